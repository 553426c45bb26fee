//! 日志系统初始化
//!
//! 基于 `tracing-subscriber` 组装：可热重载的级别过滤层 + 控制台/滚动文件输出层（文本或 JSON）。
//! 核心库本身只产生 `tracing` 事件，是否安装订阅器由上层应用决定。

use crate::models::config::{LogConfig, LogFormat, LogLevel, LogOutput};
use std::path::PathBuf;
use std::sync::OnceLock;
use tracing_appender::{non_blocking, rolling};
use tracing_subscriber::{
    fmt,
    layer::{Layered, SubscriberExt},
    reload::{self, Handle},
    util::SubscriberInitExt,
    EnvFilter, Layer, Registry,
};

/// 滚动日志文件名前缀
const LOG_FILE_PREFIX: &str = "claudewarp.log";

/// 全局日志级别 reload handle
static LOG_LEVEL_HANDLE: OnceLock<Handle<EnvFilter, Registry>> = OnceLock::new();

/// 过滤层之上的订阅器类型，输出层都挂在它上面
type FilteredRegistry = Layered<reload::Layer<EnvFilter, Registry>, Registry>;
type BoxedLayer = Box<dyn Layer<FilteredRegistry> + Send + Sync + 'static>;

/// 初始化日志系统
///
/// 支持：
/// - 日志级别（trace/debug/info/warn/error），`RUST_LOG` 优先
/// - 输出格式（JSON/纯文本）
/// - 输出目标（控制台/文件/both），文件按天滚动
///
/// 日志级别可以通过 [`update_log_level`] 动态调整；其他配置只在初始化时生效。
/// 重复初始化返回错误。
///
/// # 示例
/// ```ignore
/// use claudewarp::core::init_logger;
/// use claudewarp::models::config::LogConfig;
///
/// init_logger(&LogConfig::default()).expect("初始化日志系统失败");
/// ```
pub fn init_logger(config: &LogConfig) -> anyhow::Result<()> {
    let filter = create_env_filter(&config.level);
    let (filter_layer, reload_handle) = reload::Layer::new(filter);

    if LOG_LEVEL_HANDLE.set(reload_handle).is_err() {
        anyhow::bail!("日志系统已初始化，不能重复初始化");
    }

    let json = config.format == LogFormat::Json;
    let mut layers: Vec<BoxedLayer> = Vec::with_capacity(2);
    if matches!(config.output, LogOutput::Console | LogOutput::Both) {
        layers.push(create_console_layer(json));
    }
    if matches!(config.output, LogOutput::File | LogOutput::Both) {
        layers.push(create_file_layer(config.file_path.as_deref(), json)?);
    }

    Registry::default()
        .with(filter_layer)
        .with(layers)
        .try_init()
        .map_err(|e| anyhow::anyhow!("安装日志订阅器失败: {e}"))?;

    tracing::info!(
        level = config.level.as_str(),
        format = ?config.format,
        output = ?config.output,
        file_path = ?config.file_path,
        "日志系统初始化完成"
    );

    Ok(())
}

/// 创建环境过滤器，`RUST_LOG` 优先
fn create_env_filter(level: &LogLevel) -> EnvFilter {
    EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_filter_directive(level)))
}

/// 默认过滤规则：本库使用指定级别，其余 crate 使用 WARN
fn default_filter_directive(level: &LogLevel) -> String {
    format!("warn,claudewarp={}", level.as_str())
}

fn create_console_layer(json: bool) -> BoxedLayer {
    let layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(cfg!(debug_assertions))
        .with_thread_ids(false);
    if json {
        layer.json().boxed()
    } else {
        layer.with_ansi(true).boxed()
    }
}

fn create_file_layer(file_path: Option<&str>, json: bool) -> anyhow::Result<BoxedLayer> {
    let log_dir = get_log_dir(file_path)?;
    let file_appender = rolling::daily(log_dir, LOG_FILE_PREFIX);
    let (writer, guard) = non_blocking(file_appender);

    // guard 被 drop 后后台写线程会停止，需与进程同寿命
    Box::leak(Box::new(guard));

    let layer = fmt::layer()
        .with_writer(writer)
        .with_ansi(false)
        .with_target(true);
    if json {
        Ok(layer.json().with_thread_ids(true).boxed())
    } else {
        Ok(layer.boxed())
    }
}

/// 获取日志目录（不存在时创建）
fn get_log_dir(file_path: Option<&str>) -> anyhow::Result<PathBuf> {
    let log_dir = match file_path {
        Some(path) => PathBuf::from(path),
        None => crate::utils::config::config_dir()?.join("logs"),
    };
    std::fs::create_dir_all(&log_dir)?;
    Ok(log_dir)
}

/// 动态更新日志级别（热重载）
///
/// # 示例
/// ```ignore
/// use claudewarp::core::{init_logger, update_log_level};
/// use claudewarp::models::config::{LogConfig, LogLevel};
///
/// init_logger(&LogConfig::default()).expect("初始化日志系统失败");
/// update_log_level(LogLevel::Debug).expect("更新日志级别失败");
/// ```
pub fn update_log_level(new_level: LogLevel) -> anyhow::Result<()> {
    let handle = LOG_LEVEL_HANDLE
        .get()
        .ok_or_else(|| anyhow::anyhow!("日志系统未初始化"))?;

    handle
        .reload(create_env_filter(&new_level))
        .map_err(|e| anyhow::anyhow!("重载日志级别失败: {}", e))?;

    tracing::info!(new_level = new_level.as_str(), "日志级别已动态更新");
    Ok(())
}
