//! Claude `settings.json` 同步
//!
//! 把中转站写入 Claude 的原生配置文件，只改动认证、基础 URL、模型等相关键，
//! 其余内容原样保留：
//! - API 密钥 / 认证令牌写入 `env`，并移除另一种认证方式的键
//! - 密钥助手命令写入顶层 `apiKeyHelper`，并移除 `env` 中的两种认证键
//! - 始终设置 `CLAUDE_CODE_DISABLE_NONESSENTIAL_TRAFFIC = 1`
//! - 首次覆盖已有文件前备份一次到 `settings.json.claudewarp.bak`

use crate::core::{AppError, AppResult};
use crate::data::DataManager;
use crate::models::{AuthMethod, Credential, Profile, DEFAULT_PREFIX};
use crate::utils::config::claude_settings_path;
use serde_json::{json, Map, Value};
use std::fs;
use std::path::{Path, PathBuf};

pub const API_KEY_HELPER_KEY: &str = "apiKeyHelper";
pub const DISABLE_TRAFFIC_KEY: &str = "CLAUDE_CODE_DISABLE_NONESSENTIAL_TRAFFIC";

/// 当前 `settings.json` 中生效的中转站信息
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppliedSettings {
    pub base_url: Option<String>,
    pub auth_method: Option<AuthMethod>,
}

/// Claude 原生配置合并器
pub struct ClaudeSettingsMerger {
    settings_path: PathBuf,
    env_prefix: String,
    data_manager: DataManager,
}

impl ClaudeSettingsMerger {
    pub fn new(settings_path: impl Into<PathBuf>) -> Self {
        Self {
            settings_path: settings_path.into(),
            env_prefix: DEFAULT_PREFIX.to_string(),
            data_manager: DataManager::new(),
        }
    }

    /// 使用默认路径（`~/.claude/settings.json`）
    pub fn with_default_path() -> AppResult<Self> {
        Ok(Self::new(claude_settings_path()?))
    }

    /// 自定义 `env` 中变量名前缀（默认 `ANTHROPIC_`）
    pub fn with_env_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.env_prefix = prefix.into();
        self
    }

    pub fn settings_path(&self) -> &Path {
        &self.settings_path
    }

    /// 一次性备份路径（与配置文件同目录）
    pub fn backup_path(&self) -> PathBuf {
        let mut name = self
            .settings_path
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_else(|| "settings.json".into());
        name.push(".claudewarp.bak");
        self.settings_path.with_file_name(name)
    }

    fn env_key(&self, suffix: &str) -> String {
        format!("{}{suffix}", self.env_prefix)
    }

    /// 将中转站合并进配置文档（纯内存操作）
    pub fn merge(&self, doc: &mut Value, profile: &Profile) -> AppResult<()> {
        let root = doc
            .as_object_mut()
            .ok_or_else(|| AppError::validation("settings", "配置文件根节点必须是 JSON 对象"))?;

        match &profile.credential {
            Credential::Helper(command) => {
                root.insert(API_KEY_HELPER_KEY.to_string(), json!(command));
            }
            Credential::ApiKey(_) | Credential::AuthToken(_) => {
                root.shift_remove(API_KEY_HELPER_KEY);
            }
        }

        if !root.contains_key("permissions") {
            root.insert(
                "permissions".to_string(),
                json!({ "allow": [], "deny": [] }),
            );
        }

        let env = ensure_object(root, "env")
            .ok_or_else(|| AppError::validation("settings.env", "env 必须是 JSON 对象"))?;
        let api_key = self.env_key("API_KEY");
        let auth_token = self.env_key("AUTH_TOKEN");
        match &profile.credential {
            Credential::ApiKey(key) => {
                env.insert(api_key, json!(key));
                env.shift_remove(&auth_token);
            }
            Credential::AuthToken(token) => {
                env.insert(auth_token, json!(token));
                env.shift_remove(&api_key);
            }
            Credential::Helper(_) => {
                env.shift_remove(&api_key);
                env.shift_remove(&auth_token);
            }
        }

        env.insert(self.env_key("BASE_URL"), json!(profile.base_url));
        for (suffix, model) in [
            ("MODEL", &profile.bigmodel),
            ("SMALL_FAST_MODEL", &profile.smallmodel),
        ] {
            // 未设置的模型要清掉上一个中转站留下的值
            match model {
                Some(model) => env.insert(self.env_key(suffix), json!(model)),
                None => env.shift_remove(&self.env_key(suffix)),
            };
        }
        env.insert(DISABLE_TRAFFIC_KEY.to_string(), json!(1));

        Ok(())
    }

    /// 将中转站写入 `settings.json`，返回写入的路径
    ///
    /// 已有文件不是合法 JSON 时报错且不修改文件。
    pub fn apply(&self, profile: &Profile) -> AppResult<PathBuf> {
        let path = &self.settings_path;
        let existed = path.is_file();
        let mut doc = self.data_manager.json().read_or_empty(path)?;

        self.merge(&mut doc, profile)?;

        let backup = self.backup_path();
        if existed && !backup.exists() {
            fs::copy(path, &backup).map_err(|e| AppError::io(&backup, e, "写入备份"))?;
            tracing::info!(backup = %backup.display(), "已备份 Claude 原配置");
        }

        self.data_manager.json().write(path, &doc)?;
        tracing::info!(
            profile = %profile.name,
            auth_method = %profile.auth_method(),
            path = %path.display(),
            "已应用到 Claude 配置"
        );
        Ok(path.clone())
    }

    /// 读取 `settings.json` 当前指向的基础 URL 与认证方式，文件不存在时返回 `None`
    pub fn read_current(&self) -> AppResult<Option<AppliedSettings>> {
        if !self.settings_path.is_file() {
            return Ok(None);
        }
        let doc = self.data_manager.json().read(&self.settings_path)?;
        let env = doc.get("env").and_then(Value::as_object);
        let env_str = |suffix: &str| {
            env.and_then(|e| e.get(&self.env_key(suffix)))
                .and_then(Value::as_str)
                .map(str::to_string)
        };

        let auth_method = if doc.get(API_KEY_HELPER_KEY).is_some() {
            Some(AuthMethod::ApiKeyHelper)
        } else if env_str("API_KEY").is_some() {
            Some(AuthMethod::ApiKey)
        } else if env_str("AUTH_TOKEN").is_some() {
            Some(AuthMethod::AuthToken)
        } else {
            None
        };

        Ok(Some(AppliedSettings {
            base_url: env_str("BASE_URL"),
            auth_method,
        }))
    }
}

/// 取出指定键的对象，不存在或类型不符时替换为空对象
fn ensure_object<'a>(
    root: &'a mut Map<String, Value>,
    key: &str,
) -> Option<&'a mut Map<String, Value>> {
    let entry = root
        .entry(key.to_string())
        .or_insert_with(|| Value::Object(Map::new()));
    if !entry.is_object() {
        tracing::warn!(key, "配置项类型不是对象，已重置");
        *entry = Value::Object(Map::new());
    }
    entry.as_object_mut()
}
