//! 默认路径解析
//!
//! - 中转站配置目录：`$CLAUDEWARP_CONFIG_DIR`，否则 `<系统配置目录>/claudewarp`
//! - Claude 配置目录：`$CLAUDE_CONFIG_DIR`，否则 `~/.claude`

use crate::core::{AppError, AppResult};
use std::path::PathBuf;

/// 覆盖中转站配置目录的环境变量
pub const CONFIG_DIR_ENV: &str = "CLAUDEWARP_CONFIG_DIR";
/// 覆盖 Claude 配置目录的环境变量
pub const CLAUDE_CONFIG_DIR_ENV: &str = "CLAUDE_CONFIG_DIR";

pub const CONFIG_FILE_NAME: &str = "config.toml";
pub const CLAUDE_SETTINGS_FILE_NAME: &str = "settings.json";

fn env_dir(key: &str) -> Option<PathBuf> {
    std::env::var_os(key)
        .filter(|v| !v.is_empty())
        .map(PathBuf::from)
}

/// ClaudeWarp 配置目录（不会自动创建）
pub fn config_dir() -> AppResult<PathBuf> {
    if let Some(dir) = env_dir(CONFIG_DIR_ENV) {
        return Ok(dir);
    }
    dirs::config_dir()
        .map(|dir| dir.join("claudewarp"))
        .ok_or_else(|| AppError::Config("无法获取系统配置目录".to_string()))
}

/// 默认中转站配置文件路径
pub fn default_config_path() -> AppResult<PathBuf> {
    Ok(config_dir()?.join(CONFIG_FILE_NAME))
}

/// Claude 配置目录
pub fn claude_config_dir() -> AppResult<PathBuf> {
    if let Some(dir) = env_dir(CLAUDE_CONFIG_DIR_ENV) {
        return Ok(dir);
    }
    dirs::home_dir()
        .map(|home| home.join(".claude"))
        .ok_or_else(|| AppError::Config("无法获取用户主目录".to_string()))
}

/// Claude `settings.json` 默认路径
pub fn claude_settings_path() -> AppResult<PathBuf> {
    Ok(claude_config_dir()?.join(CLAUDE_SETTINGS_FILE_NAME))
}
