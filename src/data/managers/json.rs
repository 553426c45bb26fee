//! JSON 配置管理器
//!
//! 用于读写外部工具的 JSON 配置（如 Claude `settings.json`）：
//! - 解析失败时携带文件路径
//! - 写入使用格式化输出并原子替换
//! - Unix 权限设置（0o600）
//!
//! # 使用示例
//!
//! ```rust
//! use std::path::Path;
//! use crate::data::managers::JsonManager;
//!
//! let manager = JsonManager::new();
//! let mut settings = manager.read(Path::new("~/.claude/settings.json"))?;
//! settings["env"]["ANTHROPIC_BASE_URL"] = serde_json::json!("https://api.example.com/");
//! manager.write(Path::new("~/.claude/settings.json"), &settings)?;
//! ```

use crate::data::{DataError, Result};
use crate::utils::file_helpers::atomic_write;
use serde_json::Value;
use std::fs;
use std::path::Path;

/// JSON 配置管理器
#[derive(Debug, Default)]
pub struct JsonManager;

impl JsonManager {
    pub fn new() -> Self {
        Self
    }

    /// 读取整个 JSON 文件
    ///
    /// # 返回
    ///
    /// - `Ok(Value)`: JSON 值
    /// - `Err(DataError::Io)`: 读取失败
    /// - `Err(DataError::Parse)`: 内容不是合法 JSON
    pub fn read(&self, path: &Path) -> Result<Value> {
        let content = fs::read_to_string(path).map_err(|e| DataError::io(path, e))?;
        serde_json::from_str(&content).map_err(|e| DataError::parse(path, e))
    }

    /// 读取 JSON 文件，文件不存在时返回空对象
    pub fn read_or_empty(&self, path: &Path) -> Result<Value> {
        if !path.exists() {
            return Ok(Value::Object(serde_json::Map::new()));
        }
        self.read(path)
    }

    /// 写入整个 JSON 文件（原子替换）
    pub fn write(&self, path: &Path, value: &Value) -> Result<()> {
        let mut content =
            serde_json::to_string_pretty(value).map_err(|e| DataError::Serialize(e.to_string()))?;
        content.push('\n');
        atomic_write(path, content.as_bytes())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::TempDir;

    #[test]
    fn test_read_write() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("settings.json");
        let manager = JsonManager::new();

        let value = json!({"env": {"FOO": "bar"}, "model": "opus"});
        manager.write(&path, &value).unwrap();

        let read_value = manager.read(&path).unwrap();
        assert_eq!(read_value, value);
    }

    #[test]
    fn test_write_preserves_key_order() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("settings.json");
        let manager = JsonManager::new();

        fs::write(&path, r#"{"zeta": 1, "alpha": 2, "mid": 3}"#).unwrap();
        let value = manager.read(&path).unwrap();
        manager.write(&path, &value).unwrap();

        let content = fs::read_to_string(&path).unwrap();
        let zeta = content.find("zeta").unwrap();
        let alpha = content.find("alpha").unwrap();
        let mid = content.find("mid").unwrap();
        assert!(zeta < alpha && alpha < mid);
    }

    #[test]
    fn test_read_or_empty_missing_file() {
        let temp_dir = TempDir::new().unwrap();
        let manager = JsonManager::new();
        let value = manager
            .read_or_empty(&temp_dir.path().join("missing.json"))
            .unwrap();
        assert_eq!(value, json!({}));
    }

    #[test]
    fn test_read_invalid_json() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("broken.json");
        fs::write(&path, "{not json").unwrap();

        let err = JsonManager::new().read(&path).unwrap_err();
        assert!(matches!(err, DataError::Parse { .. }));
    }
}
