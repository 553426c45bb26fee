//! TOML 配置管理器
//!
//! 中转站配置文件的底层读写：读取为原始 `toml::Table`（版本检查与迁移在类型化解析之前进行），
//! 写入时在文档前附加头部注释并原子替换。

use crate::data::{DataError, Result};
use crate::utils::file_helpers::atomic_write;
use serde::Serialize;
use std::fs;
use std::path::Path;
use toml::Table;

/// TOML 配置管理器
#[derive(Debug, Default)]
pub struct TomlManager;

impl TomlManager {
    pub fn new() -> Self {
        Self
    }

    /// 读取整个 TOML 文件为原始表
    pub fn read_table(&self, path: &Path) -> Result<Table> {
        let content = fs::read_to_string(path).map_err(|e| DataError::io(path, e))?;
        Self::parse_table(path, &content)
    }

    /// 解析 TOML 文本，错误信息携带来源路径
    pub fn parse_table(path: &Path, content: &str) -> Result<Table> {
        toml::from_str::<Table>(content).map_err(|e| DataError::parse(path, e.message()))
    }

    /// 序列化并写入 TOML 文件
    ///
    /// `header` 中的每一行都会以 `# ` 注释形式写在文档开头。
    pub fn write_with_header<T: Serialize>(
        &self,
        path: &Path,
        header: &[String],
        value: &T,
    ) -> Result<()> {
        let body =
            toml::to_string_pretty(value).map_err(|e| DataError::Serialize(e.to_string()))?;

        let mut content = String::new();
        for line in header {
            content.push_str("# ");
            content.push_str(line);
            content.push('\n');
        }
        if !header.is_empty() {
            content.push('\n');
        }
        content.push_str(&body);

        atomic_write(path, content.as_bytes())
    }
}
