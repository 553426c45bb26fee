//! 统一数据管理入口
//!
//! 聚合 JSON 与 TOML 管理器，供配置存储与外部配置合并共用。

use crate::data::managers::{JsonManager, TomlManager};

/// 统一数据管理器
#[derive(Debug, Default)]
pub struct DataManager {
    json: JsonManager,
    toml: TomlManager,
}

impl DataManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// JSON 管理器（Claude `settings.json` 等）
    pub fn json(&self) -> &JsonManager {
        &self.json
    }

    /// TOML 管理器（中转站配置文件）
    pub fn toml(&self) -> &TomlManager {
        &self.toml
    }
}
