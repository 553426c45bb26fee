//! 各格式配置管理器

pub mod json;
pub mod toml;

pub use json::JsonManager;
pub use toml::TomlManager;
