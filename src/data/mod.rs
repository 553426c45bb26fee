//! 统一数据管理模块
//!
//! 提供 JSON/TOML 配置文件的统一读写接口，写入一律走原子替换。
//!
//! # 模块组织
//!
//! - `error`: 数据层错误类型定义
//! - `managers`: 各格式管理器（JSON/TOML）
//! - `manager`: 统一入口 `DataManager`
//!
//! # 使用示例
//!
//! ```rust
//! use crate::data::DataManager;
//! use std::path::Path;
//!
//! let manager = DataManager::new();
//!
//! // 读取中转站配置（原始 TOML 表）
//! let table = manager.toml().read_table(Path::new("config.toml"))?;
//!
//! // 读取 Claude 原生配置
//! let settings = manager.json().read(Path::new("~/.claude/settings.json"))?;
//! ```

pub mod error;
pub mod manager;
pub mod managers;

pub use error::{DataError, Result};
pub use manager::DataManager;
