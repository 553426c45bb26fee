// lib.rs - 中转站配置管理核心库

pub mod core; // 核心基础设施层
pub mod data; // 统一数据管理层
pub mod models;
pub mod services;
pub mod utils;

pub use crate::core::{init_logger, AppError, AppResult, ErrorKind};
pub use models::*;
pub use services::{
    ClaudeSettingsMerger, ConfigStore, EnvExportCodec, ProfilePatch, ProfileRegistry,
    ProfileStatistics, SearchField,
};
