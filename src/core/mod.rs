//! 核心基础设施层
//!
//! - `error`: 统一错误类型
//! - `logger`: 日志系统初始化与热重载

pub mod error;
pub mod logger;

pub use error::{AppError, AppResult, ErrorKind};
pub use logger::{init_logger, update_log_level};
