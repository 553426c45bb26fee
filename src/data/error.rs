//! 数据层错误类型定义
//!
//! 使用 `thiserror` 定义文件格式管理器的错误类型，上层通过 `From<DataError> for AppError` 归类。

use std::path::PathBuf;
use thiserror::Error;

/// 数据管理模块的统一错误类型
#[derive(Error, Debug)]
pub enum DataError {
    /// 文件 I/O 错误
    #[error("文件 I/O 错误: {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// 文件内容无法解析（TOML/JSON 语法错误）
    #[error("解析失败: {path}: {detail}")]
    Parse { path: PathBuf, detail: String },

    /// 序列化失败
    #[error("序列化失败: {0}")]
    Serialize(String),
}

/// 便于与现有代码集成的类型别名
pub type Result<T> = std::result::Result<T, DataError>;

impl DataError {
    /// 从 `std::io::Error` 和路径创建 I/O 错误
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    pub fn parse(path: impl Into<PathBuf>, detail: impl ToString) -> Self {
        Self::Parse {
            path: path.into(),
            detail: detail.to_string(),
        }
    }
}
