//! 统一错误类型定义
//!
//! 所有公开操作都返回 [`AppResult`]。每个错误携带：
//! - 错误类别 [`ErrorKind`]（配置 / 校验 / 未找到 / 重复 / 导出 / 系统）
//! - 稳定的机器可读错误码（如 `CONFIG_FILE_CORRUPTED`）
//! - 面向用户的描述信息（`Display`）

use crate::data::DataError;
use serde::Serialize;
use std::path::PathBuf;
use thiserror::Error;

/// 错误类别
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    Config,
    Validation,
    NotFound,
    Duplicate,
    Export,
    System,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::Config => "config",
            ErrorKind::Validation => "validation",
            ErrorKind::NotFound => "not_found",
            ErrorKind::Duplicate => "duplicate",
            ErrorKind::Export => "export",
            ErrorKind::System => "system",
        }
    }
}

/// 核心库统一错误类型
#[derive(Error, Debug)]
pub enum AppError {
    /// 配置文件格式错误（TOML/JSON 解析失败）
    #[error("配置文件格式错误: {path}: {detail}")]
    Corrupted { path: PathBuf, detail: String },

    /// 不支持的配置文件版本
    #[error("不支持的配置文件版本: {version}")]
    UnsupportedVersion { version: String },

    /// 配置文件权限不足
    #[error("配置文件权限不足，无法{operation}: {path}")]
    Permission { path: PathBuf, operation: String },

    /// 其他配置错误
    #[error("配置错误: {0}")]
    Config(String),

    /// 配置迁移失败
    #[error("配置迁移失败 ({migration_id}): {reason}")]
    Migration {
        migration_id: String,
        reason: String,
    },

    /// 数据校验失败
    #[error("数据验证失败 [{field}]: {message}")]
    Validation { field: String, message: String },

    /// 尝试切换到未启用的中转站
    #[error("代理服务器 '{0}' 未启用")]
    ProfileInactive(String),

    /// 中转站不存在
    #[error("代理服务器 '{0}' 不存在")]
    ProfileNotFound(String),

    /// 备份文件不存在
    #[error("备份文件不存在: {0}")]
    BackupNotFound(PathBuf),

    /// 中转站名称重复
    #[error("代理服务器 '{0}' 已存在")]
    Duplicate(String),

    /// 没有可导出的当前中转站
    #[error("没有设置当前代理服务器")]
    NoCurrentProfile,

    /// 不支持的 Shell 类型
    #[error("不支持的 Shell 类型: {0}")]
    UnsupportedShell(String),

    /// 文件系统错误
    #[error("文件操作失败: {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// 核心库 Result 别名
pub type AppResult<T> = std::result::Result<T, AppError>;

impl AppError {
    /// 便捷的校验错误构造器
    pub fn validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Validation {
            field: field.into(),
            message: message.into(),
        }
    }

    /// 根据 I/O 错误类型构造，权限拒绝单独归类为配置错误
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error, operation: &str) -> Self {
        let path = path.into();
        if source.kind() == std::io::ErrorKind::PermissionDenied {
            Self::Permission {
                path,
                operation: operation.to_string(),
            }
        } else {
            Self::Io { path, source }
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            AppError::Corrupted { .. }
            | AppError::UnsupportedVersion { .. }
            | AppError::Permission { .. }
            | AppError::Config(_)
            | AppError::Migration { .. } => ErrorKind::Config,
            AppError::Validation { .. } | AppError::ProfileInactive(_) => ErrorKind::Validation,
            AppError::ProfileNotFound(_) | AppError::BackupNotFound(_) => ErrorKind::NotFound,
            AppError::Duplicate(_) => ErrorKind::Duplicate,
            AppError::NoCurrentProfile | AppError::UnsupportedShell(_) => ErrorKind::Export,
            AppError::Io { .. } => ErrorKind::System,
        }
    }

    /// 稳定的错误码，供调用方做分支判断
    pub fn code(&self) -> &'static str {
        match self {
            AppError::Corrupted { .. } => "CONFIG_FILE_CORRUPTED",
            AppError::UnsupportedVersion { .. } => "UNSUPPORTED_CONFIG_VERSION",
            AppError::Permission { .. } => "CONFIG_PERMISSION_ERROR",
            AppError::Config(_) => "CONFIG_ERROR",
            AppError::Migration { .. } => "MIGRATION_ERROR",
            AppError::Validation { .. } => "VALIDATION_ERROR",
            AppError::ProfileInactive(_) => "PROXY_INACTIVE",
            AppError::ProfileNotFound(_) => "PROXY_NOT_FOUND",
            AppError::BackupNotFound(_) => "BACKUP_NOT_FOUND",
            AppError::Duplicate(_) => "DUPLICATE_PROXY",
            AppError::NoCurrentProfile => "NO_CURRENT_PROXY",
            AppError::UnsupportedShell(_) => "UNSUPPORTED_SHELL",
            AppError::Io { .. } => "SYSTEM_ERROR",
        }
    }

    /// 用户修正输入后即可重试的错误
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self.kind(),
            ErrorKind::Validation | ErrorKind::NotFound | ErrorKind::Duplicate | ErrorKind::Export
        )
    }
}

impl From<DataError> for AppError {
    fn from(err: DataError) -> Self {
        match err {
            DataError::Io { path, source } => AppError::io(path, source, "访问"),
            DataError::Parse { path, detail } => AppError::Corrupted { path, detail },
            DataError::Serialize(detail) => AppError::Config(format!("序列化失败: {detail}")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_kind_and_code() {
        let err = AppError::ProfileNotFound("missing".to_string());
        assert_eq!(err.kind(), ErrorKind::NotFound);
        assert_eq!(err.code(), "PROXY_NOT_FOUND");
        assert!(err.to_string().contains("missing"));

        let err = AppError::UnsupportedVersion {
            version: "999.0".to_string(),
        };
        assert_eq!(err.kind(), ErrorKind::Config);
        assert!(!err.is_recoverable());

        assert_eq!(AppError::NoCurrentProfile.kind(), ErrorKind::Export);
        assert_eq!(
            AppError::Duplicate("a".into()).kind().as_str(),
            "duplicate"
        );
    }

    #[test]
    fn test_permission_denied_is_config_error() {
        let io_err = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied");
        let err = AppError::io("/etc/config.toml", io_err, "写入");
        assert_eq!(err.code(), "CONFIG_PERMISSION_ERROR");
        assert_eq!(err.kind(), ErrorKind::Config);
        assert!(err.to_string().contains("写入"));

        let io_err = std::io::Error::new(std::io::ErrorKind::Other, "boom");
        let err = AppError::io("/tmp/x", io_err, "写入");
        assert_eq!(err.kind(), ErrorKind::System);
    }

    #[test]
    fn test_data_error_conversion() {
        let err: AppError = DataError::Parse {
            path: PathBuf::from("config.toml"),
            detail: "expected `=`".to_string(),
        }
        .into();
        assert!(matches!(err, AppError::Corrupted { .. }));
        assert!(err.to_string().contains("配置文件格式错误"));

        let err: AppError = DataError::Serialize("bad".to_string()).into();
        assert_eq!(err.kind(), ErrorKind::Config);
    }

    #[test]
    fn test_validation_is_recoverable() {
        let err = AppError::validation("name", "名称不能为空");
        assert!(err.is_recoverable());
        assert_eq!(err.to_string(), "数据验证失败 [name]: 名称不能为空");
    }
}
