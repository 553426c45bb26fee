// Migration - 配置文件迁移接口
//
// 迁移直接作用于原始 TOML 表，在类型化解析之前执行

use crate::core::AppResult;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use toml::Table;

/// 迁移接口
pub trait Migration: Send + Sync {
    /// 迁移唯一标识（如 "profile_schema_v1"）
    fn id(&self) -> &str;

    /// 迁移名称（用于日志）
    fn name(&self) -> &str;

    /// 目标版本号（迁移执行后达到的版本）
    ///
    /// 规则：config.version < target_version 时执行
    fn target_version(&self) -> &str;

    /// 执行迁移，原地修改配置表
    fn migrate(&self, table: &mut Table) -> AppResult<MigrationResult>;
}

/// 迁移结果
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MigrationResult {
    pub migration_id: String,
    pub message: String,
    /// 受影响的中转站条目数
    pub records_migrated: usize,
}

/// 补全为三段式版本号，"1.0" → "1.0.0"
fn normalize_version(version: &str) -> String {
    let parts = version.split('.').count();
    match parts {
        1 => format!("{version}.0.0"),
        2 => format!("{version}.0"),
        _ => version.to_string(),
    }
}

/// 版本比较辅助函数
pub fn compare_versions(v1: &str, v2: &str) -> Ordering {
    use semver::Version;

    let version1 = Version::parse(&normalize_version(v1)).ok();
    let version2 = Version::parse(&normalize_version(v2)).ok();

    match (version1, version2) {
        (Some(ver1), Some(ver2)) => ver1.cmp(&ver2),
        (Some(_), None) => Ordering::Greater,
        (None, Some(_)) => Ordering::Less,
        (None, None) => v1.cmp(v2), // 字符串比较
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version_comparison() {
        assert_eq!(compare_versions("0.9", "1.0"), Ordering::Less);
        assert_eq!(compare_versions("1.0", "1.0.0"), Ordering::Equal);
        assert_eq!(compare_versions("999.0", "1.0"), Ordering::Greater);
        assert_eq!(compare_versions("1.10", "1.9"), Ordering::Greater);
        assert_eq!(compare_versions("garbage", "1.0"), Ordering::Less);
    }
}
