// Migration Manager - 迁移管理器核心
//
// 根据配置表中的版本号规划并执行迁移链

use super::migration_trait::{compare_versions, Migration, MigrationResult};
use crate::core::{AppError, AppResult};
use crate::models::profile_set::{CURRENT_CONFIG_VERSION, SUPPORTED_CONFIG_VERSIONS};
use std::cmp::Ordering;
use std::sync::Arc;
use toml::{Table, Value};

/// 读取配置表中的版本号，缺失时视为当前版本
pub fn read_version(table: &Table) -> AppResult<String> {
    match table.get("version") {
        None => Ok(CURRENT_CONFIG_VERSION.to_string()),
        Some(Value::String(version)) => Ok(version.clone()),
        Some(other) => Err(AppError::validation(
            "version",
            format!("版本号必须是字符串，实际为 {}", other.type_str()),
        )),
    }
}

/// 检查版本是否受支持
pub fn ensure_supported(version: &str) -> AppResult<()> {
    if SUPPORTED_CONFIG_VERSIONS.contains(&version) {
        Ok(())
    } else {
        Err(AppError::UnsupportedVersion {
            version: version.to_string(),
        })
    }
}

/// 迁移管理器
#[derive(Default)]
pub struct MigrationManager {
    migrations: Vec<Arc<dyn Migration>>,
}

impl MigrationManager {
    /// 创建新的迁移管理器
    pub fn new() -> Self {
        Self {
            migrations: Vec::new(),
        }
    }

    /// 注册迁移
    pub fn register(&mut self, migration: Arc<dyn Migration>) {
        tracing::debug!(
            id = migration.id(),
            target_version = migration.target_version(),
            "注册迁移"
        );
        self.migrations.push(migration);
    }

    /// 列出已注册的迁移 (id, 目标版本)
    pub fn list_migrations(&self) -> Vec<(String, String)> {
        self.migrations
            .iter()
            .map(|m| (m.id().to_string(), m.target_version().to_string()))
            .collect()
    }

    /// 给定版本是否需要迁移
    pub fn needs_migration(&self, version: &str) -> bool {
        compare_versions(version, CURRENT_CONFIG_VERSION) == Ordering::Less
    }

    /// 执行所有需要的迁移
    ///
    /// 流程：
    /// 1. 读取配置表版本，不受支持的版本直接报错
    /// 2. 筛选 version < target_version <= 当前版本 的迁移，按目标版本排序
    /// 3. 依次执行，每个迁移成功后写入其目标版本
    /// 4. 最后将版本号更新为当前版本
    ///
    /// 任一迁移失败即中止，调用方不应持久化半迁移的配置表。
    pub fn run(&self, table: &mut Table) -> AppResult<Vec<MigrationResult>> {
        let current_version = read_version(table)?;
        ensure_supported(&current_version)?;

        if !self.needs_migration(&current_version) {
            return Ok(Vec::new());
        }

        let mut pending: Vec<_> = self
            .migrations
            .iter()
            .filter(|m| {
                compare_versions(&current_version, m.target_version()) == Ordering::Less
                    && compare_versions(m.target_version(), CURRENT_CONFIG_VERSION)
                        != Ordering::Greater
            })
            .collect();
        pending.sort_by(|a, b| compare_versions(a.target_version(), b.target_version()));

        tracing::info!(
            from = %current_version,
            to = CURRENT_CONFIG_VERSION,
            count = pending.len(),
            "开始迁移配置文件"
        );

        let mut results = Vec::with_capacity(pending.len());
        for migration in pending {
            let result = migration
                .migrate(table)
                .map_err(|e| AppError::Migration {
                    migration_id: migration.id().to_string(),
                    reason: e.to_string(),
                })?;
            table.insert(
                "version".to_string(),
                Value::String(migration.target_version().to_string()),
            );
            tracing::info!(
                migration = migration.name(),
                records = result.records_migrated,
                "{}",
                result.message
            );
            results.push(result);
        }

        table.insert(
            "version".to_string(),
            Value::String(CURRENT_CONFIG_VERSION.to_string()),
        );
        Ok(results)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::ErrorKind;
    use crate::services::migration_manager::create_migration_manager;

    struct FailingMigration;

    impl Migration for FailingMigration {
        fn id(&self) -> &str {
            "always_fails"
        }
        fn name(&self) -> &str {
            "失败迁移"
        }
        fn target_version(&self) -> &str {
            "1.0"
        }
        fn migrate(&self, _table: &mut Table) -> AppResult<MigrationResult> {
            Err(AppError::Config("boom".to_string()))
        }
    }

    #[test]
    fn test_current_version_is_noop() {
        let manager = create_migration_manager();
        let mut table: Table = toml::from_str("version = \"1.0\"").unwrap();
        let before = table.clone();
        assert!(manager.run(&mut table).unwrap().is_empty());
        assert_eq!(table, before);
    }

    #[test]
    fn test_missing_version_treated_as_current() {
        let manager = create_migration_manager();
        let mut table = Table::new();
        assert!(manager.run(&mut table).unwrap().is_empty());
    }

    #[test]
    fn test_legacy_version_migrated() {
        let manager = create_migration_manager();
        let mut table: Table = toml::from_str("version = \"0.9\"").unwrap();
        let results = manager.run(&mut table).unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(table["version"].as_str(), Some(CURRENT_CONFIG_VERSION));
    }

    #[test]
    fn test_unsupported_version_rejected() {
        let manager = create_migration_manager();
        let mut table: Table = toml::from_str("version = \"999.0\"").unwrap();
        let err = manager.run(&mut table).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Config);
        assert_eq!(err.code(), "UNSUPPORTED_CONFIG_VERSION");
    }

    #[test]
    fn test_non_string_version_rejected() {
        let table: Table = toml::from_str("version = 1").unwrap();
        assert_eq!(read_version(&table).unwrap_err().kind(), ErrorKind::Validation);
    }

    #[test]
    fn test_failed_migration_aborts() {
        let mut manager = MigrationManager::new();
        manager.register(Arc::new(FailingMigration));
        let mut table: Table = toml::from_str("version = \"0.9\"").unwrap();

        let err = manager.run(&mut table).unwrap_err();
        assert_eq!(err.code(), "MIGRATION_ERROR");
        assert_eq!(table["version"].as_str(), Some("0.9"));
    }
}
