// Migration Manager Module
//
// 配置文件版本迁移

mod manager;
mod migration_trait;
mod migrations;

pub use manager::{ensure_supported, read_version, MigrationManager};
pub use migration_trait::{compare_versions, Migration, MigrationResult};
pub use migrations::ProfileSchemaV1Migration;

use std::sync::Arc;

/// 创建并初始化迁移管理器
///
/// 自动注册所有迁移（按版本号执行）：
/// - ProfileSchemaV1Migration (1.0) - 0.9 配置结构升级
pub fn create_migration_manager() -> MigrationManager {
    let mut manager = MigrationManager::new();
    manager.register(Arc::new(ProfileSchemaV1Migration::new()));

    tracing::debug!(
        count = manager.list_migrations().len(),
        "迁移管理器初始化完成"
    );

    manager
}
