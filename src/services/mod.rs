// 服务层模块
//
// - config_store: 配置文件持久化、备份与恢复
// - migration_manager: 配置文件版本迁移
// - profile_registry: 中转站增删改查与当前中转站管理
// - env_export: 环境变量脚本渲染
// - claude_settings: Claude settings.json 同步

pub mod claude_settings;
pub mod config_store;
pub mod env_export;
pub mod migration_manager;
pub mod profile_registry;

pub use claude_settings::{AppliedSettings, ClaudeSettingsMerger};
pub use config_store::{BackupPolicy, ConfigInfo, ConfigStore};
pub use env_export::EnvExportCodec;
pub use migration_manager::{create_migration_manager, MigrationManager};
pub use profile_registry::{ProfilePatch, ProfileRegistry, ProfileStatistics, SearchField};
