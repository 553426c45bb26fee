//! 中转站配置存储（ConfigStore）
//!
//! 负责 `config.toml` 的持久化：
//! - 加载时先检查版本并按需在内存中迁移，再做类型化解析与校验
//! - 保存前可选地备份旧文件到同级 `backups/` 目录，并按数量上限清理
//! - 写入采用同目录临时文件 + rename 的原子替换
//!
//! # 使用示例
//!
//! ```rust
//! use claudewarp::services::ConfigStore;
//!
//! let store = ConfigStore::with_default_path()?;
//! let mut set = store.load()?;
//! set.settings.insert("theme".into(), toml::Value::String("dark".into()));
//! store.save(&mut set)?;
//! ```

use crate::core::{AppError, AppResult};
use crate::data::DataManager;
use crate::models::profile_set::{ProfileSet, ProfileSetDocument, DEFAULT_MAX_BACKUPS};
use crate::services::migration_manager::{
    create_migration_manager, ensure_supported, read_version, MigrationManager,
};
use crate::utils::config::default_config_path;
use crate::utils::file_helpers::{atomic_write, file_checksum};
use chrono::{DateTime, Local, Utc};
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::SystemTime;
use toml::Table;

const BACKUP_DIR_NAME: &str = "backups";

/// 备份策略
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct BackupPolicy {
    pub auto_backup: bool,
    pub max_backups: usize,
}

impl Default for BackupPolicy {
    fn default() -> Self {
        Self {
            auto_backup: true,
            max_backups: DEFAULT_MAX_BACKUPS,
        }
    }
}

/// 配置文件状态信息
#[derive(Debug, Clone, Serialize)]
pub struct ConfigInfo {
    pub config_path: PathBuf,
    pub exists: bool,
    pub size: Option<u64>,
    pub modified: Option<DateTime<Utc>>,
    pub readonly: Option<bool>,
    /// 文件内容 SHA256
    pub checksum: Option<String>,
    pub auto_backup: bool,
    pub max_backups: usize,
    pub backup_dir: PathBuf,
    pub backup_count: usize,
    pub latest_backup: Option<PathBuf>,
}

/// 中转站配置存储
pub struct ConfigStore {
    config_path: PathBuf,
    backup_dir: PathBuf,
    policy: BackupPolicy,
    /// 调用方显式指定了策略时，不再被配置文件中的 settings 覆盖
    policy_pinned: bool,
    data_manager: DataManager,
    migrations: MigrationManager,
}

impl ConfigStore {
    /// 使用指定路径创建（不会访问文件系统）
    pub fn new(config_path: impl Into<PathBuf>) -> Self {
        let config_path = config_path.into();
        let backup_dir = config_path
            .parent()
            .map(|p| p.join(BACKUP_DIR_NAME))
            .unwrap_or_else(|| PathBuf::from(BACKUP_DIR_NAME));

        Self {
            config_path,
            backup_dir,
            policy: BackupPolicy::default(),
            policy_pinned: false,
            data_manager: DataManager::new(),
            migrations: create_migration_manager(),
        }
    }

    /// 使用默认路径创建
    pub fn with_default_path() -> AppResult<Self> {
        Ok(Self::new(default_config_path()?))
    }

    /// 显式指定备份策略
    pub fn with_backup_policy(mut self, policy: BackupPolicy) -> Self {
        self.policy = policy;
        self.policy_pinned = true;
        self
    }

    pub fn config_path(&self) -> &Path {
        &self.config_path
    }

    pub fn backup_dir(&self) -> &Path {
        &self.backup_dir
    }

    pub fn policy(&self) -> BackupPolicy {
        self.policy
    }

    pub fn exists(&self) -> bool {
        self.config_path.is_file()
    }

    /// 从配置文件的 settings 表读取备份策略（显式指定过策略时忽略）
    pub fn apply_settings(&mut self, settings: &Table) {
        if self.policy_pinned {
            return;
        }
        if let Some(auto_backup) = settings.get("auto_backup").and_then(|v| v.as_bool()) {
            self.policy.auto_backup = auto_backup;
        }
        if let Some(max_backups) = settings
            .get("max_backups")
            .and_then(|v| v.as_integer())
            .and_then(|v| usize::try_from(v).ok())
        {
            self.policy.max_backups = max_backups;
        }
        tracing::debug!(
            auto_backup = self.policy.auto_backup,
            max_backups = self.policy.max_backups,
            "已应用配置文件中的备份策略"
        );
    }

    // ==================== 加载 / 保存 ====================

    /// 加载配置
    ///
    /// 文件不存在时创建默认配置并立即写盘；文件损坏时返回错误且不修改文件。
    pub fn load(&self) -> AppResult<ProfileSet> {
        if !self.exists() {
            let mut set = ProfileSet::new();
            self.save(&mut set)?;
            tracing::info!(path = %self.config_path.display(), "配置文件不存在，已创建默认配置");
            return Ok(set);
        }

        let mut table = self.data_manager.toml().read_table(&self.config_path)?;
        let results = self.migrations.run(&mut table)?;
        if !results.is_empty() {
            tracing::info!(
                path = %self.config_path.display(),
                migrations = results.len(),
                "配置文件版本较旧，已在内存中迁移"
            );
        }

        let set = parse_table(table)?;
        tracing::debug!(
            path = %self.config_path.display(),
            proxies = set.len(),
            current = ?set.current_proxy,
            "配置文件加载完成"
        );
        Ok(set)
    }

    /// 保存配置
    ///
    /// 校验通过后刷新 `updated_at`；文件已存在且启用自动备份时先备份旧文件。
    pub fn save(&self, set: &mut ProfileSet) -> AppResult<()> {
        set.validate()?;
        set.touch();

        if self.exists() && self.policy.auto_backup {
            self.create_backup()?;
            self.cleanup_old_backups()?;
        }

        let header = vec![
            "ClaudeWarp 中转站配置文件".to_string(),
            format!("配置版本: {}", set.version),
            format!("生成时间: {}", Local::now().format("%Y-%m-%d %H:%M:%S")),
        ];
        self.data_manager
            .toml()
            .write_with_header(&self.config_path, &header, &set.to_document())?;

        tracing::debug!(
            path = %self.config_path.display(),
            proxies = set.len(),
            "配置文件已保存"
        );
        Ok(())
    }

    /// 将磁盘上的旧版本配置迁移到当前版本并写回
    ///
    /// 返回是否执行了迁移；文件不存在或已是当前版本时返回 `false`。
    pub fn migrate(&self) -> AppResult<bool> {
        if !self.exists() {
            return Ok(false);
        }

        let mut table = self.data_manager.toml().read_table(&self.config_path)?;
        let version = read_version(&table)?;
        ensure_supported(&version)?;
        if !self.migrations.needs_migration(&version) {
            return Ok(false);
        }

        self.migrations.run(&mut table)?;
        let mut set = parse_table(table)?;
        self.save(&mut set)?;

        tracing::info!(
            path = %self.config_path.display(),
            from = %version,
            to = %set.version,
            "配置文件迁移完成"
        );
        Ok(true)
    }

    // ==================== 备份 ====================

    /// 立即备份当前配置文件，返回备份路径
    pub fn create_backup(&self) -> AppResult<PathBuf> {
        fs::create_dir_all(&self.backup_dir)
            .map_err(|e| AppError::io(&self.backup_dir, e, "创建备份目录"))?;

        let (stem, ext) = self.backup_name_parts();
        let timestamp = Local::now().format("%Y%m%d_%H%M%S_%6f");
        let mut backup_path = self.backup_dir.join(format!("{stem}_{timestamp}.{ext}"));
        let mut attempt = 1;
        while backup_path.exists() {
            backup_path = self
                .backup_dir
                .join(format!("{stem}_{timestamp}_{attempt}.{ext}"));
            attempt += 1;
        }

        fs::copy(&self.config_path, &backup_path)
            .map_err(|e| AppError::io(&backup_path, e, "写入备份"))?;
        tracing::debug!(backup = %backup_path.display(), "已备份配置文件");
        Ok(backup_path)
    }

    /// 列出备份文件（按修改时间从新到旧）
    pub fn get_backup_files(&self) -> AppResult<Vec<PathBuf>> {
        if !self.backup_dir.is_dir() {
            return Ok(Vec::new());
        }

        let (stem, ext) = self.backup_name_parts();
        let prefix = format!("{stem}_");
        let suffix = format!(".{ext}");

        let entries = fs::read_dir(&self.backup_dir)
            .map_err(|e| AppError::io(&self.backup_dir, e, "读取备份目录"))?;
        let mut backups: Vec<(SystemTime, PathBuf)> = entries
            .filter_map(|entry| entry.ok())
            .map(|entry| entry.path())
            .filter(|path| path.is_file())
            .filter(|path| {
                path.file_name()
                    .and_then(|n| n.to_str())
                    .is_some_and(|n| n.starts_with(&prefix) && n.ends_with(&suffix))
            })
            .map(|path| {
                let modified = fs::metadata(&path)
                    .and_then(|m| m.modified())
                    .unwrap_or(SystemTime::UNIX_EPOCH);
                (modified, path)
            })
            .collect();

        backups.sort_by(|a, b| b.0.cmp(&a.0).then_with(|| b.1.cmp(&a.1)));
        Ok(backups.into_iter().map(|(_, path)| path).collect())
    }

    /// 按 `max_backups` 清理最旧的备份，返回删除数量
    ///
    /// 任何一个备份删除失败都返回错误。
    pub fn cleanup_old_backups(&self) -> AppResult<usize> {
        let backups = self.get_backup_files()?;
        let mut removed = 0;
        for old in backups.iter().skip(self.policy.max_backups) {
            fs::remove_file(old).map_err(|e| AppError::io(old, e, "删除旧备份"))?;
            removed += 1;
        }
        if removed > 0 {
            tracing::debug!(removed, "已清理旧备份");
        }
        Ok(removed)
    }

    /// 用备份文件覆盖当前配置，调用方需重新加载
    ///
    /// 备份内容必须是合法的 TOML，否则不会覆盖当前配置。
    pub fn restore_from_backup(&self, backup_path: &Path) -> AppResult<()> {
        if !backup_path.is_file() {
            return Err(AppError::BackupNotFound(backup_path.to_path_buf()));
        }

        let content = fs::read_to_string(backup_path)
            .map_err(|e| AppError::io(backup_path, e, "读取备份"))?;
        crate::data::managers::TomlManager::parse_table(backup_path, &content)?;
        atomic_write(&self.config_path, content.as_bytes())?;

        tracing::info!(
            backup = %backup_path.display(),
            path = %self.config_path.display(),
            "已从备份恢复配置文件"
        );
        Ok(())
    }

    // ==================== 状态信息 ====================

    pub fn info(&self) -> AppResult<ConfigInfo> {
        let metadata = fs::metadata(&self.config_path).ok();
        let backups = self.get_backup_files()?;
        let checksum = if self.exists() {
            file_checksum(&self.config_path).ok()
        } else {
            None
        };

        Ok(ConfigInfo {
            config_path: self.config_path.clone(),
            exists: self.exists(),
            size: metadata.as_ref().map(|m| m.len()),
            modified: metadata
                .as_ref()
                .and_then(|m| m.modified().ok())
                .map(DateTime::<Utc>::from),
            readonly: metadata.as_ref().map(|m| m.permissions().readonly()),
            checksum,
            auto_backup: self.policy.auto_backup,
            max_backups: self.policy.max_backups,
            backup_dir: self.backup_dir.clone(),
            backup_count: backups.len(),
            latest_backup: backups.into_iter().next(),
        })
    }

    fn backup_name_parts(&self) -> (String, String) {
        let stem = self
            .config_path
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or("config")
            .to_string();
        let ext = self
            .config_path
            .extension()
            .and_then(|s| s.to_str())
            .unwrap_or("toml")
            .to_string();
        (stem, ext)
    }
}

/// 原始配置表 → ProfileSet
fn parse_table(table: Table) -> AppResult<ProfileSet> {
    let doc: ProfileSetDocument = toml::Value::Table(table)
        .try_into()
        .map_err(|e: toml::de::Error| AppError::validation("config", e.message()))?;
    ProfileSet::from_document(doc)
}
