//! 中转站集合（ProfileSet）
//!
//! 配置文件的内存表示：版本号、当前中转站、按插入顺序排列的中转站映射以及开放的设置表。
//!
//! 不变量：
//! - `current_proxy` 为空或指向映射中存在的键
//! - 映射中每个 Profile 的 `name` 与其键一致

use crate::core::{AppError, AppResult};
use crate::models::profile::{validate_name, Profile, ProfileRecord};
use crate::models::timestamp;
use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use toml::{Table, Value};

/// 当前配置文件版本
pub const CURRENT_CONFIG_VERSION: &str = "1.0";

/// 可加载的配置文件版本（旧版本会先迁移）
pub const SUPPORTED_CONFIG_VERSIONS: &[&str] = &["0.9", "1.0"];

pub const DEFAULT_MAX_BACKUPS: usize = 5;
pub const DEFAULT_THEME: &str = "auto";

/// 新配置的默认设置
pub fn default_settings() -> Table {
    let mut settings = Table::new();
    settings.insert("auto_backup".to_string(), Value::Boolean(true));
    settings.insert(
        "max_backups".to_string(),
        Value::Integer(DEFAULT_MAX_BACKUPS as i64),
    );
    settings.insert("theme".to_string(), Value::String(DEFAULT_THEME.to_string()));
    settings
}

fn default_version() -> String {
    CURRENT_CONFIG_VERSION.to_string()
}

/// 中转站集合
#[derive(Debug, Clone, PartialEq)]
pub struct ProfileSet {
    pub version: String,
    pub current_proxy: Option<String>,
    pub profiles: IndexMap<String, Profile>,
    pub settings: Table,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Default for ProfileSet {
    fn default() -> Self {
        Self::new()
    }
}

impl ProfileSet {
    pub fn new() -> Self {
        let now = Utc::now();
        Self {
            version: default_version(),
            current_proxy: None,
            profiles: IndexMap::new(),
            settings: default_settings(),
            created_at: now,
            updated_at: now,
        }
    }

    pub fn len(&self) -> usize {
        self.profiles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.profiles.is_empty()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.profiles.contains_key(name)
    }

    pub fn get(&self, name: &str) -> Option<&Profile> {
        self.profiles.get(name)
    }

    pub fn current_profile(&self) -> Option<&Profile> {
        self.current_proxy
            .as_deref()
            .and_then(|name| self.profiles.get(name))
    }

    /// 按插入顺序返回名称
    pub fn names(&self, active_only: bool) -> Vec<String> {
        self.profiles
            .values()
            .filter(|p| !active_only || p.is_active)
            .map(|p| p.name.clone())
            .collect()
    }

    /// 追加新的中转站；集合原本为空时自动设为当前
    pub fn insert(&mut self, profile: Profile) -> AppResult<()> {
        if self.profiles.contains_key(&profile.name) {
            return Err(AppError::Duplicate(profile.name));
        }
        let was_empty = self.profiles.is_empty();
        let name = profile.name.clone();
        self.profiles.insert(name.clone(), profile);
        if was_empty {
            self.current_proxy = Some(name);
        }
        Ok(())
    }

    /// 删除中转站，其余条目保持相对顺序
    pub fn remove(&mut self, name: &str) -> AppResult<Profile> {
        let profile = self
            .profiles
            .shift_remove(name)
            .ok_or_else(|| AppError::ProfileNotFound(name.to_string()))?;
        self.repair_current();
        Ok(profile)
    }

    /// 重命名中转站，保持其在映射中的位置和当前引用
    pub fn rename(&mut self, old: &str, new: &str) -> AppResult<()> {
        if old == new {
            return Ok(());
        }
        validate_name(new)?;
        if self.profiles.contains_key(new) {
            return Err(AppError::Duplicate(new.to_string()));
        }
        let index = self
            .profiles
            .get_index_of(old)
            .ok_or_else(|| AppError::ProfileNotFound(old.to_string()))?;

        if let Some((_, mut profile)) = self.profiles.shift_remove_index(index) {
            profile.name = new.to_string();
            self.profiles.shift_insert(index, new.to_string(), profile);
        }
        if self.current_proxy.as_deref() == Some(old) {
            self.current_proxy = Some(new.to_string());
        }
        Ok(())
    }

    /// 设置当前中转站，未启用的中转站会被拒绝
    pub fn set_current(&mut self, name: &str) -> AppResult<()> {
        let profile = self
            .profiles
            .get(name)
            .ok_or_else(|| AppError::ProfileNotFound(name.to_string()))?;
        if !profile.is_active {
            return Err(AppError::ProfileInactive(name.to_string()));
        }
        self.current_proxy = Some(name.to_string());
        Ok(())
    }

    /// 修复悬空的当前引用：优先改为第一个已启用的中转站，没有时退回第一个中转站，集合为空时置空
    ///
    /// 返回当前引用是否发生了变化。
    pub fn repair_current(&mut self) -> bool {
        let dangling = matches!(&self.current_proxy, Some(name) if !self.profiles.contains_key(name));
        if !dangling {
            return false;
        }
        let replacement = self
            .profiles
            .values()
            .find(|p| p.is_active)
            .map(|p| p.name.clone())
            .or_else(|| self.profiles.keys().next().cloned());
        tracing::warn!(
            previous = ?self.current_proxy,
            replacement = ?replacement,
            "当前代理服务器已不存在，自动重新选择"
        );
        self.current_proxy = replacement;
        true
    }

    /// 当前中转站被停用后，改选第一个其他已启用的中转站，没有则置空
    pub fn reselect_if_current_inactive(&mut self) -> bool {
        let Some(current) = self.current_profile() else {
            return false;
        };
        if current.is_active {
            return false;
        }
        let previous = current.name.clone();
        let replacement = self
            .profiles
            .values()
            .find(|p| p.is_active && p.name != previous)
            .map(|p| p.name.clone());
        tracing::info!(
            previous = %previous,
            replacement = ?replacement,
            "当前代理服务器已停用，自动切换"
        );
        self.current_proxy = replacement;
        true
    }

    /// 校验集合不变量及每个中转站
    pub fn validate(&self) -> AppResult<()> {
        if !SUPPORTED_CONFIG_VERSIONS.contains(&self.version.as_str()) {
            return Err(AppError::UnsupportedVersion {
                version: self.version.clone(),
            });
        }
        for (key, profile) in &self.profiles {
            if key != &profile.name {
                return Err(AppError::validation(
                    format!("proxies.{key}.name"),
                    format!("名称 '{}' 与键 '{key}' 不一致", profile.name),
                ));
            }
            profile.validate().map_err(|e| scoped(key, e))?;
        }
        if let Some(current) = &self.current_proxy {
            if !self.profiles.contains_key(current) {
                return Err(AppError::validation(
                    "current_proxy",
                    format!("当前代理服务器 '{current}' 不存在"),
                ));
            }
        }
        Ok(())
    }

    pub fn touch(&mut self) {
        self.updated_at = Utc::now();
    }

    // ==================== 设置项 ====================

    pub fn setting(&self, key: &str) -> Option<&Value> {
        self.settings.get(key)
    }

    pub fn bool_setting(&self, key: &str) -> Option<bool> {
        self.settings.get(key).and_then(Value::as_bool)
    }

    pub fn usize_setting(&self, key: &str) -> Option<usize> {
        self.settings
            .get(key)
            .and_then(Value::as_integer)
            .and_then(|v| usize::try_from(v).ok())
    }

    // ==================== 文档转换 ====================

    /// 从配置文件文档构造
    ///
    /// 名称缺失或与键不一致时以键为准；任一中转站校验失败则整体失败。
    pub fn from_document(doc: ProfileSetDocument) -> AppResult<Self> {
        let mut profiles = IndexMap::with_capacity(doc.proxies.len());
        for (key, record) in doc.proxies {
            validate_name(&key).map_err(|e| scoped(&key, e))?;
            if !record.name.is_empty() && record.name != key {
                tracing::warn!(
                    key = %key,
                    name = %record.name,
                    "代理服务器名称与键不一致，已按键名修正"
                );
            }
            let profile = Profile::from_record(&key, record).map_err(|e| scoped(&key, e))?;
            profiles.insert(key, profile);
        }

        let set = Self {
            version: doc.version,
            current_proxy: doc.current_proxy.filter(|c| !c.is_empty()),
            profiles,
            settings: doc.settings,
            created_at: doc.created_at,
            updated_at: doc.updated_at,
        };
        set.validate()?;
        Ok(set)
    }

    pub fn to_document(&self) -> ProfileSetDocument {
        ProfileSetDocument {
            version: self.version.clone(),
            current_proxy: self.current_proxy.clone(),
            created_at: self.created_at,
            updated_at: self.updated_at,
            settings: self.settings.clone(),
            proxies: self
                .profiles
                .iter()
                .map(|(k, p)| (k.clone(), ProfileRecord::from(p)))
                .collect(),
        }
    }
}

/// 为中转站字段的校验错误加上所属键
fn scoped(key: &str, err: AppError) -> AppError {
    match err {
        AppError::Validation { field, message } => AppError::Validation {
            field: format!("proxies.{key}.{field}"),
            message,
        },
        other => other,
    }
}

/// 配置文件的序列化形态
///
/// 标量字段必须排在表之前，TOML 才能正确输出。
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProfileSetDocument {
    #[serde(default = "default_version")]
    pub version: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub current_proxy: Option<String>,
    #[serde(default = "Utc::now", deserialize_with = "timestamp::deserialize")]
    pub created_at: DateTime<Utc>,
    #[serde(default = "Utc::now", deserialize_with = "timestamp::deserialize")]
    pub updated_at: DateTime<Utc>,
    #[serde(default = "default_settings")]
    pub settings: Table,
    #[serde(default)]
    pub proxies: IndexMap<String, ProfileRecord>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::ErrorKind;
    use crate::models::profile::Credential;

    fn profile(name: &str) -> Profile {
        Profile::new(
            name,
            "https://api.example.com",
            Credential::ApiKey(format!("sk-{name}-key")),
        )
        .unwrap()
    }

    fn sample_set(names: &[&str]) -> ProfileSet {
        let mut set = ProfileSet::new();
        for name in names {
            set.insert(profile(name)).unwrap();
        }
        set
    }

    #[test]
    fn test_default_set() {
        let set = ProfileSet::new();
        assert_eq!(set.version, CURRENT_CONFIG_VERSION);
        assert!(set.current_proxy.is_none());
        assert_eq!(set.bool_setting("auto_backup"), Some(true));
        assert_eq!(set.usize_setting("max_backups"), Some(5));
        assert_eq!(set.setting("theme").and_then(Value::as_str), Some("auto"));
    }

    #[test]
    fn test_first_insert_becomes_current() {
        let set = sample_set(&["a", "b"]);
        assert_eq!(set.current_proxy.as_deref(), Some("a"));
        assert_eq!(set.names(false), vec!["a", "b"]);
    }

    #[test]
    fn test_duplicate_insert_leaves_set_unchanged() {
        let mut set = sample_set(&["a"]);
        let before = set.clone();
        let err = set.insert(profile("a")).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Duplicate);
        assert_eq!(set, before);
    }

    #[test]
    fn test_remove_current_repairs_reference() {
        let mut set = sample_set(&["a", "b", "c"]);
        set.remove("a").unwrap();
        assert_eq!(set.current_proxy.as_deref(), Some("b"));
        assert_eq!(set.names(false), vec!["b", "c"]);

        set.remove("b").unwrap();
        set.remove("c").unwrap();
        assert!(set.current_proxy.is_none());
    }

    #[test]
    fn test_repair_current_prefers_active() {
        let mut set = sample_set(&["a"]);
        set.insert(profile("b").with_active(false)).unwrap();
        set.insert(profile("c")).unwrap();
        set.remove("a").unwrap();
        assert_eq!(set.current_proxy.as_deref(), Some("c"));

        // 只剩未启用的中转站时退回第一个
        set.remove("c").unwrap();
        assert_eq!(set.current_proxy.as_deref(), Some("b"));
    }

    #[test]
    fn test_rename_keeps_position_and_current() {
        let mut set = sample_set(&["a", "b", "c"]);
        set.set_current("b").unwrap();
        set.rename("b", "bee").unwrap();

        assert_eq!(set.names(false), vec!["a", "bee", "c"]);
        assert_eq!(set.current_proxy.as_deref(), Some("bee"));
        assert_eq!(set.get("bee").unwrap().name, "bee");

        let err = set.rename("a", "c").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Duplicate);
        let err = set.rename("missing", "x").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
    }

    #[test]
    fn test_set_current_rejects_inactive() {
        let mut set = sample_set(&["a"]);
        set.insert(profile("b").with_active(false)).unwrap();

        let err = set.set_current("b").unwrap_err();
        assert_eq!(err.code(), "PROXY_INACTIVE");
        assert_eq!(err.kind(), ErrorKind::Validation);
        assert_eq!(set.current_proxy.as_deref(), Some("a"));
    }

    #[test]
    fn test_reselect_if_current_inactive() {
        let mut set = sample_set(&["a", "b", "c"]);
        set.profiles.get_mut("b").unwrap().is_active = false;
        set.profiles.get_mut("a").unwrap().is_active = false;
        assert!(set.reselect_if_current_inactive());
        assert_eq!(set.current_proxy.as_deref(), Some("c"));

        set.profiles.get_mut("c").unwrap().is_active = false;
        assert!(set.reselect_if_current_inactive());
        assert!(set.current_proxy.is_none());
        assert!(!set.reselect_if_current_inactive());
    }

    #[test]
    fn test_validate_detects_dangling_current() {
        let mut set = sample_set(&["a"]);
        set.current_proxy = Some("ghost".to_string());
        assert!(set.validate().is_err());
        assert!(set.repair_current());
        assert!(set.validate().is_ok());
    }

    #[test]
    fn test_document_roundtrip() {
        let set = sample_set(&["z", "a", "m"]);
        let restored = ProfileSet::from_document(set.to_document()).unwrap();
        assert_eq!(restored, set);
        assert_eq!(restored.names(false), vec!["z", "a", "m"]);
    }

    #[test]
    fn test_from_document_corrects_name_mismatch() {
        let set = sample_set(&["a"]);
        let mut doc = set.to_document();
        doc.proxies.get_mut("a").unwrap().name = "other".to_string();

        let restored = ProfileSet::from_document(doc).unwrap();
        assert_eq!(restored.get("a").unwrap().name, "a");
    }

    #[test]
    fn test_from_document_invalid_profile_scoped_error() {
        let set = sample_set(&["a"]);
        let mut doc = set.to_document();
        doc.proxies.get_mut("a").unwrap().base_url = "ftp://bad".to_string();

        match ProfileSet::from_document(doc).unwrap_err() {
            AppError::Validation { field, .. } => assert_eq!(field, "proxies.a.base_url"),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_toml_serialization_roundtrip() {
        let mut set = sample_set(&["a", "b"]);
        set.profiles.get_mut("b").unwrap().tags = vec!["fast".to_string()];

        let text = toml::to_string_pretty(&set.to_document()).unwrap();
        assert!(text.contains("[proxies.a]"));
        let doc: ProfileSetDocument = toml::from_str(&text).unwrap();
        let restored = ProfileSet::from_document(doc).unwrap();
        assert_eq!(restored, set);
    }
}
