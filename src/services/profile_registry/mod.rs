//! Profile Registry Module
//!
//! 中转站注册表，按职责拆分为多个子模块：
//! - `mutation`: 增删改、切换当前中转站、设置项
//! - `query`: 搜索、标签筛选、统计
//! - `output`: 导出环境变量、同步 Claude 配置
//!
//! 注册表持有注入的 [`ConfigStore`] 和惰性加载的 [`ProfileSet`] 缓存。
//! 所有修改都在缓存副本上进行，保存成功后才替换缓存，保存失败时缓存不变。

mod mutation;
mod output;
mod query;
pub mod types;

pub use types::{ProfilePatch, ProfileStatistics, SearchField};

use crate::core::{AppError, AppResult};
use crate::models::{Profile, ProfileSet};
use crate::services::config_store::ConfigStore;

/// 中转站注册表
pub struct ProfileRegistry {
    store: ConfigStore,
    cache: Option<ProfileSet>,
}

impl ProfileRegistry {
    /// 使用注入的存储创建（首次访问时才加载配置）
    pub fn new(store: ConfigStore) -> Self {
        Self { store, cache: None }
    }

    /// 使用默认配置路径创建
    pub fn with_default_path() -> AppResult<Self> {
        Ok(Self::new(ConfigStore::with_default_path()?))
    }

    pub fn store(&self) -> &ConfigStore {
        &self.store
    }

    /// 当前配置（未加载时先加载）
    pub fn profile_set(&mut self) -> AppResult<&ProfileSet> {
        if let Some(set) = self.cache.take() {
            return Ok(&*self.cache.insert(set));
        }
        let set = self.store.load()?;
        self.store.apply_settings(&set.settings);
        tracing::debug!(
            proxies = set.len(),
            current = ?set.current_proxy,
            "中转站配置已加载到缓存"
        );
        Ok(&*self.cache.insert(set))
    }

    /// 丢弃缓存并重新从磁盘加载
    pub fn refresh(&mut self) -> AppResult<()> {
        self.cache = None;
        self.profile_set()?;
        Ok(())
    }

    /// 在缓存副本上执行修改，修复当前引用后保存并提交
    fn mutate<T>(
        &mut self,
        op: impl FnOnce(&mut ProfileSet) -> AppResult<T>,
    ) -> AppResult<T> {
        let mut working = self.profile_set()?.clone();
        let output = op(&mut working)?;
        working.repair_current();
        self.store.save(&mut working)?;
        self.store.apply_settings(&working.settings);
        self.cache = Some(working);
        Ok(output)
    }

    // ==================== 读取 ====================

    pub fn get(&mut self, name: &str) -> AppResult<Profile> {
        self.profile_set()?
            .get(name)
            .cloned()
            .ok_or_else(|| AppError::ProfileNotFound(name.to_string()))
    }

    pub fn current(&mut self) -> AppResult<Option<Profile>> {
        Ok(self.profile_set()?.current_profile().cloned())
    }

    /// 按插入顺序列出中转站
    pub fn list(&mut self, active_only: bool) -> AppResult<Vec<Profile>> {
        Ok(self
            .profile_set()?
            .profiles
            .values()
            .filter(|p| !active_only || p.is_active)
            .cloned()
            .collect())
    }

    pub fn names(&mut self, active_only: bool) -> AppResult<Vec<String>> {
        Ok(self.profile_set()?.names(active_only))
    }

    /// 指定名称的中转站，未指定时使用当前中转站
    fn resolve(&mut self, name: Option<&str>) -> AppResult<Profile> {
        match name {
            Some(name) => self.get(name),
            None => self.current()?.ok_or(AppError::NoCurrentProfile),
        }
    }
}


#[cfg(test)]
mod tests {
    use super::test_support::*;
    use crate::models::{ExportFormat, ShellType};
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_lazy_load_creates_default_config() {
        let temp_dir = TempDir::new().unwrap();
        let mut registry = registry_at(temp_dir.path());
        assert!(!registry.store().exists());

        assert!(registry.names(false).unwrap().is_empty());
        assert!(registry.current().unwrap().is_none());
        assert!(registry.store().exists());
    }

    #[test]
    fn test_refresh_picks_up_external_changes() {
        let temp_dir = TempDir::new().unwrap();
        let mut registry = registry_at(temp_dir.path());
        registry
            .add(api_key_profile("p1", "https://a.example.com", "sk-aaaaaaaaaa"), false)
            .unwrap();

        let mut other = registry_at(temp_dir.path());
        other
            .add(api_key_profile("p2", "https://b.example.com", "sk-bbbbbbbbbb"), false)
            .unwrap();

        assert_eq!(registry.names(false).unwrap(), ["p1"]);
        registry.refresh().unwrap();
        assert_eq!(registry.names(false).unwrap(), ["p1", "p2"]);
    }

    #[test]
    fn test_scenario_add_then_export() {
        let temp_dir = TempDir::new().unwrap();
        let mut registry = registry_at(temp_dir.path());

        registry
            .add(api_key_profile("p1", "https://a.example.com", "sk-aaaaaaaaaa"), false)
            .unwrap();
        assert_eq!(registry.current().unwrap().unwrap().name, "p1");

        registry
            .add(
                auth_token_profile("p2", "https://b.example.com", "sk-ant-bbbbbbbbbb"),
                false,
            )
            .unwrap();
        assert_eq!(registry.current().unwrap().unwrap().name, "p1");

        let script = registry
            .export_environment(None, &ExportFormat::new(ShellType::Bash))
            .unwrap();
        assert!(script.contains("export ANTHROPIC_BASE_URL=\"https://a.example.com/\""));
        assert!(script.contains("export ANTHROPIC_API_KEY=\"sk-aaaaaaaaaa\""));
        assert!(!script.contains("AUTH_TOKEN"));
    }

    #[test]
    fn test_scenario_remove_current_then_export() {
        let temp_dir = TempDir::new().unwrap();
        let mut registry = registry_at(temp_dir.path());
        registry
            .add(api_key_profile("p1", "https://a.example.com", "sk-aaaaaaaaaa"), false)
            .unwrap();
        registry
            .add(
                auth_token_profile("p2", "https://b.example.com", "sk-ant-bbbbbbbbbb"),
                false,
            )
            .unwrap();

        registry.remove("p1").unwrap();
        assert_eq!(registry.current().unwrap().unwrap().name, "p2");

        let script = registry
            .export_environment(None, &ExportFormat::new(ShellType::Bash))
            .unwrap();
        assert!(script.contains("ANTHROPIC_AUTH_TOKEN"));
        assert!(!script.contains("ANTHROPIC_API_KEY"));
    }

    #[test]
    fn test_unsupported_version_left_untouched() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("config.toml");
        let content = "version = \"9.9\"\n\n[proxies]\n";
        fs::write(&path, content).unwrap();

        let mut registry = registry_at(temp_dir.path());
        let err = registry.names(false).unwrap_err();
        assert_eq!(err.kind(), crate::core::ErrorKind::Config);
        assert_eq!(err.code(), "UNSUPPORTED_CONFIG_VERSION");
        assert_eq!(fs::read_to_string(&path).unwrap(), content);
    }

    #[test]
    fn test_persisted_state_survives_reload() {
        let temp_dir = TempDir::new().unwrap();
        let mut registry = registry_at(temp_dir.path());
        registry
            .add(
                api_key_profile("p1", "https://a.example.com", "sk-aaaaaaaaaa")
                    .with_tags(["cn", "fast"])
                    .with_models(Some("claude-opus"), None),
                false,
            )
            .unwrap();
        registry
            .add(auth_token_profile("p2", "https://b.example.com", "tok-bbbbbb"), true)
            .unwrap();

        let mut reloaded = registry_at(temp_dir.path());
        assert_eq!(
            reloaded.list(false).unwrap(),
            registry.list(false).unwrap()
        );
        assert_eq!(reloaded.current().unwrap().unwrap().name, "p2");
    }

    #[test]
    fn test_get_missing() {
        let temp_dir = TempDir::new().unwrap();
        let mut registry = registry_at(temp_dir.path());
        let err = registry.get("missing").unwrap_err();
        assert_eq!(err.code(), "PROXY_NOT_FOUND");
    }
}
