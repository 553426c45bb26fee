//! 修改操作模块
//!
//! 负责中转站的增删改、切换当前中转站以及设置项读写

use super::types::ProfilePatch;
use super::ProfileRegistry;
use crate::core::{AppError, AppResult};
use crate::models::profile_set::DEFAULT_THEME;
use crate::models::Profile;
use toml::Value;

impl ProfileRegistry {
    /// 添加中转站
    ///
    /// 集合原本为空时新中转站自动成为当前；`set_as_current` 为真时切换到新中转站
    /// （未启用的中转站不能被设为当前）。
    pub fn add(&mut self, mut profile: Profile, set_as_current: bool) -> AppResult<()> {
        profile.normalize()?;
        let name = profile.name.clone();
        self.mutate(|set| {
            set.insert(profile)?;
            if set_as_current {
                set.set_current(&name)?;
            }
            Ok(())
        })?;
        tracing::info!(proxy = %name, set_as_current, "已添加代理服务器");
        Ok(())
    }

    /// 删除中转站，删除的是当前中转站时自动改选第一个剩余的已启用中转站
    pub fn remove(&mut self, name: &str) -> AppResult<Profile> {
        let removed = self.mutate(|set| set.remove(name))?;
        tracing::info!(proxy = %name, "已删除代理服务器");
        Ok(removed)
    }

    /// 部分更新中转站
    ///
    /// 重命名时保持位置与当前引用；停用当前中转站时改选第一个其他已启用的中转站。
    /// 空补丁不写盘。
    pub fn update(&mut self, name: &str, patch: ProfilePatch) -> AppResult<Profile> {
        if patch.is_empty() {
            return self.get(name);
        }
        let updated = self.mutate(|set| {
            let mut profile = set
                .get(name)
                .cloned()
                .ok_or_else(|| AppError::ProfileNotFound(name.to_string()))?;
            patch.apply_to(&mut profile)?;
            profile.touch();

            let target = match patch.name.as_deref().map(str::trim) {
                Some(new_name) if !new_name.is_empty() && new_name != name => {
                    set.rename(name, new_name)?;
                    new_name.to_string()
                }
                _ => name.to_string(),
            };
            profile.name = target.clone();
            set.profiles.insert(target, profile.clone());
            set.reselect_if_current_inactive();
            Ok(profile)
        })?;
        tracing::info!(proxy = %name, updated = %updated.name, "已更新代理服务器");
        Ok(updated)
    }

    /// 切换当前中转站
    pub fn switch(&mut self, name: &str) -> AppResult<Profile> {
        let profile = self.mutate(|set| {
            set.set_current(name)?;
            set.get(name)
                .cloned()
                .ok_or_else(|| AppError::ProfileNotFound(name.to_string()))
        })?;
        tracing::info!(proxy = %name, base_url = %profile.base_url, "已切换代理服务器");
        Ok(profile)
    }

    // ==================== 设置项 ====================

    pub fn setting(&mut self, key: &str) -> AppResult<Option<Value>> {
        Ok(self.profile_set()?.setting(key).cloned())
    }

    /// 写入设置项；`auto_backup` 与 `max_backups` 会立即作用于存储的备份策略
    pub fn set_setting(&mut self, key: &str, value: Value) -> AppResult<()> {
        match key {
            "auto_backup" if !value.is_bool() => {
                return Err(AppError::validation("settings.auto_backup", "必须是布尔值"));
            }
            "max_backups" if !value.as_integer().is_some_and(|v| v >= 0) => {
                return Err(AppError::validation(
                    "settings.max_backups",
                    "必须是非负整数",
                ));
            }
            _ => {}
        }
        self.mutate(|set| {
            set.settings.insert(key.to_string(), value);
            Ok(())
        })?;
        tracing::debug!(key, "设置项已更新");
        Ok(())
    }

    pub fn theme(&mut self) -> AppResult<String> {
        Ok(self
            .profile_set()?
            .setting("theme")
            .and_then(Value::as_str)
            .unwrap_or(DEFAULT_THEME)
            .to_string())
    }

    pub fn set_theme(&mut self, theme: &str) -> AppResult<()> {
        let theme = theme.trim();
        if theme.is_empty() {
            return Err(AppError::validation("settings.theme", "主题不能为空"));
        }
        self.set_setting("theme", Value::String(theme.to_string()))
    }
}
