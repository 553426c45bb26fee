//! 查询模块
//!
//! 负责搜索、按标签筛选和统计，均为只读操作

use super::types::{ProfileStatistics, SearchField};
use super::ProfileRegistry;
use crate::core::AppResult;
use crate::models::{Profile, ProfileSet};

impl ProfileRegistry {
    /// 在指定字段中搜索（不区分大小写的子串匹配），结果保持原有顺序
    ///
    /// `fields` 为空时使用 [`SearchField::DEFAULT_FIELDS`]。
    pub fn search(&mut self, query: &str, fields: &[SearchField]) -> AppResult<Vec<Profile>> {
        Ok(search(self.profile_set()?, query, fields))
    }

    /// 按标签筛选（不区分大小写，完整匹配）
    pub fn by_tag(&mut self, tag: &str) -> AppResult<Vec<Profile>> {
        Ok(by_tag(self.profile_set()?, tag))
    }

    pub fn statistics(&mut self) -> AppResult<ProfileStatistics> {
        Ok(statistics(self.profile_set()?))
    }
}

pub(crate) fn search(set: &ProfileSet, query: &str, fields: &[SearchField]) -> Vec<Profile> {
    let fields = if fields.is_empty() {
        SearchField::DEFAULT_FIELDS
    } else {
        fields
    };
    let needle = query.trim().to_lowercase();

    let results: Vec<Profile> = set
        .profiles
        .values()
        .filter(|p| fields.iter().any(|f| f.matches(p, &needle)))
        .cloned()
        .collect();
    tracing::debug!(query, matched = results.len(), "搜索代理服务器");
    results
}

pub(crate) fn by_tag(set: &ProfileSet, tag: &str) -> Vec<Profile> {
    set.profiles
        .values()
        .filter(|p| p.has_tag(tag))
        .cloned()
        .collect()
}

pub(crate) fn statistics(set: &ProfileSet) -> ProfileStatistics {
    let mut stats = ProfileStatistics {
        total: set.len(),
        current: set.current_proxy.clone(),
        ..Default::default()
    };

    for profile in set.profiles.values() {
        if profile.is_active {
            stats.active += 1;
        } else {
            stats.inactive += 1;
        }
        for tag in &profile.tags {
            *stats.tags.entry(tag.clone()).or_default() += 1;
        }
        *stats.auth_methods.entry(profile.auth_method()).or_default() += 1;
    }
    stats
}
