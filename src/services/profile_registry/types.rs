//! 中转站注册表数据类型

use crate::core::AppResult;
use crate::models::profile::normalize_tags;
use crate::models::{AuthMethod, Credential, Profile};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

// ==================== 更新补丁 ====================

/// 中转站部分更新
///
/// 只有 `Some` 的字段会被修改。描述与模型字段传入空字符串表示清除；
/// 任一凭据字段出现时，按补丁中的凭据字段整体替换原凭据。
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProfilePatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub auth_token: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key_helper: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tags: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_active: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bigmodel: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub smallmodel: Option<String>,
}

impl ProfilePatch {
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    fn touches_credential(&self) -> bool {
        self.api_key.is_some() || self.auth_token.is_some() || self.api_key_helper.is_some()
    }

    /// 将补丁应用到中转站（不处理名称），应用后重新规范化并校验
    pub fn apply_to(&self, profile: &mut Profile) -> AppResult<()> {
        if let Some(base_url) = &self.base_url {
            profile.base_url = base_url.clone();
        }
        if self.touches_credential() {
            profile.credential = Credential::from_parts(
                self.api_key.as_deref(),
                self.auth_token.as_deref(),
                self.api_key_helper.as_deref(),
            )?;
        }
        if let Some(description) = &self.description {
            profile.description = Some(description.clone());
        }
        if let Some(tags) = &self.tags {
            profile.tags = normalize_tags(tags);
        }
        if let Some(is_active) = self.is_active {
            profile.is_active = is_active;
        }
        if let Some(model) = &self.bigmodel {
            profile.bigmodel = Some(model.clone());
        }
        if let Some(model) = &self.smallmodel {
            profile.smallmodel = Some(model.clone());
        }
        profile.normalize()
    }
}

// ==================== 搜索 ====================

/// 可搜索的字段
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SearchField {
    Name,
    Description,
    Tags,
    BaseUrl,
}

impl SearchField {
    /// 未指定字段时的默认搜索范围
    pub const DEFAULT_FIELDS: &'static [SearchField] = &[
        SearchField::Name,
        SearchField::Description,
        SearchField::Tags,
    ];

    /// 字段是否包含查询串（调用方负责将查询转为小写）
    pub(crate) fn matches(&self, profile: &Profile, needle: &str) -> bool {
        let contains = |s: &str| s.to_lowercase().contains(needle);
        match self {
            SearchField::Name => contains(&profile.name),
            SearchField::Description => profile.description.as_deref().is_some_and(contains),
            SearchField::Tags => profile.tags.iter().any(|t| contains(t)),
            SearchField::BaseUrl => contains(&profile.base_url),
        }
    }
}

// ==================== 统计 ====================

/// 中转站统计信息
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ProfileStatistics {
    pub total: usize,
    pub active: usize,
    pub inactive: usize,
    pub current: Option<String>,
    /// 标签 -> 使用次数
    pub tags: BTreeMap<String, usize>,
    pub auth_methods: BTreeMap<AuthMethod, usize>,
}
