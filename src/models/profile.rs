//! 中转站（Profile）数据模型
//!
//! 一个 Profile 描述一个 Claude API 中转端点：名称、基础 URL、认证凭据以及可选的
//! 描述、标签和模型覆盖。凭据使用 [`Credential`] 枚举表示，三种认证方式天然互斥。
//!
//! # 使用示例
//!
//! ```rust
//! use claudewarp::models::{Credential, Profile};
//!
//! let profile = Profile::new(
//!     "proxy-cn",
//!     "https://api.example.com",
//!     Credential::ApiKey("sk-1234567890".to_string()),
//! )?
//! .with_description("国内节点")
//! .with_tags(["fast", "cn"]);
//!
//! assert_eq!(profile.base_url, "https://api.example.com/");
//! ```

use crate::core::{AppError, AppResult};
use crate::models::timestamp;
use chrono::{DateTime, Utc};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use url::Url;

pub const NAME_MAX_LEN: usize = 50;
pub const DESCRIPTION_MAX_LEN: usize = 200;
pub const CREDENTIAL_MIN_LEN: usize = 3;

static NAME_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z0-9_-]+$").expect("invalid profile name regex"));

// ==================== 认证方式 ====================

/// 认证方式
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuthMethod {
    ApiKey,
    AuthToken,
    ApiKeyHelper,
}

impl AuthMethod {
    /// 对应的配置字段名
    pub fn as_str(&self) -> &'static str {
        match self {
            AuthMethod::ApiKey => "api_key",
            AuthMethod::AuthToken => "auth_token",
            AuthMethod::ApiKeyHelper => "api_key_helper",
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            AuthMethod::ApiKey => "API 密钥",
            AuthMethod::AuthToken => "认证令牌",
            AuthMethod::ApiKeyHelper => "密钥助手命令",
        }
    }
}

impl std::fmt::Display for AuthMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 认证凭据（三选一）
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Credential {
    /// 直接使用的 API 密钥
    ApiKey(String),
    /// Bearer 认证令牌
    AuthToken(String),
    /// 输出 API 密钥的 shell 命令
    Helper(String),
}

impl Credential {
    /// 从三个可选字段构造凭据
    ///
    /// 空字符串视为未设置；未设置或同时设置多个均视为校验失败。
    pub fn from_parts(
        api_key: Option<&str>,
        auth_token: Option<&str>,
        api_key_helper: Option<&str>,
    ) -> AppResult<Self> {
        fn present(v: Option<&str>) -> Option<&str> {
            v.filter(|s| !s.trim().is_empty())
        }

        let mut candidates = Vec::with_capacity(3);
        if let Some(v) = present(api_key) {
            candidates.push(Credential::ApiKey(v.to_string()));
        }
        if let Some(v) = present(auth_token) {
            candidates.push(Credential::AuthToken(v.to_string()));
        }
        if let Some(v) = present(api_key_helper) {
            candidates.push(Credential::Helper(v.to_string()));
        }

        if candidates.len() > 1 {
            return Err(AppError::validation(
                "credential",
                "只能设置 api_key、auth_token 或 api_key_helper 中的一种",
            ));
        }
        let credential = candidates.pop().ok_or_else(|| {
            AppError::validation(
                "credential",
                "必须提供 api_key、auth_token 或 api_key_helper 之一",
            )
        })?;
        credential.validate()?;
        Ok(credential)
    }

    pub fn method(&self) -> AuthMethod {
        match self {
            Credential::ApiKey(_) => AuthMethod::ApiKey,
            Credential::AuthToken(_) => AuthMethod::AuthToken,
            Credential::Helper(_) => AuthMethod::ApiKeyHelper,
        }
    }

    pub fn value(&self) -> &str {
        match self {
            Credential::ApiKey(v) | Credential::AuthToken(v) | Credential::Helper(v) => v,
        }
    }

    /// 校验凭据内容
    ///
    /// 所有凭据至少 3 个字符；密钥与令牌不允许包含空白字符，
    /// 助手命令允许内部空格但首尾不能有空白。
    pub fn validate(&self) -> AppResult<()> {
        let field = self.method().as_str();
        let value = self.value();

        if value.trim().is_empty() {
            return Err(AppError::validation(field, "不能为空"));
        }
        if value.chars().count() < CREDENTIAL_MIN_LEN {
            return Err(AppError::validation(
                field,
                format!("长度至少为 {CREDENTIAL_MIN_LEN} 个字符"),
            ));
        }
        match self {
            Credential::ApiKey(v) | Credential::AuthToken(v) => {
                if v.chars().any(char::is_whitespace) {
                    return Err(AppError::validation(field, "不能包含空白字符"));
                }
            }
            Credential::Helper(v) => {
                if v.trim() != v {
                    return Err(AppError::validation(field, "首尾不能包含空白字符"));
                }
            }
        }
        Ok(())
    }

    /// 脱敏显示（保留首尾各 4 个字符）
    pub fn masked(&self) -> String {
        let chars: Vec<char> = self.value().chars().collect();
        if chars.len() <= 8 {
            return "*".repeat(chars.len());
        }
        let head: String = chars[..4].iter().collect();
        let tail: String = chars[chars.len() - 4..].iter().collect();
        format!("{head}{}{tail}", "*".repeat(chars.len() - 8))
    }
}

// ==================== Profile ====================

/// 中转站配置
#[derive(Debug, Clone)]
pub struct Profile {
    pub name: String,
    pub base_url: String,
    pub credential: Credential,
    pub description: Option<String>,
    pub tags: Vec<String>,
    pub is_active: bool,
    /// 主模型覆盖（对应 ANTHROPIC_MODEL）
    pub bigmodel: Option<String>,
    /// 快速模型覆盖（对应 ANTHROPIC_SMALL_FAST_MODEL）
    pub smallmodel: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Profile {
    /// 创建并校验新的 Profile（默认启用）
    pub fn new(
        name: impl Into<String>,
        base_url: impl Into<String>,
        credential: Credential,
    ) -> AppResult<Self> {
        let now = Utc::now();
        let mut profile = Self {
            name: name.into(),
            base_url: base_url.into(),
            credential,
            description: None,
            tags: Vec::new(),
            is_active: true,
            bigmodel: None,
            smallmodel: None,
            created_at: now,
            updated_at: now,
        };
        profile.normalize()?;
        Ok(profile)
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = non_empty(Some(description.into()));
        self
    }

    pub fn with_tags<I, S>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.tags = normalize_tags(tags);
        self
    }

    pub fn with_models(mut self, bigmodel: Option<&str>, smallmodel: Option<&str>) -> Self {
        self.bigmodel = non_empty(bigmodel.map(str::to_string));
        self.smallmodel = non_empty(smallmodel.map(str::to_string));
        self
    }

    pub fn with_active(mut self, is_active: bool) -> Self {
        self.is_active = is_active;
        self
    }

    /// 规范化字段并执行完整校验
    ///
    /// - 基础 URL 经解析后重新序列化（无路径时补全结尾 `/`）
    /// - 标签去除首尾空白、去空、去重
    /// - 空描述与空模型名视为未设置
    pub fn normalize(&mut self) -> AppResult<()> {
        self.base_url = normalize_base_url(&self.base_url)?;
        self.tags = normalize_tags(&self.tags);
        self.description = non_empty(self.description.take());
        self.bigmodel = non_empty(self.bigmodel.take());
        self.smallmodel = non_empty(self.smallmodel.take());
        self.validate()
    }

    /// 只读校验（不修改字段）
    pub fn validate(&self) -> AppResult<()> {
        validate_name(&self.name)?;
        normalize_base_url(&self.base_url)?;
        self.credential.validate()?;

        if let Some(description) = &self.description {
            if description.chars().count() > DESCRIPTION_MAX_LEN {
                return Err(AppError::validation(
                    "description",
                    format!("描述长度不能超过 {DESCRIPTION_MAX_LEN} 个字符"),
                ));
            }
        }
        if self.tags.iter().any(|t| t.trim().is_empty()) {
            return Err(AppError::validation("tags", "标签不能为空"));
        }
        Ok(())
    }

    pub fn auth_method(&self) -> AuthMethod {
        self.credential.method()
    }

    /// 当前生效的凭据值
    pub fn active_credential(&self) -> &str {
        self.credential.value()
    }

    pub fn api_key(&self) -> Option<&str> {
        match &self.credential {
            Credential::ApiKey(v) => Some(v),
            _ => None,
        }
    }

    pub fn auth_token(&self) -> Option<&str> {
        match &self.credential {
            Credential::AuthToken(v) => Some(v),
            _ => None,
        }
    }

    pub fn api_key_helper(&self) -> Option<&str> {
        match &self.credential {
            Credential::Helper(v) => Some(v),
            _ => None,
        }
    }

    pub fn masked_credential(&self) -> String {
        self.credential.masked()
    }

    /// 标签匹配（不区分大小写）
    pub fn has_tag(&self, tag: &str) -> bool {
        let needle = tag.trim().to_lowercase();
        self.tags.iter().any(|t| t.to_lowercase() == needle)
    }

    pub fn touch(&mut self) {
        self.updated_at = Utc::now();
    }

    /// 从持久化记录构造，`name` 以调用方给定的键为准
    pub fn from_record(name: &str, record: ProfileRecord) -> AppResult<Self> {
        let credential = Credential::from_parts(
            record.api_key.as_deref(),
            record.auth_token.as_deref(),
            record.api_key_helper.as_deref(),
        )?;
        let mut profile = Self {
            name: name.to_string(),
            base_url: record.base_url,
            credential,
            description: record.description,
            tags: record.tags,
            is_active: record.is_active,
            bigmodel: record.bigmodel,
            smallmodel: record.smallmodel,
            created_at: record.created_at,
            updated_at: record.updated_at,
        };
        profile.normalize()?;
        Ok(profile)
    }
}

impl PartialEq for Profile {
    fn eq(&self, other: &Self) -> bool {
        let tags: HashSet<&String> = self.tags.iter().collect();
        let other_tags: HashSet<&String> = other.tags.iter().collect();

        self.name == other.name
            && self.base_url == other.base_url
            && self.credential == other.credential
            && self.description == other.description
            && tags == other_tags
            && self.is_active == other.is_active
            && self.bigmodel == other.bigmodel
            && self.smallmodel == other.smallmodel
            && self.created_at == other.created_at
            && self.updated_at == other.updated_at
    }
}

// ==================== 持久化记录 ====================

fn default_true() -> bool {
    true
}

/// Profile 在配置文件中的扁平表示
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProfileRecord {
    /// 旧版本配置可能缺失，以映射键为准
    #[serde(default)]
    pub name: String,
    pub base_url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub auth_token: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key_helper: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default = "default_true")]
    pub is_active: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bigmodel: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub smallmodel: Option<String>,
    #[serde(default = "Utc::now", deserialize_with = "timestamp::deserialize")]
    pub created_at: DateTime<Utc>,
    #[serde(default = "Utc::now", deserialize_with = "timestamp::deserialize")]
    pub updated_at: DateTime<Utc>,
}

impl From<&Profile> for ProfileRecord {
    fn from(profile: &Profile) -> Self {
        Self {
            name: profile.name.clone(),
            base_url: profile.base_url.clone(),
            api_key: profile.api_key().map(str::to_string),
            auth_token: profile.auth_token().map(str::to_string),
            api_key_helper: profile.api_key_helper().map(str::to_string),
            description: profile.description.clone(),
            tags: profile.tags.clone(),
            is_active: profile.is_active,
            bigmodel: profile.bigmodel.clone(),
            smallmodel: profile.smallmodel.clone(),
            created_at: profile.created_at,
            updated_at: profile.updated_at,
        }
    }
}

// ==================== 字段校验 ====================

/// 校验中转站名称：1-50 个字符，仅允许字母、数字、下划线和连字符
pub fn validate_name(name: &str) -> AppResult<()> {
    if name.is_empty() {
        return Err(AppError::validation("name", "名称不能为空"));
    }
    if name.chars().count() > NAME_MAX_LEN {
        return Err(AppError::validation(
            "name",
            format!("名称长度不能超过 {NAME_MAX_LEN} 个字符"),
        ));
    }
    if !NAME_PATTERN.is_match(name) {
        return Err(AppError::validation(
            "name",
            "名称只能包含字母、数字、下划线和连字符",
        ));
    }
    Ok(())
}

/// 校验并规范化基础 URL
pub fn normalize_base_url(raw: &str) -> AppResult<String> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Err(AppError::validation("base_url", "URL 不能为空"));
    }

    let lower = raw.to_ascii_lowercase();
    if !lower.starts_with("http://") && !lower.starts_with("https://") {
        return Err(AppError::validation(
            "base_url",
            "URL 必须以 http:// 或 https:// 开头",
        ));
    }

    let url = Url::parse(raw)
        .map_err(|e| AppError::validation("base_url", format!("无效的 URL 格式: {e}")))?;
    match url.host_str() {
        Some(host) if !host.is_empty() => Ok(url.to_string()),
        _ => Err(AppError::validation("base_url", "URL 缺少主机名")),
    }
}

/// 标签规范化：去除首尾空白、丢弃空标签、按首次出现去重
pub fn normalize_tags<I, S>(tags: I) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut seen = HashSet::new();
    tags.into_iter()
        .map(|t| t.as_ref().trim().to_string())
        .filter(|t| !t.is_empty())
        .filter(|t| seen.insert(t.clone()))
        .collect()
}

fn non_empty(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}
