//! 环境变量导出格式

use crate::core::{AppError, AppResult};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

pub const DEFAULT_PREFIX: &str = "ANTHROPIC_";

static PREFIX_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Z_][A-Z0-9_]*$").expect("invalid prefix regex"));

/// 目标 Shell 类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ShellType {
    #[default]
    Bash,
    Zsh,
    Fish,
    PowerShell,
}

impl ShellType {
    pub const ALL: [ShellType; 4] = [
        ShellType::Bash,
        ShellType::Zsh,
        ShellType::Fish,
        ShellType::PowerShell,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ShellType::Bash => "bash",
            ShellType::Zsh => "zsh",
            ShellType::Fish => "fish",
            ShellType::PowerShell => "powershell",
        }
    }
}

impl std::fmt::Display for ShellType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ShellType {
    type Err = AppError;

    /// 不区分大小写
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lower = s.trim().to_lowercase();
        ShellType::ALL
            .into_iter()
            .find(|shell| shell.as_str() == lower)
            .ok_or_else(|| AppError::UnsupportedShell(s.to_string()))
    }
}

/// 导出格式选项
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportFormat {
    pub shell_type: ShellType,
    prefix: String,
    pub include_comments: bool,
    pub export_all: bool,
}

impl Default for ExportFormat {
    fn default() -> Self {
        Self {
            shell_type: ShellType::default(),
            prefix: DEFAULT_PREFIX.to_string(),
            include_comments: true,
            export_all: false,
        }
    }
}

impl ExportFormat {
    pub fn new(shell_type: ShellType) -> Self {
        Self {
            shell_type,
            ..Self::default()
        }
    }

    /// 按 Shell 名称构造（不区分大小写）
    pub fn for_shell(shell: &str) -> AppResult<Self> {
        Ok(Self::new(shell.parse()?))
    }

    pub fn with_prefix(mut self, prefix: &str) -> AppResult<Self> {
        self.prefix = normalize_prefix(prefix)?;
        Ok(self)
    }

    pub fn with_comments(mut self, include_comments: bool) -> Self {
        self.include_comments = include_comments;
        self
    }

    pub fn with_export_all(mut self, export_all: bool) -> Self {
        self.export_all = export_all;
        self
    }

    /// 已规范化的变量前缀（总是以 `_` 结尾）
    pub fn prefix(&self) -> &str {
        &self.prefix
    }
}

/// 校验变量前缀，缺少结尾 `_` 时自动补全
pub fn normalize_prefix(prefix: &str) -> AppResult<String> {
    if !PREFIX_PATTERN.is_match(prefix) {
        return Err(AppError::validation(
            "prefix",
            "前缀只能包含大写字母、数字和下划线，且不能以数字开头",
        ));
    }
    if prefix.ends_with('_') {
        Ok(prefix.to_string())
    } else {
        Ok(format!("{prefix}_"))
    }
}
