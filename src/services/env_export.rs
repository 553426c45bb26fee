//! 环境变量导出
//!
//! 将中转站渲染为可被目标 Shell 直接执行的环境变量脚本。纯函数，不访问文件系统，
//! 相同输入总是得到相同输出。
//!
//! | Shell | 语法 |
//! |---|---|
//! | bash / zsh | `export KEY="value"` |
//! | fish | `set -gx KEY "value"` |
//! | powershell | `$env:KEY="value"` |

use crate::models::{AuthMethod, ExportFormat, Profile, ShellType};

/// 环境变量渲染器
pub struct EnvExportCodec;

impl EnvExportCodec {
    /// 渲染中转站的环境变量脚本
    ///
    /// `others` 仅在 `export_all` 时使用，其中与 `profile` 同名的条目会被跳过。
    pub fn render<'a, I>(profile: &Profile, others: I, format: &ExportFormat) -> String
    where
        I: IntoIterator<Item = &'a Profile>,
    {
        let mut lines = Vec::new();

        if format.include_comments {
            lines.push("# Claude 中转站环境变量".to_string());
            lines.push(format!("# 代理服务器: {}", profile.name));
            if let Some(description) = &profile.description {
                lines.push(format!("# 描述: {description}"));
            }
            lines.push(format!(
                "# 认证方式: {}",
                profile.auth_method().display_name()
            ));
            lines.push(format!(
                "# 更新时间: {}",
                profile.updated_at.format("%Y-%m-%d %H:%M:%S UTC")
            ));
            lines.push(String::new());
        }

        for (key, value) in profile_variables(profile, format.prefix(), "") {
            lines.push(assignment(format.shell_type, &key, &value));
        }

        if format.export_all {
            let extra: Vec<&Profile> = others
                .into_iter()
                .filter(|p| p.name != profile.name)
                .collect();
            if !extra.is_empty() {
                if format.include_comments {
                    lines.push(String::new());
                    lines.push("# 所有可用代理服务器".to_string());
                }
                for other in extra {
                    if format.include_comments {
                        lines.push(match &other.description {
                            Some(d) => format!("# {}: {d}", other.name),
                            None => format!("# {}", other.name),
                        });
                    }
                    let scope = format!("{}_", safe_name(&other.name));
                    for (key, value) in profile_variables(other, format.prefix(), &scope) {
                        lines.push(assignment(format.shell_type, &key, &value));
                    }
                }
            }
        }

        let mut script = lines.join("\n");
        script.push('\n');
        script
    }
}

/// 中转站对应的变量列表
///
/// `scope` 为空时输出当前中转站的标准变量名；非空时用于导出全部中转站，
/// 此时基础 URL 使用 `API_BASE_URL` 以免与 `{prefix}BASE_URL` 混淆。
fn profile_variables(profile: &Profile, prefix: &str, scope: &str) -> Vec<(String, String)> {
    let base_url_key = if scope.is_empty() {
        "BASE_URL"
    } else {
        "API_BASE_URL"
    };
    let credential_key = match profile.auth_method() {
        AuthMethod::ApiKey | AuthMethod::ApiKeyHelper => "API_KEY",
        AuthMethod::AuthToken => "AUTH_TOKEN",
    };

    let mut vars = vec![
        (
            format!("{prefix}{scope}{base_url_key}"),
            profile.base_url.clone(),
        ),
        (
            format!("{prefix}{scope}{credential_key}"),
            profile.active_credential().to_string(),
        ),
    ];
    if let Some(model) = &profile.bigmodel {
        vars.push((format!("{prefix}{scope}MODEL"), model.clone()));
    }
    if let Some(model) = &profile.smallmodel {
        vars.push((format!("{prefix}{scope}SMALL_FAST_MODEL"), model.clone()));
    }
    vars
}

/// 名称转为变量名片段：大写，非字母数字替换为 `_`
pub fn safe_name(name: &str) -> String {
    name.chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() {
                c.to_ascii_uppercase()
            } else {
                '_'
            }
        })
        .collect()
}

fn assignment(shell: ShellType, key: &str, value: &str) -> String {
    match shell {
        ShellType::Bash | ShellType::Zsh => format!("export {key}=\"{}\"", escape_posix(value)),
        ShellType::Fish => format!("set -gx {key} \"{}\"", escape_fish(value)),
        ShellType::PowerShell => format!("$env:{key}=\"{}\"", escape_powershell(value)),
    }
}

/// 双引号内需要转义的字符：`\` `"` `$` 和反引号
fn escape_posix(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for c in value.chars() {
        if matches!(c, '\\' | '"' | '$' | '`') {
            out.push('\\');
        }
        out.push(c);
    }
    out
}

fn escape_fish(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for c in value.chars() {
        if matches!(c, '\\' | '"' | '$') {
            out.push('\\');
        }
        out.push(c);
    }
    out
}

/// PowerShell 使用反引号转义
fn escape_powershell(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for c in value.chars() {
        if matches!(c, '`' | '"' | '$') {
            out.push('`');
        }
        out.push(c);
    }
    out
}
