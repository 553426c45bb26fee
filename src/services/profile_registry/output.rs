//! 输出模块
//!
//! 负责把中转站导出为环境变量脚本或写入 Claude 原生配置

use super::ProfileRegistry;
use crate::core::AppResult;
use crate::models::ExportFormat;
use crate::services::claude_settings::ClaudeSettingsMerger;
use crate::services::env_export::EnvExportCodec;
use std::path::PathBuf;

impl ProfileRegistry {
    /// 导出环境变量脚本
    ///
    /// `name` 为空时使用当前中转站，没有当前中转站时返回 `NoCurrentProfile`。
    pub fn export_environment(
        &mut self,
        name: Option<&str>,
        format: &ExportFormat,
    ) -> AppResult<String> {
        let profile = self.resolve(name)?;
        let set = self.profile_set()?;
        let script = EnvExportCodec::render(&profile, set.profiles.values(), format);
        tracing::debug!(
            proxy = %profile.name,
            shell = %format.shell_type,
            export_all = format.export_all,
            "已生成环境变量脚本"
        );
        Ok(script)
    }

    /// 将中转站写入 Claude `settings.json`，返回写入的路径
    pub fn apply_claude_settings(
        &mut self,
        merger: &ClaudeSettingsMerger,
        name: Option<&str>,
    ) -> AppResult<PathBuf> {
        let profile = self.resolve(name)?;
        merger.apply(&profile)
    }
}

#[cfg(test)]
mod tests {
    use super::super::test_support::*;
    use crate::core::ErrorKind;
    use crate::models::{AuthMethod, ExportFormat, ShellType};
    use crate::services::claude_settings::ClaudeSettingsMerger;
    use serde_json::Value;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_export_without_current() {
        let temp_dir = TempDir::new().unwrap();
        let mut registry = registry_at(temp_dir.path());

        let err = registry
            .export_environment(None, &ExportFormat::default())
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Export);
        assert_eq!(err.code(), "NO_CURRENT_PROXY");

        let err = registry
            .export_environment(Some("missing"), &ExportFormat::default())
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
    }

    #[test]
    fn test_export_named_profile() {
        let temp_dir = TempDir::new().unwrap();
        let mut registry = registry_at(temp_dir.path());
        registry
            .add(api_key_profile("p1", "https://a.example.com", "sk-aaaaaaaaaa"), false)
            .unwrap();
        registry
            .add(auth_token_profile("p2", "https://b.example.com", "tok-bbbbbb"), false)
            .unwrap();

        let format = ExportFormat::new(ShellType::Fish).with_comments(false);
        let script = registry.export_environment(Some("p2"), &format).unwrap();
        assert_eq!(
            script,
            "set -gx ANTHROPIC_BASE_URL \"https://b.example.com/\"\n\
             set -gx ANTHROPIC_AUTH_TOKEN \"tok-bbbbbb\"\n"
        );
    }

    #[test]
    fn test_export_all_uses_set_order() {
        let temp_dir = TempDir::new().unwrap();
        let mut registry = registry_at(temp_dir.path());
        for name in ["p1", "p2", "p3"] {
            registry
                .add(
                    api_key_profile(name, &format!("https://{name}.example.com"), "sk-aaaaaa"),
                    false,
                )
                .unwrap();
        }

        let format = ExportFormat::default().with_export_all(true);
        let script = registry.export_environment(Some("p2"), &format).unwrap();
        let p1 = script.find("ANTHROPIC_P1_API_BASE_URL").unwrap();
        let p3 = script.find("ANTHROPIC_P3_API_BASE_URL").unwrap();
        assert!(p1 < p3);
        assert!(!script.contains("ANTHROPIC_P2_"));
    }

    #[test]
    fn test_apply_current_to_claude_settings() {
        let temp_dir = TempDir::new().unwrap();
        let mut registry = registry_at(temp_dir.path());
        registry
            .add(auth_token_profile("p1", "https://a.example.com", "tok-aaaaaa"), false)
            .unwrap();

        let settings_path = temp_dir.path().join("claude/settings.json");
        fs::create_dir_all(settings_path.parent().unwrap()).unwrap();
        fs::write(&settings_path, r#"{"env":{"FOO":"bar","ANTHROPIC_API_KEY":"old"}}"#).unwrap();
        let merger = ClaudeSettingsMerger::new(&settings_path);

        let written = registry.apply_claude_settings(&merger, None).unwrap();
        assert_eq!(written, settings_path);

        let doc: Value = serde_json::from_str(&fs::read_to_string(&settings_path).unwrap()).unwrap();
        assert_eq!(doc["env"]["FOO"], "bar");
        assert_eq!(doc["env"]["ANTHROPIC_AUTH_TOKEN"], "tok-aaaaaa");
        assert!(doc["env"].get("ANTHROPIC_API_KEY").is_none());

        let current = merger.read_current().unwrap().unwrap();
        assert_eq!(current.auth_method, Some(AuthMethod::AuthToken));
    }
}
