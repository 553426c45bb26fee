// 配置结构 v1.0 迁移
//
// 0.9 版本的配置文件中：
// - 标签以逗号分隔的字符串保存
// - 中转站条目可能缺少 name / is_active / 时间戳
// - settings 表可能缺失备份相关设置

use crate::core::AppResult;
use crate::models::profile_set::DEFAULT_MAX_BACKUPS;
use crate::services::migration_manager::migration_trait::{Migration, MigrationResult};
use chrono::Utc;
use toml::{Table, Value};

/// 配置结构迁移（目标版本 1.0）
pub struct ProfileSchemaV1Migration;

impl ProfileSchemaV1Migration {
    pub fn new() -> Self {
        Self
    }
}

impl Default for ProfileSchemaV1Migration {
    fn default() -> Self {
        Self::new()
    }
}

impl Migration for ProfileSchemaV1Migration {
    fn id(&self) -> &str {
        "profile_schema_v1"
    }

    fn name(&self) -> &str {
        "中转站配置结构 v1.0 迁移"
    }

    fn target_version(&self) -> &str {
        "1.0"
    }

    fn migrate(&self, table: &mut Table) -> AppResult<MigrationResult> {
        let now = Value::String(Utc::now().to_rfc3339());
        let mut touched = 0;

        if let Some(Value::Table(proxies)) = table.get_mut("proxies") {
            for (key, entry) in proxies.iter_mut() {
                let Value::Table(entry) = entry else {
                    continue;
                };
                let mut changed = false;

                if let Some(Value::String(raw)) = entry.get("tags") {
                    let tags = raw
                        .split(',')
                        .map(str::trim)
                        .filter(|t| !t.is_empty())
                        .map(|t| Value::String(t.to_string()))
                        .collect();
                    entry.insert("tags".to_string(), Value::Array(tags));
                    changed = true;
                }
                for (field, default) in [
                    ("name", Value::String(key.clone())),
                    ("is_active", Value::Boolean(true)),
                    ("created_at", now.clone()),
                    ("updated_at", now.clone()),
                ] {
                    if !entry.contains_key(field) {
                        entry.insert(field.to_string(), default);
                        changed = true;
                    }
                }

                if changed {
                    touched += 1;
                }
            }
        }

        let settings = table
            .entry("settings")
            .or_insert_with(|| Value::Table(Table::new()));
        if let Value::Table(settings) = settings {
            settings
                .entry("auto_backup")
                .or_insert(Value::Boolean(true));
            settings
                .entry("max_backups")
                .or_insert(Value::Integer(DEFAULT_MAX_BACKUPS as i64));
        }

        Ok(MigrationResult {
            migration_id: self.id().to_string(),
            message: format!("已升级 {touched} 个中转站条目"),
            records_migrated: touched,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_migrate_legacy_entries() {
        let mut table: Table = toml::from_str(
            r#"
version = "0.9"

[proxies.old]
base_url = "https://api.example.com/"
api_key = "sk-legacy"
tags = "fast, cn,,"

[proxies.modern]
name = "modern"
base_url = "https://api.example.com/"
api_key = "sk-modern"
tags = ["x"]
is_active = false
created_at = "2024-01-01T00:00:00Z"
updated_at = "2024-01-01T00:00:00Z"
"#,
        )
        .unwrap();

        let result = ProfileSchemaV1Migration::new().migrate(&mut table).unwrap();
        assert_eq!(result.records_migrated, 1);

        let old = table["proxies"]["old"].as_table().unwrap();
        let tags: Vec<&str> = old["tags"]
            .as_array()
            .unwrap()
            .iter()
            .filter_map(Value::as_str)
            .collect();
        assert_eq!(tags, vec!["fast", "cn"]);
        assert_eq!(old["name"].as_str(), Some("old"));
        assert_eq!(old["is_active"].as_bool(), Some(true));
        assert!(old.contains_key("created_at"));

        let modern = table["proxies"]["modern"].as_table().unwrap();
        assert_eq!(modern["is_active"].as_bool(), Some(false));

        let settings = table["settings"].as_table().unwrap();
        assert_eq!(settings["auto_backup"].as_bool(), Some(true));
        assert_eq!(settings["max_backups"].as_integer(), Some(5));
    }

    #[test]
    fn test_existing_settings_preserved() {
        let mut table: Table =
            toml::from_str("[settings]\nauto_backup = false\ntheme = \"dark\"").unwrap();
        ProfileSchemaV1Migration::new().migrate(&mut table).unwrap();

        let settings = table["settings"].as_table().unwrap();
        assert_eq!(settings["auto_backup"].as_bool(), Some(false));
        assert_eq!(settings["theme"].as_str(), Some("dark"));
    }
}
