use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use ghas_core::{Integration, RepoRef};
use ghas_notify::NoticeTemplates;
use ghas_templates::{ANALYSIS_ACTION, DEFAULT_PULL_REQUEST_BODY, REUSABLE_WORKFLOW_SOURCE};

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub platform: PlatformConfig,
    pub policy: PolicyConfig,
    pub integrations: IntegrationsConfig,
    pub promotion: PromotionConfig,
    pub notifications: NotificationsConfig,
    pub configure: ConfigureConfig,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct PlatformConfig {
    /// Organization whose repositories are configured and verified.
    pub org: String,
    pub api_url: String,
    pub uploads_url: String,
    /// Environment variable holding the API token.
    pub token_env: String,
    pub max_attempts: u32,
    pub base_backoff_ms: u64,
    pub connect_timeout_secs: u64,
    pub timeout_secs: u64,
}

impl Default for PlatformConfig {
    fn default() -> Self {
        Self {
            org: String::new(),
            api_url: "https://api.github.com".to_string(),
            uploads_url: "https://uploads.github.com".to_string(),
            token_env: "GITHUB_TOKEN".to_string(),
            max_attempts: 4,
            base_backoff_ms: 500,
            connect_timeout_secs: 15,
            timeout_secs: 60,
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct PolicyConfig {
    pub days_to_scan: u32,
    /// How many of the newest CLI releases count as current.
    pub latest_versions: usize,
    pub release_repo: String,
    pub system_list: SystemListConfig,
}

impl Default for PolicyConfig {
    fn default() -> Self {
        Self {
            days_to_scan: 30,
            latest_versions: 5,
            release_repo: "github/codeql-cli-binaries".to_string(),
            system_list: SystemListConfig::default(),
        }
    }
}

impl PolicyConfig {
    pub fn release_repo(&self) -> RepoRef {
        split_slug(&self.release_repo)
    }
}

/// Where the canonical system ID list lives.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct SystemListConfig {
    pub repo: String,
    pub path: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub branch: Option<String>,
}

impl Default for SystemListConfig {
    fn default() -> Self {
        Self {
            repo: String::new(),
            path: "emass-system-ids.txt".to_string(),
            branch: None,
        }
    }
}

impl SystemListConfig {
    pub fn repo(&self) -> RepoRef {
        split_slug(&self.repo)
    }
}

/// App installation IDs; zero means "not configured".
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct IntegrationsConfig {
    pub configure: u64,
    pub verify: u64,
    pub promote: u64,
}

impl IntegrationsConfig {
    pub fn installations(&self) -> BTreeMap<Integration, u64> {
        [
            (Integration::Configure, self.configure),
            (Integration::Verify, self.verify),
            (Integration::Promote, self.promote),
        ]
        .into_iter()
        .filter(|(_, id)| *id != 0)
        .collect()
    }
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PromotionConfig {
    /// Organization holding the per-system export repositories.
    pub org: String,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct NotificationsConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub secondary_email: Option<String>,
    pub dry_run: bool,
    pub templates: TemplatePaths,
}

/// Optional overrides for the built-in notice bodies. `~` is expanded.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct TemplatePaths {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub missing_configuration: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub missing_coverage: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub outdated_tool: Option<String>,
}

impl TemplatePaths {
    pub fn load(&self) -> Result<NoticeTemplates> {
        let mut templates = NoticeTemplates::default();
        for (path, slot) in [
            (&self.missing_configuration, &mut templates.missing_configuration),
            (&self.missing_coverage, &mut templates.missing_coverage),
            (&self.outdated_tool, &mut templates.outdated_tool),
        ] {
            if let Some(path) = path {
                let expanded = PathBuf::from(shellexpand::tilde(path).to_string());
                *slot = std::fs::read_to_string(&expanded)
                    .with_context(|| format!("read template {}", expanded.display()))?;
            }
        }
        Ok(templates)
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct ConfigureConfig {
    pub pull_request_body: String,
    pub analysis_action: String,
    pub reusable_source: String,
}

impl Default for ConfigureConfig {
    fn default() -> Self {
        Self {
            pull_request_body: DEFAULT_PULL_REQUEST_BODY.to_string(),
            analysis_action: ANALYSIS_ACTION.to_string(),
            reusable_source: REUSABLE_WORKFLOW_SOURCE.to_string(),
        }
    }
}

fn split_slug(slug: &str) -> RepoRef {
    match slug.split_once('/') {
        Some((owner, name)) => RepoRef::new(owner, name),
        None => RepoRef::new("", slug),
    }
}

fn env_flag(value: Option<String>) -> bool {
    value.is_some_and(|v| matches!(v.trim().to_ascii_lowercase().as_str(), "1" | "true" | "yes"))
}

impl Config {
    pub fn default_for_org(org: &str) -> Self {
        let mut cfg = Self::default();
        cfg.platform.org = org.to_string();
        cfg.promotion.org = format!("{org}-emass");
        cfg.policy.system_list.repo = format!("{org}/emass-system-list");
        cfg
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        let s = std::fs::read_to_string(path).with_context(|| format!("read {}", path.display()))?;
        let cfg: Config = toml::from_str(&s).with_context(|| format!("parse {}", path.display()))?;
        Ok(cfg)
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).ok();
        }
        let s = toml::to_string_pretty(self).with_context(|| "serialize toml")?;
        std::fs::write(path, s).with_context(|| format!("write {}", path.display()))?;
        Ok(())
    }

    /// `DRY_RUN=true` forces rehearsal mode.
    pub fn apply_env<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if env_flag(lookup("DRY_RUN")) {
            self.notifications.dry_run = true;
        }
    }

    pub fn debug_requested<F>(lookup: F) -> bool
    where
        F: Fn(&str) -> Option<String>,
    {
        env_flag(lookup("DEBUG"))
    }

    pub fn default_path() -> PathBuf {
        PathBuf::from("ghas-compliance.toml")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn template_round_trips_through_toml() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("ghas-compliance.toml");
        let cfg = Config::default_for_org("acme");
        cfg.save_to(&path).unwrap();

        let loaded = Config::load_from(&path).unwrap();
        assert_eq!(loaded.platform.org, "acme");
        assert_eq!(loaded.promotion.org, "acme-emass");
        assert_eq!(loaded.policy.days_to_scan, 30);
        assert_eq!(loaded.policy.release_repo(), RepoRef::new("github", "codeql-cli-binaries"));
        assert_eq!(loaded.configure.analysis_action, ANALYSIS_ACTION);
    }

    #[test]
    fn minimal_file_uses_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("c.toml");
        std::fs::write(&path, "[platform]\norg = \"acme\"\n\n[integrations]\nverify = 42\n").unwrap();
        let cfg = Config::load_from(&path).unwrap();
        assert_eq!(cfg.platform.max_attempts, 4);
        assert_eq!(cfg.policy.latest_versions, 5);
        assert_eq!(
            cfg.integrations.installations().into_iter().collect::<Vec<_>>(),
            vec![(Integration::Verify, 42)]
        );
    }

    #[test]
    fn dry_run_env_override() {
        let mut cfg = Config::default_for_org("acme");
        cfg.apply_env(|k| (k == "DRY_RUN").then(|| "TRUE".to_string()));
        assert!(cfg.notifications.dry_run);

        let mut cfg = Config::default_for_org("acme");
        cfg.apply_env(|_| Some("false".to_string()));
        assert!(!cfg.notifications.dry_run);
        assert!(Config::debug_requested(|k| (k == "DEBUG").then(|| "1".to_string())));
    }

    #[test]
    fn template_overrides_are_read_from_disk() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("coverage.html");
        std::fs::write(&file, "custom <LANGUAGES_PLACEHOLDER>").unwrap();
        let paths = TemplatePaths {
            missing_coverage: Some(file.display().to_string()),
            ..TemplatePaths::default()
        };
        let templates = paths.load().unwrap();
        assert_eq!(templates.missing_coverage, "custom <LANGUAGES_PLACEHOLDER>");
        assert_eq!(templates.outdated_tool, NoticeTemplates::default().outdated_tool);
    }
}
