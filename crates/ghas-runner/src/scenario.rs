use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use chrono::{DateTime, Duration, Utc};
use serde::Deserialize;

use ghas_core::{AnalysisRecord, DatabaseArtifact, DefaultSetupState, Integration, Issue, Purpose, RepoRef, Repository};
use ghas_platform::InMemoryPlatform;

use crate::Config;

/// `remote.yaml`: the platform state a scenario starts from.
#[derive(Debug, Deserialize)]
pub struct RemoteFixture {
    pub now: DateTime<Utc>,
    pub org: String,
    #[serde(default)]
    pub compliance_org: Option<String>,
    #[serde(default)]
    pub days_to_scan: Option<u32>,
    #[serde(default)]
    pub system_ids: Vec<i64>,
    #[serde(default)]
    pub releases: Vec<String>,
    pub repositories: Vec<RepoFixture>,
}

#[derive(Debug, Deserialize)]
pub struct RepoFixture {
    pub id: u64,
    pub name: String,
    #[serde(default)]
    pub owner: Option<String>,
    #[serde(default = "default_branch")]
    pub default_branch: String,
    #[serde(default)]
    pub archived: bool,
    #[serde(default)]
    pub installations: Vec<Integration>,
    #[serde(default)]
    pub languages: BTreeMap<String, u64>,
    #[serde(default)]
    pub default_setup: DefaultSetupState,
    /// Files on the default branch.
    #[serde(default)]
    pub files: BTreeMap<String, String>,
    /// Extra branches and their files.
    #[serde(default)]
    pub branches: BTreeMap<String, BTreeMap<String, String>>,
    #[serde(default)]
    pub analyses: Vec<AnalysisFixture>,
    #[serde(default)]
    pub databases: Vec<DatabaseFixture>,
    #[serde(default)]
    pub issues: Vec<Issue>,
}

#[derive(Debug, Deserialize)]
pub struct AnalysisFixture {
    pub id: u64,
    pub category: String,
    #[serde(default)]
    pub tool_version: String,
    #[serde(default)]
    pub analysis_key: String,
    pub days_ago: i64,
}

#[derive(Debug, Deserialize)]
pub struct DatabaseFixture {
    pub id: u64,
    pub language: String,
    pub days_ago: i64,
}

/// `expected.yaml`: what the run must report and leave behind.
#[derive(Debug, Deserialize)]
pub struct ScenarioExpected {
    pub scenario_id: String,
    pub purpose: Purpose,
    pub repositories: Vec<ExpectedRepo>,
}

#[derive(Debug, Deserialize)]
pub struct ExpectedRepo {
    pub repo: String,
    pub event: String,
    #[serde(default)]
    pub notifications: usize,
    #[serde(default)]
    pub open_issues: usize,
    #[serde(default)]
    pub pull_requests: usize,
    #[serde(default)]
    pub missing_languages: Option<Vec<String>>,
}

pub struct Scenario {
    pub now: DateTime<Utc>,
    pub platform: Arc<InMemoryPlatform>,
    pub config: Config,
}

pub const SECONDARY_EMAIL: &str = "ghas-admins@example.gov";
const SYSTEM_LIST_REPO: &str = "emass-system-list";

fn default_branch() -> String {
    "main".to_string()
}

pub fn load_expected(dir: &Path) -> Result<ScenarioExpected> {
    let p = dir.join("expected.yaml");
    let s = std::fs::read_to_string(&p).with_context(|| format!("read expected.yaml: {}", p.display()))?;
    let exp: ScenarioExpected = serde_yaml::from_str(&s).with_context(|| "parse expected.yaml")?;
    Ok(exp)
}

pub fn load_remote(dir: &Path) -> Result<RemoteFixture> {
    let p = dir.join("remote.yaml");
    let s = std::fs::read_to_string(&p).with_context(|| format!("read remote.yaml: {}", p.display()))?;
    let remote: RemoteFixture = serde_yaml::from_str(&s).with_context(|| "parse remote.yaml")?;
    Ok(remote)
}

/// Builds an in-memory platform and a matching config from a scenario directory.
pub fn load_scenario(dir: &Path) -> Result<Scenario> {
    let remote = load_remote(dir)?;
    let now = remote.now;
    let platform = Arc::new(InMemoryPlatform::new(now));

    let mut config = Config::default_for_org(&remote.org);
    if let Some(org) = &remote.compliance_org {
        config.promotion.org = org.clone();
    }
    if let Some(days) = remote.days_to_scan {
        config.policy.days_to_scan = days;
    }
    config.notifications.secondary_email = Some(SECONDARY_EMAIL.to_string());
    config.policy.system_list.repo = format!("{}/{SYSTEM_LIST_REPO}", remote.org);

    let list_repo = config.policy.system_list.repo();
    platform.add_repository(Repository {
        id: 1,
        owner: list_repo.owner.clone(),
        name: list_repo.name.clone(),
        default_branch: default_branch(),
        archived: false,
        html_url: String::new(),
    });
    let ids: String = remote.system_ids.iter().map(|id| format!("{id}\n")).collect();
    platform.seed_file(
        &list_repo,
        None,
        &config.policy.system_list.path,
        &format!("# systems\n{ids}"),
    );
    platform.set_releases(&config.policy.release_repo(), remote.releases.clone());

    for fixture in &remote.repositories {
        seed_repository(&platform, &remote.org, now, fixture);
    }
    Ok(Scenario { now, platform, config })
}

fn seed_repository(platform: &InMemoryPlatform, org: &str, now: DateTime<Utc>, fixture: &RepoFixture) {
    let repo = Repository {
        id: fixture.id,
        owner: fixture.owner.clone().unwrap_or_else(|| org.to_string()),
        name: fixture.name.clone(),
        default_branch: fixture.default_branch.clone(),
        archived: fixture.archived,
        html_url: String::new(),
    };
    let reference: RepoRef = repo.reference();
    let git_ref = repo.default_ref();
    platform.add_repository(repo);

    for integration in &fixture.installations {
        platform.install(*integration, fixture.id);
    }
    platform.set_languages(&reference, fixture.languages.clone());
    platform.set_default_setup(&reference, fixture.default_setup);
    for (path, content) in &fixture.files {
        platform.seed_file(&reference, None, path, content);
    }
    for (branch, files) in &fixture.branches {
        for (path, content) in files {
            platform.seed_file(&reference, Some(branch.as_str()), path, content);
        }
    }
    for a in &fixture.analyses {
        platform.push_analysis(
            &reference,
            AnalysisRecord {
                id: a.id,
                category: a.category.clone(),
                git_ref: git_ref.clone(),
                analysis_key: a.analysis_key.clone(),
                tool_version: a.tool_version.clone(),
                created_at: now - Duration::days(a.days_ago),
            },
        );
    }
    for d in &fixture.databases {
        platform.push_database(
            &reference,
            DatabaseArtifact {
                id: d.id,
                name: format!("{}-db", d.language),
                language: d.language.clone(),
                created_at: now - Duration::days(d.days_ago),
                url: String::new(),
            },
        );
    }
    for issue in &fixture.issues {
        platform.seed_issue(&reference, issue.clone());
    }
}
