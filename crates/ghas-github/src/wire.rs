use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use ghas_core::{AnalysisRecord, DatabaseArtifact, Issue, Repository};

#[derive(Debug, Deserialize)]
pub(crate) struct WireOwner {
    pub login: String,
}

#[derive(Debug, Deserialize)]
pub(crate) struct WireRepository {
    pub id: u64,
    pub name: String,
    pub owner: WireOwner,
    #[serde(default)]
    pub default_branch: Option<String>,
    #[serde(default)]
    pub archived: bool,
    #[serde(default)]
    pub html_url: String,
}

impl From<WireRepository> for Repository {
    fn from(w: WireRepository) -> Self {
        Repository {
            id: w.id,
            owner: w.owner.login,
            name: w.name,
            default_branch: w.default_branch.unwrap_or_else(|| "main".to_string()),
            archived: w.archived,
            html_url: w.html_url,
        }
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct WireInstallationRepositories {
    pub repositories: Vec<WireRepository>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct WireContent {
    #[serde(default)]
    pub content: Option<String>,
    pub sha: String,
}

#[derive(Debug, Deserialize)]
pub(crate) struct WireObject {
    pub sha: String,
}

#[derive(Debug, Deserialize)]
pub(crate) struct WireRef {
    pub object: WireObject,
}

#[derive(Debug, Deserialize)]
pub(crate) struct WireTool {
    #[serde(default)]
    pub version: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct WireAnalysis {
    pub id: u64,
    #[serde(default)]
    pub category: String,
    #[serde(rename = "ref", default)]
    pub git_ref: String,
    #[serde(default)]
    pub analysis_key: String,
    pub created_at: DateTime<Utc>,
    pub tool: WireTool,
}

impl From<WireAnalysis> for AnalysisRecord {
    fn from(w: WireAnalysis) -> Self {
        AnalysisRecord {
            id: w.id,
            category: w.category,
            git_ref: w.git_ref,
            analysis_key: w.analysis_key,
            tool_version: w.tool.version.unwrap_or_default(),
            created_at: w.created_at,
        }
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct WireDatabase {
    pub id: u64,
    pub name: String,
    pub language: String,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub url: String,
}

impl From<WireDatabase> for DatabaseArtifact {
    fn from(w: WireDatabase) -> Self {
        DatabaseArtifact {
            id: w.id,
            name: w.name,
            language: w.language,
            created_at: w.created_at,
            url: w.url,
        }
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct WireDefaultSetup {
    pub state: String,
}

#[derive(Debug, Deserialize)]
pub(crate) struct WireLabel {
    pub name: String,
}

#[derive(Debug, Deserialize)]
pub(crate) struct WireIssue {
    pub number: u64,
    pub title: String,
    #[serde(default)]
    pub body: Option<String>,
    #[serde(default)]
    pub labels: Vec<WireLabel>,
    /// Present when the "issue" is really a pull request.
    #[serde(default)]
    pub pull_request: Option<serde_json::Value>,
}

impl From<WireIssue> for Issue {
    fn from(w: WireIssue) -> Self {
        Issue {
            number: w.number,
            title: w.title,
            body: w.body.unwrap_or_default(),
            labels: w.labels.into_iter().map(|l| l.name).collect(),
        }
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct WireRelease {
    pub tag_name: String,
}

#[derive(Debug, Deserialize)]
pub(crate) struct WireNumbered {
    pub number: u64,
}

#[derive(Debug, Serialize)]
pub(crate) struct CreateRefBody<'a> {
    #[serde(rename = "ref")]
    pub git_ref: String,
    pub sha: &'a str,
}

#[derive(Debug, Serialize)]
pub(crate) struct PutContentsBody<'a> {
    pub message: &'a str,
    pub content: String,
    pub branch: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sha: Option<&'a str>,
}

#[derive(Debug, Serialize)]
pub(crate) struct CreatePullBody<'a> {
    pub title: &'a str,
    pub head: &'a str,
    pub base: &'a str,
    pub body: &'a str,
}

#[derive(Debug, Serialize)]
pub(crate) struct CreateIssueBody<'a> {
    pub title: &'a str,
    pub body: &'a str,
    pub labels: &'a [String],
}

#[derive(Debug, Serialize)]
pub(crate) struct PatchIssueBody<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub body: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub state: Option<&'a str>,
}

#[derive(Debug, Serialize)]
pub(crate) struct CreateRepositoryBody<'a> {
    pub name: &'a str,
    pub private: bool,
    pub auto_init: bool,
}

#[derive(Debug, Serialize)]
pub(crate) struct PatchRepositoryBody<'a> {
    pub default_branch: &'a str,
}

#[derive(Debug, Serialize)]
pub(crate) struct SarifBody<'a> {
    pub commit_sha: &'a str,
    #[serde(rename = "ref")]
    pub git_ref: &'a str,
    pub sarif: String,
}
