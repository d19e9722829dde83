use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct RepoRef {
    pub owner: String,
    pub name: String,
}

impl RepoRef {
    pub fn new(owner: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            owner: owner.into(),
            name: name.into(),
        }
    }
}

impl fmt::Display for RepoRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.owner, self.name)
    }
}

fn default_branch_name() -> String {
    "main".to_string()
}

/// Repository metadata as reported by the platform. Read-only to this system.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Repository {
    pub id: u64,
    pub owner: String,
    pub name: String,
    #[serde(default = "default_branch_name")]
    pub default_branch: String,
    #[serde(default)]
    pub archived: bool,
    #[serde(default)]
    pub html_url: String,
}

impl Repository {
    pub fn reference(&self) -> RepoRef {
        RepoRef::new(&self.owner, &self.name)
    }

    pub fn url(&self) -> String {
        if self.html_url.is_empty() {
            format!("https://github.com/{}/{}", self.owner, self.name)
        } else {
            self.html_url.clone()
        }
    }

    pub fn default_ref(&self) -> String {
        format!("refs/heads/{}", self.default_branch)
    }
}

/// One code-scanning analysis from the history feed.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnalysisRecord {
    pub id: u64,
    pub category: String,
    #[serde(rename = "ref", default)]
    pub git_ref: String,
    #[serde(default)]
    pub analysis_key: String,
    #[serde(default)]
    pub tool_version: String,
    pub created_at: DateTime<Utc>,
}

/// One exportable CodeQL database.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DatabaseArtifact {
    pub id: u64,
    pub name: String,
    pub language: String,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub url: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Issue {
    pub number: u64,
    pub title: String,
    #[serde(default)]
    pub body: String,
    #[serde(default)]
    pub labels: Vec<String>,
}

/// Decoded file contents plus the blob hash needed for optimistic updates.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileContents {
    pub text: String,
    pub sha: String,
}

/// Query parameters for one page of the analyses feed.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AnalysisQuery {
    pub git_ref: Option<String>,
    pub tool_name: Option<String>,
    pub per_page: u32,
}

impl AnalysisQuery {
    /// Most-recent-first CodeQL history for one branch.
    pub fn codeql_history(git_ref: impl Into<String>) -> Self {
        Self {
            git_ref: Some(git_ref.into()),
            tool_name: Some("CodeQL".to_string()),
            per_page: 100,
        }
    }

    /// Just the latest analysis of any tool; used to detect whether scanning is enabled.
    pub fn latest_any() -> Self {
        Self {
            git_ref: None,
            tool_name: None,
            per_page: 1,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NewPullRequest {
    pub title: String,
    pub head: String,
    pub base: String,
    pub body: String,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NewIssue {
    pub title: String,
    pub body: String,
    pub labels: Vec<String>,
}

/// SARIF upload addressed at a commit of the target repository.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SarifUpload {
    pub commit_sha: String,
    pub git_ref: String,
    pub sarif: Vec<u8>,
}
