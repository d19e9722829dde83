use std::collections::BTreeMap;

use async_trait::async_trait;
use ghas_core::{
    AnalysisQuery, AnalysisRecord, DatabaseArtifact, DefaultSetupState, FileContents, Integration,
    Issue, NewIssue, NewPullRequest, RepoRef, Repository, SarifUpload,
};

use crate::PlatformResult;

/// Atomic read-only queries. Each is idempotent and safe to retry.
#[async_trait]
pub trait RemoteProbes: Send + Sync {
    async fn repository(&self, repo: &RepoRef) -> PlatformResult<Option<Repository>>;

    /// Every repository the integration is installed on, across all pages.
    async fn installation_repositories(&self, integration: Integration) -> PlatformResult<Vec<Repository>>;

    /// File on `branch`, or on the default branch when `branch` is `None`.
    async fn file(&self, repo: &RepoRef, path: &str, branch: Option<&str>) -> PlatformResult<Option<FileContents>>;

    async fn file_exists(&self, repo: &RepoRef, path: &str, branch: Option<&str>) -> PlatformResult<bool> {
        Ok(self.file(repo, path, branch).await?.is_some())
    }

    async fn ref_sha(&self, repo: &RepoRef, branch: &str) -> PlatformResult<Option<String>>;

    async fn branch_exists(&self, repo: &RepoRef, branch: &str) -> PlatformResult<bool> {
        Ok(self.ref_sha(repo, branch).await?.is_some())
    }

    /// Language name to byte count.
    async fn languages(&self, repo: &RepoRef) -> PlatformResult<BTreeMap<String, u64>>;

    /// One page (1-based) of the analyses feed, newest first.
    /// `None` means the repository has no analyses at all.
    async fn analyses_page(
        &self,
        repo: &RepoRef,
        query: &AnalysisQuery,
        page: u32,
    ) -> PlatformResult<Option<Vec<AnalysisRecord>>>;

    /// Empty when the repository has no databases.
    async fn databases(&self, repo: &RepoRef) -> PlatformResult<Vec<DatabaseArtifact>>;

    async fn default_setup(&self, repo: &RepoRef) -> PlatformResult<DefaultSetupState>;

    async fn open_issues(&self, repo: &RepoRef, label: &str) -> PlatformResult<Vec<Issue>>;

    /// Tag names of the newest `count` releases.
    async fn latest_releases(&self, repo: &RepoRef, count: usize) -> PlatformResult<Vec<String>>;

    async fn download_database(&self, repo: &RepoRef, database: &DatabaseArtifact) -> PlatformResult<Vec<u8>>;

    async fn download_sarif(&self, repo: &RepoRef, analysis_id: u64) -> PlatformResult<Vec<u8>>;
}

/// Contents write. `sha` absent creates the file; present updates the blob it names.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FileWrite {
    pub branch: String,
    pub path: String,
    pub message: String,
    pub content: String,
    pub sha: Option<String>,
}

/// Mutating calls used by the action executor.
#[async_trait]
pub trait RemoteActions: Send + Sync {
    async fn create_ref(&self, repo: &RepoRef, branch: &str, sha: &str) -> PlatformResult<()>;

    async fn put_file(&self, repo: &RepoRef, write: &FileWrite) -> PlatformResult<()>;

    /// Returns the pull request number.
    async fn create_pull_request(&self, repo: &RepoRef, pr: &NewPullRequest) -> PlatformResult<u64>;

    async fn add_to_installation(&self, integration: Integration, repository_id: u64) -> PlatformResult<()>;

    async fn create_issue(&self, repo: &RepoRef, issue: &NewIssue) -> PlatformResult<u64>;

    async fn update_issue_body(&self, repo: &RepoRef, number: u64, body: &str) -> PlatformResult<()>;

    async fn close_issue(&self, repo: &RepoRef, number: u64) -> PlatformResult<()>;

    /// Private repository, initialised with a first commit.
    async fn create_repository(&self, repo: &RepoRef) -> PlatformResult<()>;

    async fn set_default_branch(&self, repo: &RepoRef, branch: &str) -> PlatformResult<()>;

    async fn upload_database(&self, repo: &RepoRef, database: &DatabaseArtifact, bytes: Vec<u8>) -> PlatformResult<()>;

    async fn upload_sarif(&self, repo: &RepoRef, upload: &SarifUpload) -> PlatformResult<()>;
}

/// The full remote surface the runner talks to.
pub trait Platform: RemoteProbes + RemoteActions {}

impl<T: RemoteProbes + RemoteActions> Platform for T {}
