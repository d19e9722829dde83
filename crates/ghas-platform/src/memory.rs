use std::collections::{BTreeMap, BTreeSet};
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use ghas_core::{
    AnalysisQuery, AnalysisRecord, DatabaseArtifact, DefaultSetupState, FileContents, Integration,
    Issue, NewIssue, NewPullRequest, RepoRef, Repository, SarifUpload,
};

use crate::{FileWrite, PlatformError, PlatformResult, RemoteActions, RemoteProbes};

/// Scripted in-memory platform for tests and rehearsals.
///
/// Behaves like the hosted API closely enough for the runner: absence is
/// `None`, writes that conflict are rejected, and every call is counted so
/// tests can assert on request volume.
pub struct InMemoryPlatform {
    inner: Mutex<Inner>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StoredFile {
    pub content: String,
    pub sha: String,
}

#[derive(Clone, Debug, Default)]
struct BranchState {
    sha: String,
    files: BTreeMap<String, StoredFile>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StoredIssue {
    pub issue: Issue,
    pub open: bool,
}

#[derive(Clone, Debug)]
struct RemoteRepo {
    repository: Repository,
    branches: BTreeMap<String, BranchState>,
    languages: BTreeMap<String, u64>,
    analyses: Vec<AnalysisRecord>,
    databases: Vec<DatabaseArtifact>,
    default_setup: DefaultSetupState,
    issues: Vec<StoredIssue>,
    pull_requests: Vec<NewPullRequest>,
    sarif_uploads: Vec<SarifUpload>,
}

struct Inner {
    now: DateTime<Utc>,
    repos: BTreeMap<RepoRef, RemoteRepo>,
    installations: BTreeMap<Integration, BTreeSet<u64>>,
    releases: BTreeMap<RepoRef, Vec<String>>,
    calls: BTreeMap<String, usize>,
    failures: BTreeSet<(String, Option<RepoRef>)>,
    next_id: u64,
}

impl Default for InMemoryPlatform {
    fn default() -> Self {
        Self::new(Utc::now())
    }
}

impl InMemoryPlatform {
    pub fn new(now: DateTime<Utc>) -> Self {
        Self {
            inner: Mutex::new(Inner {
                now,
                repos: BTreeMap::new(),
                installations: BTreeMap::new(),
                releases: BTreeMap::new(),
                calls: BTreeMap::new(),
                failures: BTreeSet::new(),
                next_id: 10_000,
            }),
        }
    }

    fn state(&self) -> PlatformResult<MutexGuard<'_, Inner>> {
        self.inner
            .lock()
            .map_err(|_| PlatformError::Configuration("in-memory platform lock poisoned".into()))
    }

    /// Records the call and returns the state, or the injected failure.
    fn enter(&self, operation: &str, repo: Option<&RepoRef>) -> PlatformResult<MutexGuard<'_, Inner>> {
        let mut inner = self.state()?;
        *inner.calls.entry(operation.to_string()).or_default() += 1;
        let any = (operation.to_string(), None);
        let scoped = (operation.to_string(), repo.cloned());
        if inner.failures.contains(&any) || (repo.is_some() && inner.failures.contains(&scoped)) {
            return Err(PlatformError::transient(operation, Some(503), "injected failure"));
        }
        Ok(inner)
    }

    // --- seeding -------------------------------------------------------

    /// Adds a repository with an initial commit on its default branch.
    pub fn add_repository(&self, repository: Repository) {
        if let Ok(mut inner) = self.state() {
            let sha = format!("{}-init", repository.name);
            let mut branches = BTreeMap::new();
            branches.insert(
                repository.default_branch.clone(),
                BranchState {
                    sha,
                    files: BTreeMap::new(),
                },
            );
            inner.repos.insert(
                repository.reference(),
                RemoteRepo {
                    repository,
                    branches,
                    languages: BTreeMap::new(),
                    analyses: vec![],
                    databases: vec![],
                    default_setup: DefaultSetupState::NotConfigured,
                    issues: vec![],
                    pull_requests: vec![],
                    sarif_uploads: vec![],
                },
            );
        }
    }

    /// Writes a file on `branch` (default branch when `None`), creating the branch if needed.
    pub fn seed_file(&self, repo: &RepoRef, branch: Option<&str>, path: &str, content: &str) {
        if let Ok(mut inner) = self.state() {
            let blob = inner.next_blob();
            if let Some(r) = inner.repos.get_mut(repo) {
                let branch = branch.unwrap_or(&r.repository.default_branch).to_string();
                let state = r.branches.entry(branch.clone()).or_insert_with(|| BranchState {
                    sha: format!("{branch}-head"),
                    files: BTreeMap::new(),
                });
                state.files.insert(
                    path.to_string(),
                    StoredFile {
                        content: content.to_string(),
                        sha: blob,
                    },
                );
            }
        }
    }

    pub fn set_languages(&self, repo: &RepoRef, languages: BTreeMap<String, u64>) {
        self.with_repo(repo, |r| r.languages = languages);
    }

    pub fn push_analysis(&self, repo: &RepoRef, record: AnalysisRecord) {
        self.with_repo(repo, |r| r.analyses.push(record));
    }

    pub fn push_database(&self, repo: &RepoRef, database: DatabaseArtifact) {
        self.with_repo(repo, |r| r.databases.push(database));
    }

    pub fn set_default_setup(&self, repo: &RepoRef, state: DefaultSetupState) {
        self.with_repo(repo, |r| r.default_setup = state);
    }

    pub fn seed_issue(&self, repo: &RepoRef, issue: Issue) {
        self.with_repo(repo, |r| r.issues.push(StoredIssue { issue, open: true }));
    }

    pub fn install(&self, integration: Integration, repository_id: u64) {
        if let Ok(mut inner) = self.state() {
            inner.installations.entry(integration).or_default().insert(repository_id);
        }
    }

    pub fn set_releases(&self, repo: &RepoRef, tags: Vec<String>) {
        if let Ok(mut inner) = self.state() {
            inner.releases.insert(repo.clone(), tags);
        }
    }

    /// Every call to `operation` (optionally only for `repo`) fails as transient.
    pub fn fail_on(&self, operation: &str, repo: Option<RepoRef>) {
        if let Ok(mut inner) = self.state() {
            inner.failures.insert((operation.to_string(), repo));
        }
    }

    pub fn set_now(&self, now: DateTime<Utc>) {
        if let Ok(mut inner) = self.state() {
            inner.now = now;
        }
    }

    // --- inspection ----------------------------------------------------

    pub fn calls(&self, operation: &str) -> usize {
        self.state()
            .map(|inner| inner.calls.get(operation).copied().unwrap_or(0))
            .unwrap_or(0)
    }

    pub fn reset_calls(&self) {
        if let Ok(mut inner) = self.state() {
            inner.calls.clear();
        }
    }

    /// Total mutating calls made so far.
    pub fn write_calls(&self) -> usize {
        const WRITES: &[&str] = &[
            "create_ref",
            "put_file",
            "create_pull_request",
            "add_to_installation",
            "create_issue",
            "update_issue_body",
            "close_issue",
            "create_repository",
            "set_default_branch",
            "upload_database",
            "upload_sarif",
        ];
        WRITES.iter().map(|op| self.calls(op)).sum()
    }

    pub fn branches(&self, repo: &RepoRef) -> Vec<String> {
        self.read_repo(repo, |r| r.branches.keys().cloned().collect())
            .unwrap_or_default()
    }

    pub fn stored_file(&self, repo: &RepoRef, branch: &str, path: &str) -> Option<StoredFile> {
        self.read_repo(repo, |r| r.branches.get(branch).and_then(|b| b.files.get(path).cloned()))
            .flatten()
    }

    pub fn pull_requests(&self, repo: &RepoRef) -> Vec<NewPullRequest> {
        self.read_repo(repo, |r| r.pull_requests.clone()).unwrap_or_default()
    }

    pub fn issues(&self, repo: &RepoRef) -> Vec<StoredIssue> {
        self.read_repo(repo, |r| r.issues.clone()).unwrap_or_default()
    }

    pub fn sarif_uploads(&self, repo: &RepoRef) -> Vec<SarifUpload> {
        self.read_repo(repo, |r| r.sarif_uploads.clone()).unwrap_or_default()
    }

    pub fn repository_snapshot(&self, repo: &RepoRef) -> Option<Repository> {
        self.read_repo(repo, |r| r.repository.clone())
    }

    pub fn database_languages(&self, repo: &RepoRef) -> Vec<String> {
        self.read_repo(repo, |r| r.databases.iter().map(|d| d.language.clone()).collect())
            .unwrap_or_default()
    }

    pub fn is_installed(&self, integration: Integration, repository_id: u64) -> bool {
        self.state()
            .map(|inner| {
                inner
                    .installations
                    .get(&integration)
                    .is_some_and(|ids| ids.contains(&repository_id))
            })
            .unwrap_or(false)
    }

    fn with_repo(&self, repo: &RepoRef, f: impl FnOnce(&mut RemoteRepo)) {
        if let Ok(mut inner) = self.state() {
            if let Some(r) = inner.repos.get_mut(repo) {
                f(r);
            }
        }
    }

    fn read_repo<T>(&self, repo: &RepoRef, f: impl FnOnce(&RemoteRepo) -> T) -> Option<T> {
        self.state().ok().and_then(|inner| inner.repos.get(repo).map(f))
    }
}

impl Inner {
    fn next_blob(&mut self) -> String {
        self.next_id += 1;
        format!("blob-{}", self.next_id)
    }

    fn repo(&self, operation: &str, repo: &RepoRef) -> PlatformResult<&RemoteRepo> {
        self.repos
            .get(repo)
            .ok_or_else(|| PlatformError::rejected(operation, 404, format!("{repo} does not exist")))
    }

    fn repo_mut(&mut self, operation: &str, repo: &RepoRef) -> PlatformResult<&mut RemoteRepo> {
        self.repos
            .get_mut(repo)
            .ok_or_else(|| PlatformError::rejected(operation, 404, format!("{repo} does not exist")))
    }
}

fn fake_sarif(category: &str, analysis_id: u64) -> Vec<u8> {
    format!(r#"{{"version":"2.1.0","category":"{category}","analysis":{analysis_id}}}"#).into_bytes()
}

fn sarif_category(sarif: &[u8]) -> String {
    serde_json::from_slice::<serde_json::Value>(sarif)
        .ok()
        .and_then(|v| v.get("category").and_then(|c| c.as_str()).map(str::to_string))
        .unwrap_or_default()
}

#[async_trait]
impl RemoteProbes for InMemoryPlatform {
    async fn repository(&self, repo: &RepoRef) -> PlatformResult<Option<Repository>> {
        let inner = self.enter("repository", Some(repo))?;
        Ok(inner.repos.get(repo).map(|r| r.repository.clone()))
    }

    async fn installation_repositories(&self, integration: Integration) -> PlatformResult<Vec<Repository>> {
        let inner = self.enter("installation_repositories", None)?;
        let ids = inner.installations.get(&integration).cloned().unwrap_or_default();
        Ok(inner
            .repos
            .values()
            .filter(|r| ids.contains(&r.repository.id))
            .map(|r| r.repository.clone())
            .collect())
    }

    async fn file(&self, repo: &RepoRef, path: &str, branch: Option<&str>) -> PlatformResult<Option<FileContents>> {
        let inner = self.enter("file", Some(repo))?;
        let Some(r) = inner.repos.get(repo) else {
            return Ok(None);
        };
        let branch = branch.unwrap_or(&r.repository.default_branch);
        Ok(r.branches.get(branch).and_then(|b| b.files.get(path)).map(|f| FileContents {
            text: f.content.clone(),
            sha: f.sha.clone(),
        }))
    }

    async fn ref_sha(&self, repo: &RepoRef, branch: &str) -> PlatformResult<Option<String>> {
        let inner = self.enter("ref_sha", Some(repo))?;
        Ok(inner
            .repos
            .get(repo)
            .and_then(|r| r.branches.get(branch))
            .map(|b| b.sha.clone()))
    }

    async fn languages(&self, repo: &RepoRef) -> PlatformResult<BTreeMap<String, u64>> {
        let inner = self.enter("languages", Some(repo))?;
        Ok(inner.repo("languages", repo)?.languages.clone())
    }

    async fn analyses_page(
        &self,
        repo: &RepoRef,
        query: &AnalysisQuery,
        page: u32,
    ) -> PlatformResult<Option<Vec<AnalysisRecord>>> {
        let inner = self.enter("analyses_page", Some(repo))?;
        let Some(r) = inner.repos.get(repo) else {
            return Ok(None);
        };
        if r.analyses.is_empty() {
            return Ok(None);
        }
        let mut matching: Vec<AnalysisRecord> = r
            .analyses
            .iter()
            .filter(|a| query.git_ref.as_ref().map_or(true, |g| &a.git_ref == g))
            .cloned()
            .collect();
        matching.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        let per_page = query.per_page.max(1) as usize;
        let skip = (page.max(1) as usize - 1) * per_page;
        Ok(Some(matching.into_iter().skip(skip).take(per_page).collect()))
    }

    async fn databases(&self, repo: &RepoRef) -> PlatformResult<Vec<DatabaseArtifact>> {
        let inner = self.enter("databases", Some(repo))?;
        Ok(inner.repos.get(repo).map(|r| r.databases.clone()).unwrap_or_default())
    }

    async fn default_setup(&self, repo: &RepoRef) -> PlatformResult<DefaultSetupState> {
        let inner = self.enter("default_setup", Some(repo))?;
        Ok(inner.repo("default_setup", repo)?.default_setup)
    }

    async fn open_issues(&self, repo: &RepoRef, label: &str) -> PlatformResult<Vec<Issue>> {
        let inner = self.enter("open_issues", Some(repo))?;
        Ok(inner
            .repo("open_issues", repo)?
            .issues
            .iter()
            .filter(|s| s.open && s.issue.labels.iter().any(|l| l == label))
            .map(|s| s.issue.clone())
            .collect())
    }

    async fn latest_releases(&self, repo: &RepoRef, count: usize) -> PlatformResult<Vec<String>> {
        let inner = self.enter("latest_releases", Some(repo))?;
        let tags = inner
            .releases
            .get(repo)
            .ok_or_else(|| PlatformError::rejected("latest_releases", 404, format!("no releases for {repo}")))?;
        Ok(tags.iter().take(count).cloned().collect())
    }

    async fn download_database(&self, repo: &RepoRef, database: &DatabaseArtifact) -> PlatformResult<Vec<u8>> {
        let _inner = self.enter("download_database", Some(repo))?;
        Ok(format!("codeql-database:{}:{}", database.language, database.id).into_bytes())
    }

    async fn download_sarif(&self, repo: &RepoRef, analysis_id: u64) -> PlatformResult<Vec<u8>> {
        let inner = self.enter("download_sarif", Some(repo))?;
        let analysis = inner
            .repo("download_sarif", repo)?
            .analyses
            .iter()
            .find(|a| a.id == analysis_id)
            .ok_or_else(|| PlatformError::rejected("download_sarif", 404, format!("analysis {analysis_id}")))?;
        Ok(fake_sarif(&analysis.category, analysis_id))
    }
}

#[async_trait]
impl RemoteActions for InMemoryPlatform {
    async fn create_ref(&self, repo: &RepoRef, branch: &str, sha: &str) -> PlatformResult<()> {
        let mut inner = self.enter("create_ref", Some(repo))?;
        let r = inner.repo_mut("create_ref", repo)?;
        if r.branches.contains_key(branch) {
            return Err(PlatformError::rejected("create_ref", 422, "Reference already exists"));
        }
        let files = r
            .branches
            .values()
            .find(|b| b.sha == sha)
            .map(|b| b.files.clone())
            .unwrap_or_default();
        r.branches.insert(
            branch.to_string(),
            BranchState {
                sha: sha.to_string(),
                files,
            },
        );
        Ok(())
    }

    async fn put_file(&self, repo: &RepoRef, write: &FileWrite) -> PlatformResult<()> {
        let mut inner = self.enter("put_file", Some(repo))?;
        let blob = inner.next_blob();
        let r = inner.repo_mut("put_file", repo)?;
        let branch = r
            .branches
            .get_mut(&write.branch)
            .ok_or_else(|| PlatformError::rejected("put_file", 404, format!("no branch {}", write.branch)))?;
        let existing = branch.files.get(&write.path).map(|f| f.sha.clone());
        match (&write.sha, existing) {
            (None, Some(_)) => {
                return Err(PlatformError::rejected("put_file", 422, "sha wasn't supplied"));
            }
            (Some(given), Some(current)) if *given != current => {
                return Err(PlatformError::rejected("put_file", 409, "sha does not match"));
            }
            (Some(_), None) => {
                return Err(PlatformError::rejected("put_file", 404, "file to update not found"));
            }
            _ => {}
        }
        branch.files.insert(
            write.path.clone(),
            StoredFile {
                content: write.content.clone(),
                sha: blob.clone(),
            },
        );
        branch.sha = format!("commit-{blob}");
        Ok(())
    }

    async fn create_pull_request(&self, repo: &RepoRef, pr: &NewPullRequest) -> PlatformResult<u64> {
        let mut inner = self.enter("create_pull_request", Some(repo))?;
        let r = inner.repo_mut("create_pull_request", repo)?;
        if !r.branches.contains_key(&pr.head) {
            return Err(PlatformError::rejected("create_pull_request", 422, "head branch missing"));
        }
        r.pull_requests.push(pr.clone());
        Ok(r.pull_requests.len() as u64)
    }

    async fn add_to_installation(&self, integration: Integration, repository_id: u64) -> PlatformResult<()> {
        let mut inner = self.enter("add_to_installation", None)?;
        inner.installations.entry(integration).or_default().insert(repository_id);
        Ok(())
    }

    async fn create_issue(&self, repo: &RepoRef, issue: &NewIssue) -> PlatformResult<u64> {
        let mut inner = self.enter("create_issue", Some(repo))?;
        let r = inner.repo_mut("create_issue", repo)?;
        let number = r.issues.len() as u64 + 1;
        r.issues.push(StoredIssue {
            issue: Issue {
                number,
                title: issue.title.clone(),
                body: issue.body.clone(),
                labels: issue.labels.clone(),
            },
            open: true,
        });
        Ok(number)
    }

    async fn update_issue_body(&self, repo: &RepoRef, number: u64, body: &str) -> PlatformResult<()> {
        let mut inner = self.enter("update_issue_body", Some(repo))?;
        let r = inner.repo_mut("update_issue_body", repo)?;
        let stored = r
            .issues
            .iter_mut()
            .find(|s| s.issue.number == number)
            .ok_or_else(|| PlatformError::rejected("update_issue_body", 404, format!("issue {number}")))?;
        stored.issue.body = body.to_string();
        Ok(())
    }

    async fn close_issue(&self, repo: &RepoRef, number: u64) -> PlatformResult<()> {
        let mut inner = self.enter("close_issue", Some(repo))?;
        let r = inner.repo_mut("close_issue", repo)?;
        if let Some(stored) = r.issues.iter_mut().find(|s| s.issue.number == number) {
            stored.open = false;
        }
        Ok(())
    }

    async fn create_repository(&self, repo: &RepoRef) -> PlatformResult<()> {
        let id = {
            let mut inner = self.enter("create_repository", Some(repo))?;
            if inner.repos.contains_key(repo) {
                return Err(PlatformError::rejected("create_repository", 422, "name already exists"));
            }
            inner.next_id += 1;
            inner.next_id
        };
        self.add_repository(Repository {
            id,
            owner: repo.owner.clone(),
            name: repo.name.clone(),
            default_branch: "main".to_string(),
            archived: false,
            html_url: String::new(),
        });
        Ok(())
    }

    async fn set_default_branch(&self, repo: &RepoRef, branch: &str) -> PlatformResult<()> {
        let mut inner = self.enter("set_default_branch", Some(repo))?;
        let r = inner.repo_mut("set_default_branch", repo)?;
        if !r.branches.contains_key(branch) {
            return Err(PlatformError::rejected("set_default_branch", 422, format!("no branch {branch}")));
        }
        r.repository.default_branch = branch.to_string();
        Ok(())
    }

    async fn upload_database(&self, repo: &RepoRef, database: &DatabaseArtifact, bytes: Vec<u8>) -> PlatformResult<()> {
        let mut inner = self.enter("upload_database", Some(repo))?;
        if bytes.is_empty() {
            return Err(PlatformError::rejected("upload_database", 400, "empty database bundle"));
        }
        inner.next_id += 1;
        let id = inner.next_id;
        let now = inner.now;
        let r = inner.repo_mut("upload_database", repo)?;
        r.databases.retain(|d| d.language != database.language);
        r.databases.push(DatabaseArtifact {
            id,
            name: database.name.clone(),
            language: database.language.clone(),
            created_at: now,
            url: String::new(),
        });
        Ok(())
    }

    async fn upload_sarif(&self, repo: &RepoRef, upload: &SarifUpload) -> PlatformResult<()> {
        let mut inner = self.enter("upload_sarif", Some(repo))?;
        inner.next_id += 1;
        let id = inner.next_id;
        let now = inner.now;
        let r = inner.repo_mut("upload_sarif", repo)?;
        r.analyses.push(AnalysisRecord {
            id,
            category: sarif_category(&upload.sarif),
            git_ref: upload.git_ref.clone(),
            analysis_key: "sarif-upload".to_string(),
            tool_version: String::new(),
            created_at: now,
        });
        r.sarif_uploads.push(upload.clone());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 10, 0, 0, 0).unwrap()
    }

    fn platform() -> (InMemoryPlatform, RepoRef) {
        let p = InMemoryPlatform::new(now());
        p.add_repository(Repository {
            id: 1,
            owner: "org".into(),
            name: "svc".into(),
            default_branch: "main".into(),
            archived: false,
            html_url: String::new(),
        });
        (p, RepoRef::new("org", "svc"))
    }

    #[tokio::test]
    async fn absent_file_is_none_not_error() {
        let (p, repo) = platform();
        assert!(p.file(&repo, ".github/emass.json", None).await.unwrap().is_none());
        p.seed_file(&repo, None, ".github/emass.json", "{}");
        assert!(p.file_exists(&repo, ".github/emass.json", None).await.unwrap());
        assert_eq!(p.calls("file"), 2);
    }

    #[tokio::test]
    async fn update_requires_current_sha() {
        let (p, repo) = platform();
        p.seed_file(&repo, None, "a.txt", "one");
        let mut write = FileWrite {
            branch: "main".into(),
            path: "a.txt".into(),
            message: "m".into(),
            content: "two".into(),
            sha: None,
        };
        assert!(p.put_file(&repo, &write).await.is_err());
        let current = p.file(&repo, "a.txt", None).await.unwrap().unwrap();
        write.sha = Some(current.sha);
        p.put_file(&repo, &write).await.unwrap();
        assert_eq!(p.stored_file(&repo, "main", "a.txt").unwrap().content, "two");
    }

    #[tokio::test]
    async fn analyses_pages_newest_first() {
        let (p, repo) = platform();
        assert!(p
            .analyses_page(&repo, &AnalysisQuery::codeql_history("refs/heads/main"), 1)
            .await
            .unwrap()
            .is_none());
        for (id, days) in [(1u64, 5i64), (2, 1), (3, 3)] {
            p.push_analysis(
                &repo,
                AnalysisRecord {
                    id,
                    category: "ois-go".into(),
                    git_ref: "refs/heads/main".into(),
                    analysis_key: "k".into(),
                    tool_version: "2.0.0".into(),
                    created_at: now() - Duration::days(days),
                },
            );
        }
        let mut query = AnalysisQuery::codeql_history("refs/heads/main");
        query.per_page = 2;
        let first = p.analyses_page(&repo, &query, 1).await.unwrap().unwrap();
        assert_eq!(first.iter().map(|a| a.id).collect::<Vec<_>>(), vec![2, 3]);
        let second = p.analyses_page(&repo, &query, 2).await.unwrap().unwrap();
        assert_eq!(second.iter().map(|a| a.id).collect::<Vec<_>>(), vec![1]);
        let third = p.analyses_page(&repo, &query, 3).await.unwrap().unwrap();
        assert!(third.is_empty());
    }

    #[tokio::test]
    async fn injected_failures_are_transient() {
        let (p, repo) = platform();
        p.fail_on("languages", Some(repo.clone()));
        let err = p.languages(&repo).await.unwrap_err();
        assert!(err.is_transient());
    }

    #[tokio::test]
    async fn branch_from_sha_copies_files() {
        let (p, repo) = platform();
        p.seed_file(&repo, None, "README.md", "hi");
        let sha = p.ref_sha(&repo, "main").await.unwrap().unwrap();
        p.create_ref(&repo, "feature", &sha).await.unwrap();
        assert!(p.create_ref(&repo, "feature", &sha).await.is_err());
        assert!(p.stored_file(&repo, "feature", "README.md").is_some());
    }
}
