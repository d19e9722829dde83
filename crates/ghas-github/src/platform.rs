use std::collections::BTreeMap;

use async_trait::async_trait;
use ghas_core::{
    AnalysisQuery, AnalysisRecord, DatabaseArtifact, DefaultSetupState, FileContents, Integration,
    Issue, NewIssue, NewPullRequest, RepoRef, Repository, SarifUpload,
};
use ghas_platform::{FileWrite, PlatformError, PlatformResult, RemoteActions, RemoteProbes};
use reqwest::header::{ACCEPT, CONTENT_TYPE};
use secrecy::SecretString;
use tracing::debug;

use crate::codec::{decode_content, encode_component, encode_content, encode_sarif};
use crate::wire::*;
use crate::{GitHubClient, GitHubSettings};

/// The hosted code-hosting platform, spoken to over REST.
pub struct GitHubPlatform {
    client: GitHubClient,
}

impl GitHubPlatform {
    pub fn new(token: SecretString, settings: GitHubSettings) -> PlatformResult<Self> {
        Ok(Self {
            client: GitHubClient::new(token, settings)?,
        })
    }

    fn repo_path(repo: &RepoRef, rest: &str) -> String {
        format!(
            "/repos/{}/{}{}",
            encode_component(&repo.owner),
            encode_component(&repo.name),
            rest
        )
    }

    fn contents_path(repo: &RepoRef, path: &str) -> String {
        let encoded: Vec<String> = path.split('/').map(encode_component).collect();
        Self::repo_path(repo, &format!("/contents/{}", encoded.join("/")))
    }

    fn analyses_url(&self, repo: &RepoRef, query: &AnalysisQuery, page: u32) -> String {
        let mut params = vec![
            format!("per_page={}", query.per_page),
            format!("page={page}"),
            "sort=created".to_string(),
            "direction=desc".to_string(),
        ];
        if let Some(git_ref) = &query.git_ref {
            params.push(format!("ref={}", encode_component(git_ref)));
        }
        if let Some(tool) = &query.tool_name {
            params.push(format!("tool_name={}", encode_component(tool)));
        }
        self.client.api_url(&Self::repo_path(
            repo,
            &format!("/code-scanning/analyses?{}", params.join("&")),
        ))
    }
}

#[async_trait]
impl RemoteProbes for GitHubPlatform {
    async fn repository(&self, repo: &RepoRef) -> PlatformResult<Option<Repository>> {
        let url = self.client.api_url(&Self::repo_path(repo, ""));
        Ok(self
            .client
            .get_json::<WireRepository>("get repository", &url)
            .await?
            .map(Repository::from))
    }

    async fn installation_repositories(&self, integration: Integration) -> PlatformResult<Vec<Repository>> {
        let id = self.client.installation_id(integration)?;
        let url = self
            .client
            .api_url(&format!("/user/installations/{id}/repositories?per_page=100"));
        let repos = self
            .client
            .get_paginated("list installation repositories", &url, |page: WireInstallationRepositories| {
                page.repositories
            })
            .await?;
        debug!(%integration, count = repos.len(), "installation repositories listed");
        Ok(repos.into_iter().map(Repository::from).collect())
    }

    async fn file(&self, repo: &RepoRef, path: &str, branch: Option<&str>) -> PlatformResult<Option<FileContents>> {
        let mut url = self.client.api_url(&Self::contents_path(repo, path));
        if let Some(branch) = branch {
            url.push_str(&format!("?ref={}", encode_component(branch)));
        }
        let Some(content) = self.client.get_json::<WireContent>("get contents", &url).await? else {
            return Ok(None);
        };
        let text = match content.content {
            Some(encoded) => decode_content(&encoded)?,
            None => String::new(),
        };
        Ok(Some(FileContents {
            text,
            sha: content.sha,
        }))
    }

    async fn ref_sha(&self, repo: &RepoRef, branch: &str) -> PlatformResult<Option<String>> {
        let url = self
            .client
            .api_url(&Self::repo_path(repo, &format!("/git/ref/heads/{branch}")));
        Ok(self
            .client
            .get_json::<WireRef>("get ref", &url)
            .await?
            .map(|r| r.object.sha))
    }

    async fn languages(&self, repo: &RepoRef) -> PlatformResult<BTreeMap<String, u64>> {
        let url = self.client.api_url(&Self::repo_path(repo, "/languages"));
        Ok(self
            .client
            .get_json::<BTreeMap<String, u64>>("list languages", &url)
            .await?
            .unwrap_or_default())
    }

    async fn analyses_page(
        &self,
        repo: &RepoRef,
        query: &AnalysisQuery,
        page: u32,
    ) -> PlatformResult<Option<Vec<AnalysisRecord>>> {
        let url = self.analyses_url(repo, query, page);
        Ok(self
            .client
            .get_json::<Vec<WireAnalysis>>("list analyses", &url)
            .await?
            .map(|page| page.into_iter().map(AnalysisRecord::from).collect()))
    }

    async fn databases(&self, repo: &RepoRef) -> PlatformResult<Vec<DatabaseArtifact>> {
        let url = self
            .client
            .api_url(&Self::repo_path(repo, "/code-scanning/codeql/databases"));
        Ok(self
            .client
            .get_json::<Vec<WireDatabase>>("list databases", &url)
            .await?
            .map(|dbs| dbs.into_iter().map(DatabaseArtifact::from).collect())
            .unwrap_or_default())
    }

    async fn default_setup(&self, repo: &RepoRef) -> PlatformResult<DefaultSetupState> {
        let url = self
            .client
            .api_url(&Self::repo_path(repo, "/code-scanning/default-setup"));
        let state = self
            .client
            .get_json::<WireDefaultSetup>("get default setup", &url)
            .await?;
        Ok(match state {
            Some(s) if s.state == "configured" => DefaultSetupState::Configured,
            _ => DefaultSetupState::NotConfigured,
        })
    }

    async fn open_issues(&self, repo: &RepoRef, label: &str) -> PlatformResult<Vec<Issue>> {
        let url = self.client.api_url(&Self::repo_path(
            repo,
            &format!("/issues?state=open&labels={}&per_page=100", encode_component(label)),
        ));
        let issues = self
            .client
            .get_paginated("list issues", &url, |page: Vec<WireIssue>| page)
            .await?;
        Ok(issues
            .into_iter()
            .filter(|i| i.pull_request.is_none())
            .map(Issue::from)
            .collect())
    }

    async fn latest_releases(&self, repo: &RepoRef, count: usize) -> PlatformResult<Vec<String>> {
        let url = self
            .client
            .api_url(&Self::repo_path(repo, &format!("/releases?per_page={count}")));
        let releases = self
            .client
            .get_json::<Vec<WireRelease>>("list releases", &url)
            .await?
            .ok_or_else(|| PlatformError::rejected("list releases", 404, format!("{repo} has no releases")))?;
        Ok(releases.into_iter().take(count).map(|r| r.tag_name).collect())
    }

    async fn download_database(&self, repo: &RepoRef, database: &DatabaseArtifact) -> PlatformResult<Vec<u8>> {
        let url = if database.url.is_empty() {
            self.client.api_url(&Self::repo_path(
                repo,
                &format!("/code-scanning/codeql/databases/{}", encode_component(&database.language)),
            ))
        } else {
            database.url.clone()
        };
        self.client
            .get_bytes("download database", &url, "application/zip")
            .await
    }

    async fn download_sarif(&self, repo: &RepoRef, analysis_id: u64) -> PlatformResult<Vec<u8>> {
        let url = self
            .client
            .api_url(&Self::repo_path(repo, &format!("/code-scanning/analyses/{analysis_id}")));
        self.client
            .get_bytes("download sarif", &url, "application/sarif+json")
            .await
    }
}

#[async_trait]
impl RemoteActions for GitHubPlatform {
    async fn create_ref(&self, repo: &RepoRef, branch: &str, sha: &str) -> PlatformResult<()> {
        let url = self.client.api_url(&Self::repo_path(repo, "/git/refs"));
        let body = CreateRefBody {
            git_ref: format!("refs/heads/{branch}"),
            sha,
        };
        self.client
            .require("create ref", |c| c.post(url.as_str()).json(&body))
            .await?;
        Ok(())
    }

    async fn put_file(&self, repo: &RepoRef, write: &FileWrite) -> PlatformResult<()> {
        let url = self.client.api_url(&Self::contents_path(repo, &write.path));
        let body = PutContentsBody {
            message: &write.message,
            content: encode_content(&write.content),
            branch: &write.branch,
            sha: write.sha.as_deref(),
        };
        self.client
            .require("put contents", |c| c.put(url.as_str()).json(&body))
            .await?;
        Ok(())
    }

    async fn create_pull_request(&self, repo: &RepoRef, pr: &NewPullRequest) -> PlatformResult<u64> {
        let url = self.client.api_url(&Self::repo_path(repo, "/pulls"));
        let body = CreatePullBody {
            title: &pr.title,
            head: &pr.head,
            base: &pr.base,
            body: &pr.body,
        };
        let resp = self
            .client
            .require("create pull request", |c| c.post(url.as_str()).json(&body))
            .await?;
        let created: WireNumbered = crate::client::decode("create pull request", resp).await?;
        Ok(created.number)
    }

    async fn add_to_installation(&self, integration: Integration, repository_id: u64) -> PlatformResult<()> {
        let id = self.client.installation_id(integration)?;
        let url = self
            .client
            .api_url(&format!("/user/installations/{id}/repositories/{repository_id}"));
        self.client
            .require("add repository to installation", |c| c.put(url.as_str()))
            .await?;
        Ok(())
    }

    async fn create_issue(&self, repo: &RepoRef, issue: &NewIssue) -> PlatformResult<u64> {
        let url = self.client.api_url(&Self::repo_path(repo, "/issues"));
        let body = CreateIssueBody {
            title: &issue.title,
            body: &issue.body,
            labels: &issue.labels,
        };
        let resp = self
            .client
            .require("create issue", |c| c.post(url.as_str()).json(&body))
            .await?;
        let created: WireNumbered = crate::client::decode("create issue", resp).await?;
        Ok(created.number)
    }

    async fn update_issue_body(&self, repo: &RepoRef, number: u64, body: &str) -> PlatformResult<()> {
        let url = self
            .client
            .api_url(&Self::repo_path(repo, &format!("/issues/{number}")));
        let patch = PatchIssueBody {
            body: Some(body),
            state: None,
        };
        self.client
            .require("update issue", |c| c.patch(url.as_str()).json(&patch))
            .await?;
        Ok(())
    }

    async fn close_issue(&self, repo: &RepoRef, number: u64) -> PlatformResult<()> {
        let url = self
            .client
            .api_url(&Self::repo_path(repo, &format!("/issues/{number}")));
        let patch = PatchIssueBody {
            body: None,
            state: Some("closed"),
        };
        self.client
            .require("close issue", |c| c.patch(url.as_str()).json(&patch))
            .await?;
        Ok(())
    }

    async fn create_repository(&self, repo: &RepoRef) -> PlatformResult<()> {
        let url = self
            .client
            .api_url(&format!("/orgs/{}/repos", encode_component(&repo.owner)));
        let body = CreateRepositoryBody {
            name: &repo.name,
            private: true,
            auto_init: true,
        };
        self.client
            .require("create repository", |c| c.post(url.as_str()).json(&body))
            .await?;
        Ok(())
    }

    async fn set_default_branch(&self, repo: &RepoRef, branch: &str) -> PlatformResult<()> {
        let url = self.client.api_url(&Self::repo_path(repo, ""));
        let body = PatchRepositoryBody {
            default_branch: branch,
        };
        self.client
            .require("set default branch", |c| c.patch(url.as_str()).json(&body))
            .await?;
        Ok(())
    }

    async fn upload_database(&self, repo: &RepoRef, database: &DatabaseArtifact, bytes: Vec<u8>) -> PlatformResult<()> {
        let url = self.client.uploads_url(&Self::repo_path(
            repo,
            &format!(
                "/code-scanning/codeql/databases/{}?name={}",
                encode_component(&database.language),
                encode_component(&database.name)
            ),
        ));
        self.client
            .require("upload database", |c| {
                c.post(url.as_str())
                    .header(CONTENT_TYPE, "application/zip")
                    .header(ACCEPT, "application/vnd.github+json")
                    .body(bytes.clone())
            })
            .await?;
        Ok(())
    }

    async fn upload_sarif(&self, repo: &RepoRef, upload: &SarifUpload) -> PlatformResult<()> {
        let url = self
            .client
            .api_url(&Self::repo_path(repo, "/code-scanning/sarifs"));
        let body = SarifBody {
            commit_sha: &upload.commit_sha,
            git_ref: &upload.git_ref,
            sarif: encode_sarif(&upload.sarif)?,
        };
        self.client
            .require("upload sarif", |c| c.post(url.as_str()).json(&body))
            .await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn platform() -> GitHubPlatform {
        let settings = GitHubSettings {
            api_base_url: "https://ghe.example.test/api/v3/".to_string(),
            ..GitHubSettings::default()
        };
        GitHubPlatform::new(SecretString::from("token".to_string()), settings).unwrap()
    }

    #[test]
    fn analyses_url_carries_filters() {
        let url = platform().analyses_url(
            &RepoRef::new("acme", "ledger"),
            &AnalysisQuery::codeql_history("refs/heads/main"),
            2,
        );
        assert_eq!(
            url,
            "https://ghe.example.test/api/v3/repos/acme/ledger/code-scanning/analyses?per_page=100&page=2&sort=created&direction=desc&ref=refs%2Fheads%2Fmain&tool_name=CodeQL"
        );
    }

    #[test]
    fn contents_path_keeps_slashes() {
        assert_eq!(
            GitHubPlatform::contents_path(&RepoRef::new("acme", "ledger"), ".github/emass.json"),
            "/repos/acme/ledger/contents/.github/emass.json"
        );
    }

    #[test]
    fn missing_installation_is_a_configuration_error() {
        let err = platform().client.installation_id(Integration::Verify).unwrap_err();
        assert!(matches!(err, PlatformError::Configuration(_)));
    }
}
