use crate::{AnalysisRecord, DatabaseArtifact, Integration, Notice, RepoRef};

/// Corrective side effects, executed strictly in plan order.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Command {
    /// Create the working branch, suffixing `canonical` if it is taken.
    CreateWorkingBranch {
        repo: RepoRef,
        canonical: String,
        from_sha: String,
    },
    /// Create or update a file on the working branch.
    UpsertFile {
        repo: RepoRef,
        path: String,
        content: String,
        message: String,
    },
    /// Create a file on the working branch unless it already exists.
    CreateFileIfAbsent {
        repo: RepoRef,
        path: String,
        content: String,
        message: String,
    },
    /// Open a PR from the working branch.
    OpenPullRequest {
        repo: RepoRef,
        base: String,
        title: String,
        body: String,
    },
    InstallIntegration {
        integration: Integration,
        repo: RepoRef,
        repository_id: u64,
    },
    Notify {
        notice: Notice,
        owner_email: Option<String>,
    },
    OpenIssue {
        repo: RepoRef,
        notice: Notice,
    },
    UpdateIssue {
        repo: RepoRef,
        number: u64,
        notice: Notice,
    },
    CloseIssue {
        repo: RepoRef,
        number: u64,
    },
    CreateRepository {
        repo: RepoRef,
    },
    PromoteDatabase {
        source: RepoRef,
        target: RepoRef,
        database: DatabaseArtifact,
    },
    /// Ensure `branch` exists on the target at its current head and make it the default.
    PrepareTargetBranch {
        target: RepoRef,
        branch: String,
    },
    PromoteAnalysis {
        source: RepoRef,
        target: RepoRef,
        analysis: AnalysisRecord,
    },
}

impl Command {
    pub fn name(&self) -> &'static str {
        match self {
            Command::CreateWorkingBranch { .. } => "create-working-branch",
            Command::UpsertFile { .. } => "upsert-file",
            Command::CreateFileIfAbsent { .. } => "create-file-if-absent",
            Command::OpenPullRequest { .. } => "open-pull-request",
            Command::InstallIntegration { .. } => "install-integration",
            Command::Notify { .. } => "notify",
            Command::OpenIssue { .. } => "open-issue",
            Command::UpdateIssue { .. } => "update-issue",
            Command::CloseIssue { .. } => "close-issue",
            Command::CreateRepository { .. } => "create-repository",
            Command::PromoteDatabase { .. } => "promote-database",
            Command::PrepareTargetBranch { .. } => "prepare-target-branch",
            Command::PromoteAnalysis { .. } => "promote-analysis",
        }
    }

    /// Owner-facing side effects that dry-run suppresses.
    pub fn is_owner_facing(&self) -> bool {
        matches!(
            self,
            Command::Notify { .. }
                | Command::OpenIssue { .. }
                | Command::UpdateIssue { .. }
                | Command::CloseIssue { .. }
        )
    }
}
