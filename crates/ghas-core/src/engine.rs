use std::collections::{BTreeMap, BTreeSet};

use crate::{
    extract_fingerprint, missing_databases, AnalysisCoverage, AnalysisRecord, Command,
    ComplianceManifest, ConfigProblem, DatabaseArtifact, Finding, Integration, Issue,
    LanguageSet, Notice, Purpose, RepoRef, Repository, SkipReason, Verdict, MANIFEST_PATH,
};

pub const WORKFLOW_PATH: &str = ".github/workflows/codeql-analysis.yml";
pub const CANONICAL_BRANCH: &str = "ghas-enforcement-codeql";
pub const PULL_REQUEST_TITLE: &str = "Action Required: Configure CodeQL";

/// Idempotency guards, evaluated top to bottom. The first that trips ends
/// the repository with a skip (or, for `PolicyConfig`, a missing-configuration plan).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Guard {
    OutOfScope,
    Ignored,
    Archived,
    AlreadyReconciled,
    PolicyConfig,
}

/// Which guards apply and which actions fire for one purpose.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Strategy {
    pub purpose: Purpose,
    pub guards: Vec<Guard>,
    /// Owner notice + tracking issue when the policy-config guard trips.
    pub notifies_missing_config: bool,
    /// Configure's default-setup / reusable-workflow / neither branch.
    pub checks_scanning_setup: bool,
    pub reconciles_coverage: bool,
    pub checks_tool_versions: bool,
    pub promotes_artifacts: bool,
}

impl Strategy {
    pub fn for_purpose(purpose: Purpose) -> Self {
        match purpose {
            Purpose::Configure => Self {
                purpose,
                guards: vec![
                    Guard::OutOfScope,
                    Guard::Ignored,
                    Guard::Archived,
                    Guard::AlreadyReconciled,
                ],
                notifies_missing_config: false,
                checks_scanning_setup: true,
                reconciles_coverage: false,
                checks_tool_versions: false,
                promotes_artifacts: false,
            },
            Purpose::Verify => Self {
                purpose,
                guards: vec![Guard::Ignored, Guard::Archived, Guard::PolicyConfig],
                notifies_missing_config: true,
                checks_scanning_setup: false,
                reconciles_coverage: true,
                checks_tool_versions: true,
                promotes_artifacts: false,
            },
            Purpose::Promote => Self {
                purpose,
                guards: vec![
                    Guard::OutOfScope,
                    Guard::Ignored,
                    Guard::Archived,
                    Guard::PolicyConfig,
                ],
                notifies_missing_config: false,
                checks_scanning_setup: false,
                reconciles_coverage: false,
                checks_tool_versions: false,
                promotes_artifacts: true,
            },
        }
    }

    /// Installation whose membership means "already reconciled" for this purpose.
    pub fn membership_integration(&self) -> Option<Integration> {
        match self.purpose {
            Purpose::Configure => Some(Integration::Verify),
            Purpose::Verify | Purpose::Promote => None,
        }
    }
}

/// Verdict plus the ordered commands that realise it.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Plan {
    pub verdict: Verdict,
    pub commands: Vec<Command>,
}

impl Plan {
    pub fn skip(reason: SkipReason) -> Self {
        Self {
            verdict: Verdict::Skip(reason),
            commands: vec![],
        }
    }
}

/// Everything the configure planner needs, already probed and rendered.
#[derive(Clone, Debug)]
pub struct ConfigureFacts {
    pub repo: Repository,
    pub languages: LanguageSet,
    pub default_sha: String,
    pub workflow: String,
    pub manifest: String,
    pub pull_request_body: String,
}

pub fn plan_configure(facts: ConfigureFacts) -> Plan {
    let repo = facts.repo.reference();
    let commands = vec![
        Command::CreateWorkingBranch {
            repo: repo.clone(),
            canonical: CANONICAL_BRANCH.to_string(),
            from_sha: facts.default_sha,
        },
        Command::UpsertFile {
            repo: repo.clone(),
            path: WORKFLOW_PATH.to_string(),
            content: facts.workflow,
            message: "Add CodeQL workflow".to_string(),
        },
        Command::CreateFileIfAbsent {
            repo: repo.clone(),
            path: MANIFEST_PATH.to_string(),
            content: facts.manifest,
            message: "Add emass.json placeholder".to_string(),
        },
        Command::OpenPullRequest {
            repo: repo.clone(),
            base: facts.repo.default_branch.clone(),
            title: PULL_REQUEST_TITLE.to_string(),
            body: facts.pull_request_body,
        },
        Command::InstallIntegration {
            integration: Integration::Verify,
            repo,
            repository_id: facts.repo.id,
        },
    ];
    Plan {
        verdict: Verdict::NeedsConfiguration {
            languages: facts.languages,
        },
        commands,
    }
}

/// Repository already runs the reusable workflow: just make sure verification picks it up.
pub fn plan_registration(repo: &Repository) -> Plan {
    Plan {
        verdict: Verdict::Skip(SkipReason::AlreadyCompliant),
        commands: vec![Command::InstallIntegration {
            integration: Integration::Verify,
            repo: repo.reference(),
            repository_id: repo.id,
        }],
    }
}

/// Policy-config guard tripped. Notices are only produced when the strategy notifies.
pub fn plan_missing_configuration(
    strategy: &Strategy,
    repo: &Repository,
    manifest: Option<&ComplianceManifest>,
    problems: Vec<ConfigProblem>,
    open_issues: &[Issue],
) -> Plan {
    let mut commands = vec![];
    if strategy.notifies_missing_config {
        let notice = Notice::MissingConfiguration {
            repository: repo.reference().to_string(),
            repository_url: repo.url(),
            problems: problems.clone(),
        };
        commands = reconcile_tracking_issues(
            &repo.reference(),
            vec![notice],
            owner_email(manifest),
            open_issues,
            false,
        );
    }
    Plan {
        verdict: Verdict::NonCompliant(vec![Finding::MissingPolicyConfig(problems)]),
        commands,
    }
}

#[derive(Clone, Debug)]
pub struct VerifyFacts<'a> {
    pub repo: &'a Repository,
    pub manifest: &'a ComplianceManifest,
    pub expected: &'a LanguageSet,
    pub coverage: &'a AnalysisCoverage,
    pub latest_databases: &'a BTreeMap<String, DatabaseArtifact>,
    pub latest_versions: &'a BTreeSet<String>,
    pub promote_installed: bool,
    pub open_issues: &'a [Issue],
}

/// Coverage and tool-version findings are gated on the strategy's flags.
pub fn plan_verify(strategy: &Strategy, facts: &VerifyFacts<'_>) -> Plan {
    let repo = facts.repo.reference();
    let mut commands = vec![];
    let mut findings = vec![];
    let mut notices = vec![];

    if facts.coverage.has_analyses() && !facts.promote_installed {
        commands.push(Command::InstallIntegration {
            integration: Integration::Promote,
            repo: repo.clone(),
            repository_id: facts.repo.id,
        });
    }

    if strategy.checks_tool_versions {
        for version in facts.coverage.tool_versions() {
            if !facts.latest_versions.contains(&version) {
                notices.push(Notice::OutdatedToolVersion {
                    repository: repo.to_string(),
                    repository_url: facts.repo.url(),
                    version: version.clone(),
                });
                findings.push(Finding::OutdatedToolVersion(version));
            }
        }
    }

    if strategy.reconciles_coverage {
        let missing_analyses = facts.coverage.missing.clone();
        let missing_dbs = missing_databases(facts.expected, facts.latest_databases);
        let missing: LanguageSet = missing_analyses.union(&missing_dbs).cloned().collect();
        if !missing.is_empty() {
            notices.push(Notice::MissingCoverage {
                repository: repo.to_string(),
                repository_url: facts.repo.url(),
                system_id: facts.manifest.system_id,
                system_name: facts.manifest.system_name.clone(),
                languages: missing.into_iter().collect(),
            });
        }
        if !missing_analyses.is_empty() {
            findings.push(Finding::MissingAnalyses(missing_analyses));
        }
        if !missing_dbs.is_empty() {
            findings.push(Finding::MissingDatabases(missing_dbs));
        }
    }

    commands.extend(reconcile_tracking_issues(
        &repo,
        notices,
        owner_email(Some(facts.manifest)),
        facts.open_issues,
        true,
    ));

    let verdict = if findings.is_empty() {
        Verdict::Skip(SkipReason::AlreadyCompliant)
    } else {
        Verdict::NonCompliant(findings)
    };
    Plan { verdict, commands }
}

#[derive(Clone, Debug)]
pub struct PromoteFacts {
    pub source: Repository,
    pub target: RepoRef,
    pub target_exists: bool,
    pub databases: BTreeMap<String, DatabaseArtifact>,
    pub analyses: BTreeMap<String, AnalysisRecord>,
    pub target_databases: BTreeMap<String, DatabaseArtifact>,
    pub target_analyses: BTreeMap<String, AnalysisRecord>,
}

/// Target repository name for a manifest: `<systemID>-<repository name>`.
pub fn promotion_target(compliance_org: &str, system_id: i64, repo: &Repository) -> RepoRef {
    RepoRef::new(compliance_org, format!("{}-{}", system_id, repo.name))
}

pub fn plan_promote(facts: PromoteFacts) -> Plan {
    if facts.databases.is_empty() && facts.analyses.is_empty() {
        return Plan::skip(SkipReason::NothingToPromote);
    }
    let source = facts.source.reference();

    let databases: Vec<&DatabaseArtifact> = facts
        .databases
        .iter()
        .filter(|(lang, db)| {
            facts
                .target_databases
                .get(*lang)
                .map_or(true, |promoted| promoted.created_at < db.created_at)
        })
        .map(|(_, db)| db)
        .collect();
    let analyses: Vec<(&String, &AnalysisRecord)> = facts
        .analyses
        .iter()
        .filter(|(lang, analysis)| {
            facts
                .target_analyses
                .get(*lang)
                .map_or(true, |promoted| promoted.created_at < analysis.created_at)
        })
        .collect();

    if databases.is_empty() && analyses.is_empty() {
        return Plan::skip(SkipReason::AlreadyCompliant);
    }

    let mut commands = vec![];
    if !facts.target_exists {
        commands.push(Command::CreateRepository {
            repo: facts.target.clone(),
        });
    }
    for db in &databases {
        commands.push(Command::PromoteDatabase {
            source: source.clone(),
            target: facts.target.clone(),
            database: (*db).clone(),
        });
    }
    if !analyses.is_empty() {
        commands.push(Command::PrepareTargetBranch {
            target: facts.target.clone(),
            branch: facts.source.default_branch.clone(),
        });
    }
    for (_, analysis) in &analyses {
        commands.push(Command::PromoteAnalysis {
            source: source.clone(),
            target: facts.target.clone(),
            analysis: (*analysis).clone(),
        });
    }

    Plan {
        verdict: Verdict::NeedsPromotion {
            databases: databases.iter().map(|db| db.language.to_lowercase()).collect(),
            analyses: analyses.iter().map(|(lang, _)| (*lang).clone()).collect(),
        },
        commands,
    }
}

fn owner_email(manifest: Option<&ComplianceManifest>) -> Option<String> {
    manifest
        .filter(|m| m.owner_email_is_valid())
        .map(|m| m.system_owner_email.trim().to_string())
}

/// Pairs each notice with a tracking issue.
///
/// An open issue already carrying the notice fingerprint means the owner
/// has seen this exact state, so nothing is emitted. A same-title issue
/// with an older fingerprint is updated in place. Otherwise a new issue is
/// opened. Each changed notice also notifies the owner once. With
/// `close_stale`, open issues matching no current notice are closed.
pub fn reconcile_tracking_issues(
    repo: &RepoRef,
    notices: Vec<Notice>,
    owner_email: Option<String>,
    open_issues: &[Issue],
    close_stale: bool,
) -> Vec<Command> {
    let mut claimed: BTreeSet<u64> = BTreeSet::new();
    let mut pending = vec![];

    for notice in notices {
        let fingerprint = notice.fingerprint();
        let exact = open_issues.iter().find(|issue| {
            !claimed.contains(&issue.number)
                && extract_fingerprint(&issue.body) == Some(fingerprint.as_str())
        });
        match exact {
            Some(issue) => {
                claimed.insert(issue.number);
            }
            None => pending.push(notice),
        }
    }

    let mut commands = vec![];
    for notice in pending {
        let same_title = open_issues
            .iter()
            .find(|issue| !claimed.contains(&issue.number) && issue.title == notice.subject());
        commands.push(Command::Notify {
            notice: notice.clone(),
            owner_email: owner_email.clone(),
        });
        match same_title {
            Some(issue) => {
                claimed.insert(issue.number);
                commands.push(Command::UpdateIssue {
                    repo: repo.clone(),
                    number: issue.number,
                    notice,
                });
            }
            None => commands.push(Command::OpenIssue {
                repo: repo.clone(),
                notice,
            }),
        }
    }

    if close_stale {
        for issue in open_issues {
            if !claimed.contains(&issue.number) {
                commands.push(Command::CloseIssue {
                    repo: repo.clone(),
                    number: issue.number,
                });
            }
        }
    }
    commands
}
