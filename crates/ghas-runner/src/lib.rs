pub mod config;
pub mod context;
pub mod executor;
pub mod fleet;
pub mod pipeline;
pub mod report;
pub mod scenario;

pub use config::*;
pub use context::*;
pub use executor::*;
pub use fleet::*;
pub use pipeline::*;
pub use report::*;

#[cfg(test)]
mod scenario_tests {
    use super::scenario::*;
    use super::*;
    use ghas_core::{Finding, Integration, RepoRef, Verdict, CANONICAL_BRANCH, WORKFLOW_PATH};
    use ghas_notify::RecordingNotifier;
    use std::path::{Path, PathBuf};
    use std::sync::Arc;

    fn dir(name: &str) -> PathBuf {
        Path::new(env!("CARGO_MANIFEST_DIR")).join("../../fixtures/scenarios").join(name)
    }

    async fn run(name: &str) -> (Scenario, Arc<RecordingNotifier>, RunReport) {
        let scenario = load_scenario(&dir(name)).unwrap();
        let expected = load_expected(&dir(name)).unwrap();
        assert_eq!(expected.scenario_id, name);
        let notifier = Arc::new(RecordingNotifier::new());
        let fleet = Fleet::new(scenario.platform.clone(), notifier.clone(), scenario.config.clone())
            .unwrap()
            .with_seed(7);
        let report = fleet.run_at(expected.purpose, None, scenario.now).await.unwrap();

        for exp in &expected.repositories {
            let outcome = report.outcome(&exp.repo).unwrap();
            assert_eq!(outcome.event(), exp.event, "{}", exp.repo);
            let (owner, repo) = exp.repo.split_once('/').unwrap();
            let reference = RepoRef::new(owner, repo);
            let open = scenario.platform.issues(&reference).iter().filter(|i| i.open).count();
            assert_eq!(open, exp.open_issues, "{} open issues", exp.repo);
            assert_eq!(
                scenario.platform.pull_requests(&reference).len(),
                exp.pull_requests,
                "{} pull requests",
                exp.repo
            );
            if let Some(langs) = &exp.missing_languages {
                let missing = outcome
                    .verdict
                    .as_ref()
                    .unwrap()
                    .findings()
                    .iter()
                    .find_map(|f| match f {
                        Finding::MissingAnalyses(l) => Some(l.iter().cloned().collect::<Vec<_>>()),
                        _ => None,
                    })
                    .unwrap();
                assert_eq!(&missing, langs);
            }
        }
        let expected_notifications: usize = expected.repositories.iter().map(|r| r.notifications).sum();
        assert_eq!(notifier.sent().len(), expected_notifications);
        (scenario, notifier, report)
    }

    #[tokio::test]
    async fn scenario_sc01_missing_manifest_notifies_once() {
        let (_, notifier, _) = run("SC-01-missing-manifest").await;
        let sent = notifier.sent();
        assert_eq!(sent[0].subject, "Error: GitHub Repository Not Mapped To eMASS System");
        assert_eq!(sent[0].recipients, vec![SECONDARY_EMAIL.to_string()]);
    }

    #[tokio::test]
    async fn scenario_sc02_partial_coverage_lists_python() {
        let (scenario, notifier, _) = run("SC-02-partial-coverage").await;
        let sent = notifier.sent();
        assert!(sent[0].body.contains("<li>python</li>"));
        assert!(!sent[0].body.contains("<li>go</li>"));
        assert_eq!(
            sent[0].recipients,
            vec![SECONDARY_EMAIL.to_string(), "pat.owner@example.gov".to_string()]
        );
        // analyses exist, so the promotion integration is registered
        assert!(scenario.platform.is_installed(Integration::Promote, 102));
    }

    #[tokio::test]
    async fn scenario_sc03_stale_analysis_counts_as_missing() {
        let (_, _, report) = run("SC-03-stale-analysis").await;
        let verdict = report.outcome("acme/inventory").unwrap().verdict.clone().unwrap();
        assert!(verdict
            .findings()
            .iter()
            .any(|f| matches!(f, Finding::MissingDatabases(l) if l.contains("java"))));
    }

    #[tokio::test]
    async fn scenario_sc04_taken_branch_gets_suffix() {
        let (scenario, _, _) = run("SC-04-branch-taken").await;
        let portal = RepoRef::new("acme", "portal");
        let branches = scenario.platform.branches(&portal);
        let created: Vec<_> = branches
            .iter()
            .filter(|b| b.starts_with(&format!("{CANONICAL_BRANCH}-")))
            .collect();
        assert_eq!(created.len(), 1);
        let suffix = &created[0][CANONICAL_BRANCH.len() + 1..];
        assert_eq!(suffix.len(), 5);
        assert!(suffix.chars().all(|c| c.is_ascii_lowercase() || c.is_ascii_digit()));

        // the earlier branch is untouched
        let old = scenario.platform.stored_file(&portal, CANONICAL_BRANCH, WORKFLOW_PATH).unwrap();
        assert_eq!(old.content, "name: leftover from an earlier run\n");
        let new = scenario.platform.stored_file(&portal, created[0], WORKFLOW_PATH).unwrap();
        assert!(new.content.contains("javascript"));
        assert!(new.content.contains("typescript"));

        let prs = scenario.platform.pull_requests(&portal);
        assert_eq!(&prs[0].head, created[0]);
        assert_eq!(prs[0].base, "main");
        assert!(scenario.platform.is_installed(Integration::Verify, 104));
    }

    #[tokio::test]
    async fn scenario_sc05_ignore_wins_over_missing_manifest() {
        let (scenario, _, _) = run("SC-05-ignored-noncompliant").await;
        assert_eq!(scenario.platform.calls("open_issues"), 0);
        assert_eq!(scenario.platform.write_calls(), 0);
    }

    #[tokio::test]
    async fn scenario_sc06_reusable_workflow_only_registers() {
        let (scenario, _, report) = run("SC-06-reusable-workflow").await;
        assert!(scenario.platform.is_installed(Integration::Verify, 106));
        assert_eq!(scenario.platform.calls("create_ref"), 0);
        let actions = &report.outcome("acme/gateway").unwrap().actions;
        assert_eq!(actions.len(), 1);
        assert_eq!(actions[0].action, "install-integration");
    }

    #[tokio::test]
    async fn scenario_sc07_promote_exports_latest_per_language() {
        let (scenario, _, report) = run("SC-07-promote-exports").await;
        let target = RepoRef::new("acme-emass", "1001-billing");
        assert!(scenario.platform.repository_snapshot(&target).is_some());

        let mut dbs = scenario.platform.database_languages(&target);
        dbs.sort();
        assert_eq!(dbs, vec!["go".to_string(), "python".to_string()]);

        let uploads = scenario.platform.sarif_uploads(&target);
        assert_eq!(uploads.len(), 2);
        assert!(uploads.iter().all(|u| u.commit_sha == "1001-billing-init"));
        assert!(uploads.iter().all(|u| u.git_ref == "refs/heads/main"));

        match &report.outcome("acme/billing").unwrap().verdict {
            Some(Verdict::NeedsPromotion { databases, analyses }) => {
                assert_eq!(databases.len(), 2);
                assert_eq!(analyses.len(), 2);
            }
            other => panic!("unexpected verdict {other:?}"),
        }
    }
}
