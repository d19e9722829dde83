use serde::Serialize;
use thiserror::Error;

use ghas_core::{ActionRecord, ActionStatus, Purpose, RunId, Verdict};

/// A probe or action failed; the repository's remaining work was abandoned.
#[derive(Clone, Debug, Error, PartialEq, Eq, Serialize)]
#[error("{step}: {reason}")]
pub struct RepoFailure {
    pub step: String,
    pub reason: String,
}

impl RepoFailure {
    pub fn new(step: &str, reason: impl ToString) -> Self {
        Self {
            step: step.to_string(),
            reason: reason.to_string(),
        }
    }
}

/// Tags a fallible step with its name.
pub trait AtStep<T> {
    fn at_step(self, step: &str) -> Result<T, RepoFailure>;
}

impl<T, E: std::fmt::Display> AtStep<T> for Result<T, E> {
    fn at_step(self, step: &str) -> Result<T, RepoFailure> {
        self.map_err(|e| RepoFailure::new(step, e))
    }
}

#[derive(Clone, Debug, Serialize)]
pub struct RepoOutcome {
    pub repo: String,
    pub verdict: Option<Verdict>,
    pub actions: Vec<ActionRecord>,
    pub failure: Option<RepoFailure>,
}

impl RepoOutcome {
    /// Stable label for logs and summaries.
    pub fn event(&self) -> &'static str {
        match (&self.failure, &self.verdict) {
            (Some(_), _) | (None, None) => "repository-failed",
            (None, Some(verdict)) => verdict.event(),
        }
    }

    pub fn applied(&self) -> usize {
        self.actions
            .iter()
            .filter(|a| a.status == ActionStatus::Applied)
            .count()
    }
}

/// Everything one fleet run did, collected instead of kept in globals.
#[derive(Clone, Debug, Serialize)]
pub struct RunReport {
    pub run_id: RunId,
    pub purpose: Purpose,
    pub dry_run: bool,
    pub outcomes: Vec<RepoOutcome>,
}

impl RunReport {
    pub fn outcome(&self, repo: &str) -> Option<&RepoOutcome> {
        self.outcomes.iter().find(|o| o.repo == repo)
    }

    pub fn skipped(&self) -> impl Iterator<Item = &RepoOutcome> {
        self.outcomes
            .iter()
            .filter(|o| o.failure.is_none() && o.verdict.as_ref().is_some_and(Verdict::is_skip))
    }

    pub fn failed(&self) -> impl Iterator<Item = &RepoOutcome> {
        self.outcomes.iter().filter(|o| o.failure.is_some())
    }

    /// Repositories with a non-skip verdict that finished without failure.
    pub fn acted(&self) -> impl Iterator<Item = &RepoOutcome> {
        self.outcomes
            .iter()
            .filter(|o| o.failure.is_none() && o.verdict.as_ref().is_some_and(|v| !v.is_skip()))
    }

    pub fn summary(&self) -> String {
        let mut s = String::new();
        s.push_str(&format!(
            "{} run {}{}\n",
            self.purpose,
            self.run_id,
            if self.dry_run { " (dry run)" } else { "" }
        ));
        s.push_str(&format!(
            "repositories: {}  acted: {}  skipped: {}  failed: {}\n",
            self.outcomes.len(),
            self.acted().count(),
            self.skipped().count(),
            self.failed().count()
        ));
        for o in &self.outcomes {
            s.push_str(&format!("- {} {}", o.repo, o.event()));
            if let Some(f) = &o.failure {
                s.push_str(&format!(" at {}: {}", f.step, f.reason));
            } else if !o.actions.is_empty() {
                s.push_str(&format!(" ({} actions)", o.actions.len()));
            }
            s.push('\n');
        }
        s
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ghas_core::SkipReason;

    #[test]
    fn summary_lists_each_repository() {
        let report = RunReport {
            run_id: RunId::from_str("run-1"),
            purpose: Purpose::Verify,
            dry_run: true,
            outcomes: vec![
                RepoOutcome {
                    repo: "acme/a".into(),
                    verdict: Some(Verdict::Skip(SkipReason::Ignored)),
                    actions: vec![],
                    failure: None,
                },
                RepoOutcome {
                    repo: "acme/b".into(),
                    verdict: None,
                    actions: vec![],
                    failure: Some(RepoFailure::new("languages", "boom")),
                },
                RepoOutcome {
                    repo: "acme/c".into(),
                    verdict: Some(Verdict::NonCompliant(vec![])),
                    actions: vec![ActionRecord::suppressed("notify", "x")],
                    failure: None,
                },
            ],
        };
        assert_eq!(
            report.summary(),
            "verify run run-1 (dry run)\n\
             repositories: 3  acted: 1  skipped: 1  failed: 1\n\
             - acme/a skipped-ignored\n\
             - acme/b repository-failed at languages: boom\n\
             - acme/c out-of-date-cli (1 actions)\n"
        );
        assert_eq!(report.outcomes[2].applied(), 0);
    }
}
