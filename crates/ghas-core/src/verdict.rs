use serde::{Deserialize, Serialize};

use crate::{ConfigProblem, LanguageSet};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SkipReason {
    Ignored,
    Archived,
    AlreadyCompliant,
    OutOfScope,
    NoSupportedLanguages,
    NothingToPromote,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Finding {
    MissingPolicyConfig(Vec<ConfigProblem>),
    MissingAnalyses(LanguageSet),
    MissingDatabases(LanguageSet),
    OutdatedToolVersion(String),
}

/// Per-repository decision. Recomputed every run, never persisted.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Verdict {
    Skip(SkipReason),
    NeedsConfiguration { languages: LanguageSet },
    NeedsPromotion {
        databases: LanguageSet,
        analyses: LanguageSet,
    },
    NonCompliant(Vec<Finding>),
}

impl Verdict {
    /// Stable `event` label logged when a repository finishes.
    pub fn event(&self) -> &'static str {
        match self {
            Verdict::Skip(SkipReason::Ignored) => "skipped-ignored",
            Verdict::Skip(SkipReason::Archived) => "skipped-archived",
            Verdict::Skip(SkipReason::AlreadyCompliant) => "skipped-already-compliant",
            Verdict::Skip(SkipReason::OutOfScope) => "skipped-out-of-scope",
            Verdict::Skip(SkipReason::NoSupportedLanguages) => "skipped-no-supported-languages",
            Verdict::Skip(SkipReason::NothingToPromote) => "skipped-nothing-to-promote",
            Verdict::NeedsConfiguration { .. } => "successfully-configured",
            Verdict::NeedsPromotion { .. } => "successfully-promoted",
            Verdict::NonCompliant(findings) => {
                if findings
                    .iter()
                    .any(|f| matches!(f, Finding::MissingPolicyConfig(_)))
                {
                    "missing-configuration"
                } else if findings.iter().any(|f| {
                    matches!(f, Finding::MissingAnalyses(_) | Finding::MissingDatabases(_))
                }) {
                    "missing-data"
                } else {
                    "out-of-date-cli"
                }
            }
        }
    }

    pub fn is_skip(&self) -> bool {
        matches!(self, Verdict::Skip(_))
    }

    pub fn findings(&self) -> &[Finding] {
        match self {
            Verdict::NonCompliant(findings) => findings,
            _ => &[],
        }
    }
}
