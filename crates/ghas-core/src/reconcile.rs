use std::collections::{BTreeMap, BTreeSet};

use chrono::{DateTime, Utc};

use crate::{AnalysisRecord, DatabaseArtifact, LanguageSet, RecencyWindow};

/// Categories produced by the organization's own workflow start with this tag.
pub const CATEGORY_PREFIX: &str = "ois-";

/// Language encoded in an analysis category, if the category belongs to our workflow.
pub fn category_language(category: &str) -> Option<String> {
    category
        .strip_prefix(CATEGORY_PREFIX)
        .map(|l| l.trim().to_lowercase())
        .filter(|l| !l.is_empty())
}

/// What the caller should do after feeding a page.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PageVerdict {
    /// Fetch the next page.
    Continue,
    /// Every expected language is matched; stop paginating.
    Satisfied,
    /// History is empty or now older than the window; stop paginating.
    Exhausted,
}

impl PageVerdict {
    pub fn should_continue(&self) -> bool {
        matches!(self, PageVerdict::Continue)
    }
}

/// Incremental reconciler over the most-recent-first analyses feed.
///
/// The shell owns pagination and hands each page to `observe_page`; the
/// returned verdict decides whether another request is made.
#[derive(Clone, Debug)]
pub struct AnalysisReconciler {
    expected: LanguageSet,
    window: RecencyWindow,
    now: DateTime<Utc>,
    matched: BTreeMap<String, AnalysisRecord>,
    exhausted: bool,
}

impl AnalysisReconciler {
    pub fn new(expected: LanguageSet, window: RecencyWindow, now: DateTime<Utc>) -> Self {
        Self {
            expected,
            window,
            now,
            matched: BTreeMap::new(),
            exhausted: false,
        }
    }

    pub fn observe_page(&mut self, page: &[AnalysisRecord]) -> PageVerdict {
        if page.is_empty() {
            return PageVerdict::Exhausted;
        }
        for record in page {
            if !self.window.contains(self.now, record.created_at) {
                // Feed is sorted by creation time, so everything after this is older.
                self.exhausted = true;
                continue;
            }
            let Some(language) = category_language(&record.category) else {
                continue;
            };
            match self.matched.get(&language) {
                Some(kept) if kept.created_at >= record.created_at => {}
                _ => {
                    self.matched.insert(language, record.clone());
                }
            }
            if self.is_satisfied() {
                return PageVerdict::Satisfied;
            }
        }
        if self.exhausted {
            PageVerdict::Exhausted
        } else {
            PageVerdict::Continue
        }
    }

    /// An empty expectation never short-circuits; the feed is walked until exhausted.
    pub fn is_satisfied(&self) -> bool {
        !self.expected.is_empty() && self.expected.iter().all(|l| self.matched.contains_key(l))
    }

    pub fn finish(self) -> AnalysisCoverage {
        let missing = self
            .expected
            .iter()
            .filter(|l| !self.matched.contains_key(*l))
            .cloned()
            .collect();
        AnalysisCoverage {
            matched: self.matched,
            missing,
        }
    }
}

/// Result of reconciling the analyses feed against an expected language set.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct AnalysisCoverage {
    /// Most recent in-window analysis per language.
    pub matched: BTreeMap<String, AnalysisRecord>,
    pub missing: LanguageSet,
}

impl AnalysisCoverage {
    pub fn has_analyses(&self) -> bool {
        !self.matched.is_empty()
    }

    pub fn tool_versions(&self) -> BTreeSet<String> {
        self.matched
            .values()
            .map(|r| r.tool_version.trim().to_string())
            .filter(|v| !v.is_empty())
            .collect()
    }
}

/// Single-pass filter-and-group: newest in-window database per language.
pub fn latest_databases(
    artifacts: &[DatabaseArtifact],
    window: RecencyWindow,
    now: DateTime<Utc>,
) -> BTreeMap<String, DatabaseArtifact> {
    let mut latest: BTreeMap<String, DatabaseArtifact> = BTreeMap::new();
    for artifact in artifacts {
        if !window.contains(now, artifact.created_at) {
            continue;
        }
        let language = artifact.language.trim().to_lowercase();
        match latest.get(&language) {
            Some(kept) if kept.created_at >= artifact.created_at => {}
            _ => {
                latest.insert(language, artifact.clone());
            }
        }
    }
    latest
}

/// Expected languages with no in-window database.
pub fn missing_databases(
    expected: &LanguageSet,
    latest: &BTreeMap<String, DatabaseArtifact>,
) -> LanguageSet {
    expected
        .iter()
        .filter(|l| !latest.contains_key(*l))
        .cloned()
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 6, 1, 0, 0, 0).unwrap()
    }

    fn analysis(id: u64, category: &str, days_ago: i64, version: &str) -> AnalysisRecord {
        AnalysisRecord {
            id,
            category: category.to_string(),
            git_ref: "refs/heads/main".into(),
            analysis_key: ".github/workflows/codeql-analysis.yml:analyze".into(),
            tool_version: version.to_string(),
            created_at: now() - Duration::days(days_ago),
        }
    }

    fn set(langs: &[&str]) -> LanguageSet {
        langs.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn category_prefix_is_required() {
        assert_eq!(category_language("ois-Python"), Some("python".into()));
        assert_eq!(category_language("/language:python"), None);
        assert_eq!(category_language("ois-"), None);
    }

    #[test]
    fn keeps_first_record_per_language() {
        let mut r = AnalysisReconciler::new(set(&["go", "python"]), RecencyWindow::new(30), now());
        let page = vec![
            analysis(3, "ois-go", 1, "2.15.0"),
            analysis(2, "ois-go", 2, "2.14.0"),
            analysis(1, "other", 2, "2.14.0"),
        ];
        assert_eq!(r.observe_page(&page), PageVerdict::Continue);
        let coverage = r.finish();
        assert_eq!(coverage.matched.len(), 1);
        assert_eq!(coverage.matched["go"].id, 3);
        assert_eq!(coverage.missing, set(&["python"]));
        assert_eq!(coverage.tool_versions(), set(&["2.15.0"]));
    }

    #[test]
    fn newest_wins_even_when_feed_is_unsorted() {
        let mut r = AnalysisReconciler::new(set(&["java"]), RecencyWindow::new(30), now());
        r.observe_page(&[analysis(1, "ois-ruby", 9, "a"), analysis(2, "ois-ruby", 3, "b")]);
        let coverage = r.finish();
        assert_eq!(coverage.matched["ruby"].id, 2);
    }

    #[test]
    fn satisfied_as_soon_as_expected_set_is_covered() {
        let mut r = AnalysisReconciler::new(set(&["go"]), RecencyWindow::new(30), now());
        let verdict = r.observe_page(&[analysis(1, "ois-go", 0, "2.15.0"), analysis(2, "ois-go", 0, "x")]);
        assert_eq!(verdict, PageVerdict::Satisfied);
    }

    #[test]
    fn stale_records_exhaust_the_feed_and_do_not_count() {
        let mut r = AnalysisReconciler::new(set(&["java"]), RecencyWindow::new(30), now());
        let verdict = r.observe_page(&[analysis(1, "ois-java", 40, "2.10.0")]);
        assert_eq!(verdict, PageVerdict::Exhausted);
        let coverage = r.finish();
        assert!(!coverage.has_analyses());
        assert_eq!(coverage.missing, set(&["java"]));
    }

    #[test]
    fn empty_page_exhausts() {
        let mut r = AnalysisReconciler::new(set(&["go"]), RecencyWindow::new(30), now());
        assert_eq!(r.observe_page(&[]), PageVerdict::Exhausted);
    }

    #[test]
    fn empty_expectation_never_short_circuits() {
        let mut r = AnalysisReconciler::new(LanguageSet::new(), RecencyWindow::new(30), now());
        assert_eq!(r.observe_page(&[analysis(1, "ois-go", 0, "v")]), PageVerdict::Continue);
        assert!(r.finish().missing.is_empty());
    }

    #[test]
    fn databases_grouped_by_newest_in_window() {
        let db = |id, lang: &str, days| DatabaseArtifact {
            id,
            name: format!("{lang}-db"),
            language: lang.to_string(),
            created_at: now() - Duration::days(days),
            url: format!("https://example.test/db/{id}"),
        };
        let latest = latest_databases(
            &[db(1, "go", 5), db(2, "go", 1), db(3, "java", 45)],
            RecencyWindow::new(30),
            now(),
        );
        assert_eq!(latest.len(), 1);
        assert_eq!(latest["go"].id, 2);
        assert_eq!(missing_databases(&set(&["go", "java"]), &latest), set(&["java"]));
    }
}
