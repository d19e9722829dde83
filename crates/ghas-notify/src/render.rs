use ghas_core::{fingerprint_marker, ConfigProblem, Notice};
use serde::{Deserialize, Serialize};

pub const REPOSITORY_URL_PLACEHOLDER: &str = "<REPOSITORY_URL_PLACEHOLDER>";
pub const REPOSITORY_NAME_PLACEHOLDER: &str = "<REPOSITORY_NAME_PLACEHOLDER>";
pub const SYSTEM_ID_PLACEHOLDER: &str = "<SYSTEM_ID_PLACEHOLDER>";
pub const SYSTEM_NAME_PLACEHOLDER: &str = "<SYSTEM_NAME_PLACEHOLDER>";
pub const LANGUAGES_PLACEHOLDER: &str = "<LANGUAGES_PLACEHOLDER>";
pub const CODEQL_VERSION_PLACEHOLDER: &str = "<CODEQL_VERSION_PLACEHOLDER>";
pub const PROBLEMS_PLACEHOLDER: &str = "<PROBLEMS_PLACEHOLDER>";

const DEFAULT_MISSING_CONFIGURATION: &str = "<p>The repository <a href=\"<REPOSITORY_URL_PLACEHOLDER>\"><REPOSITORY_NAME_PLACEHOLDER></a> \
is not mapped to an eMASS system. Add a complete <code>.github/emass.json</code> to the default branch.</p>
<ul>
<PROBLEMS_PLACEHOLDER></ul>
";

const DEFAULT_MISSING_COVERAGE: &str = "<p>Code scanning is not enabled for every language in \
<a href=\"<REPOSITORY_URL_PLACEHOLDER>\"><REPOSITORY_NAME_PLACEHOLDER></a> \
(eMASS system <SYSTEM_NAME_PLACEHOLDER>, ID <SYSTEM_ID_PLACEHOLDER>). Missing recent analyses or databases for:</p>
<ul>
<LANGUAGES_PLACEHOLDER></ul>
";

const DEFAULT_OUTDATED_TOOL: &str = "<p><a href=\"<REPOSITORY_URL_PLACEHOLDER>\"><REPOSITORY_NAME_PLACEHOLDER></a> \
is scanned with CodeQL <CODEQL_VERSION_PLACEHOLDER>, which is not one of the supported releases. \
Update the CodeQL CLI used by the workflow.</p>
";

/// Body templates per notice kind. Email and tracking issue share a template.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct NoticeTemplates {
    pub missing_configuration: String,
    pub missing_coverage: String,
    pub outdated_tool: String,
}

impl Default for NoticeTemplates {
    fn default() -> Self {
        Self {
            missing_configuration: DEFAULT_MISSING_CONFIGURATION.to_string(),
            missing_coverage: DEFAULT_MISSING_COVERAGE.to_string(),
            outdated_tool: DEFAULT_OUTDATED_TOOL.to_string(),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RenderedNotice {
    pub subject: String,
    pub body: String,
}

fn list_items<'a>(items: impl IntoIterator<Item = &'a str>) -> String {
    items.into_iter().map(|i| format!("<li>{i}</li>\n")).collect()
}

fn describe(problem: &ConfigProblem) -> String {
    match problem {
        ConfigProblem::ManifestMissing => "emass.json is missing".to_string(),
        ConfigProblem::SystemIdMissing => "systemID is not set".to_string(),
        ConfigProblem::SystemNameMissing => "systemName is empty".to_string(),
        ConfigProblem::OwnerNameMissing => "systemOwnerName is empty".to_string(),
        ConfigProblem::OwnerEmailMissing => "systemOwnerEmail is empty".to_string(),
        ConfigProblem::OwnerEmailInvalid => "systemOwnerEmail is not an email address".to_string(),
        ConfigProblem::SystemIdUnknown(id) => format!("systemID {id} is not a registered eMASS system"),
    }
}

pub fn render(notice: &Notice, templates: &NoticeTemplates) -> RenderedNotice {
    let body = match notice {
        Notice::MissingConfiguration {
            repository, problems, ..
        } => {
            let described: Vec<String> = problems.iter().map(describe).collect();
            templates
                .missing_configuration
                .replace(REPOSITORY_NAME_PLACEHOLDER, repository)
                .replace(PROBLEMS_PLACEHOLDER, &list_items(described.iter().map(String::as_str)))
        }
        Notice::MissingCoverage {
            repository,
            system_id,
            system_name,
            languages,
            ..
        } => templates
            .missing_coverage
            .replace(REPOSITORY_NAME_PLACEHOLDER, repository)
            .replace(SYSTEM_ID_PLACEHOLDER, &system_id.to_string())
            .replace(SYSTEM_NAME_PLACEHOLDER, system_name)
            .replace(LANGUAGES_PLACEHOLDER, &list_items(languages.iter().map(String::as_str))),
        Notice::OutdatedToolVersion {
            repository, version, ..
        } => templates
            .outdated_tool
            .replace(REPOSITORY_NAME_PLACEHOLDER, repository)
            .replace(CODEQL_VERSION_PLACEHOLDER, version),
    };
    RenderedNotice {
        subject: notice.subject().to_string(),
        body: body.replace(REPOSITORY_URL_PLACEHOLDER, notice.repository_url()),
    }
}

/// Issue body: the rendered notice plus its hidden fingerprint.
pub fn issue_body(notice: &Notice, templates: &NoticeTemplates) -> String {
    let rendered = render(notice, templates);
    format!("{}\n{}\n", rendered.body.trim_end(), fingerprint_marker(&notice.fingerprint()))
}

/// Secondary address always; the owner only when it looks like an address.
pub fn recipients(secondary: Option<&str>, owner: Option<&str>) -> Vec<String> {
    let mut out: Vec<String> = Vec::new();
    for candidate in [secondary, owner].into_iter().flatten() {
        let candidate = candidate.trim();
        if candidate.contains('@') && !out.iter().any(|r| r.eq_ignore_ascii_case(candidate)) {
            out.push(candidate.to_string());
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use ghas_core::extract_fingerprint;

    fn coverage() -> Notice {
        Notice::MissingCoverage {
            repository: "acme/ledger".into(),
            repository_url: "https://github.com/acme/ledger".into(),
            system_id: 1001,
            system_name: "Ledger".into(),
            languages: vec!["go".into(), "python".into()],
        }
    }

    #[test]
    fn languages_render_as_list_items() {
        let templates = NoticeTemplates {
            missing_coverage: "<SYSTEM_ID_PLACEHOLDER>|<SYSTEM_NAME_PLACEHOLDER>|<LANGUAGES_PLACEHOLDER>".into(),
            ..NoticeTemplates::default()
        };
        let rendered = render(&coverage(), &templates);
        assert_eq!(rendered.subject, "GitHub Repository Code Scanning Not Enabled");
        assert_eq!(rendered.body, "1001|Ledger|<li>go</li>\n<li>python</li>\n");
    }

    #[test]
    fn default_templates_leave_no_placeholders() {
        let notices = vec![
            coverage(),
            Notice::OutdatedToolVersion {
                repository: "acme/ledger".into(),
                repository_url: "https://github.com/acme/ledger".into(),
                version: "2.9.0".into(),
            },
            Notice::MissingConfiguration {
                repository: "acme/ledger".into(),
                repository_url: "https://github.com/acme/ledger".into(),
                problems: vec![ConfigProblem::ManifestMissing, ConfigProblem::SystemIdUnknown(5)],
            },
        ];
        for notice in notices {
            let body = render(&notice, &NoticeTemplates::default()).body;
            assert!(!body.contains("_PLACEHOLDER>"), "{body}");
            assert!(body.contains("href=\"https://github.com/acme/ledger\""), "{body}");
        }
    }

    #[test]
    fn issue_body_embeds_fingerprint() {
        let notice = coverage();
        let body = issue_body(&notice, &NoticeTemplates::default());
        assert_eq!(extract_fingerprint(&body), Some(notice.fingerprint().as_str()));
    }

    #[test]
    fn recipients_dedupe_and_drop_invalid() {
        assert_eq!(
            recipients(Some("ghas@example.gov"), Some("owner@example.gov")),
            vec!["ghas@example.gov", "owner@example.gov"]
        );
        assert_eq!(recipients(Some("ghas@example.gov"), Some("<email>")), vec!["ghas@example.gov"]);
        assert_eq!(recipients(Some("A@x.gov"), Some("a@x.gov")), vec!["A@x.gov"]);
        assert!(recipients(None, None).is_empty());
    }
}
