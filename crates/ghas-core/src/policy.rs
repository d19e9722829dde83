use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};
use thiserror::Error;

pub const IGNORE_MARKER_PATH: &str = ".github/.emass-repo-ignore";
pub const MANIFEST_PATH: &str = ".github/emass.json";
pub const SCAN_CONFIG_PATH: &str = ".github/codeql.yml";

/// The compliance manifest a repository carries at `.github/emass.json`.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ComplianceManifest {
    #[serde(rename = "systemID", default)]
    pub system_id: i64,
    #[serde(rename = "systemName", default)]
    pub system_name: String,
    #[serde(rename = "systemOwnerName", default)]
    pub system_owner_name: String,
    #[serde(rename = "systemOwnerEmail", default)]
    pub system_owner_email: String,
}

impl ComplianceManifest {
    /// Placeholder written by the configure tool for humans to fill in.
    pub fn placeholder() -> Self {
        Self {
            system_id: 0,
            system_name: "<system_name>".to_string(),
            system_owner_name: "<full_name>".to_string(),
            system_owner_email: "<email>".to_string(),
        }
    }

    pub fn parse(text: &str) -> Result<Self, PolicyError> {
        serde_json::from_str(text).map_err(|e| PolicyError::MalformedManifest(e.to_string()))
    }

    pub fn owner_email_is_valid(&self) -> bool {
        self.system_owner_email.contains('@')
    }
}

/// Per-repository scan configuration. Absence means empty defaults.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScanConfig {
    #[serde(default)]
    pub excluded_languages: Vec<String>,
    #[serde(default)]
    pub build_commands: BTreeMap<String, String>,
}

impl ScanConfig {
    /// Accepts YAML or JSON. An empty document is the same as no file.
    pub fn parse(text: &str) -> Result<Self, PolicyError> {
        if text.trim().is_empty() {
            return Ok(Self::default());
        }
        serde_yaml::from_str(text).map_err(|e| PolicyError::MalformedScanConfig(e.to_string()))
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum PolicyError {
    #[error("manifest is not valid JSON: {0}")]
    MalformedManifest(String),
    #[error("scan configuration is malformed: {0}")]
    MalformedScanConfig(String),
    #[error("system list line {line} is not an integer: {text:?}")]
    MalformedSystemList { line: usize, text: String },
}

/// Why a manifest fails the policy-config guard.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ConfigProblem {
    ManifestMissing,
    SystemIdMissing,
    SystemNameMissing,
    OwnerNameMissing,
    OwnerEmailMissing,
    OwnerEmailInvalid,
    SystemIdUnknown(i64),
}

/// Canonical list of compliance-system identifiers.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SystemIdList(BTreeSet<i64>);

impl SystemIdList {
    /// One integer per line; blank lines and lines containing `#` are skipped.
    pub fn parse(text: &str) -> Result<Self, PolicyError> {
        let mut ids = BTreeSet::new();
        for (idx, raw) in text.lines().enumerate() {
            let line = raw.trim();
            if line.is_empty() || line.contains('#') {
                continue;
            }
            let id = line
                .parse::<i64>()
                .map_err(|_| PolicyError::MalformedSystemList {
                    line: idx + 1,
                    text: line.to_string(),
                })?;
            ids.insert(id);
        }
        Ok(Self(ids))
    }

    pub fn contains(&self, id: i64) -> bool {
        self.0.contains(&id)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl FromIterator<i64> for SystemIdList {
    fn from_iter<T: IntoIterator<Item = i64>>(iter: T) -> Self {
        Self(iter.into_iter().collect())
    }
}

/// All problems with a repository's manifest. Empty means the guard passes.
pub fn validate_manifest(
    manifest: Option<&ComplianceManifest>,
    valid_ids: &SystemIdList,
) -> Vec<ConfigProblem> {
    let Some(m) = manifest else {
        return vec![ConfigProblem::ManifestMissing];
    };
    let mut problems = Vec::new();
    if m.system_id == 0 {
        problems.push(ConfigProblem::SystemIdMissing);
    } else if !valid_ids.contains(m.system_id) {
        problems.push(ConfigProblem::SystemIdUnknown(m.system_id));
    }
    if m.system_name.trim().is_empty() {
        problems.push(ConfigProblem::SystemNameMissing);
    }
    if m.system_owner_name.trim().is_empty() {
        problems.push(ConfigProblem::OwnerNameMissing);
    }
    if m.system_owner_email.trim().is_empty() {
        problems.push(ConfigProblem::OwnerEmailMissing);
    } else if !m.owner_email_is_valid() {
        problems.push(ConfigProblem::OwnerEmailInvalid);
    }
    problems
}

#[cfg(test)]
mod tests {
    use super::*;

    fn complete() -> ComplianceManifest {
        ComplianceManifest {
            system_id: 1234,
            system_name: "Benefits Portal".into(),
            system_owner_name: "Sam Rivera".into(),
            system_owner_email: "sam.rivera@example.gov".into(),
        }
    }

    fn ids() -> SystemIdList {
        [1234, 5678].into_iter().collect()
    }

    #[test]
    fn complete_manifest_has_no_problems() {
        assert!(validate_manifest(Some(&complete()), &ids()).is_empty());
    }

    #[test]
    fn each_missing_field_is_flagged() {
        let mut m = complete();
        m.system_owner_email = String::new();
        assert_eq!(validate_manifest(Some(&m), &ids()), vec![ConfigProblem::OwnerEmailMissing]);

        let mut m = complete();
        m.system_owner_email = "sam.rivera.example.gov".into();
        assert_eq!(validate_manifest(Some(&m), &ids()), vec![ConfigProblem::OwnerEmailInvalid]);

        let mut m = complete();
        m.system_id = 0;
        assert_eq!(validate_manifest(Some(&m), &ids()), vec![ConfigProblem::SystemIdMissing]);

        let mut m = complete();
        m.system_id = 42;
        assert_eq!(validate_manifest(Some(&m), &ids()), vec![ConfigProblem::SystemIdUnknown(42)]);
    }

    #[test]
    fn absent_manifest() {
        assert_eq!(validate_manifest(None, &ids()), vec![ConfigProblem::ManifestMissing]);
    }

    #[test]
    fn manifest_parses_wire_names() {
        let m = ComplianceManifest::parse(
            r#"{"systemID": 1234, "systemName": "x", "systemOwnerName": "y", "systemOwnerEmail": "z@q"}"#,
        )
        .unwrap();
        assert_eq!(m.system_id, 1234);
        assert!(ComplianceManifest::parse(r#"{"systemID": "abc"}"#).is_err());
    }

    #[test]
    fn scan_config_accepts_yaml_and_json() {
        let yaml = ScanConfig::parse("excluded_languages: [ruby]\nbuild_commands:\n  java: mvn package\n").unwrap();
        assert_eq!(yaml.excluded_languages, vec!["ruby"]);
        assert_eq!(yaml.build_commands["java"], "mvn package");
        let json = ScanConfig::parse(r#"{"excluded_languages": ["go"]}"#).unwrap();
        assert_eq!(json.excluded_languages, vec!["go"]);
        assert_eq!(ScanConfig::parse("").unwrap(), ScanConfig::default());
        assert!(ScanConfig::parse("excluded_languages: 7").is_err());
    }

    #[test]
    fn system_list_skips_comments_and_blanks() {
        let list = SystemIdList::parse("# header\n1234\n\n5678 # trailing\n  42  \n").unwrap();
        assert!(list.contains(1234));
        assert!(list.contains(42));
        assert!(!list.contains(5678));
        assert_eq!(list.len(), 2);
    }

    #[test]
    fn system_list_rejects_garbage() {
        let err = SystemIdList::parse("1\nabc\n").unwrap_err();
        assert_eq!(
            err,
            PolicyError::MalformedSystemList {
                line: 2,
                text: "abc".into()
            }
        );
    }
}
