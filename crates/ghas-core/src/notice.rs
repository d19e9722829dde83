use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::ConfigProblem;

/// Label carried by every tracking issue this system opens.
pub const TRACKING_LABEL: &str = "ghas-non-compliant";

pub const MISSING_CONFIGURATION_SUBJECT: &str = "Error: GitHub Repository Not Mapped To eMASS System";
pub const MISSING_COVERAGE_SUBJECT: &str = "GitHub Repository Code Scanning Not Enabled";
pub const OUTDATED_TOOL_SUBJECT: &str = "GitHub Repository Code Scanning Software Is Out Of Date";

const FINGERPRINT_OPEN: &str = "<!-- ghas-compliance:fingerprint=";
const FINGERPRINT_CLOSE: &str = " -->";

/// A structured owner notice. Rendering to text happens in the shell.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum Notice {
    MissingConfiguration {
        repository: String,
        repository_url: String,
        problems: Vec<ConfigProblem>,
    },
    MissingCoverage {
        repository: String,
        repository_url: String,
        system_id: i64,
        system_name: String,
        languages: Vec<String>,
    },
    OutdatedToolVersion {
        repository: String,
        repository_url: String,
        version: String,
    },
}

impl Notice {
    pub fn subject(&self) -> &'static str {
        match self {
            Notice::MissingConfiguration { .. } => MISSING_CONFIGURATION_SUBJECT,
            Notice::MissingCoverage { .. } => MISSING_COVERAGE_SUBJECT,
            Notice::OutdatedToolVersion { .. } => OUTDATED_TOOL_SUBJECT,
        }
    }

    pub fn repository_url(&self) -> &str {
        match self {
            Notice::MissingConfiguration { repository_url, .. }
            | Notice::MissingCoverage { repository_url, .. }
            | Notice::OutdatedToolVersion { repository_url, .. } => repository_url,
        }
    }

    /// Stable hash of the notice content; equal notices hash equally.
    pub fn fingerprint(&self) -> String {
        let bytes = serde_json::to_vec(self).unwrap_or_default();
        let digest = Sha256::digest(&bytes);
        hex::encode(&digest[..8])
    }
}

pub fn fingerprint_marker(fingerprint: &str) -> String {
    format!("{FINGERPRINT_OPEN}{fingerprint}{FINGERPRINT_CLOSE}")
}

/// Fingerprint previously embedded in an issue body, if any.
pub fn extract_fingerprint(body: &str) -> Option<&str> {
    let start = body.find(FINGERPRINT_OPEN)? + FINGERPRINT_OPEN.len();
    let rest = &body[start..];
    let end = rest.find(FINGERPRINT_CLOSE)?;
    Some(rest[..end].trim())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn outdated(version: &str) -> Notice {
        Notice::OutdatedToolVersion {
            repository: "org/app".into(),
            repository_url: "https://github.com/org/app".into(),
            version: version.into(),
        }
    }

    #[test]
    fn fingerprint_tracks_content() {
        assert_eq!(outdated("2.1.0").fingerprint(), outdated("2.1.0").fingerprint());
        assert_ne!(outdated("2.1.0").fingerprint(), outdated("2.2.0").fingerprint());
        assert_eq!(outdated("2.1.0").fingerprint().len(), 16);
    }

    #[test]
    fn marker_round_trips_through_a_body() {
        let fp = outdated("2.1.0").fingerprint();
        let body = format!("Please upgrade.\n\n{}\n", fingerprint_marker(&fp));
        assert_eq!(extract_fingerprint(&body), Some(fp.as_str()));
        assert_eq!(extract_fingerprint("no marker here"), None);
    }
}
