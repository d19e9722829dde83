use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ActionStatus {
    Applied,
    /// Skipped because dry-run is on.
    Suppressed,
}

/// One executed command, as reported back to the fleet driver.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActionRecord {
    pub action: String,
    pub detail: String,
    pub status: ActionStatus,
}

impl ActionRecord {
    pub fn applied(action: &str, detail: impl Into<String>) -> Self {
        Self {
            action: action.to_string(),
            detail: detail.into(),
            status: ActionStatus::Applied,
        }
    }

    pub fn suppressed(action: &str, detail: impl Into<String>) -> Self {
        Self {
            action: action.to_string(),
            detail: detail.into(),
            status: ActionStatus::Suppressed,
        }
    }
}
