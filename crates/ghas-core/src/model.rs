use serde::{Deserialize, Serialize};
use std::fmt;

/// The three fixed reconciliation purposes.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "kebab-case")]
pub enum Purpose {
    Configure,
    Promote,
    Verify,
}

impl Purpose {
    pub fn as_str(&self) -> &'static str {
        match self {
            Purpose::Configure => "configure",
            Purpose::Promote => "promote",
            Purpose::Verify => "verify",
        }
    }

    /// Installation whose repositories make up the fleet for this purpose.
    pub fn fleet_integration(&self) -> Integration {
        match self {
            Purpose::Configure => Integration::Configure,
            Purpose::Promote => Integration::Promote,
            Purpose::Verify => Integration::Verify,
        }
    }
}

impl fmt::Display for Purpose {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Platform app installations the tools enumerate and register repositories with.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "kebab-case")]
pub enum Integration {
    Configure,
    Verify,
    Promote,
}

impl Integration {
    pub fn as_str(&self) -> &'static str {
        match self {
            Integration::Configure => "configure",
            Integration::Verify => "verify",
            Integration::Promote => "promote",
        }
    }
}

impl fmt::Display for Integration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "kebab-case")]
pub enum DefaultSetupState {
    Configured,
    #[default]
    NotConfigured,
}

/// How code scanning is currently set up on a repository.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum ScanningSetup {
    NotEnabled,
    DefaultSetup,
    ReusableWorkflow { workflow_path: String },
    OtherWorkflow { workflow_path: String },
}
