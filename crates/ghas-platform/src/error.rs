use thiserror::Error;

/// Failures from the platform layer. "Not found" is never one of these:
/// probes report absence through `Option`/`bool`.
#[derive(Debug, Error)]
pub enum PlatformError {
    /// Rate limit, timeout, 5xx or transport trouble that outlived retries.
    #[error("transient failure during {operation} (status {status:?}): {message}")]
    Transient {
        operation: String,
        status: Option<u16>,
        message: String,
    },
    /// Any other non-success status. Fatal for the current repository.
    #[error("{operation} rejected with status {status}: {message}")]
    Rejected {
        operation: String,
        status: u16,
        message: String,
    },
    #[error("malformed data from {operation}: {message}")]
    Malformed { operation: String, message: String },
    #[error("platform configuration: {0}")]
    Configuration(String),
}

impl PlatformError {
    pub fn transient(operation: &str, status: Option<u16>, message: impl Into<String>) -> Self {
        Self::Transient {
            operation: operation.to_string(),
            status,
            message: message.into(),
        }
    }

    pub fn rejected(operation: &str, status: u16, message: impl Into<String>) -> Self {
        Self::Rejected {
            operation: operation.to_string(),
            status,
            message: message.into(),
        }
    }

    pub fn malformed(operation: &str, message: impl Into<String>) -> Self {
        Self::Malformed {
            operation: operation.to_string(),
            message: message.into(),
        }
    }

    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Transient { .. })
    }
}

pub type PlatformResult<T> = Result<T, PlatformError>;
