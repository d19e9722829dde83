/// How the platform layer treats an HTTP status.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StatusClass {
    Success,
    /// Valid absence, never an error.
    NotFound,
    /// Rate limit or server trouble; retry with backoff.
    Retryable,
    /// Fatal for the current repository only.
    Fatal,
}

pub fn classify_status(status: u16) -> StatusClass {
    match status {
        200..=299 => StatusClass::Success,
        404 => StatusClass::NotFound,
        403 | 429 | 500..=599 => StatusClass::Retryable,
        _ => StatusClass::Fatal,
    }
}
