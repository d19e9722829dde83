/// Pure retry delay used by the platform layer.
///
/// Exponential from `base_ms` per failed attempt, capped at one minute.
/// A server-provided `Retry-After` wins when present (still capped).
pub fn retry_delay_ms(attempt: u32, base_ms: u64, retry_after_secs: Option<u64>) -> u64 {
    const CAP_MS: u64 = 60_000;
    if let Some(secs) = retry_after_secs {
        return secs.saturating_mul(1000).min(CAP_MS);
    }
    let exp = attempt.saturating_sub(1).min(16);
    base_ms.saturating_mul(1u64 << exp).min(CAP_MS)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn doubles_per_attempt() {
        assert_eq!(retry_delay_ms(1, 500, None), 500);
        assert_eq!(retry_delay_ms(2, 500, None), 1000);
        assert_eq!(retry_delay_ms(3, 500, None), 2000);
    }

    #[test]
    fn capped_and_honours_retry_after() {
        assert_eq!(retry_delay_ms(30, 500, None), 60_000);
        assert_eq!(retry_delay_ms(1, 500, Some(7)), 7_000);
        assert_eq!(retry_delay_ms(1, 500, Some(3600)), 60_000);
    }
}
