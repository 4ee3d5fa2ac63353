//! Exponential backoff with jitter for event log write retries.

use rand::Rng;
use std::time::Duration;

/// Delay before retry number `attempt` (1-based). Doubles from `base_ms`,
/// capped at `max_ms`, plus up to 10% jitter so a flapping disk is not
/// hammered in lockstep.
pub fn calculate_backoff(attempt: u32, base_ms: u64, max_ms: u64) -> Duration {
    if attempt == 0 {
        return Duration::ZERO;
    }

    let factor = 1u64.checked_shl(attempt - 1).unwrap_or(u64::MAX);
    let capped_delay = base_ms.saturating_mul(factor).min(max_ms);

    let jitter_range = capped_delay / 10;
    let jitter = if jitter_range > 0 {
        rand::thread_rng().gen_range(0..jitter_range)
    } else {
        0
    };

    Duration::from_millis(capped_delay + jitter)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_backoff_doubles_until_cap() {
        assert_eq!(calculate_backoff(0, 200, 10_000), Duration::ZERO);

        let first = calculate_backoff(1, 200, 10_000).as_millis();
        assert!((200..220).contains(&first));

        let third = calculate_backoff(3, 200, 10_000).as_millis();
        assert!((800..880).contains(&third));

        let capped = calculate_backoff(40, 200, 10_000).as_millis();
        assert!((10_000..11_000).contains(&capped));
    }

    #[test]
    fn test_huge_attempt_does_not_overflow() {
        let delay = calculate_backoff(u32::MAX, u64::MAX, 5_000);
        assert!(delay.as_millis() >= 5_000);
    }
}
