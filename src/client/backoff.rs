//! Exponential backoff with jitter.

use rand::Rng;
use std::time::Duration;

/// Absolute ceiling for a single retry delay.
pub const MAX_RETRY_DELAY_MS: u64 = 1500;

/// Upper bound (exclusive) of the random jitter added to each delay.
pub const MAX_JITTER_MS: u64 = 100;

/// Delay before retry number `attempt` (1-based; attempt 0 never waits).
///
/// `min(base * 2^(attempt-1) + jitter, 1500ms)`
pub fn retry_delay(attempt: u32, base_ms: u64) -> Duration {
    if attempt == 0 {
        return Duration::ZERO;
    }

    let exponential = 2u64.saturating_pow(attempt - 1);
    let delay_ms = base_ms.saturating_mul(exponential);
    let jitter = rand::thread_rng().gen_range(0..MAX_JITTER_MS);

    Duration::from_millis(delay_ms.saturating_add(jitter).min(MAX_RETRY_DELAY_MS))
}
