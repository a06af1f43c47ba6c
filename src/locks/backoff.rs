//! Backoff curves for acquisition retries and existence polling.

use crate::config::{PollPolicy, RetryPolicy};
use rand::Rng;
use std::time::Duration;

/// Fraction by which a retry delay is randomly stretched or shrunk.
const JITTER: f64 = 0.1;

/// First existence-poll interval; doubles on every poll.
const POLL_BASE: Duration = Duration::from_millis(250);

/// Delay before retry number `attempt` (1-based), without jitter.
///
/// `min(max_sleep, min_sleep + sleep_inc * attempt)`
pub fn retry_delay(policy: &RetryPolicy, attempt: u32) -> Duration {
    policy
        .min_sleep
        .saturating_add(policy.sleep_inc.saturating_mul(attempt))
        .min(policy.max_sleep)
}

/// Perturb `delay` by up to ±10% so contenders that collided once do not
/// keep colliding in lockstep.
pub fn with_jitter(delay: Duration) -> Duration {
    if delay.is_zero() {
        return delay;
    }
    let factor = rand::thread_rng().gen_range((1.0 - JITTER)..=(1.0 + JITTER));
    Duration::try_from_secs_f64(delay.as_secs_f64() * factor).unwrap_or(delay)
}

/// Interval before existence poll number `poll` (0-based).
pub fn poll_delay(policy: &PollPolicy, poll: u32) -> Duration {
    let factor = 1u32.checked_shl(poll).unwrap_or(u32::MAX);
    POLL_BASE.saturating_mul(factor).min(policy.max_sleep)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn policy() -> RetryPolicy {
        RetryPolicy {
            retries: None,
            sleep_inc: Duration::from_secs(5),
            min_sleep: Duration::from_secs(5),
            max_sleep: Duration::from_secs(60),
            suspend: Duration::from_secs(15),
            timeout: None,
            poll: PollPolicy {
                retries: 10,
                max_sleep: Duration::from_secs(5),
            },
        }
    }

    #[test]
    fn retry_delay_grows_linearly_then_caps() {
        let p = policy();
        assert_eq!(retry_delay(&p, 1), Duration::from_secs(10));
        assert_eq!(retry_delay(&p, 2), Duration::from_secs(15));
        assert_eq!(retry_delay(&p, 11), Duration::from_secs(60));
        assert_eq!(retry_delay(&p, 1000), Duration::from_secs(60));
        assert_eq!(retry_delay(&p, u32::MAX), Duration::from_secs(60));
    }

    #[test]
    fn jitter_stays_within_ten_percent() {
        let base = Duration::from_secs(10);
        for _ in 0..200 {
            let d = with_jitter(base);
            assert!(d >= Duration::from_secs(9), "{:?}", d);
            assert!(d <= Duration::from_secs(11), "{:?}", d);
        }
        assert_eq!(with_jitter(Duration::ZERO), Duration::ZERO);
    }

    #[test]
    fn jitter_on_longest_delay_does_not_overflow() {
        let d = with_jitter(Duration::MAX);
        assert!(d >= Duration::from_secs(u64::MAX / 2), "{:?}", d);
    }

    #[test]
    fn poll_delay_doubles_up_to_ceiling() {
        let p = policy().poll;
        assert_eq!(poll_delay(&p, 0), Duration::from_millis(250));
        assert_eq!(poll_delay(&p, 1), Duration::from_millis(500));
        assert_eq!(poll_delay(&p, 2), Duration::from_secs(1));
        assert_eq!(poll_delay(&p, 5), Duration::from_secs(5));
        assert_eq!(poll_delay(&p, 40), Duration::from_secs(5));
    }
}
