use std::time::{SystemTime, UNIX_EPOCH};

pub fn now_ms() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as i64
}

pub fn backoff_ms(base_ms: u64, attempt: u32, max_ms: u64) -> u64 {
    if attempt == 0 {
        return 0;
    }
    let pow = 2u64.saturating_pow(attempt.saturating_sub(1));
    let delay = base_ms.saturating_mul(pow);
    delay.min(max_ms)
}

/// Delay before the next periodic score sweep. A healthy sweep waits the
/// full interval; failed sweeps retry sooner, growing back toward it.
pub fn next_sweep_delay_ms(interval_ms: u64, consecutive_failures: u32, retry_base_ms: u64) -> u64 {
    if consecutive_failures == 0 {
        return interval_ms;
    }
    backoff_ms(retry_base_ms, consecutive_failures, interval_ms)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn backoff_ms_returns_zero_for_zero_attempt() {
        assert_eq!(backoff_ms(1_000, 0, 60_000), 0);
    }

    #[test]
    fn backoff_ms_grows_geometrically() {
        assert_eq!(backoff_ms(1_000, 1, 60_000), 1_000);
        assert_eq!(backoff_ms(1_000, 2, 60_000), 2_000);
        assert_eq!(backoff_ms(1_000, 3, 60_000), 4_000);
    }

    #[test]
    fn backoff_ms_caps_at_maximum() {
        assert_eq!(backoff_ms(1_000, 10, 3_000), 3_000);
    }

    #[test]
    fn healthy_sweeps_wait_the_full_interval() {
        assert_eq!(next_sweep_delay_ms(900_000, 0, 5_000), 900_000);
    }

    #[test]
    fn failed_sweeps_retry_sooner_but_never_past_interval() {
        assert_eq!(next_sweep_delay_ms(900_000, 1, 5_000), 5_000);
        assert_eq!(next_sweep_delay_ms(900_000, 3, 5_000), 20_000);
        assert_eq!(next_sweep_delay_ms(900_000, 30, 5_000), 900_000);
    }
}
