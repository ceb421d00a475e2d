//! Property-based tests for reconnect backoff

use chathub::client::ReconnectPolicy;
use proptest::prelude::*;
use std::time::Duration;

proptest! {
    #[test]
    fn test_delay_never_exceeds_max(base_ms in 1u64..5_000, max_ms in 1u64..120_000, attempt in any::<u32>()) {
        let policy = ReconnectPolicy::new(Duration::from_millis(base_ms), Duration::from_millis(max_ms));
        prop_assert!(policy.delay(attempt) <= Duration::from_millis(max_ms));
    }

    #[test]
    fn test_delay_is_monotonic(base_ms in 1u64..5_000, max_ms in 1u64..120_000, attempt in 0u32..64) {
        let policy = ReconnectPolicy::new(Duration::from_millis(base_ms), Duration::from_millis(max_ms));
        prop_assert!(policy.delay(attempt) <= policy.delay(attempt + 1));
    }

    #[test]
    fn test_delay_doubles_until_capped(attempt in 0u32..5) {
        let policy = ReconnectPolicy::default();
        let expected = Duration::from_secs(1u64 << attempt);
        prop_assert_eq!(policy.delay(attempt), expected);
    }
}
