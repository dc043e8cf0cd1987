//! Property-based tests for capture configuration validation.

use platform::config::CaptureConfig;
use platform::dma_safety::EASYDMA_MAX_COUNT;

proptest::proptest! {
    /// Every accepted configuration yields a frame that holds segment 0's
    /// extended read `[1, segment_len + 2)`.
    #[test]
    fn accepted_configs_hold_first_segment(
        transfers in 0usize..16,
        segment_len in 0usize..400,
        ring_capacity in 0usize..100,
        interval in 0u32..1000,
    ) {
        let config = CaptureConfig {
            transfers_per_frame: transfers,
            segment_len,
            ring_capacity,
            transfer_interval_us: interval,
        };
        if config.validate().is_ok() {
            let frame = config.frame_bytes().unwrap_or(0);
            proptest::prop_assert!(segment_len + 2 <= frame);
            proptest::prop_assert!(segment_len <= EASYDMA_MAX_COUNT);
            proptest::prop_assert!(ring_capacity >= 2);
        }
    }

    /// Validation never panics, whatever the input.
    #[test]
    fn validate_never_panics(
        transfers in proptest::num::usize::ANY,
        segment_len in proptest::num::usize::ANY,
        ring_capacity in proptest::num::usize::ANY,
        interval in proptest::num::u32::ANY,
    ) {
        let config = CaptureConfig {
            transfers_per_frame: transfers,
            segment_len,
            ring_capacity,
            transfer_interval_us: interval,
        };
        let _ = config.validate();
    }
}
