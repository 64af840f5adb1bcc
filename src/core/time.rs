// Millisecond timestamps, following the store's epoch-millis convention

use chrono::Utc;

/// Milliseconds since the Unix epoch.
pub type Millis = i64;

/// Fixed feed retention: 30 days of 24h, independent of calendar months.
pub const FEED_ITEM_TTL_MS: Millis = 30 * 24 * 60 * 60 * 1000;

/// Current time in milliseconds since Unix epoch
pub fn current_time_millis() -> Millis {
    Utc::now().timestamp_millis()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ttl_is_exactly_thirty_days() {
        assert_eq!(FEED_ITEM_TTL_MS, 2_592_000_000);
    }

    #[test]
    fn clock_is_after_2020() {
        assert!(current_time_millis() > 1_577_836_800_000);
    }
}
