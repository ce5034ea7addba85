//! Day-boundary arithmetic for forecast dates.
//!
//! Stored dates are epoch milliseconds truncated to a UTC day boundary, so a
//! day of forecast data has a stable join key regardless of the local clock.

use chrono::{DateTime, FixedOffset};

/// Length of one day in milliseconds. Day `i` of a forecast is
/// `start + i * DAY_MILLIS`.
pub const DAY_MILLIS: i64 = 24 * 60 * 60 * 1000;

/// Truncates a timestamp to the most recent day boundary.
///
/// Idempotent, and the result is never later than the input. Uses euclidean
/// remainder so pre-epoch timestamps truncate downward as well.
pub fn normalize_to_start_of_day(timestamp_ms: i64) -> i64 {
    timestamp_ms - timestamp_ms.rem_euclid(DAY_MILLIS)
}

/// Shifts a UTC instant by the local-minus-UTC offset, yielding a timestamp
/// whose UTC day boundary matches the local calendar day. Handles negative
/// and sub-hour offsets.
pub fn local_to_utc_day_boundary(timestamp_ms: i64, offset_ms: i64) -> i64 {
    normalize_to_start_of_day(timestamp_ms + offset_ms)
}

/// Start of the local calendar day containing `reference_now`, expressed as a
/// normalized UTC timestamp. This is the date assigned to day 0 of a parsed
/// forecast.
pub fn day_start(reference_now: DateTime<FixedOffset>) -> i64 {
    let offset_ms = i64::from(reference_now.offset().local_minus_utc()) * 1000;
    local_to_utc_day_boundary(reference_now.timestamp_millis(), offset_ms)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn normalize_is_idempotent() {
        let ts = 1_700_000_123_456;
        let once = normalize_to_start_of_day(ts);
        assert_eq!(once, normalize_to_start_of_day(once));
    }

    #[test]
    fn normalize_never_exceeds_input() {
        for ts in [0, 1, DAY_MILLIS - 1, DAY_MILLIS, 1_700_000_123_456] {
            assert!(normalize_to_start_of_day(ts) <= ts);
        }
    }

    #[test]
    fn normalize_handles_pre_epoch_timestamps() {
        // 1969-12-31T23:59:59 truncates to the start of 1969-12-31.
        assert_eq!(normalize_to_start_of_day(-1_000), -DAY_MILLIS);
        assert_eq!(normalize_to_start_of_day(-DAY_MILLIS), -DAY_MILLIS);
    }

    #[test]
    fn negative_offset_can_shift_to_previous_day() {
        // 01:00 UTC at UTC-05:00 is still the previous local day.
        let one_am_utc = DAY_MILLIS + 60 * 60 * 1000;
        let offset = -5 * 60 * 60 * 1000;
        assert_eq!(local_to_utc_day_boundary(one_am_utc, offset), 0);
    }

    #[test]
    fn sub_hour_offset_is_respected() {
        // 18:30 UTC at UTC+05:45 (Kathmandu) is already the next local day
        // at 00:15.
        let ts = 18 * 60 * 60 * 1000 + 30 * 60 * 1000;
        let offset = (5 * 60 + 45) * 60 * 1000;
        assert_eq!(local_to_utc_day_boundary(ts, offset), DAY_MILLIS);
    }

    #[test]
    fn day_start_uses_the_zone_offset() {
        let zone = FixedOffset::east_opt(2 * 3600).unwrap();
        let now = zone.with_ymd_and_hms(2023, 11, 14, 23, 30, 0).unwrap();
        let start = day_start(now);

        assert_eq!(start % DAY_MILLIS, 0);
        // 23:30 at UTC+2 is 21:30 UTC; the local day is Nov 14.
        let expected = zone
            .with_ymd_and_hms(2023, 11, 14, 0, 0, 0)
            .unwrap()
            .timestamp_millis()
            + 2 * 3600 * 1000;
        assert_eq!(start, expected);
    }
}
