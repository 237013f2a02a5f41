//! Millisecond-epoch conversions for API time ranges.
//!
//! The API wants milliseconds since the epoch; users think in local wall
//! time. `to_millis` derives from whole-second local time, so sub-second
//! input is truncated -- a documented lossy property. Nanosecond wire
//! fields are always `millis * 1_000_000`.

use chrono::{Local, NaiveDateTime, TimeZone};

/// Nanoseconds per millisecond, for the dataset nano fields.
pub const NANOS_PER_MILLI: i64 = 1_000_000;

/// Display format used by [`from_millis`]: `08/01/22 05:00:00.000`.
pub const DISPLAY_FORMAT: &str = "%m/%d/%y %H:%M:%S%.3f";

/// Convert a local wall-clock datetime to milliseconds since the epoch.
///
/// Sub-second precision is discarded. During a DST fold the earlier
/// mapping wins; a nonexistent local time falls back to its UTC reading.
pub fn to_millis(dt: NaiveDateTime) -> i64 {
    let secs = Local
        .from_local_datetime(&dt)
        .earliest()
        .map_or_else(|| dt.and_utc().timestamp(), |local| local.timestamp());
    secs * 1000
}

/// Render milliseconds since the epoch as a local display string
/// with millisecond precision.
pub fn from_millis(millis: i64) -> String {
    let secs = millis.div_euclid(1000);
    let sub_ms = millis.rem_euclid(1000);
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    let nanos = (sub_ms * NANOS_PER_MILLI) as u32;
    Local
        .timestamp_opt(secs, nanos)
        .earliest()
        .map_or_else(|| format!("{millis}ms"), |local| {
            local.format(DISPLAY_FORMAT).to_string()
        })
}

#[cfg(test)]
mod tests {
    use chrono::{NaiveDate, Timelike};

    use super::*;

    fn dt(y: i32, mo: u32, d: u32, h: u32, mi: u32, s: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(y, mo, d)
            .and_then(|date| date.and_hms_opt(h, mi, s))
            .expect("valid datetime")
    }

    #[test]
    fn to_millis_is_second_aligned() {
        let millis = to_millis(dt(2022, 8, 1, 5, 0, 0));
        assert_eq!(millis % 1000, 0);
    }

    #[test]
    fn to_millis_truncates_subsecond_input() {
        let base = dt(2022, 8, 1, 5, 0, 0);
        let with_nanos = base.with_nanosecond(999_000_000).expect("valid nanos");
        assert_eq!(to_millis(base), to_millis(with_nanos));
    }

    #[test]
    fn round_trips_through_display_string() {
        // to_millis(parse(from_millis(x))) == x for second-aligned x.
        for input in [
            dt(2022, 8, 1, 5, 0, 0),
            dt(2023, 1, 15, 23, 59, 59),
            dt(2026, 6, 30, 12, 34, 56),
        ] {
            let millis = to_millis(input);
            let display = from_millis(millis);
            let parsed = NaiveDateTime::parse_from_str(&display, DISPLAY_FORMAT)
                .expect("display string parses back");
            assert_eq!(to_millis(parsed), millis, "round-trip failed for {display}");
        }
    }

    #[test]
    fn ordering_is_preserved() {
        let early = to_millis(dt(2022, 8, 1, 5, 0, 0));
        let late = to_millis(dt(2022, 8, 1, 6, 0, 0));
        assert_eq!(late - early, 3_600_000);
    }
}
