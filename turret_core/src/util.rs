//! Loop period and file-name timestamp helpers.

use chrono::{DateTime, Local};

/// Number of microseconds in one second.
pub const MICROS_PER_SEC: u64 = 1_000_000;

/// Compute the loop period in microseconds for a given rate in Hz.
/// - Clamps `hz` to at least 1 to avoid division by zero.
/// - Ensures result is at least 1 microsecond.
#[inline]
pub fn period_us(hz: u32) -> u64 {
    (MICROS_PER_SEC / u64::from(hz.max(1))).max(1)
}

/// Timestamp fragment used in capture and log file names, e.g. `2026-10-18-141503`.
pub fn file_stamp(ts: &DateTime<Local>) -> String {
    ts.format("%Y-%m-%d-%H%M%S").to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn periods_clamp_zero_rate() {
        assert_eq!(period_us(0), 1_000_000);
        assert_eq!(period_us(30), 33_333);
    }

    #[test]
    fn file_stamp_format() {
        let ts = Local.with_ymd_and_hms(2026, 3, 7, 9, 5, 1).single().unwrap();
        assert_eq!(file_stamp(&ts), "2026-03-07-090501");
    }
}
