use chrono::{DateTime, Duration as ChronoDuration, NaiveDate, NaiveDateTime, Utc};
use std::time::SystemTime;

// 1601-01-01 00:00:00 is a valid date, so the panics below are never reached.
const WINDOWS_EPOCH_NAIVE: NaiveDateTime = match NaiveDate::from_ymd_opt(1601, 1, 1) {
    Some(date) => match date.and_hms_opt(0, 0, 0) {
        Some(datetime) => datetime,
        None => panic!("Invalid time component for Windows epoch constant"),
    },
    None => panic!("Invalid date component for Windows epoch constant"),
};
const WINDOWS_EPOCH_UTC: DateTime<Utc> =
    DateTime::<Utc>::from_naive_utc_and_offset(WINDOWS_EPOCH_NAIVE, Utc);

/// Converts the two halves of a Windows FILETIME (100-nanosecond intervals since
/// 1601-01-01 UTC) to a `SystemTime`.
///
/// A zero FILETIME means the filesystem does not record that timestamp and yields `None`.
#[cfg_attr(not(windows), allow(dead_code))]
pub(crate) fn filetime_to_systemtime(low: u32, high: u32) -> Option<SystemTime> {
    let intervals = (u64::from(high) << 32) | u64::from(low);
    if intervals == 0 {
        return None;
    }

    let secs = (intervals / 10_000_000) as i64;
    let nanos = ((intervals % 10_000_000) * 100) as i64;
    let since_epoch = ChronoDuration::seconds(secs) + ChronoDuration::nanoseconds(nanos);

    WINDOWS_EPOCH_UTC
        .checked_add_signed(since_epoch)
        .map(SystemTime::from)
}
