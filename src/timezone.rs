use chrono::{DateTime, Duration, LocalResult, NaiveDateTime, TimeZone};
use chrono_tz::Tz;

/// Wall-clock timestamp format used by the event log
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Attach `tz` to a wall-clock time.
///
/// Ambiguous times (DST fall-back) resolve to the earlier instant. Times inside
/// a DST gap move forward by the gap's hour.
pub fn localize(tz: Tz, naive: NaiveDateTime) -> DateTime<Tz> {
    match tz.from_local_datetime(&naive) {
        LocalResult::Single(dt) => dt,
        LocalResult::Ambiguous(earliest, _) => earliest,
        LocalResult::None => tz
            .from_local_datetime(&(naive + Duration::hours(1)))
            .earliest()
            .unwrap_or_else(|| tz.from_utc_datetime(&naive)),
    }
}

/// Reinterpret a wall-clock time from one timezone in another
pub fn convert(naive: NaiveDateTime, from: Tz, to: Tz) -> NaiveDateTime {
    localize(from, naive).with_timezone(&to).naive_local()
}
