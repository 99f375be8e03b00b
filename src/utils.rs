use chrono::{DateTime, Utc};

/// Convert fractional epoch seconds from the export into a UTC timestamp.
///
/// Missing or out-of-range values map to the epoch so the timestamp never
/// blocks an export; it only degrades the filename prefix.
pub fn datetime_from_epoch(secs: Option<f64>) -> DateTime<Utc> {
    secs.and_then(|s| {
        let whole = s.trunc() as i64;
        let nanos = (s.fract().abs() * 1e9) as u32;
        DateTime::from_timestamp(whole, nanos)
    })
    .unwrap_or(DateTime::UNIX_EPOCH)
}

/// Filename prefix rendering of a timestamp, sortable and filesystem-safe.
pub fn timestamp_stem(dt: DateTime<Utc>) -> String {
    dt.format("%Y-%m-%d_%H%M%S").to_string()
}
