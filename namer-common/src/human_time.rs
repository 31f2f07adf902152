//! Human-readable duration formatting
//!
//! Scene and file durations are whole seconds. Display uses `M:SS` below one
//! hour and `H:MM:SS` from one hour up, so TPDB and file durations line up
//! when shown next to each other.

const SECONDS_PER_MINUTE: u64 = 60;
const SECONDS_PER_HOUR: u64 = 3600;

/// Placeholder shown for an unknown duration
pub const UNKNOWN_DURATION: &str = "n/a";

/// Format whole seconds as `M:SS` or `H:MM:SS`
///
/// # Examples
///
/// ```
/// use namer_common::human_time::format_duration;
///
/// assert_eq!(format_duration(45), "0:45");
/// assert_eq!(format_duration(1800), "30:00");
/// assert_eq!(format_duration(3661), "1:01:01");
/// ```
pub fn format_duration(seconds: u64) -> String {
    let hours = seconds / SECONDS_PER_HOUR;
    let mins = (seconds % SECONDS_PER_HOUR) / SECONDS_PER_MINUTE;
    let secs = seconds % SECONDS_PER_MINUTE;

    if hours > 0 {
        format!("{}:{:02}:{:02}", hours, mins, secs)
    } else {
        format!("{}:{:02}", mins, secs)
    }
}

/// Format an optional duration, using [`UNKNOWN_DURATION`] for `None`
///
/// ```
/// use namer_common::human_time::format_duration_opt;
///
/// assert_eq!(format_duration_opt(Some(1820)), "30:20");
/// assert_eq!(format_duration_opt(None), "n/a");
/// ```
pub fn format_duration_opt(seconds: Option<u64>) -> String {
    match seconds {
        Some(seconds) => format_duration(seconds),
        None => UNKNOWN_DURATION.to_string(),
    }
}

/// Signed difference `actual - reference`, e.g. `+0:20` or `-1:05`
///
/// Returns `None` unless both sides are known.
///
/// ```
/// use namer_common::human_time::format_duration_delta;
///
/// assert_eq!(format_duration_delta(Some(1820), Some(1800)).as_deref(), Some("+0:20"));
/// assert_eq!(format_duration_delta(Some(1735), Some(1800)).as_deref(), Some("-1:05"));
/// assert_eq!(format_duration_delta(None, Some(1800)), None);
/// ```
pub fn format_duration_delta(actual: Option<u64>, reference: Option<u64>) -> Option<String> {
    let (actual, reference) = (actual?, reference?);
    let (sign, magnitude) = if actual >= reference {
        ('+', actual - reference)
    } else {
        ('-', reference - actual)
    };
    Some(format!("{}{}", sign, format_duration(magnitude)))
}
