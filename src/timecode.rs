//! Conversions from seconds to the three textual timestamp encodings.
//!
//! Milliseconds are floored, never rounded. Negative and non-finite inputs
//! are clamped to zero.

const MS_PER_SECOND: u64 = 1_000;
const MS_PER_MINUTE: u64 = 60 * MS_PER_SECOND;
const MS_PER_HOUR: u64 = 60 * MS_PER_MINUTE;

/// Tolerance (in milliseconds) absorbing binary representation error, so that
/// `59.999` floors to 59999 ms rather than 59998 ms.
const MS_EPSILON: f64 = 1e-6;

struct Parts {
    hours: u64,
    minutes: u64,
    seconds: u64,
    millis: u64,
}

fn split(seconds: f64) -> Parts {
    let seconds = if seconds.is_finite() { seconds.max(0.0) } else { 0.0 };
    let total_ms = (seconds * MS_PER_SECOND as f64 + MS_EPSILON).floor() as u64;

    Parts {
        hours: total_ms / MS_PER_HOUR,
        minutes: (total_ms % MS_PER_HOUR) / MS_PER_MINUTE,
        seconds: (total_ms % MS_PER_MINUTE) / MS_PER_SECOND,
        millis: total_ms % MS_PER_SECOND,
    }
}

/// `MM:SS.mmm` below one hour, `HH:MM:SS.mmm` from one hour on.
pub fn to_short(seconds: f64) -> String {
    let p = split(seconds);
    if p.hours > 0 {
        format!(
            "{:02}:{:02}:{:02}.{:03}",
            p.hours, p.minutes, p.seconds, p.millis
        )
    } else {
        format!("{:02}:{:02}.{:03}", p.minutes, p.seconds, p.millis)
    }
}

/// SubRip timestamp, `HH:MM:SS,mmm`. Hours are not capped.
pub fn to_srt(seconds: f64) -> String {
    let p = split(seconds);
    format!(
        "{:02}:{:02}:{:02},{:03}",
        p.hours, p.minutes, p.seconds, p.millis
    )
}

/// WebVTT timestamp, `HH:MM:SS.mmm`.
pub fn to_vtt(seconds: f64) -> String {
    let p = split(seconds);
    format!(
        "{:02}:{:02}:{:02}.{:03}",
        p.hours, p.minutes, p.seconds, p.millis
    )
}
