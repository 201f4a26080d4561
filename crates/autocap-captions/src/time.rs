//! Time unit conversions and subtitle timestamp formatting.

/// Round to millisecond precision (3 decimals).
pub fn round3(value: f64) -> f64 {
    (value * 1000.0).round() / 1000.0
}

/// Milliseconds to seconds, rounded to 3 decimals and clamped at zero.
pub fn ms_to_seconds(ms: f64) -> f64 {
    round3(ms / 1000.0).max(0.0)
}

/// Seconds to the nearest whole millisecond, clamped at zero.
pub fn seconds_to_ms(seconds: f64) -> i64 {
    (seconds * 1000.0).round().max(0.0) as i64
}

/// Latest representable subtitle time, `99:59:59.999`.
pub const MAX_TIMESTAMP_SECONDS: f64 = 359_999.999;

fn clamp_timestamp(seconds: f64) -> f64 {
    if seconds.is_nan() {
        return 0.0;
    }
    seconds.clamp(0.0, MAX_TIMESTAMP_SECONDS)
}

/// Seconds to ASS centisecond ticks, clamped to the subtitle time range.
pub fn seconds_to_centis(seconds: f64) -> i64 {
    (clamp_timestamp(seconds) * 100.0).round() as i64
}

/// Seconds to SRT millisecond ticks, clamped to the subtitle time range.
/// Truncates, with a small epsilon so that values like `1.001` survive
/// binary float representation.
pub fn seconds_to_srt_ms(seconds: f64) -> i64 {
    (clamp_timestamp(seconds) * 1000.0 + 1e-6).floor() as i64
}

/// `h:mm:ss.cc`
pub fn format_ass_timestamp(centis: i64) -> String {
    let total = centis.max(0);
    let cs = total % 100;
    let total_seconds = total / 100;
    let seconds = total_seconds % 60;
    let total_minutes = total_seconds / 60;
    let minutes = total_minutes % 60;
    let hours = total_minutes / 60;
    format!("{hours}:{minutes:02}:{seconds:02}.{cs:02}")
}

/// `HH:MM:SS,mmm`
pub fn format_srt_timestamp(ms: i64) -> String {
    let ms = ms.max(0);
    let milli = ms % 1000;
    let total_seconds = ms / 1000;
    let seconds = total_seconds % 60;
    let total_minutes = total_seconds / 60;
    let minutes = total_minutes % 60;
    let hours = total_minutes / 60;
    format!("{hours:02}:{minutes:02}:{seconds:02},{milli:03}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ms_conversions() {
        assert_eq!(ms_to_seconds(1234.0), 1.234);
        assert_eq!(ms_to_seconds(1234.6), 1.235);
        assert_eq!(ms_to_seconds(-50.0), 0.0);
        assert_eq!(seconds_to_ms(1.2346), 1235);
        assert_eq!(seconds_to_ms(-1.0), 0);
    }

    #[test]
    fn test_ass_timestamp() {
        assert_eq!(format_ass_timestamp(0), "0:00:00.00");
        assert_eq!(format_ass_timestamp(seconds_to_centis(61.239)), "0:01:01.24");
        assert_eq!(format_ass_timestamp(seconds_to_centis(3725.5)), "1:02:05.50");
    }

    #[test]
    fn test_srt_timestamp_truncates() {
        assert_eq!(format_srt_timestamp(seconds_to_srt_ms(1.0019)), "00:00:01,001");
        assert_eq!(format_srt_timestamp(seconds_to_srt_ms(1.001)), "00:00:01,001");
        assert_eq!(format_srt_timestamp(seconds_to_srt_ms(3661.5)), "01:01:01,500");
    }

    #[test]
    fn test_out_of_range_times_are_clamped() {
        assert_eq!(seconds_to_centis(1e300), 36_000_000);
        assert_eq!(seconds_to_centis(f64::NAN), 0);
        assert_eq!(seconds_to_centis(-3.0), 0);
        let last = seconds_to_srt_ms(f64::INFINITY);
        assert!(last < 360_000_000);
        assert!(format_srt_timestamp(last).starts_with("99:59:59,99"));
    }
}
