//! Human-readable formatting for counts, durations, and ratios.

/// Compress a large count into a short display string (`1.2M`, `3.4K`).
pub fn format_count(n: i64) -> String {
    if n <= 0 {
        return "0".to_string();
    }
    let n = n as f64;
    if n >= 1e9 {
        format!("{:.1}B", n / 1e9)
    } else if n >= 1e6 {
        format!("{:.1}M", n / 1e6)
    } else if n >= 1e3 {
        format!("{:.1}K", n / 1e3)
    } else {
        format!("{n:.0}")
    }
}

/// Format whole seconds as `MM:SS`, or `HH:MM:SS` for durations of an hour
/// or more. Negative values render as `00:00`.
pub fn format_duration(seconds: i64) -> String {
    if seconds <= 0 {
        return "00:00".to_string();
    }
    let hours = seconds / 3600;
    let minutes = (seconds % 3600) / 60;
    let secs = seconds % 60;
    if hours > 0 {
        format!("{hours:02}:{minutes:02}:{secs:02}")
    } else {
        format!("{minutes:02}:{secs:02}")
    }
}

/// Format a 0..1 ratio as a percentage with two decimals.
pub fn format_percent(ratio: f64) -> String {
    format!("{:.2}%", ratio * 100.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn count_suffixes() {
        assert_eq!(format_count(0), "0");
        assert_eq!(format_count(-5), "0");
        assert_eq!(format_count(999), "999");
        assert_eq!(format_count(1_000), "1.0K");
        assert_eq!(format_count(1_250_000), "1.3M");
        assert_eq!(format_count(2_000_000_000), "2.0B");
    }

    #[test]
    fn duration_rollover() {
        assert_eq!(format_duration(0), "00:00");
        assert_eq!(format_duration(-3), "00:00");
        assert_eq!(format_duration(59), "00:59");
        assert_eq!(format_duration(61), "01:01");
        assert_eq!(format_duration(3661), "01:01:01");
    }

    #[test]
    fn percent_rendering() {
        assert_eq!(format_percent(0.0), "0.00%");
        assert_eq!(format_percent(0.1234), "12.34%");
        assert_eq!(format_percent(1.0), "100.00%");
    }
}
