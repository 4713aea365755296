//! Display formatting helpers for watch entries.

/// `h:mm:ss` when an hour or more, `m:ss` otherwise, `0m` for nothing.
pub fn format_time(seconds: f64) -> String {
    if seconds.is_nan() || seconds <= 0.0 {
        return "0m".into();
    }
    let total = seconds.floor() as u64;
    let h = total / 3600;
    let m = (total % 3600) / 60;
    let s = total % 60;
    if h > 0 {
        format!("{h}:{m:02}:{s:02}")
    } else {
        format!("{m}:{s:02}")
    }
}

/// Watched fraction as a percentage; 0 when the duration is unknown.
pub fn progress_percent(timestamp: f64, duration: f64) -> f64 {
    if duration > 0.0 {
        timestamp / duration * 100.0
    } else {
        0.0
    }
}

/// Hostname without a leading `www.`.
pub fn display_hostname(hostname: &str) -> &str {
    hostname.strip_prefix("www.").unwrap_or(hostname)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_time() {
        assert_eq!(format_time(0.0), "0m");
        assert_eq!(format_time(f64::NAN), "0m");
        assert_eq!(format_time(5.9), "0:05");
        assert_eq!(format_time(754.0), "12:34");
        assert_eq!(format_time(3600.0), "1:00:00");
        assert_eq!(format_time(3725.0), "1:02:05");
    }

    #[test]
    fn test_progress_percent() {
        assert_eq!(progress_percent(30.0, 0.0), 0.0);
        assert_eq!(progress_percent(30.0, 120.0), 25.0);
    }

    #[test]
    fn test_display_hostname() {
        assert_eq!(display_hostname("www.netflix.com"), "netflix.com");
        assert_eq!(display_hostname("tv.example.com"), "tv.example.com");
    }
}
