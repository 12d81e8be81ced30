//! Human-readable metrics formatting.

/// Format accumulated seconds as `"{h}h {m}m {s}s"`.
///
/// Hours appear only when non-zero; minutes appear when non-zero or when
/// hours are shown. Seconds are always present.
pub fn format_time_saved(seconds: u64) -> String {
    let hours = seconds / 3600;
    let minutes = (seconds % 3600) / 60;
    let remaining = seconds % 60;

    let mut formatted = String::new();
    if hours > 0 {
        formatted.push_str(&format!("{}h ", hours));
    }
    if minutes > 0 || hours > 0 {
        formatted.push_str(&format!("{}m ", minutes));
    }
    formatted.push_str(&format!("{}s", remaining));
    formatted
}
