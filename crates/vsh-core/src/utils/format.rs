//! Formatting helpers for sizes, durations, and numbers.

/// Format a byte count for display (e.g., "512B", "1.5K", "3.4M").
pub fn format_size(bytes: usize) -> String {
    if bytes >= 1_000_000 {
        format!("{:.1}M", bytes as f64 / 1_000_000.0)
    } else if bytes >= 1_000 {
        format!("{:.1}K", bytes as f64 / 1_000.0)
    } else {
        format!("{}B", bytes)
    }
}

/// Format a duration in milliseconds (e.g., "2h 5m 3s", "41s").
pub fn format_duration(ms: u64) -> String {
    let secs = ms / 1000;
    let (hours, minutes, seconds) = (secs / 3600, (secs % 3600) / 60, secs % 60);
    if hours > 0 {
        format!("{}h {}m {}s", hours, minutes, seconds)
    } else if minutes > 0 {
        format!("{}m {}s", minutes, seconds)
    } else {
        format!("{}s", seconds)
    }
}

/// Format a number the way a scripting console prints it.
///
/// Integral values print without a fraction; non-finite values print as
/// `Infinity`, `-Infinity` or `NaN`.
pub fn format_number(value: f64) -> String {
    if value.is_nan() {
        "NaN".to_string()
    } else if value.is_infinite() {
        if value > 0.0 { "Infinity" } else { "-Infinity" }.to_string()
    } else if value.fract() == 0.0 && value.abs() < 1e15 {
        // Avoid "-0"
        format!("{}", value as i64)
    } else {
        format!("{}", value)
    }
}

/// Space saved by compression as a rounded, non-negative percentage.
pub fn compression_ratio(original: usize, compressed: usize) -> u32 {
    if original == 0 || compressed >= original {
        return 0;
    }
    let saved = (original - compressed) as f64 / original as f64 * 100.0;
    saved.round() as u32
}

/// Cut `text` to `width` characters, ending with "..." when shortened.
pub fn truncate(text: &str, width: usize) -> String {
    if text.chars().count() <= width {
        return text.to_string();
    }
    let keep = width.saturating_sub(3);
    let mut out: String = text.chars().take(keep).collect();
    out.push_str("...");
    out
}
