//! Formatting helpers for sizes, durations and titles.

use crate::config;

/// Formats a byte count into a human-readable size ("14.2 MB").
/// Returns `None` for zero/unknown sizes so callers can substitute a
/// localized "unknown" label.
pub fn format_file_size(size_bytes: u64) -> Option<String> {
    if size_bytes == 0 {
        return None;
    }
    let size = size_bytes as f64;
    let formatted = if size < 1024.0 {
        format!("{size:.0} B")
    } else if size < 1024.0 * 1024.0 {
        format!("{:.1} KB", size / 1024.0)
    } else if size < 1024.0 * 1024.0 * 1024.0 {
        format!("{:.1} MB", size / (1024.0 * 1024.0))
    } else {
        format!("{:.2} GB", size / (1024.0 * 1024.0 * 1024.0))
    };
    Some(formatted)
}

/// Formats a duration in seconds as MM:SS, or HH:MM:SS for longer media.
pub fn format_duration(seconds: u64) -> String {
    let hours = seconds / 3600;
    let minutes = (seconds % 3600) / 60;
    let secs = seconds % 60;
    if hours > 0 {
        format!("{hours:02}:{minutes:02}:{secs:02}")
    } else {
        format!("{minutes:02}:{secs:02}")
    }
}

/// Formats a view count compactly ("1.2M").
pub fn format_views(views: u64) -> String {
    if views >= 1_000_000_000 {
        format!("{:.1}B", views as f64 / 1e9)
    } else if views >= 1_000_000 {
        format!("{:.1}M", views as f64 / 1e6)
    } else if views >= 1_000 {
        format!("{:.1}K", views as f64 / 1e3)
    } else {
        views.to_string()
    }
}

/// Formats a YYYYMMDD upload date as DD/MM/YYYY; passes anything else
/// through unchanged.
pub fn format_upload_date(date: &str) -> String {
    if date.len() == 8 && date.chars().all(|c| c.is_ascii_digit()) {
        format!("{}/{}/{}", &date[6..8], &date[4..6], &date[0..4])
    } else {
        date.to_string()
    }
}

/// Truncates an over-long title for display, appending an ellipsis.
pub fn truncate_title(title: &str) -> String {
    let max = config::validation::MAX_TITLE_LENGTH;
    let chars: Vec<char> = title.chars().collect();
    if chars.len() > max {
        let mut out: String = chars[..max - 3].iter().collect();
        out.push_str("...");
        out
    } else {
        title.to_string()
    }
}
