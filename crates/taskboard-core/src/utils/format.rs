/// Truncate a string to a maximum length, adding ellipsis if needed
pub fn truncate_string(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else if max_len <= 3 {
        s.chars().take(max_len).collect()
    } else {
        let truncated: String = s.chars().take(max_len - 3).collect();
        format!("{}...", truncated)
    }
}

/// Format a timestamp from the backend for display
pub fn format_date(date: &str) -> String {
    if let Ok(dt) = chrono::DateTime::parse_from_rfc3339(date) {
        dt.format("%b %d, %Y").to_string()
    } else if let Ok(dt) = chrono::NaiveDateTime::parse_from_str(date, "%Y-%m-%dT%H:%M:%S%.f") {
        dt.format("%b %d, %Y").to_string()
    } else if date.len() >= 10 && date.is_char_boundary(10) {
        date[..10].to_string()
    } else {
        date.to_string()
    }
}

/// "1 task", "3 tasks"
pub fn pluralize(count: u64, noun: &str) -> String {
    if count == 1 {
        format!("{} {}", count, noun)
    } else {
        format!("{} {}s", count, noun)
    }
}
