use chrono::TimeDelta;

/// Maximum number of characters kept from a title in a file name
const MAX_FILENAME_COMPONENT_CHARS: usize = 120;

/// Characters that are not allowed in file names on at least one supported platform
const FORBIDDEN_FILENAME_CHARS: &[char] = &['/', '\\', ':', '*', '?', '"', '<', '>', '|'];

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

/// Turn arbitrary text into a single, portable path component.
///
/// Separators, reserved and control characters become `_`, runs of whitespace
/// collapse to one space, leading/trailing dots and spaces are dropped (so the
/// result can never be `.` or `..`), and the result is capped in length.
/// Empty input yields `untitled`.
pub fn sanitize_filename_component(s: &str) -> String {
    let replaced: String = s
        .chars()
        .map(|c| {
            if c.is_control() || FORBIDDEN_FILENAME_CHARS.contains(&c) {
                '_'
            } else {
                c
            }
        })
        .collect();

    let collapsed = replaced.split_whitespace().collect::<Vec<_>>().join(" ");
    let capped: String = collapsed
        .trim_matches(|c| c == '.' || c == ' ')
        .chars()
        .take(MAX_FILENAME_COMPONENT_CHARS)
        .collect();
    let cleaned = capped.trim_end_matches(|c| c == '.' || c == ' ');

    if cleaned.is_empty() {
        "untitled".to_string()
    } else {
        cleaned.to_string()
    }
}

fn plural(count: i64, unit: &str) -> String {
    if count == 1 {
        format!("1 {}", unit)
    } else {
        format!("{} {}s", count, unit)
    }
}

/// Human readable time until a deadline, e.g. "in 9 minutes"
pub fn format_remaining(remaining: TimeDelta) -> String {
    let seconds = remaining.num_seconds();
    if seconds <= 0 {
        return "now".to_string();
    }
    if seconds < 60 {
        return format!("in {}", plural(seconds, "second"));
    }

    let minutes = seconds / 60;
    if minutes < 60 {
        // Round up: 8m 30s+ becomes 9 minutes
        let rounded = if seconds % 60 >= 30 { minutes + 1 } else { minutes };
        return format!("in {}", plural(rounded, "minute"));
    }

    let hours = minutes / 60;
    let rounded = if minutes % 60 >= 30 { hours + 1 } else { hours };
    format!("in {}", plural(rounded, "hour"))
}
