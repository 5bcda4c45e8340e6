//! Shared utility helpers for command output and argument handling.

use chrono::{DateTime, Utc};
use std::time::Duration;

/// Timestamp format used in trash listings.
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Renders a UTC timestamp in the listing format.
pub fn format_timestamp(time: DateTime<Utc>) -> String {
    time.format(TIMESTAMP_FORMAT).to_string()
}

/// Human readable size rendering shared across commands.
pub fn print_size(bytes: u64) -> String {
    const SUFFIXES: [&str; 5] = ["B", "K", "M", "G", "T"];
    let mut value = bytes as f64;
    let mut idx = 0usize;

    while value >= 1024.0 && idx < SUFFIXES.len() - 1 {
        value /= 1024.0;
        idx += 1;
    }

    if idx == 0 {
        format!("{:.0} {}", value, SUFFIXES[idx])
    } else {
        format!("{:.1} {}", value, SUFFIXES[idx])
    }
}

/// Produces a human readable string from a duration.
pub fn format_duration(duration: Duration) -> String {
    let secs = duration.as_secs();
    let mins = secs / 60;
    let hours = mins / 60;
    let rem_secs = secs % 60;
    let rem_mins = mins % 60;

    if hours > 0 {
        format!("{hours}h {rem_mins:02}:{rem_secs:02}")
    } else if mins > 0 {
        format!("{mins}m {rem_secs:02}s")
    } else {
        format!("{secs}s")
    }
}

/// Longest prefix of `text` that fits in `max` bytes without splitting a character.
pub fn truncate_at_boundary(text: &str, max: usize) -> &str {
    if text.len() <= max {
        return text;
    }
    let mut end = max;
    while !text.is_char_boundary(end) {
        end -= 1;
    }
    &text[..end]
}

/// Splits `input` into its first whitespace-delimited word and the raw rest.
///
/// The rest keeps its inner spacing; only the separating whitespace is dropped.
pub fn split_first_word(input: &str) -> (&str, &str) {
    let input = input.trim_start();
    match input.find(char::is_whitespace) {
        Some(idx) => {
            let (word, rest) = input.split_at(idx);
            (word, &rest[1..])
        }
        None => (input, ""),
    }
}

/// Removes one layer of surrounding double quotes, if present.
pub fn strip_quotes(text: &str) -> &str {
    text.strip_prefix('"')
        .and_then(|inner| inner.strip_suffix('"'))
        .unwrap_or(text)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn truncation_respects_char_boundaries() {
        assert_eq!(truncate_at_boundary("hello", 10), "hello");
        assert_eq!(truncate_at_boundary("hello", 3), "hel");
        assert_eq!(truncate_at_boundary("héllo", 2), "h");
        assert_eq!(truncate_at_boundary("abc", 0), "");
    }

    #[test]
    fn split_keeps_inner_spacing() {
        assert_eq!(split_first_word("notes.txt  two  spaces"), ("notes.txt", " two  spaces"));
        assert_eq!(split_first_word("  single"), ("single", ""));
        assert_eq!(split_first_word(""), ("", ""));
    }

    #[test]
    fn quotes_are_stripped_once() {
        assert_eq!(strip_quotes("\"hello\""), "hello");
        assert_eq!(strip_quotes("\" world\""), " world");
        assert_eq!(strip_quotes("\"\"x\"\""), "\"x\"");
        assert_eq!(strip_quotes("\"open"), "\"open");
    }

    #[test]
    fn sizes_and_durations_render() {
        assert_eq!(print_size(512), "512 B");
        assert_eq!(print_size(2048), "2.0 K");
        assert_eq!(format_duration(Duration::from_secs(42)), "42s");
        assert_eq!(format_duration(Duration::from_secs(125)), "2m 05s");
        assert_eq!(format_duration(Duration::from_secs(3725)), "1h 02:05");
    }

    #[test]
    fn timestamps_use_listing_format() {
        let time = Utc.with_ymd_and_hms(2024, 3, 9, 7, 5, 1).unwrap();
        assert_eq!(format_timestamp(time), "2024-03-09 07:05:01");
    }
}
