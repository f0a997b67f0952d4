use chrono::Datelike;
use once_cell::sync::Lazy;
use regex::Regex;

use crate::text_processing::char_prefix;

/// Only the head of the document is searched; references further down are
/// full of older years.
const YEAR_WINDOW_CHARS: usize = 2000;

/// Extract the publication year relative to the current local year.
pub fn extract_year(text: &str) -> Option<i32> {
    extract_year_with_current(text, chrono::Local::now().year())
}

/// Extract the most recent plausible year from the first 2000 characters.
///
/// Years are accepted when they fall in `[current_year - 50, current_year + 1]`.
pub fn extract_year_with_current(text: &str, current_year: i32) -> Option<i32> {
    static YEAR_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\b(19\d{2}|20[0-2]\d)\b").unwrap());

    let sample = char_prefix(text, YEAR_WINDOW_CHARS);
    let range = (current_year - 50)..=(current_year + 1);

    YEAR_RE
        .captures_iter(sample)
        .filter_map(|caps| caps.get(1)?.as_str().parse::<i32>().ok())
        .filter(|year| range.contains(year))
        .max()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_year_most_recent_wins() {
        assert_eq!(
            extract_year_with_current("Received 2010, published 2023.", 2026),
            Some(2023)
        );
    }

    #[test]
    fn test_year_out_of_window() {
        assert_eq!(extract_year_with_current("Founded in 1950", 2026), None);
        assert_eq!(extract_year_with_current("Founded in 1976", 2026), Some(1976));
        assert_eq!(extract_year_with_current("Founded in 1975", 2026), None);
    }

    #[test]
    fn test_year_allows_next_year() {
        assert_eq!(extract_year_with_current("Forthcoming 2027", 2026), Some(2027));
        assert_eq!(extract_year_with_current("Forthcoming 2028", 2026), None);
    }

    #[test]
    fn test_year_requires_word_boundary() {
        assert_eq!(extract_year_with_current("ID 120154 and 20231", 2026), None);
    }

    #[test]
    fn test_year_only_head_of_document() {
        let text = format!("{}2021", "a".repeat(2000));
        assert_eq!(extract_year_with_current(&text, 2026), None);
    }

    #[test]
    fn test_year_empty() {
        assert_eq!(extract_year(""), None);
    }

    #[test]
    fn test_year_result_always_in_window() {
        let current = chrono::Local::now().year();
        if let Some(y) = extract_year("1901 1999 2005 2019 2029") {
            assert!(y >= current - 50 && y <= current + 1);
        }
    }
}
