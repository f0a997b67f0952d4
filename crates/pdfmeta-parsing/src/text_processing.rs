use once_cell::sync::Lazy;
use regex::Regex;

/// The first `max_chars` characters of `text`, never splitting a codepoint.
pub fn char_prefix(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}

/// Length in characters rather than bytes.
pub fn char_len(text: &str) -> usize {
    text.chars().count()
}

/// True when the text has at least one cased character and no lower-case
/// ones, so "DEEP LEARNING 2.0" counts but "1234 5678" does not.
pub fn is_all_caps(text: &str) -> bool {
    let mut cased = false;
    for c in text.chars() {
        if c.is_lowercase() {
            return false;
        }
        if c.is_uppercase() {
            cased = true;
        }
    }
    cased
}

pub fn has_uppercase(text: &str) -> bool {
    text.chars().any(char::is_uppercase)
}

/// Collapse every run of whitespace (including newlines) to a single space.
pub fn collapse_whitespace(text: &str) -> String {
    static WS_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").unwrap());
    WS_RE.replace_all(text, " ").into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_char_prefix_multibyte() {
        assert_eq!(char_prefix("résumé", 2), "ré");
        assert_eq!(char_prefix("abc", 10), "abc");
        assert_eq!(char_prefix("", 3), "");
    }

    #[test]
    fn test_is_all_caps() {
        assert!(is_all_caps("DEEP LEARNING FOR PDFS"));
        assert!(is_all_caps("ÁRBOLES Y GRAFOS 2.0"));
        assert!(!is_all_caps("Deep Learning"));
        assert!(!is_all_caps("1234 5678"));
        assert!(!is_all_caps(""));
    }

    #[test]
    fn test_collapse_whitespace() {
        assert_eq!(collapse_whitespace("a \n\n b\t c"), "a b c");
    }
}
