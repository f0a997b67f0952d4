use once_cell::sync::Lazy;
use regex::Regex;

use crate::text_processing::{char_len, char_prefix, collapse_whitespace};

/// Headers that open an abstract, tried in this order.
pub const ABSTRACT_MARKERS: &[&str] = &[
    "abstract",
    "resumen",
    "resumo",
    "résumé",
    "summary",
    "síntesis",
];

/// Headers that open a keywords section, tried in this order.
pub const KEYWORD_MARKERS: &[&str] = &[
    "keywords",
    "palabras clave",
    "key words",
    "palabras-clave",
    "términos",
    "descriptores",
];

/// Headers that open the introduction.
pub const INTRODUCTION_MARKERS: &[&str] = &[
    "introduction",
    "introducción",
    "introdução",
    "1. introduction",
    "1 introduction",
];

const KEYWORD_WINDOW_CHARS: usize = 500;
const MAX_KEYWORDS: usize = 15;

fn bounded(markers: &[&str], suffix: &str) -> Vec<Regex> {
    markers
        .iter()
        .map(|m| Regex::new(&format!(r"(?i)\b{}\b{}", regex::escape(m), suffix)).unwrap())
        .collect()
}

/// Extract the abstract.
///
/// The abstract starts right after the first abstract header found (headers
/// are tried in [`ABSTRACT_MARKERS`] order) and ends at the nearest
/// following keywords or introduction header, or at the end of the text.
/// Whitespace is collapsed; results outside 51–1999 characters are rejected.
pub fn extract_abstract(text: &str) -> Option<String> {
    static START_RES: Lazy<Vec<Regex>> = Lazy::new(|| bounded(ABSTRACT_MARKERS, ""));
    static END_RES: Lazy<Vec<Regex>> = Lazy::new(|| {
        let mut res = bounded(KEYWORD_MARKERS, "");
        res.extend(bounded(INTRODUCTION_MARKERS, ""));
        res
    });

    if text.is_empty() {
        return None;
    }

    let start = START_RES.iter().find_map(|re| re.find(text))?.end();
    let rest = &text[start..];

    let end = END_RES
        .iter()
        .filter_map(|re| re.find(rest))
        .map(|m| m.start())
        .min()
        .unwrap_or(rest.len());

    let abstract_text = collapse_whitespace(rest[..end].trim());
    let len = char_len(&abstract_text);
    if len > 50 && len < 2000 {
        Some(abstract_text)
    } else {
        tracing::debug!(len, "abstract candidate rejected by length");
        None
    }
}

/// Extract the keyword list that follows a keywords header.
///
/// Up to 500 characters after the header are read, cut at the first
/// sentence end followed by a newline or at a blank line, then split on
/// commas, semicolons, bullets and newlines.
pub fn extract_keywords(text: &str) -> Vec<String> {
    static START_RES: Lazy<Vec<Regex>> = Lazy::new(|| bounded(KEYWORD_MARKERS, r"[:\s]*"));
    static END_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\.\s*\n|\n\n").unwrap());
    static SPLIT_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"[,;•\n]").unwrap());

    if text.is_empty() {
        return Vec::new();
    }

    let Some(start) = START_RES.iter().find_map(|re| re.find(text)).map(|m| m.end()) else {
        return Vec::new();
    };

    let window = char_prefix(&text[start..], KEYWORD_WINDOW_CHARS);
    let window = match END_RE.find(window) {
        Some(m) => &window[..m.start()],
        None => window,
    };

    SPLIT_RE
        .split(window)
        .map(str::trim)
        .filter(|kw| char_len(kw) > 2)
        .map(|kw| kw.trim_matches('.').trim())
        .filter(|kw| !kw.is_empty())
        .map(str::to_string)
        .take(MAX_KEYWORDS)
        .collect()
}
