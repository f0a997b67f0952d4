use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::HashSet;

use crate::text_processing::char_prefix;

const EMAIL_WINDOW_CHARS: usize = 3000;
const MAX_EMAILS: usize = 10;

/// Extract a DOI from anywhere in the text.
///
/// Handles formats like:
/// - `10.1234/example`
/// - `doi:10.1234/example`
/// - `https://doi.org/10.1234/example`
/// - `http://dx.doi.org/10.1234/example`
///
/// Trailing punctuation picked up from the surrounding sentence is stripped.
pub fn extract_doi(text: &str) -> Option<String> {
    static DOI_RE: Lazy<Regex> = Lazy::new(|| {
        Regex::new(r"(?i)(?:doi[:\s]*|https?://(?:dx\.)?doi\.org/)?(10\.\d{4,}/[^\s]+)").unwrap()
    });

    let caps = DOI_RE.captures(text)?;
    let doi = caps
        .get(1)?
        .as_str()
        .trim_end_matches(['.', ',', ';', ':', ')', ']', '}', ' ']);
    if doi.is_empty() {
        return None;
    }
    Some(doi.to_string())
}

/// Extract an ISSN and normalize it to `XXXX-XXXX`.
///
/// A whitespace separator becomes a hyphen, a missing separator is inserted,
/// and a lower-case check digit `x` is upper-cased.
pub fn extract_issn(text: &str) -> Option<String> {
    static ISSN_RE: Lazy<Regex> =
        Lazy::new(|| Regex::new(r"(?i)ISSN[:\s]*(\d{4}[-\s]?\d{3}[\dXx])").unwrap());

    let caps = ISSN_RE.captures(text)?;
    let raw = caps.get(1)?.as_str();

    let mut issn: String = raw
        .chars()
        .map(|c| if c.is_whitespace() { '-' } else { c })
        .collect::<String>()
        .to_uppercase();
    if !issn.contains('-') && issn.len() == 8 {
        issn.insert(4, '-');
    }
    Some(issn)
}

/// Extract contact emails from the author block (first 3000 characters).
///
/// Addresses are lower-cased, placeholder domains are dropped, and
/// duplicates are removed keeping the first occurrence.
pub fn extract_emails(text: &str) -> Vec<String> {
    static EMAIL_RE: Lazy<Regex> = Lazy::new(|| {
        Regex::new(r"\b[A-Za-z0-9._%+-]+@[A-Za-z0-9.-]+\.[A-Za-z]{2,}\b").unwrap()
    });
    const PLACEHOLDERS: &[&str] = &["example.com", "test.com", "mailto"];

    let sample = char_prefix(text, EMAIL_WINDOW_CHARS);
    let mut seen = HashSet::new();

    EMAIL_RE
        .find_iter(sample)
        .map(|m| m.as_str().to_lowercase())
        .filter(|email| !PLACEHOLDERS.iter().any(|bad| email.contains(bad)))
        .filter(|email| seen.insert(email.clone()))
        .take(MAX_EMAILS)
        .collect()
}
