use std::cmp::Reverse;

use crate::text_processing::{char_len, is_all_caps};

/// Lines containing any of these (case-insensitive) are journal furniture,
/// not titles.
const TITLE_DENYLIST: &[&str] = &["issn", "volume", "journal", "revista", "doi"];

/// Extract the article title from the first lines of the document.
///
/// Candidates are lines of 10–200 characters among the first 20 that are
/// either fully upper-case or longer than 30 characters. The earliest
/// candidate wins, ties broken by length. When nothing qualifies, the first
/// line over 20 characters among the first 10 that does not look like a URL
/// or DOI is used instead.
pub fn extract_title(text: &str) -> Option<String> {
    if text.is_empty() {
        return None;
    }

    let lines: Vec<&str> = text.split('\n').collect();

    let best = lines
        .iter()
        .take(20)
        .enumerate()
        .map(|(i, line)| (i, line.trim()))
        .filter(|(_, line)| {
            let len = char_len(line);
            (10..=200).contains(&len)
        })
        .filter(|(_, line)| {
            let lower = line.to_lowercase();
            !TITLE_DENYLIST.iter().any(|kw| lower.contains(kw))
        })
        .filter(|(_, line)| is_all_caps(line) || char_len(line) > 30)
        .min_by_key(|(i, line)| (*i, Reverse(char_len(line))));

    if let Some((_, line)) = best {
        return Some(line.to_string());
    }

    lines
        .iter()
        .take(10)
        .map(|line| line.trim())
        .find(|line| {
            char_len(line) > 20
                && !line.starts_with("http")
                && !line.starts_with("www")
                && !line.starts_with("doi")
        })
        .map(str::to_string)
}
