use std::collections::HashSet;

use crate::text_processing::{char_len, has_uppercase};

/// Lines 5..30 sit between the title block and the abstract in most layouts.
const AUTHOR_ZONE: std::ops::Range<usize> = 5..30;
const MAX_AUTHORS: usize = 10;

/// Extract author names from comma-separated lines after the title.
///
/// A line qualifies when it contains a comma, is under 200 characters and
/// has an upper-case letter. Each comma-separated token of 4–49 characters
/// with an upper-case letter is taken as a name. Scanning stops once two
/// names have been collected. Duplicates are removed keeping the first
/// occurrence, so the first name stays first.
pub fn extract_authors(text: &str) -> Vec<String> {
    if text.is_empty() {
        return Vec::new();
    }

    let mut authors: Vec<String> = Vec::new();

    for line in text
        .split('\n')
        .skip(AUTHOR_ZONE.start)
        .take(AUTHOR_ZONE.len())
    {
        let line = line.trim();

        if line.contains(',') && char_len(line) < 200 && has_uppercase(line) {
            authors.extend(
                line.split(',')
                    .map(str::trim)
                    .filter(|token| {
                        let len = char_len(token);
                        len > 3 && len < 50 && has_uppercase(token)
                    })
                    .map(str::to_string),
            );
        }

        if authors.len() >= 2 {
            break;
        }
    }

    authors.truncate(MAX_AUTHORS);

    let mut seen = HashSet::new();
    authors.retain(|a| seen.insert(a.clone()));
    authors
}
