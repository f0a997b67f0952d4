use std::path::{Path, PathBuf};

use pdfmeta_core::ExtractedMetadata;

pub const MAX_TITLE_CHARS: usize = 500;

/// Everything needed to insert one article row.
#[derive(Debug, Clone, PartialEq)]
pub struct NewArticle {
    pub title: String,
    pub year: Option<i32>,
    pub doi: Option<String>,
    pub issn: Option<String>,
    pub abstract_text: Option<String>,
    pub keywords: Vec<String>,
    pub source_filename: String,
    pub stored_path: PathBuf,
    /// Labels of the core fields extraction could not recover.
    pub missing_fields: Vec<String>,
}

impl NewArticle {
    /// Build the row for a freshly extracted PDF.
    ///
    /// A missing title becomes `"Documento sin título - <filename>"`, and
    /// titles over 500 characters are cut to 497 plus `"..."`.
    pub fn from_metadata(meta: &ExtractedMetadata, filename: &str, stored_path: &Path) -> Self {
        let title = meta
            .title
            .as_deref()
            .filter(|t| !t.is_empty())
            .map(str::to_string)
            .unwrap_or_else(|| format!("Documento sin título - {filename}"));

        Self {
            title: truncate_title(&title),
            year: meta.year,
            doi: meta.doi.clone().filter(|d| !d.is_empty()),
            issn: meta.issn.clone().filter(|i| !i.is_empty()),
            abstract_text: meta.abstract_text.clone(),
            keywords: meta.keywords.clone(),
            source_filename: filename.to_string(),
            stored_path: stored_path.to_path_buf(),
            missing_fields: meta.missing_fields(),
        }
    }

    /// Human-readable completeness note stored alongside the article.
    pub fn missing_summary(&self) -> String {
        missing_fields_summary(&self.missing_fields)
    }
}

fn truncate_title(title: &str) -> String {
    if title.chars().count() > MAX_TITLE_CHARS {
        let mut cut: String = title.chars().take(MAX_TITLE_CHARS - 3).collect();
        cut.push_str("...");
        cut
    } else {
        title.to_string()
    }
}

/// `"Faltan: a, b"` or `"Extracción completa"` when nothing is missing.
pub fn missing_fields_summary(missing: &[String]) -> String {
    if missing.is_empty() {
        "Extracción completa".to_string()
    } else {
        format!("Faltan: {}", missing.join(", "))
    }
}

/// An author name split into given name and surnames.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct AuthorName {
    pub nombre: String,
    pub apellidos: String,
}

/// Split an extracted author string: the first word is the given name, the
/// rest are surnames. A single word is kept whole as the given name.
pub fn split_author_name(raw: &str) -> AuthorName {
    let raw = raw.trim();
    let mut parts = raw.split_whitespace();
    match (parts.next(), parts.clone().next()) {
        (Some(first), Some(_)) => AuthorName {
            nombre: first.to_string(),
            apellidos: parts.collect::<Vec<_>>().join(" "),
        },
        _ => AuthorName {
            nombre: raw.to_string(),
            apellidos: String::new(),
        },
    }
}
