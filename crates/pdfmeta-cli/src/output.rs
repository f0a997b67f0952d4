use std::io::Write;

use owo_colors::OwoColorize;
use pdfmeta_batch::BatchResult;
use pdfmeta_core::{Config, ExtractedMetadata, PdfInfo};

/// Whether to use colored output.
#[derive(Debug, Clone, Copy)]
pub struct ColorMode(pub bool);

impl ColorMode {
    pub fn enabled(&self) -> bool {
        self.0
    }
}

fn label(w: &mut dyn Write, name: &str, value: &str, color: ColorMode) -> std::io::Result<()> {
    if color.enabled() {
        writeln!(w, "  {:<16} {}", format!("{name}:").bold(), value)
    } else {
        writeln!(w, "  {:<16} {}", format!("{name}:"), value)
    }
}

fn missing(color: ColorMode) -> String {
    if color.enabled() {
        "(not found)".dimmed().to_string()
    } else {
        "(not found)".to_string()
    }
}

/// Print the recognized fields of one PDF.
pub fn print_metadata(
    w: &mut dyn Write,
    file_name: &str,
    meta: &ExtractedMetadata,
    color: ColorMode,
) -> std::io::Result<()> {
    writeln!(w, "Metadata for {}", file_name)?;
    writeln!(w)?;

    if !meta.success {
        let reason = meta.error.as_deref().unwrap_or("unknown error");
        if color.enabled() {
            writeln!(w, "{} {}", "FAILED:".red().bold(), reason)?;
        } else {
            writeln!(w, "FAILED: {}", reason)?;
        }
        return Ok(());
    }

    let or_missing = |v: &Option<String>| v.clone().unwrap_or_else(|| missing(color));

    label(w, "Title", &or_missing(&meta.title), color)?;
    if meta.authors.is_empty() {
        label(w, "Authors", &missing(color), color)?;
    } else {
        label(w, "Authors", &meta.authors.join("; "), color)?;
    }
    let year = meta.year.map(|y| y.to_string());
    label(w, "Year", &or_missing(&year), color)?;
    label(w, "DOI", &or_missing(&meta.doi), color)?;
    label(w, "ISSN", &or_missing(&meta.issn), color)?;
    if !meta.keywords.is_empty() {
        label(w, "Keywords", &meta.keywords.join(", "), color)?;
    }
    if !meta.emails.is_empty() {
        label(w, "Emails", &meta.emails.join(", "), color)?;
    }
    match &meta.abstract_text {
        Some(text) => {
            label(w, "Abstract", "", color)?;
            writeln!(w, "    {}", text)?;
        }
        None => label(w, "Abstract", &missing(color), color)?,
    }

    writeln!(w)?;
    let confidence = format!("{:.0}%", meta.confidence() * 100.0);
    let missing_fields = meta.missing_fields();
    if color.enabled() {
        let painted = if missing_fields.is_empty() {
            confidence.green().to_string()
        } else if meta.confidence() >= 0.5 {
            confidence.yellow().to_string()
        } else {
            confidence.red().to_string()
        };
        writeln!(w, "Confidence: {}", painted)?;
    } else {
        writeln!(w, "Confidence: {}", confidence)?;
    }
    if !missing_fields.is_empty() {
        writeln!(w, "Missing: {}", missing_fields.join(", "))?;
    }
    Ok(())
}

/// Print container-level attributes of one PDF.
pub fn print_pdf_info(
    w: &mut dyn Write,
    file_name: &str,
    info: &PdfInfo,
    color: ColorMode,
) -> std::io::Result<()> {
    writeln!(w, "PDF info for {}", file_name)?;
    writeln!(w)?;

    let unknown = || missing(color);
    label(
        w,
        "Pages",
        &info.num_pages.map(|n| n.to_string()).unwrap_or_else(unknown),
        color,
    )?;
    label(
        w,
        "Size",
        &info
            .file_size
            .map(|b| indicatif::HumanBytes(b).to_string())
            .unwrap_or_else(unknown),
        color,
    )?;
    label(
        w,
        "Version",
        &info.pdf_version.clone().unwrap_or_else(unknown),
        color,
    )?;
    label(w, "Encrypted", if info.encrypted { "yes" } else { "no" }, color)?;

    for (key, value) in &info.metadata {
        label(w, key, &value.clone().unwrap_or_else(unknown), color)?;
    }
    Ok(())
}

/// Print the per-file outcome list and totals of a batch.
pub fn print_batch_summary(
    w: &mut dyn Write,
    result: &BatchResult,
    color: ColorMode,
) -> std::io::Result<()> {
    for outcome in &result.results {
        let confidence = format!("{:.0}%", outcome.confidence * 100.0);
        let note = if outcome.authors_incomplete {
            " (authors not linked)"
        } else {
            ""
        };
        if color.enabled() {
            writeln!(
                w,
                "{} {} -> #{} \"{}\" [{} in {:.1}s]{}",
                "OK".green().bold(),
                outcome.filename,
                outcome.article_id,
                outcome.title,
                confidence,
                outcome.processing_time_seconds,
                note.yellow()
            )?;
        } else {
            writeln!(
                w,
                "OK {} -> #{} \"{}\" [{} in {:.1}s]{}",
                outcome.filename,
                outcome.article_id,
                outcome.title,
                confidence,
                outcome.processing_time_seconds,
                note
            )?;
        }
    }
    for failure in &result.error_details {
        if color.enabled() {
            writeln!(
                w,
                "{} {}: {}",
                "ERROR".red().bold(),
                failure.filename,
                failure.error
            )?;
        } else {
            writeln!(w, "ERROR {}: {}", failure.filename, failure.error)?;
        }
    }

    writeln!(w)?;
    if color.enabled() {
        writeln!(
            w,
            "{} {} files: {} ingested, {} failed",
            "SUMMARY:".bold(),
            result.total,
            result.success.to_string().green(),
            result.errors.to_string().red()
        )?;
    } else {
        writeln!(
            w,
            "SUMMARY: {} files: {} ingested, {} failed",
            result.total, result.success, result.errors
        )?;
    }
    Ok(())
}

/// Print the effective configuration.
pub fn print_config(w: &mut dyn Write, config: &Config, color: ColorMode) -> std::io::Result<()> {
    let rows = [
        ("max_pages", config.max_pages.to_string()),
        ("min_text_chars", config.min_text_chars.to_string()),
        ("max_workers", config.max_workers.to_string()),
        ("max_files", config.max_files_per_batch.to_string()),
        (
            "max_upload",
            indicatif::HumanBytes(config.max_upload_bytes).to_string(),
        ),
        ("extensions", config.allowed_extensions.join(", ")),
        ("upload_dir", config.upload_dir.display().to_string()),
        ("database", config.database_path.display().to_string()),
        (
            "file_timeout",
            format!("{}s", config.per_file_timeout.as_secs()),
        ),
        (
            "session_max_age",
            format!("{}h", config.session_max_age.as_secs() / 3600),
        ),
        ("production_type", config.catalog.production_type.clone()),
        (
            "status",
            format!("{} ({})", config.catalog.status, config.catalog.status_color),
        ),
    ];
    for (name, value) in rows {
        label(w, name, &value, color)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn render(f: impl FnOnce(&mut dyn Write) -> std::io::Result<()>) -> String {
        let mut buf = Vec::new();
        f(&mut buf).unwrap();
        String::from_utf8(buf).unwrap()
    }

    #[test]
    fn metadata_plain_output() {
        let meta = ExtractedMetadata {
            title: Some("Recuperación de metadatos".into()),
            authors: vec!["Ana Pérez".into(), "Luis Gómez".into()],
            year: Some(2022),
            success: true,
            ..Default::default()
        };
        let out = render(|w| print_metadata(w, "paper.pdf", &meta, ColorMode(false)));
        assert!(out.contains("Title:"));
        assert!(out.contains("Recuperación de metadatos"));
        assert!(out.contains("Ana Pérez; Luis Gómez"));
        assert!(out.contains("DOI:"));
        assert!(out.contains("(not found)"));
        assert!(out.contains("Confidence: 50%"));
        assert!(out.contains("Missing: DOI, ISSN, resumen"));
    }

    #[test]
    fn failed_metadata_prints_reason_only() {
        let meta = ExtractedMetadata::failed("file is not a PDF");
        let out = render(|w| print_metadata(w, "notes.txt", &meta, ColorMode(false)));
        assert!(out.contains("FAILED: file is not a PDF"));
        assert!(!out.contains("Confidence"));
    }

    #[test]
    fn batch_summary_plain_output() {
        let result = BatchResult {
            total: 2,
            success: 1,
            errors: 1,
            results: vec![pdfmeta_batch::FileOutcome {
                filename: "a.pdf".into(),
                article_id: 3,
                title: "T".into(),
                confidence: 1.0,
                processing_time_seconds: 0.42,
                extracted_fields: Default::default(),
                authors_incomplete: true,
            }],
            error_details: vec![pdfmeta_batch::FileFailure {
                filename: "b.pdf".into(),
                error: pdfmeta_batch::FileError::Cancelled,
            }],
        };
        let out = render(|w| print_batch_summary(w, &result, ColorMode(false)));
        assert!(out.contains("OK a.pdf -> #3 \"T\" [100% in 0.4s] (authors not linked)"));
        assert!(out.contains("ERROR b.pdf: batch cancelled"));
        assert!(out.contains("SUMMARY: 2 files: 1 ingested, 1 failed"));
    }
}
