use axum::extract::Multipart;

use pdfmeta_batch::UploadedFile;

/// Multipart field names accepted for batch uploads.
pub const BATCH_FIELDS: &[&str] = &["files", "files[]"];

/// Multipart field names accepted for a single-file upload.
pub const SINGLE_FIELDS: &[&str] = &["file", "pdf"];

/// Collect every uploaded file from the fields named in `accept`.
///
/// Parts without a filename (an empty file input) are skipped, as are fields
/// with other names.
pub async fn parse_files(
    mut multipart: Multipart,
    accept: &[&str],
) -> Result<Vec<UploadedFile>, String> {
    let mut files = Vec::new();

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| format!("Failed to read form field: {}", e))?
    {
        let name = field.name().unwrap_or("").to_string();
        let filename = field.file_name().unwrap_or("").to_string();

        if !accept.contains(&name.as_str()) || filename.is_empty() {
            // Ignore unknown fields
            let _ = field.bytes().await;
            continue;
        }

        let bytes = field
            .bytes()
            .await
            .map_err(|e| format!("Failed to read file data for {}: {}", filename, e))?;
        files.push(UploadedFile::new(filename, bytes.to_vec()));
    }

    Ok(files)
}

/// Exactly one file from the single-file fields.
pub async fn parse_single(multipart: Multipart) -> Result<UploadedFile, String> {
    let mut files = parse_files(multipart, SINGLE_FIELDS).await?;
    match files.len() {
        0 => Err("No file uploaded".to_string()),
        1 => Ok(files.remove(0)),
        n => Err(format!("Expected one file, got {}", n)),
    }
}
