use std::path::{Path, PathBuf};

use crate::StorageError;

/// Where uploaded PDFs are kept while (and after) they are processed.
pub trait FileStorage: Send + Sync {
    /// Persist the uploaded bytes and return the path they were written to.
    fn save(&self, filename: &str, bytes: &[u8]) -> Result<PathBuf, StorageError>;

    /// Remove a previously saved file.
    fn delete(&self, path: &Path) -> Result<(), StorageError>;
}

/// Filesystem storage under a single upload directory.
///
/// Stored names are `<YYYYmmdd_HHMMSS>_<random>_<sanitized original>`, so
/// concurrent uploads of the same filename never collide.
#[derive(Debug, Clone)]
pub struct FsStorage {
    root: PathBuf,
    allowed_extensions: Vec<String>,
    max_bytes: u64,
}

impl FsStorage {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            allowed_extensions: vec!["pdf".to_string()],
            max_bytes: 10 * 1024 * 1024,
        }
    }

    pub fn with_allowed_extensions(mut self, extensions: Vec<String>) -> Self {
        self.allowed_extensions = extensions;
        self
    }

    pub fn with_max_bytes(mut self, max_bytes: u64) -> Self {
        self.max_bytes = max_bytes;
        self
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn is_allowed(&self, filename: &str) -> bool {
        Path::new(filename)
            .extension()
            .and_then(|e| e.to_str())
            .is_some_and(|ext| {
                self.allowed_extensions
                    .iter()
                    .any(|allowed| allowed.eq_ignore_ascii_case(ext))
            })
    }
}

impl FileStorage for FsStorage {
    fn save(&self, filename: &str, bytes: &[u8]) -> Result<PathBuf, StorageError> {
        if !self.is_allowed(filename) {
            return Err(StorageError::DisallowedExtension(filename.to_string()));
        }
        if bytes.len() as u64 > self.max_bytes {
            return Err(StorageError::TooLarge {
                size: bytes.len() as u64,
                max: self.max_bytes,
            });
        }

        std::fs::create_dir_all(&self.root)?;

        let stored_name = format!(
            "{}_{:06x}_{}",
            chrono::Local::now().format("%Y%m%d_%H%M%S"),
            fastrand::u32(..0x0100_0000),
            sanitize_filename(filename)
        );
        let path = self.root.join(stored_name);
        std::fs::write(&path, bytes)?;
        tracing::debug!(path = %path.display(), bytes = bytes.len(), "upload stored");
        Ok(path)
    }

    fn delete(&self, path: &Path) -> Result<(), StorageError> {
        std::fs::remove_file(path)?;
        tracing::debug!(path = %path.display(), "upload removed");
        Ok(())
    }
}

/// Reduce an uploaded filename to a safe basename: directory components are
/// dropped, whitespace becomes `_`, and anything outside ASCII alphanumerics,
/// `.`, `-` and `_` is removed.
///
/// The stem and the extension are cleaned separately, so the extension the
/// upload was validated against survives even when nothing of the stem does
/// (`ñ.pdf` becomes `upload.pdf`).
pub fn sanitize_filename(filename: &str) -> String {
    let base = filename.rsplit(['/', '\\']).next().unwrap_or(filename);
    let base = Path::new(base);

    let stem = base
        .file_stem()
        .map(|s| clean_component(&s.to_string_lossy()))
        .unwrap_or_default();
    let extension: String = base
        .extension()
        .map(|e| e.to_string_lossy().chars().filter(|c| c.is_ascii_alphanumeric()).collect())
        .unwrap_or_default();

    match (stem.is_empty(), extension.is_empty()) {
        (true, true) => "upload.pdf".to_string(),
        (true, false) => format!("upload.{extension}"),
        (false, true) => stem,
        (false, false) => format!("{stem}.{extension}"),
    }
}

fn clean_component(raw: &str) -> String {
    let cleaned: String = raw
        .chars()
        .map(|c| if c.is_whitespace() { '_' } else { c })
        .filter(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_'))
        .collect();
    let cleaned = cleaned.trim_start_matches(['.', '_']);
    if cleaned.contains(|c: char| c.is_ascii_alphanumeric()) {
        cleaned.to_string()
    } else {
        String::new()
    }
}
