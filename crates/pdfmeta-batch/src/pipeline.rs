//! The per-file steps a batch worker runs: save, extract, persist, link.

use std::panic::{AssertUnwindSafe, catch_unwind};
use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicU8, Ordering};
use std::time::Instant;

use pdfmeta_core::{CORE_FIELD_LABELS, CatalogDefaults, MetadataSource};
use pdfmeta_store::{
    ArticleSession, FileStorage, NewArticle, PersistenceError, missing_fields_summary,
    split_author_name,
};

use crate::{FileError, FileOutcome, UploadedFile};

const GATE_OPEN: u8 = 0;
const GATE_COMMITTING: u8 = 1;
const GATE_ABANDONED: u8 = 2;

/// Settles, exactly once, the race between a file's pipeline reaching its
/// article commit and its worker giving up on it.
///
/// Whichever side moves the gate first wins: an abandoned file never gets an
/// article row, and a file whose commit has started is never reported as
/// failed.
#[derive(Debug, Clone, Default)]
pub struct CommitGate(Arc<AtomicU8>);

impl CommitGate {
    pub fn new() -> Self {
        Self::default()
    }

    /// Claim the right to commit. `false` once the file was abandoned.
    pub fn enter_commit(&self) -> bool {
        self.0
            .compare_exchange(GATE_OPEN, GATE_COMMITTING, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }

    /// Give up on the file. `false` if the pipeline already began its commit.
    pub fn abandon(&self) -> bool {
        self.0
            .compare_exchange(GATE_OPEN, GATE_ABANDONED, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }

    pub fn is_abandoned(&self) -> bool {
        self.0.load(Ordering::Acquire) == GATE_ABANDONED
    }
}

/// Collaborators shared by every worker of a batch.
#[derive(Clone)]
pub struct Pipeline {
    storage: Arc<dyn FileStorage>,
    metadata: Arc<dyn MetadataSource>,
    catalog: CatalogDefaults,
}

impl Pipeline {
    pub fn new(
        storage: Arc<dyn FileStorage>,
        metadata: Arc<dyn MetadataSource>,
        catalog: CatalogDefaults,
    ) -> Self {
        Self {
            storage,
            metadata,
            catalog,
        }
    }

    /// Run one file end to end.
    ///
    /// A failure before the article row is committed removes the saved
    /// upload, so a failed file never leaves an orphan behind. A failure while
    /// linking authors keeps the article and flags it incomplete. A file
    /// abandoned through `gate` before its commit is discarded the same way.
    pub fn process(
        &self,
        session: &mut dyn ArticleSession,
        file: &UploadedFile,
        gate: &CommitGate,
    ) -> Result<FileOutcome, FileError> {
        let started = Instant::now();

        let path = self
            .storage
            .save(&file.filename, &file.bytes)
            .map_err(|e| FileError::Storage(e.to_string()))?;

        let meta = match catch_unwind(AssertUnwindSafe(|| self.metadata.extract_metadata(&path))) {
            Ok(meta) => meta,
            Err(_) => {
                self.discard(&path);
                return Err(FileError::Extraction("metadata extractor panicked".into()));
            }
        };
        if !meta.success {
            self.discard(&path);
            let reason = meta.error.unwrap_or_else(|| "unknown error".to_string());
            return Err(FileError::Extraction(reason));
        }
        if gate.is_abandoned() {
            self.discard(&path);
            return Err(FileError::Cancelled);
        }

        let article = NewArticle::from_metadata(&meta, &file.filename, &path);
        let article_id = match self.create_article(session, &article, gate) {
            Ok(Some(id)) => id,
            Ok(None) => {
                rollback(session);
                self.discard(&path);
                tracing::debug!(file = %file.filename, "abandoned before commit; upload discarded");
                return Err(FileError::Cancelled);
            }
            Err(e) => {
                rollback(session);
                self.discard(&path);
                return Err(FileError::Persistence(e.to_string()));
            }
        };

        let mut authors_incomplete = false;
        if !meta.authors.is_empty()
            && let Err(e) = link_authors(session, article_id, &meta.authors)
        {
            rollback(session);
            authors_incomplete = true;
            tracing::warn!(
                file = %file.filename,
                article_id,
                error = %e,
                "author linkage failed; article kept as incomplete"
            );
            let missing = missing_with_authors(&article.missing_fields);
            if let Err(e) = session.mark_incomplete(article_id, &missing_fields_summary(&missing)) {
                tracing::error!(article_id, error = %e, "failed to flag article as incomplete");
            }
        }

        Ok(FileOutcome {
            filename: file.filename.clone(),
            article_id,
            title: article.title,
            confidence: meta.confidence(),
            processing_time_seconds: started.elapsed().as_secs_f64(),
            extracted_fields: meta.field_presence(),
            authors_incomplete,
        })
    }

    /// Insert the article in its own transaction. `Ok(None)` means the gate
    /// was already abandoned and the transaction is left for the caller to
    /// roll back.
    fn create_article(
        &self,
        session: &mut dyn ArticleSession,
        article: &NewArticle,
        gate: &CommitGate,
    ) -> Result<Option<i64>, PersistenceError> {
        session.begin()?;
        let production_type = session.find_or_create_production_type(&self.catalog.production_type)?;
        let status =
            session.find_or_create_status(&self.catalog.status, &self.catalog.status_color)?;
        let id = session.create_article(article, production_type, status)?;
        if !gate.enter_commit() {
            return Ok(None);
        }
        session.commit()?;
        Ok(Some(id))
    }

    fn discard(&self, path: &Path) {
        if let Err(e) = self.storage.delete(path) {
            tracing::warn!(path = %path.display(), error = %e, "failed to remove upload");
        }
    }
}

/// Resolve each author by exact name (creating it when unknown) and link it in
/// extraction order. The first author is the corresponding one.
fn link_authors(
    session: &mut dyn ArticleSession,
    article_id: i64,
    authors: &[String],
) -> Result<(), PersistenceError> {
    session.begin()?;
    for (i, raw) in authors.iter().enumerate() {
        let name = split_author_name(raw);
        let author_id = match session.find_author(&name)? {
            Some(id) => id,
            None => session.create_author(&name)?,
        };
        session.link_author(article_id, author_id, i + 1, i == 0)?;
    }
    session.commit()
}

fn rollback(session: &mut dyn ArticleSession) {
    if let Err(e) = session.rollback() {
        tracing::warn!(error = %e, "rollback failed");
    }
}

/// The missing-field labels plus `autores`, in canonical label order.
fn missing_with_authors(missing: &[String]) -> Vec<String> {
    CORE_FIELD_LABELS
        .iter()
        .filter(|label| **label == "autores" || missing.iter().any(|m| m == *label))
        .map(|label| label.to_string())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn authors_label_lands_in_canonical_position() {
        let missing = vec!["titulo".to_string(), "ISSN".to_string()];
        assert_eq!(missing_with_authors(&missing), vec!["titulo", "autores", "ISSN"]);
        assert_eq!(missing_with_authors(&[]), vec!["autores"]);

        let already = vec!["autores".to_string()];
        assert_eq!(missing_with_authors(&already), vec!["autores"]);
    }

    #[test]
    fn gate_settles_once() {
        let gate = CommitGate::new();
        assert!(gate.enter_commit());
        assert!(!gate.abandon());
        assert!(!gate.is_abandoned());

        let gate = CommitGate::new();
        let other = gate.clone();
        assert!(other.abandon());
        assert!(gate.is_abandoned());
        assert!(!gate.enter_commit());
    }
}
