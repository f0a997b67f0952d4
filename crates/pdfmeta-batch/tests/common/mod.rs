//! Shared fixtures: a filename-driven metadata source and an article store
//! wrapper that counts sessions and can fail author linkage.
#![allow(dead_code)]

use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use pdfmeta_batch::{BatchIngestionCoordinator, Pipeline, UploadedFile};
use pdfmeta_core::{CatalogDefaults, ExtractedMetadata, MetadataSource};
use pdfmeta_store::{
    ArticleSession, ArticleStore, AuthorName, CatalogLookup, FileStorage, FsStorage, NewArticle,
    PersistenceError, SqliteArticleStore,
};

/// Metadata keyed off the stored filename:
/// `corrupt` fails extraction, `slow` sleeps for two seconds, `notitle`
/// drops the title and `dup` shares one DOI. Everything else gets a full
/// record with a DOI unique to the stored file.
#[derive(Clone, Default)]
pub struct ScriptedMetadata {
    pub calls: Arc<AtomicUsize>,
}

impl ScriptedMetadata {
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl MetadataSource for ScriptedMetadata {
    fn extract_metadata(&self, path: &Path) -> ExtractedMetadata {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();

        if name.contains("corrupt") {
            return ExtractedMetadata::failed(
                "could not extract text; file may be protected or image-based",
            );
        }
        if name.contains("slow") {
            std::thread::sleep(Duration::from_secs(2));
        }

        let doi = if name.contains("dup") {
            "10.1234/dup".to_string()
        } else {
            format!("10.1234/{name}")
        };
        ExtractedMetadata {
            title: (!name.contains("notitle")).then(|| format!("Estudio {name}")),
            authors: vec!["Ana María Pérez".into(), "Luis Gómez".into()],
            year: Some(2022),
            doi: Some(doi),
            issn: Some("2145-9371".into()),
            abstract_text: None,
            keywords: vec!["metadatos".into()],
            emails: vec![],
            success: true,
            error: None,
        }
    }
}

/// Wraps the SQLite store, counting opened sessions. With `fail_links`, every
/// `link_author` call fails.
pub struct CountingStore {
    pub inner: SqliteArticleStore,
    pub opened: AtomicUsize,
    pub fail_links: bool,
}

impl CountingStore {
    pub fn new(inner: SqliteArticleStore) -> Self {
        Self {
            inner,
            opened: AtomicUsize::new(0),
            fail_links: false,
        }
    }

    pub fn opened(&self) -> usize {
        self.opened.load(Ordering::SeqCst)
    }
}

impl ArticleStore for CountingStore {
    fn open_session(&self) -> Result<Box<dyn ArticleSession>, PersistenceError> {
        self.opened.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(WrappedSession {
            inner: self.inner.open_session()?,
            fail_links: self.fail_links,
        }))
    }
}

struct WrappedSession {
    inner: Box<dyn ArticleSession>,
    fail_links: bool,
}

impl CatalogLookup for WrappedSession {
    fn find_or_create_production_type(&mut self, name: &str) -> Result<i64, PersistenceError> {
        self.inner.find_or_create_production_type(name)
    }

    fn find_or_create_status(&mut self, name: &str, color: &str) -> Result<i64, PersistenceError> {
        self.inner.find_or_create_status(name, color)
    }
}

impl ArticleSession for WrappedSession {
    fn begin(&mut self) -> Result<(), PersistenceError> {
        self.inner.begin()
    }

    fn commit(&mut self) -> Result<(), PersistenceError> {
        self.inner.commit()
    }

    fn rollback(&mut self) -> Result<(), PersistenceError> {
        self.inner.rollback()
    }

    fn create_article(
        &mut self,
        article: &NewArticle,
        production_type_id: i64,
        status_id: i64,
    ) -> Result<i64, PersistenceError> {
        self.inner.create_article(article, production_type_id, status_id)
    }

    fn find_author(&mut self, name: &AuthorName) -> Result<Option<i64>, PersistenceError> {
        self.inner.find_author(name)
    }

    fn create_author(&mut self, name: &AuthorName) -> Result<i64, PersistenceError> {
        self.inner.create_author(name)
    }

    fn link_author(
        &mut self,
        article_id: i64,
        author_id: i64,
        position: usize,
        corresponding: bool,
    ) -> Result<(), PersistenceError> {
        if self.fail_links {
            return Err(PersistenceError::Other("link table unavailable".into()));
        }
        self.inner
            .link_author(article_id, author_id, position, corresponding)
    }

    fn mark_incomplete(
        &mut self,
        article_id: i64,
        missing_summary: &str,
    ) -> Result<(), PersistenceError> {
        self.inner.mark_incomplete(article_id, missing_summary)
    }
}

/// Everything a batch test needs, rooted in one temp dir.
pub struct Harness {
    pub dir: tempfile::TempDir,
    pub metadata: ScriptedMetadata,
    pub store: Arc<CountingStore>,
    pub coordinator: BatchIngestionCoordinator,
}

impl Harness {
    pub fn new(max_workers: usize) -> Self {
        Self::build(max_workers, false)
    }

    pub fn failing_links() -> Self {
        Self::build(1, true)
    }

    fn build(max_workers: usize, fail_links: bool) -> Self {
        let dir = tempfile::tempdir().unwrap();
        let sqlite = SqliteArticleStore::open(dir.path().join("articulos.db")).unwrap();
        let mut counting = CountingStore::new(sqlite);
        counting.fail_links = fail_links;
        let store = Arc::new(counting);

        let metadata = ScriptedMetadata::default();
        let storage: Arc<dyn FileStorage> = Arc::new(FsStorage::new(dir.path().join("uploads")));
        let pipeline = Pipeline::new(
            storage,
            Arc::new(metadata.clone()),
            CatalogDefaults::default(),
        );
        let coordinator = BatchIngestionCoordinator::new(pipeline, store.clone())
            .with_max_workers(max_workers);

        Self {
            dir,
            metadata,
            store,
            coordinator,
        }
    }

    pub fn with_per_file_timeout(mut self, timeout: Duration) -> Self {
        self.coordinator = self.coordinator.with_per_file_timeout(timeout);
        self
    }

    pub fn sqlite(&self) -> &SqliteArticleStore {
        &self.store.inner
    }

    /// Number of files left in the upload directory.
    pub fn stored_uploads(&self) -> usize {
        match std::fs::read_dir(self.dir.path().join("uploads")) {
            Ok(entries) => entries.count(),
            Err(_) => 0,
        }
    }
}

pub fn pdf(name: &str) -> UploadedFile {
    UploadedFile::new(name, b"%PDF-1.5\n%fixture\n".to_vec())
}

pub fn pdfs(names: &[&str]) -> Vec<UploadedFile> {
    names.iter().map(|n| pdf(n)).collect()
}
