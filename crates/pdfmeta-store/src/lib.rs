//! Collaborators the batch coordinator persists through: upload storage,
//! catalog lookup and article/author persistence.

use thiserror::Error;

pub mod article;
pub mod sqlite;
pub mod storage;

pub use article::{AuthorName, MAX_TITLE_CHARS, NewArticle, missing_fields_summary, split_author_name};
pub use sqlite::{ArticleRecord, LinkedAuthor, SqliteArticleStore};
pub use storage::{FileStorage, FsStorage, sanitize_filename};

#[derive(Error, Debug)]
pub enum StorageError {
    #[error("file type not allowed: {0}")]
    DisallowedExtension(String),
    #[error("file too large: {size} bytes (max {max})")]
    TooLarge { size: u64, max: u64 },
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

#[derive(Error, Debug)]
pub enum PersistenceError {
    #[error("database error: {0}")]
    Sqlite(#[from] rusqlite::Error),
    #[error("integrity error: {0}")]
    Integrity(String),
    #[error("{0}")]
    Other(String),
}

/// Find-or-create access to the classification catalogs.
pub trait CatalogLookup {
    fn find_or_create_production_type(&mut self, name: &str) -> Result<i64, PersistenceError>;

    fn find_or_create_status(&mut self, name: &str, color: &str) -> Result<i64, PersistenceError>;
}

/// A unit of work against the article database, owned by one worker.
///
/// Implementations roll back any open transaction when dropped, so an early
/// return or a panic never leaves a half-written article behind.
pub trait ArticleSession: CatalogLookup + Send {
    fn begin(&mut self) -> Result<(), PersistenceError>;

    fn commit(&mut self) -> Result<(), PersistenceError>;

    fn rollback(&mut self) -> Result<(), PersistenceError>;

    /// Insert the article row and return its id.
    fn create_article(
        &mut self,
        article: &NewArticle,
        production_type_id: i64,
        status_id: i64,
    ) -> Result<i64, PersistenceError>;

    /// Exact match on `(nombre, apellidos)`.
    fn find_author(&mut self, name: &AuthorName) -> Result<Option<i64>, PersistenceError>;

    fn create_author(&mut self, name: &AuthorName) -> Result<i64, PersistenceError>;

    /// Link an author to an article at a 1-based `position`.
    fn link_author(
        &mut self,
        article_id: i64,
        author_id: i64,
        position: usize,
        corresponding: bool,
    ) -> Result<(), PersistenceError>;

    /// Flag an article as needing manual completion, replacing its
    /// missing-fields note.
    fn mark_incomplete(&mut self, article_id: i64, missing_summary: &str)
    -> Result<(), PersistenceError>;
}

/// Source of [`ArticleSession`]s; shared by all workers.
pub trait ArticleStore: Send + Sync {
    fn open_session(&self) -> Result<Box<dyn ArticleSession>, PersistenceError>;
}
