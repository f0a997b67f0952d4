//! SQLite implementation of [`ArticleStore`].
//!
//! Each [`SqliteSession`] owns its own connection, so every batch worker
//! writes through an independent handle. Writes use `BEGIN IMMEDIATE` and the
//! 5 s busy timeout serializes concurrent writers instead of failing them.

use std::path::{Path, PathBuf};

use rusqlite::{Connection, OpenFlags, OptionalExtension, params};

use crate::{ArticleSession, ArticleStore, AuthorName, CatalogLookup, NewArticle, PersistenceError};

const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS production_types (
    id      INTEGER PRIMARY KEY,
    name    TEXT NOT NULL UNIQUE,
    active  INTEGER NOT NULL DEFAULT 1
);
CREATE TABLE IF NOT EXISTS statuses (
    id      INTEGER PRIMARY KEY,
    name    TEXT NOT NULL UNIQUE,
    color   TEXT,
    active  INTEGER NOT NULL DEFAULT 1
);
CREATE TABLE IF NOT EXISTS articles (
    id                  INTEGER PRIMARY KEY,
    title               TEXT NOT NULL,
    production_type_id  INTEGER NOT NULL REFERENCES production_types(id),
    status_id           INTEGER NOT NULL REFERENCES statuses(id),
    year                INTEGER,
    doi                 TEXT UNIQUE,
    issn                TEXT,
    abstract            TEXT,
    keywords            TEXT,
    source_filename     TEXT,
    stored_path         TEXT,
    complete            INTEGER NOT NULL DEFAULT 0,
    missing_fields      TEXT,
    active              INTEGER NOT NULL DEFAULT 1,
    for_curriculum      INTEGER NOT NULL DEFAULT 1,
    created_at          TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP
);
CREATE TABLE IF NOT EXISTS authors (
    id          INTEGER PRIMARY KEY,
    first_name  TEXT NOT NULL,
    last_names  TEXT NOT NULL,
    is_member   INTEGER NOT NULL DEFAULT 0,
    active      INTEGER NOT NULL DEFAULT 1,
    UNIQUE (first_name, last_names)
);
CREATE TABLE IF NOT EXISTS article_authors (
    article_id     INTEGER NOT NULL REFERENCES articles(id) ON DELETE CASCADE,
    author_id      INTEGER NOT NULL REFERENCES authors(id),
    position       INTEGER NOT NULL,
    corresponding  INTEGER NOT NULL DEFAULT 0,
    PRIMARY KEY (article_id, author_id)
);
";

const KEYWORD_SEPARATOR: &str = "; ";

/// Open a SQLite connection with WAL mode and standard pragmas.
fn open_sqlite(path: &Path) -> Result<Connection, rusqlite::Error> {
    let flags = OpenFlags::SQLITE_OPEN_READ_WRITE
        | OpenFlags::SQLITE_OPEN_CREATE
        | OpenFlags::SQLITE_OPEN_NO_MUTEX;
    let conn = Connection::open_with_flags(path, flags)?;
    conn.execute_batch(
        "PRAGMA journal_mode = WAL;
         PRAGMA synchronous = NORMAL;
         PRAGMA busy_timeout = 5000;
         PRAGMA foreign_keys = ON;",
    )?;
    Ok(conn)
}

/// Constraint violations (duplicate DOI, dangling foreign key) become
/// [`PersistenceError::Integrity`]; everything else stays a SQLite error.
fn classify(e: rusqlite::Error) -> PersistenceError {
    match &e {
        rusqlite::Error::SqliteFailure(err, msg)
            if err.code == rusqlite::ErrorCode::ConstraintViolation =>
        {
            PersistenceError::Integrity(msg.clone().unwrap_or_else(|| err.to_string()))
        }
        _ => PersistenceError::Sqlite(e),
    }
}

/// One stored article, as read back for reporting and tests.
#[derive(Debug, Clone, PartialEq)]
pub struct ArticleRecord {
    pub id: i64,
    pub title: String,
    pub year: Option<i32>,
    pub doi: Option<String>,
    pub issn: Option<String>,
    pub abstract_text: Option<String>,
    pub keywords: Vec<String>,
    pub source_filename: Option<String>,
    pub stored_path: Option<String>,
    pub complete: bool,
    pub missing_fields: Option<String>,
    pub production_type: String,
    pub status: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinkedAuthor {
    pub nombre: String,
    pub apellidos: String,
    pub position: usize,
    pub corresponding: bool,
}

/// Article database on disk. Cheap to share: it only holds the path, and
/// every session opens a fresh connection.
#[derive(Debug, Clone)]
pub struct SqliteArticleStore {
    path: PathBuf,
}

impl SqliteArticleStore {
    /// Open (creating if needed) the database and its schema.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, PersistenceError> {
        let path = path.into();
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent).map_err(|e| {
                PersistenceError::Other(format!(
                    "failed to create database directory {}: {e}",
                    parent.display()
                ))
            })?;
        }
        let conn = open_sqlite(&path)?;
        conn.execute_batch(SCHEMA)?;
        tracing::debug!(path = %path.display(), "article database ready");
        Ok(Self { path })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn session(&self) -> Result<SqliteSession, PersistenceError> {
        Ok(SqliteSession {
            conn: open_sqlite(&self.path)?,
        })
    }

    pub fn article(&self, id: i64) -> Result<Option<ArticleRecord>, PersistenceError> {
        let conn = open_sqlite(&self.path)?;
        let record = conn
            .query_row(
                "SELECT a.id, a.title, a.year, a.doi, a.issn, a.abstract, a.keywords,
                        a.source_filename, a.stored_path, a.complete, a.missing_fields,
                        p.name, s.name
                 FROM articles a
                 JOIN production_types p ON p.id = a.production_type_id
                 JOIN statuses s ON s.id = a.status_id
                 WHERE a.id = ?1",
                params![id],
                |row| {
                    let keywords: Option<String> = row.get(6)?;
                    Ok(ArticleRecord {
                        id: row.get(0)?,
                        title: row.get(1)?,
                        year: row.get(2)?,
                        doi: row.get(3)?,
                        issn: row.get(4)?,
                        abstract_text: row.get(5)?,
                        keywords: keywords
                            .filter(|k| !k.is_empty())
                            .map(|k| k.split(KEYWORD_SEPARATOR).map(str::to_string).collect())
                            .unwrap_or_default(),
                        source_filename: row.get(7)?,
                        stored_path: row.get(8)?,
                        complete: row.get(9)?,
                        missing_fields: row.get(10)?,
                        production_type: row.get(11)?,
                        status: row.get(12)?,
                    })
                },
            )
            .optional()?;
        Ok(record)
    }

    /// Authors of an article in link order.
    pub fn article_authors(&self, article_id: i64) -> Result<Vec<LinkedAuthor>, PersistenceError> {
        let conn = open_sqlite(&self.path)?;
        let mut stmt = conn.prepare(
            "SELECT au.first_name, au.last_names, aa.position, aa.corresponding
             FROM article_authors aa
             JOIN authors au ON au.id = aa.author_id
             WHERE aa.article_id = ?1
             ORDER BY aa.position",
        )?;
        let rows = stmt.query_map(params![article_id], |row| {
            let position: i64 = row.get(2)?;
            Ok(LinkedAuthor {
                nombre: row.get(0)?,
                apellidos: row.get(1)?,
                position: position as usize,
                corresponding: row.get(3)?,
            })
        })?;
        Ok(rows.collect::<Result<Vec<_>, _>>()?)
    }

    pub fn count_articles(&self) -> Result<usize, PersistenceError> {
        self.count("articles")
    }

    pub fn count_authors(&self) -> Result<usize, PersistenceError> {
        self.count("authors")
    }

    fn count(&self, table: &str) -> Result<usize, PersistenceError> {
        let conn = open_sqlite(&self.path)?;
        let n: i64 = conn.query_row(&format!("SELECT COUNT(*) FROM {table}"), [], |r| r.get(0))?;
        Ok(n as usize)
    }
}

impl ArticleStore for SqliteArticleStore {
    fn open_session(&self) -> Result<Box<dyn ArticleSession>, PersistenceError> {
        Ok(Box::new(self.session()?))
    }
}

/// One connection, used by one worker for its whole lifetime.
pub struct SqliteSession {
    conn: Connection,
}

impl Drop for SqliteSession {
    fn drop(&mut self) {
        if !self.conn.is_autocommit()
            && let Err(e) = self.conn.execute_batch("ROLLBACK")
        {
            tracing::warn!(error = %e, "rollback on session drop failed");
        }
    }
}

impl CatalogLookup for SqliteSession {
    fn find_or_create_production_type(&mut self, name: &str) -> Result<i64, PersistenceError> {
        let created = self
            .conn
            .execute(
                "INSERT OR IGNORE INTO production_types (name) VALUES (?1)",
                params![name],
            )
            .map_err(classify)?;
        if created > 0 {
            tracing::info!(name, "created default production type");
        }
        Ok(self.conn.query_row(
            "SELECT id FROM production_types WHERE name = ?1",
            params![name],
            |r| r.get(0),
        )?)
    }

    fn find_or_create_status(&mut self, name: &str, color: &str) -> Result<i64, PersistenceError> {
        let created = self
            .conn
            .execute(
                "INSERT OR IGNORE INTO statuses (name, color) VALUES (?1, ?2)",
                params![name, color],
            )
            .map_err(classify)?;
        if created > 0 {
            tracing::info!(name, "created default status");
        }
        Ok(self
            .conn
            .query_row("SELECT id FROM statuses WHERE name = ?1", params![name], |r| {
                r.get(0)
            })?)
    }
}

impl ArticleSession for SqliteSession {
    fn begin(&mut self) -> Result<(), PersistenceError> {
        self.conn.execute_batch("BEGIN IMMEDIATE")?;
        Ok(())
    }

    fn commit(&mut self) -> Result<(), PersistenceError> {
        self.conn.execute_batch("COMMIT").map_err(classify)
    }

    fn rollback(&mut self) -> Result<(), PersistenceError> {
        if !self.conn.is_autocommit() {
            self.conn.execute_batch("ROLLBACK")?;
        }
        Ok(())
    }

    fn create_article(
        &mut self,
        article: &NewArticle,
        production_type_id: i64,
        status_id: i64,
    ) -> Result<i64, PersistenceError> {
        let keywords = article.keywords.join(KEYWORD_SEPARATOR);
        self.conn
            .execute(
                "INSERT INTO articles (
                     title, production_type_id, status_id, year, doi, issn, abstract,
                     keywords, source_filename, stored_path, complete, missing_fields
                 ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, 0, ?11)",
                params![
                    article.title,
                    production_type_id,
                    status_id,
                    article.year,
                    article.doi,
                    article.issn,
                    article.abstract_text,
                    keywords,
                    article.source_filename,
                    article.stored_path.to_string_lossy(),
                    article.missing_summary(),
                ],
            )
            .map_err(classify)?;
        Ok(self.conn.last_insert_rowid())
    }

    fn find_author(&mut self, name: &AuthorName) -> Result<Option<i64>, PersistenceError> {
        Ok(self
            .conn
            .query_row(
                "SELECT id FROM authors WHERE first_name = ?1 AND last_names = ?2",
                params![name.nombre, name.apellidos],
                |r| r.get(0),
            )
            .optional()?)
    }

    fn create_author(&mut self, name: &AuthorName) -> Result<i64, PersistenceError> {
        self.conn
            .execute(
                "INSERT INTO authors (first_name, last_names) VALUES (?1, ?2)",
                params![name.nombre, name.apellidos],
            )
            .map_err(classify)?;
        Ok(self.conn.last_insert_rowid())
    }

    fn link_author(
        &mut self,
        article_id: i64,
        author_id: i64,
        position: usize,
        corresponding: bool,
    ) -> Result<(), PersistenceError> {
        self.conn
            .execute(
                "INSERT OR IGNORE INTO article_authors (article_id, author_id, position, corresponding)
                 VALUES (?1, ?2, ?3, ?4)",
                params![article_id, author_id, position as i64, corresponding],
            )
            .map_err(classify)?;
        Ok(())
    }

    fn mark_incomplete(
        &mut self,
        article_id: i64,
        missing_summary: &str,
    ) -> Result<(), PersistenceError> {
        self.conn
            .execute(
                "UPDATE articles SET complete = 0, missing_fields = ?2 WHERE id = ?1",
                params![article_id, missing_summary],
            )
            .map_err(classify)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::split_author_name;

    fn store() -> (tempfile::TempDir, SqliteArticleStore) {
        let dir = tempfile::tempdir().unwrap();
        let store = SqliteArticleStore::open(dir.path().join("instance").join("articulos.db")).unwrap();
        (dir, store)
    }

    fn article(doi: Option<&str>) -> NewArticle {
        NewArticle {
            title: "Recuperación de metadatos".into(),
            year: Some(2022),
            doi: doi.map(str::to_string),
            issn: Some("2145-9371".into()),
            abstract_text: None,
            keywords: vec!["metadatos".into(), "PDF".into()],
            source_filename: "paper.pdf".into(),
            stored_path: PathBuf::from("/uploads/1_paper.pdf"),
            missing_fields: vec!["resumen".into()],
        }
    }

    fn insert(session: &mut SqliteSession, a: &NewArticle) -> Result<i64, PersistenceError> {
        session.begin()?;
        let tp = session.find_or_create_production_type("Artículo científico")?;
        let st = session.find_or_create_status("Publicado", "#28a745")?;
        let id = session.create_article(a, tp, st)?;
        session.commit()?;
        Ok(id)
    }

    #[test]
    fn create_and_read_back() {
        let (_dir, store) = store();
        let mut session = store.session().unwrap();
        let id = insert(&mut session, &article(Some("10.1/a"))).unwrap();

        let record = store.article(id).unwrap().unwrap();
        assert_eq!(record.title, "Recuperación de metadatos");
        assert_eq!(record.doi.as_deref(), Some("10.1/a"));
        assert_eq!(record.keywords, vec!["metadatos", "PDF"]);
        assert!(!record.complete);
        assert_eq!(record.missing_fields.as_deref(), Some("Faltan: resumen"));
        assert_eq!(record.production_type, "Artículo científico");
        assert_eq!(record.status, "Publicado");
        assert!(store.article(id + 1).unwrap().is_none());
    }

    #[test]
    fn catalog_entries_created_once() {
        let (_dir, store) = store();
        let mut a = store.session().unwrap();
        let mut b = store.session().unwrap();
        let first = a.find_or_create_status("Publicado", "#28a745").unwrap();
        let second = b.find_or_create_status("Publicado", "#000000").unwrap();
        assert_eq!(first, second);
        assert_eq!(
            a.find_or_create_production_type("Artículo científico").unwrap(),
            b.find_or_create_production_type("Artículo científico").unwrap()
        );
    }

    #[test]
    fn duplicate_doi_is_integrity_error() {
        let (_dir, store) = store();
        let mut session = store.session().unwrap();
        insert(&mut session, &article(Some("10.1/dup"))).unwrap();
        let err = insert(&mut session, &article(Some("10.1/dup"))).unwrap_err();
        assert!(matches!(err, PersistenceError::Integrity(_)));
        session.rollback().unwrap();

        // Articles without a DOI never conflict.
        insert(&mut session, &article(None)).unwrap();
        insert(&mut session, &article(None)).unwrap();
        assert_eq!(store.count_articles().unwrap(), 3);
    }

    #[test]
    fn authors_found_by_exact_name_and_linked_in_order() {
        let (_dir, store) = store();
        let mut session = store.session().unwrap();
        let id = insert(&mut session, &article(None)).unwrap();

        session.begin().unwrap();
        for (i, raw) in ["Ana María Pérez", "Luis Gómez"].iter().enumerate() {
            let name = split_author_name(raw);
            let author_id = match session.find_author(&name).unwrap() {
                Some(existing) => existing,
                None => session.create_author(&name).unwrap(),
            };
            session.link_author(id, author_id, i + 1, i == 0).unwrap();
        }
        session.commit().unwrap();

        let ana = split_author_name("Ana María Pérez");
        assert!(session.find_author(&ana).unwrap().is_some());
        let other = split_author_name("Ana Pérez");
        assert!(session.find_author(&other).unwrap().is_none());

        let linked = store.article_authors(id).unwrap();
        assert_eq!(linked.len(), 2);
        assert_eq!(linked[0].nombre, "Ana");
        assert_eq!(linked[0].apellidos, "María Pérez");
        assert!(linked[0].corresponding);
        assert_eq!(linked[1].position, 2);
        assert!(!linked[1].corresponding);
    }

    #[test]
    fn dropping_session_rolls_back_open_transaction() {
        let (_dir, store) = store();
        {
            let mut session = store.session().unwrap();
            session.begin().unwrap();
            let tp = session.find_or_create_production_type("Artículo científico").unwrap();
            let st = session.find_or_create_status("Publicado", "#28a745").unwrap();
            session.create_article(&article(None), tp, st).unwrap();
        }
        assert_eq!(store.count_articles().unwrap(), 0);
    }

    #[test]
    fn mark_incomplete_replaces_note() {
        let (_dir, store) = store();
        let mut session = store.session().unwrap();
        let id = insert(&mut session, &article(None)).unwrap();
        session.mark_incomplete(id, "Faltan: autores, resumen").unwrap();
        let record = store.article(id).unwrap().unwrap();
        assert!(!record.complete);
        assert_eq!(record.missing_fields.as_deref(), Some("Faltan: autores, resumen"));
    }

    #[test]
    fn works_through_trait_objects() {
        let (_dir, store) = store();
        let shared: &dyn ArticleStore = &store;
        let mut session = shared.open_session().unwrap();
        session.begin().unwrap();
        let tp = session.find_or_create_production_type("Artículo científico").unwrap();
        let st = session.find_or_create_status("Publicado", "#28a745").unwrap();
        session.create_article(&article(None), tp, st).unwrap();
        session.commit().unwrap();
        assert_eq!(store.count_articles().unwrap(), 1);
    }
}
