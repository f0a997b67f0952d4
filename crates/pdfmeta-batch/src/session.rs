//! Upload sessions: a pollable progress record for a batch running in the
//! background, kept in an injectable [`SessionStore`].

use std::time::Duration;

use chrono::{DateTime, Local};
use dashmap::DashMap;
use serde::Serialize;

use crate::BatchResult;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionStatus {
    Processing,
    Completed,
    Failed,
}

#[derive(Debug, Clone, PartialEq)]
pub struct UploadSession {
    pub session_id: String,
    pub total_files: usize,
    pub processed: usize,
    pub success: usize,
    pub errors: usize,
    pub start_time: DateTime<Local>,
    pub status: SessionStatus,
    /// Final batch result, set once the batch has finished.
    pub result: Option<BatchResult>,
}

/// Point-in-time view of a session, as reported to pollers.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SessionProgress {
    pub session_id: String,
    pub status: SessionStatus,
    pub total: usize,
    pub processed: usize,
    pub success: usize,
    pub errors: usize,
    pub progress_percent: f64,
    pub elapsed_time: f64,
    pub estimated_remaining: f64,
}

impl UploadSession {
    pub fn new(session_id: impl Into<String>, total_files: usize) -> Self {
        Self {
            session_id: session_id.into(),
            total_files,
            processed: 0,
            success: 0,
            errors: 0,
            start_time: Local::now(),
            status: SessionStatus::Processing,
            result: None,
        }
    }

    /// Count one finished file.
    pub fn record(&mut self, success: bool) {
        self.processed += 1;
        if success {
            self.success += 1;
        } else {
            self.errors += 1;
        }
        if self.processed >= self.total_files {
            self.status = SessionStatus::Completed;
        }
    }

    pub fn finish(&mut self, result: BatchResult) {
        self.status = SessionStatus::Completed;
        self.result = Some(result);
    }

    pub fn mark_failed(&mut self) {
        self.status = SessionStatus::Failed;
    }

    pub fn progress(&self, now: DateTime<Local>) -> SessionProgress {
        let elapsed = (now - self.start_time).num_milliseconds().max(0) as f64 / 1000.0;
        let progress_percent = if self.total_files > 0 {
            self.processed as f64 / self.total_files as f64 * 100.0
        } else {
            0.0
        };
        let estimated_remaining = if self.processed > 0 {
            let remaining = self.total_files.saturating_sub(self.processed);
            elapsed / self.processed as f64 * remaining as f64
        } else {
            0.0
        };

        SessionProgress {
            session_id: self.session_id.clone(),
            status: self.status,
            total: self.total_files,
            processed: self.processed,
            success: self.success,
            errors: self.errors,
            progress_percent,
            elapsed_time: elapsed,
            estimated_remaining,
        }
    }

    fn is_older_than(&self, max_age: Duration, now: DateTime<Local>) -> bool {
        (now - self.start_time)
            .to_std()
            .is_ok_and(|age| age > max_age)
    }
}

/// Registry of upload sessions keyed by id.
pub trait SessionStore: Send + Sync {
    fn get(&self, session_id: &str) -> Option<UploadSession>;

    fn put(&self, session: UploadSession);

    /// Returns whether a session was removed.
    fn delete(&self, session_id: &str) -> bool;

    /// Ids of sessions started more than `max_age` before `now`.
    fn list_expired(&self, max_age: Duration, now: DateTime<Local>) -> Vec<String>;

    /// Apply `f` to a stored session. Returns false if the id is unknown.
    fn update(&self, session_id: &str, f: &mut dyn FnMut(&mut UploadSession)) -> bool {
        match self.get(session_id) {
            Some(mut session) => {
                f(&mut session);
                self.put(session);
                true
            }
            None => false,
        }
    }
}

#[derive(Debug, Default)]
pub struct InMemorySessionStore {
    sessions: DashMap<String, UploadSession>,
}

impl InMemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }
}

impl SessionStore for InMemorySessionStore {
    fn get(&self, session_id: &str) -> Option<UploadSession> {
        self.sessions.get(session_id).map(|s| s.value().clone())
    }

    fn put(&self, session: UploadSession) {
        self.sessions.insert(session.session_id.clone(), session);
    }

    fn delete(&self, session_id: &str) -> bool {
        self.sessions.remove(session_id).is_some()
    }

    fn list_expired(&self, max_age: Duration, now: DateTime<Local>) -> Vec<String> {
        self.sessions
            .iter()
            .filter(|entry| entry.value().is_older_than(max_age, now))
            .map(|entry| entry.key().clone())
            .collect()
    }

    fn update(&self, session_id: &str, f: &mut dyn FnMut(&mut UploadSession)) -> bool {
        match self.sessions.get_mut(session_id) {
            Some(mut entry) => {
                f(entry.value_mut());
                true
            }
            None => false,
        }
    }
}

/// `upload_<YYYYmmdd_HHMMSS_micros>`.
pub fn new_session_id() -> String {
    format!("upload_{}", Local::now().format("%Y%m%d_%H%M%S_%6f"))
}

/// Register a fresh session for a batch of `total_files`.
pub fn create_upload_session(store: &dyn SessionStore, total_files: usize) -> UploadSession {
    let session = UploadSession::new(new_session_id(), total_files);
    store.put(session.clone());
    tracing::debug!(session_id = %session.session_id, total_files, "upload session created");
    session
}

/// Purge sessions older than `max_age`. Returns how many were removed.
pub fn cleanup_old_sessions(store: &dyn SessionStore, max_age: Duration) -> usize {
    let removed = store
        .list_expired(max_age, Local::now())
        .iter()
        .filter(|id| store.delete(id))
        .count();
    if removed > 0 {
        tracing::info!(removed, "expired upload sessions purged");
    }
    removed
}

#[cfg(test)]
mod tests {
    use super::*;

    const DAY: Duration = Duration::from_secs(24 * 3600);

    #[test]
    fn record_tracks_counts_and_completion() {
        let mut session = UploadSession::new("s", 2);
        session.record(true);
        assert_eq!(session.status, SessionStatus::Processing);
        session.record(false);
        assert_eq!((session.processed, session.success, session.errors), (2, 1, 1));
        assert_eq!(session.status, SessionStatus::Completed);
    }

    #[test]
    fn progress_snapshot() {
        let mut session = UploadSession::new("s", 4);
        let start = session.start_time;
        assert_eq!(session.progress(start).estimated_remaining, 0.0);

        session.record(true);
        let progress = session.progress(start + chrono::Duration::seconds(10));
        assert_eq!(progress.progress_percent, 25.0);
        assert_eq!(progress.elapsed_time, 10.0);
        assert_eq!(progress.estimated_remaining, 30.0);
        assert_eq!(progress.status, SessionStatus::Processing);

        let empty = UploadSession::new("e", 0).progress(start);
        assert_eq!(empty.progress_percent, 0.0);
    }

    #[test]
    fn session_ids_have_timestamp_format() {
        let id = new_session_id();
        let rest = id.strip_prefix("upload_").unwrap();
        let parts: Vec<_> = rest.split('_').collect();
        assert_eq!(parts.len(), 3);
        assert_eq!(parts[0].len(), 8);
        assert_eq!(parts[1].len(), 6);
        assert_eq!(parts[2].len(), 6);
        assert!(rest.chars().all(|c| c.is_ascii_digit() || c == '_'));
    }

    #[test]
    fn store_get_put_update_delete() {
        let store = InMemorySessionStore::new();
        let session = create_upload_session(&store, 3);
        assert_eq!(store.get(&session.session_id), Some(session.clone()));

        assert!(store.update(&session.session_id, &mut |s: &mut UploadSession| s.record(true)));
        assert_eq!(store.get(&session.session_id).unwrap().success, 1);
        assert!(!store.update("missing", &mut |s: &mut UploadSession| s.record(true)));

        assert!(store.delete(&session.session_id));
        assert!(!store.delete(&session.session_id));
        assert!(store.is_empty());
    }

    #[test]
    fn cleanup_removes_only_expired_sessions() {
        let store = InMemorySessionStore::new();
        let mut old = UploadSession::new("old", 1);
        old.start_time = Local::now() - chrono::Duration::hours(25);
        store.put(old);
        store.put(UploadSession::new("fresh", 1));

        assert_eq!(cleanup_old_sessions(&store, DAY), 1);
        assert!(store.get("old").is_none());
        assert!(store.get("fresh").is_some());
        assert_eq!(cleanup_old_sessions(&store, DAY), 0);
    }

    #[test]
    fn default_update_goes_through_get_and_put() {
        struct Plain(std::sync::Mutex<Option<UploadSession>>);
        impl SessionStore for Plain {
            fn get(&self, _: &str) -> Option<UploadSession> {
                self.0.lock().unwrap().clone()
            }
            fn put(&self, session: UploadSession) {
                *self.0.lock().unwrap() = Some(session);
            }
            fn delete(&self, _: &str) -> bool {
                self.0.lock().unwrap().take().is_some()
            }
            fn list_expired(&self, _: Duration, _: DateTime<Local>) -> Vec<String> {
                vec![]
            }
        }

        let store = Plain(std::sync::Mutex::new(Some(UploadSession::new("p", 1))));
        assert!(store.update("p", &mut |s: &mut UploadSession| s.mark_failed()));
        assert_eq!(store.get("p").unwrap().status, SessionStatus::Failed);
    }
}
