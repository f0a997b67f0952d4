//! Bounded worker pool for batch ingestion.
//!
//! Files go onto one shared queue; `min(max_workers, files)` workers pull from
//! it until it is empty. Each worker owns one persistence session for its
//! whole lifetime and runs the blocking pipeline on the blocking thread pool
//! under a per-file timeout. Outcomes are appended under a single lock, and the
//! progress callback runs under that same lock, so progress is reported
//! strictly in order from 1 to N.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;

use pdfmeta_core::{Config, MetadataSource};
use pdfmeta_ingest::MetadataExtractor;
use pdfmeta_store::{
    ArticleSession, ArticleStore, FileStorage, FsStorage, PersistenceError, SqliteArticleStore,
};

use crate::session::{SessionStore, UploadSession};
use crate::{
    BatchError, BatchResult, CommitGate, FileError, FileFailure, FileOutcome, Pipeline,
    UploadedFile, validate_batch,
};

/// Receives `(completed, total)` after every recorded outcome.
pub type ProgressCallback = Arc<dyn Fn(usize, usize) + Send + Sync>;

/// Optional hooks for a batch run.
#[derive(Clone, Default)]
pub struct BatchOptions {
    pub progress: Option<ProgressCallback>,
    /// Checked before each file is dequeued. Files still queued when it fires
    /// are recorded as cancelled.
    pub cancel: CancellationToken,
    pub session: Option<(Arc<dyn SessionStore>, String)>,
}

impl BatchOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_progress(mut self, progress: impl Fn(usize, usize) + Send + Sync + 'static) -> Self {
        self.progress = Some(Arc::new(progress));
        self
    }

    pub fn with_cancel(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    /// Mirror progress into an upload session already registered in `store`.
    pub fn with_session(mut self, store: Arc<dyn SessionStore>, session_id: impl Into<String>) -> Self {
        self.session = Some((store, session_id.into()));
        self
    }
}

pub struct BatchIngestionCoordinator {
    pipeline: Pipeline,
    store: Arc<dyn ArticleStore>,
    max_workers: usize,
    max_files_per_batch: usize,
    per_file_timeout: Duration,
}

impl BatchIngestionCoordinator {
    pub fn new(pipeline: Pipeline, store: Arc<dyn ArticleStore>) -> Self {
        let defaults = Config::default();
        Self {
            pipeline,
            store,
            max_workers: defaults.max_workers,
            max_files_per_batch: defaults.max_files_per_batch,
            per_file_timeout: defaults.per_file_timeout,
        }
    }

    /// Wire up filesystem storage, the default extractor chain and the SQLite
    /// article store from `config`.
    pub fn from_config(config: &Config) -> Result<Self, PersistenceError> {
        let storage: Arc<dyn FileStorage> = Arc::new(
            FsStorage::new(&config.upload_dir)
                .with_allowed_extensions(config.allowed_extensions.clone())
                .with_max_bytes(config.max_upload_bytes),
        );
        let metadata: Arc<dyn MetadataSource> = Arc::new(MetadataExtractor::from_config(config));
        let store: Arc<dyn ArticleStore> = Arc::new(SqliteArticleStore::open(&config.database_path)?);

        Ok(
            Self::new(Pipeline::new(storage, metadata, config.catalog.clone()), store)
                .with_max_workers(config.max_workers)
                .with_max_files_per_batch(config.max_files_per_batch)
                .with_per_file_timeout(config.per_file_timeout),
        )
    }

    pub fn with_max_workers(mut self, max_workers: usize) -> Self {
        self.max_workers = max_workers.max(1);
        self
    }

    pub fn with_max_files_per_batch(mut self, max_files: usize) -> Self {
        self.max_files_per_batch = max_files;
        self
    }

    pub fn with_per_file_timeout(mut self, timeout: Duration) -> Self {
        self.per_file_timeout = timeout;
        self
    }

    pub fn max_files_per_batch(&self) -> usize {
        self.max_files_per_batch
    }

    pub fn validate(&self, files: &[UploadedFile]) -> Result<(), BatchError> {
        validate_batch(files, self.max_files_per_batch)
    }

    /// Process a batch, reporting `(completed, total)` after each file.
    pub async fn process_files(
        &self,
        files: Vec<UploadedFile>,
        progress: Option<ProgressCallback>,
    ) -> Result<BatchResult, BatchError> {
        let options = BatchOptions {
            progress,
            ..BatchOptions::default()
        };
        self.process_files_tracked(files, options).await
    }

    /// Process a batch with cancellation and upload-session tracking.
    ///
    /// Only request validation fails the call; every per-file problem ends up
    /// in [`BatchResult::error_details`].
    pub async fn process_files_tracked(
        &self,
        files: Vec<UploadedFile>,
        options: BatchOptions,
    ) -> Result<BatchResult, BatchError> {
        self.validate(&files)?;

        let total = files.len();
        let num_workers = self.max_workers.min(total).max(1);
        tracing::info!(total, workers = num_workers, "batch started");

        let (tx, rx) = async_channel::bounded::<UploadedFile>(total);
        for file in files {
            // Capacity equals the batch size, so this never waits.
            let _ = tx.send(file).await;
        }
        tx.close();

        let shared = Arc::new(Shared {
            pipeline: self.pipeline.clone(),
            store: Arc::clone(&self.store),
            per_file_timeout: self.per_file_timeout,
            cancel: options.cancel,
            progress: options.progress,
            session: options.session.clone(),
            total,
            state: Mutex::new(BatchState::default()),
        });

        let mut workers = JoinSet::new();
        for worker_id in 0..num_workers {
            workers.spawn(worker_loop(worker_id, rx.clone(), Arc::clone(&shared)));
        }
        drop(rx);

        while let Some(joined) = workers.join_next().await {
            if let Err(e) = joined {
                tracing::error!(error = %e, "batch worker exited abnormally");
            }
        }

        let state = std::mem::take(&mut *shared.state.lock().unwrap_or_else(|e| e.into_inner()));
        let result = BatchResult {
            total,
            success: state.results.len(),
            errors: state.failures.len(),
            results: state.results,
            error_details: state.failures,
        };
        tracing::info!(
            total,
            success = result.success,
            errors = result.errors,
            "batch finished"
        );

        if let Some((store, session_id)) = &options.session {
            let finished = result.clone();
            store.update(session_id, &mut |s: &mut UploadSession| s.finish(finished.clone()));
        }

        Ok(result)
    }
}

#[derive(Default)]
struct BatchState {
    results: Vec<FileOutcome>,
    failures: Vec<FileFailure>,
}

/// State shared by the workers of one batch.
struct Shared {
    pipeline: Pipeline,
    store: Arc<dyn ArticleStore>,
    per_file_timeout: Duration,
    cancel: CancellationToken,
    progress: Option<ProgressCallback>,
    session: Option<(Arc<dyn SessionStore>, String)>,
    total: usize,
    state: Mutex<BatchState>,
}

impl Shared {
    fn record(&self, filename: String, outcome: Result<FileOutcome, FileError>) {
        let mut state = self.state.lock().unwrap_or_else(|e| e.into_inner());
        let success = outcome.is_ok();
        match outcome {
            Ok(outcome) => {
                tracing::info!(
                    file = %filename,
                    article_id = outcome.article_id,
                    confidence = outcome.confidence,
                    "file ingested"
                );
                state.results.push(outcome);
            }
            Err(error) => {
                tracing::error!(file = %filename, error = %error, "file failed");
                state.failures.push(FileFailure { filename, error });
            }
        }
        let completed = state.results.len() + state.failures.len();

        if let Some((store, session_id)) = &self.session {
            store.update(session_id, &mut |s: &mut UploadSession| s.record(success));
        }
        if let Some(progress) = &self.progress {
            progress(completed, self.total);
        }
    }
}

async fn worker_loop(
    worker_id: usize,
    rx: async_channel::Receiver<UploadedFile>,
    shared: Arc<Shared>,
) {
    // Opened lazily and reused for every file this worker handles; dropped
    // (closing the connection) when the loop exits.
    let mut session: Option<Box<dyn ArticleSession>> = None;

    while let Ok(file) = rx.recv().await {
        let filename = file.filename.clone();

        if shared.cancel.is_cancelled() {
            tracing::debug!(worker_id, file = %filename, "skipping: cancelled");
            shared.record(filename, Err(FileError::Cancelled));
            continue;
        }

        tracing::debug!(worker_id, file = %filename, "processing");
        let outcome = run_file(&shared, &mut session, file).await;
        shared.record(filename, outcome);
    }
}

/// Run the pipeline for one file on the blocking pool, bounded by the
/// per-file timeout. The worker's session travels into the blocking task and
/// comes back with the result; on timeout or panic it is lost and a fresh one
/// is opened for the next file.
///
/// On timeout the file is abandoned through its [`CommitGate`], so the task
/// still running in the background discards the upload instead of
/// persisting. If the task already started committing, the timeout yields
/// and the real outcome is awaited.
async fn run_file(
    shared: &Shared,
    session: &mut Option<Box<dyn ArticleSession>>,
    file: UploadedFile,
) -> Result<FileOutcome, FileError> {
    let pipeline = shared.pipeline.clone();
    let store = Arc::clone(&shared.store);
    let held = session.take();
    let gate = CommitGate::new();
    let task_gate = gate.clone();

    let mut task = tokio::task::spawn_blocking(move || {
        let mut active = match held {
            Some(s) => s,
            None => match store.open_session() {
                Ok(s) => s,
                Err(e) => return (Err(FileError::Persistence(e.to_string())), None),
            },
        };
        let outcome = pipeline.process(&mut *active, &file, &task_gate);
        (outcome, Some(active))
    });

    let joined = match tokio::time::timeout(shared.per_file_timeout, &mut task).await {
        Ok(joined) => joined,
        // The blocking task keeps running and discards its upload once it
        // sees the abandoned gate.
        Err(_) if gate.abandon() => return Err(FileError::Timeout(shared.per_file_timeout)),
        Err(_) => task.await,
    };

    match joined {
        Ok((outcome, returned)) => {
            *session = returned;
            outcome
        }
        Err(join_err) => Err(FileError::Panicked(join_err.to_string())),
    }
}
