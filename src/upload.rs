//! Upload pipeline with observable progress.
//!
//! An [`UploadSession`] is an explicit context owned by the caller: it holds
//! the retry policy, running counters, and a broadcast channel of
//! [`UploadEvent`]s. Observers call [`UploadSession::subscribe`] and stop
//! receiving events by dropping the returned [`UploadSubscription`].
//!
//! # Per-file workflow
//!
//! 1. Emit `queued`, read the file.
//! 2. Store a placeholder [`DocumentRecord`] with status `uploading`.
//! 3. Put the bytes at `uploads/<id>/<file_name>`, retrying with
//!    exponential backoff (`base_delay × 2^(attempt-1)`).
//! 4. Mark the record `processing` (awaiting text extraction), or `failed`
//!    with the last error once retries run out.

use anyhow::{bail, Context, Result};
use globset::{Glob, GlobSet, GlobSetBuilder};
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::time::Duration;
use tokio::sync::broadcast;
use tracing::{info, warn};
use walkdir::WalkDir;

use docsift_core::models::{DocumentRecord, DocumentStatus};
use docsift_core::store::{BlobStore, DocumentStore};

use crate::config::{Config, UploadConfig};
use crate::progress::ProgressMode;

const EVENT_BUFFER: usize = 256;

/// One step in the life of a single file upload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum UploadEvent {
    Queued {
        file_name: String,
    },
    Started {
        file_name: String,
        attempt: u32,
    },
    Retrying {
        file_name: String,
        attempt: u32,
        delay_ms: u64,
        error: String,
    },
    Completed {
        file_name: String,
        id: String,
        storage_path: String,
    },
    Failed {
        file_name: String,
        error: String,
    },
}

/// Snapshot of a session's progress.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct UploadCounters {
    /// Announced but not yet started.
    pub queued: usize,
    /// Currently transferring, including retries.
    pub active: usize,
    pub completed: usize,
    pub failed: usize,
}

#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub base_delay: Duration,
}

impl RetryPolicy {
    /// Delay before retrying after failed attempt number `attempt` (1-based).
    pub fn delay(&self, attempt: u32) -> Duration {
        let factor = 2u32.saturating_pow(attempt.saturating_sub(1));
        self.base_delay.saturating_mul(factor)
    }
}

impl From<&UploadConfig> for RetryPolicy {
    fn from(config: &UploadConfig) -> Self {
        Self {
            max_retries: config.max_retries,
            base_delay: Duration::from_millis(config.retry_base_delay_ms),
        }
    }
}

pub struct UploadSession {
    policy: RetryPolicy,
    counters: Mutex<UploadCounters>,
    events: broadcast::Sender<UploadEvent>,
}

/// A live view of a session's events. Drop it to unsubscribe.
pub struct UploadSubscription {
    rx: broadcast::Receiver<UploadEvent>,
}

impl UploadSubscription {
    /// Next event, or `None` once the session is gone.
    pub async fn next(&mut self) -> Option<UploadEvent> {
        loop {
            match self.rx.recv().await {
                Ok(event) => return Some(event),
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    warn!(skipped, "upload observer fell behind; events dropped");
                }
                Err(broadcast::error::RecvError::Closed) => return None,
            }
        }
    }
}

impl UploadSession {
    pub fn new(policy: RetryPolicy) -> Self {
        let (events, _) = broadcast::channel(EVENT_BUFFER);
        Self {
            policy,
            counters: Mutex::new(UploadCounters::default()),
            events,
        }
    }

    pub fn subscribe(&self) -> UploadSubscription {
        UploadSubscription {
            rx: self.events.subscribe(),
        }
    }

    pub fn observer_count(&self) -> usize {
        self.events.receiver_count()
    }

    pub fn counters(&self) -> UploadCounters {
        *self.counters.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub fn policy(&self) -> RetryPolicy {
        self.policy
    }

    fn emit(&self, event: UploadEvent) {
        {
            let mut c = self.counters.lock().unwrap_or_else(|e| e.into_inner());
            match &event {
                UploadEvent::Queued { .. } => c.queued += 1,
                UploadEvent::Started { attempt: 1, .. } => {
                    c.queued = c.queued.saturating_sub(1);
                    c.active += 1;
                }
                UploadEvent::Started { .. } | UploadEvent::Retrying { .. } => {}
                UploadEvent::Completed { .. } => {
                    c.active = c.active.saturating_sub(1);
                    c.completed += 1;
                }
                UploadEvent::Failed { .. } => {
                    c.active = c.active.saturating_sub(1);
                    c.failed += 1;
                }
            }
        }
        // No observers is fine.
        let _ = self.events.send(event);
    }
}

/// Blob path for an uploaded file.
pub fn storage_path_for(id: &str, file_name: &str) -> String {
    format!("uploads/{}/{}", id, file_name)
}

/// Upload one file and track it in the document store.
///
/// Returns the final record: `processing` on success, `failed` once retries
/// are exhausted. Errors only when the file cannot be read or the store
/// cannot be written; the session still sees a `failed` event then.
pub async fn upload_file<S, B>(
    session: &UploadSession,
    store: &S,
    blobs: &B,
    path: &Path,
) -> Result<DocumentRecord>
where
    S: DocumentStore + ?Sized,
    B: BlobStore + ?Sized,
{
    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .with_context(|| format!("Not a file path: {}", path.display()))?;

    session.emit(UploadEvent::Queued {
        file_name: file_name.clone(),
    });

    let mut started = false;
    let result = transfer(session, store, blobs, path, &file_name, &mut started).await;
    if let Err(e) = &result {
        if !started {
            session.emit(UploadEvent::Started {
                file_name: file_name.clone(),
                attempt: 1,
            });
        }
        warn!(file = %file_name, error = %format!("{:#}", e), "upload aborted");
        session.emit(UploadEvent::Failed {
            file_name,
            error: format!("{:#}", e),
        });
    }
    result
}

/// Everything after `queued`. Sets `started` once the first attempt is announced.
async fn transfer<S, B>(
    session: &UploadSession,
    store: &S,
    blobs: &B,
    path: &Path,
    file_name: &str,
    started: &mut bool,
) -> Result<DocumentRecord>
where
    S: DocumentStore + ?Sized,
    B: BlobStore + ?Sized,
{
    let bytes = tokio::fs::read(path)
        .await
        .with_context(|| format!("Failed to read {}", path.display()))?;

    let mut doc = DocumentRecord::new(
        file_name,
        bytes.len() as u64,
        detect_content_type(file_name),
    );
    store.upsert_document(&doc).await?;

    let storage_path = storage_path_for(&doc.id, file_name);
    let policy = session.policy();
    let mut attempt = 1;
    let outcome = loop {
        session.emit(UploadEvent::Started {
            file_name: file_name.to_string(),
            attempt,
        });
        *started = true;
        match blobs
            .put(&storage_path, bytes.clone(), &doc.content_type)
            .await
        {
            Ok(()) => break Ok(()),
            Err(e) if attempt <= policy.max_retries => {
                let delay = policy.delay(attempt);
                warn!(file = %file_name, attempt, error = %e, "upload attempt failed; retrying");
                session.emit(UploadEvent::Retrying {
                    file_name: file_name.to_string(),
                    attempt,
                    delay_ms: delay.as_millis() as u64,
                    error: format!("{:#}", e),
                });
                tokio::time::sleep(delay).await;
                attempt += 1;
            }
            Err(e) => break Err(e),
        }
    };

    // Terminal events follow a successful store write.
    match outcome {
        Ok(()) => {
            doc.storage_path = Some(storage_path.clone());
            doc.status = DocumentStatus::Processing;
            store.upsert_document(&doc).await?;
            info!(file = %file_name, id = %doc.id, "upload complete");
            session.emit(UploadEvent::Completed {
                file_name: file_name.to_string(),
                id: doc.id.clone(),
                storage_path,
            });
        }
        Err(e) => {
            let error = format!("{:#}", e);
            doc.status = DocumentStatus::Failed;
            doc.error = Some(error.clone());
            store.upsert_document(&doc).await?;
            warn!(file = %file_name, id = %doc.id, error = %error, "upload failed");
            session.emit(UploadEvent::Failed {
                file_name: file_name.to_string(),
                error,
            });
        }
    }

    Ok(doc)
}

/// Guess a MIME type from the file extension.
pub fn detect_content_type(file_name: &str) -> String {
    let ext = Path::new(file_name)
        .extension()
        .map(|e| e.to_string_lossy().to_lowercase());
    match ext.as_deref() {
        Some("pdf") => "application/pdf",
        Some("md") => "text/markdown",
        Some("txt") => "text/plain",
        Some("csv") => "text/csv",
        Some("json") => "application/json",
        Some("yaml" | "yml") => "text/yaml",
        Some("html" | "htm") => "text/html",
        Some("doc") => "application/msword",
        Some("docx") => "application/vnd.openxmlformats-officedocument.wordprocessingml.document",
        Some("xlsx") => "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet",
        Some("pptx") => "application/vnd.openxmlformats-officedocument.presentationml.presentation",
        Some("png") => "image/png",
        Some("jpg" | "jpeg") => "image/jpeg",
        Some("gif") => "image/gif",
        _ => "application/octet-stream",
    }
    .to_string()
}

fn build_globset(patterns: &[String]) -> Result<GlobSet> {
    let mut builder = GlobSetBuilder::new();
    for pattern in patterns {
        builder.add(Glob::new(pattern)?);
    }
    Ok(builder.build()?)
}

/// Expand the given files and directories into the list of files to upload.
///
/// Files named explicitly are always taken. Directories are walked and
/// their files kept when the path relative to the directory matches an
/// include glob and no exclude glob.
pub fn collect_upload_paths(
    paths: &[PathBuf],
    include: &[String],
    exclude: &[String],
) -> Result<Vec<PathBuf>> {
    let include_set = build_globset(include)?;
    let exclude_set = build_globset(exclude)?;

    let mut files = Vec::new();
    for path in paths {
        if path.is_file() {
            files.push(path.clone());
            continue;
        }
        if !path.is_dir() {
            bail!("No such file or directory: {}", path.display());
        }

        let mut found = Vec::new();
        for entry in WalkDir::new(path) {
            let entry = entry?;
            if !entry.file_type().is_file() {
                continue;
            }
            let rel = entry.path().strip_prefix(path).unwrap_or(entry.path());
            if include_set.is_match(rel) && !exclude_set.is_match(rel) {
                found.push(entry.into_path());
            }
        }
        found.sort();
        files.extend(found);
    }

    files.dedup();
    Ok(files)
}

/// Upload files sequentially through one session, printing progress.
pub async fn upload_all<S, B>(
    session: &UploadSession,
    store: &S,
    blobs: &B,
    files: &[PathBuf],
) -> Vec<Result<DocumentRecord>>
where
    S: DocumentStore + ?Sized,
    B: BlobStore + ?Sized,
{
    let mut results = Vec::with_capacity(files.len());
    for file in files {
        results.push(upload_file(session, store, blobs, file).await);
    }
    results
}

/// `docsift upload`: collect paths, upload them, report progress on stderr
/// and print one line per uploaded record on stdout.
pub async fn run_upload(
    config: &Config,
    paths: &[PathBuf],
    progress: Option<ProgressMode>,
) -> Result<()> {
    let files = collect_upload_paths(
        paths,
        &config.upload.include_globs,
        &config.upload.exclude_globs,
    )?;
    if files.is_empty() {
        println!("No files to upload.");
        return Ok(());
    }

    let backends = crate::backends::Backends::open(config).await?;
    let session = UploadSession::new(RetryPolicy::from(&config.upload));

    let reporter = progress.unwrap_or_else(ProgressMode::default_for_tty).reporter();
    let mut sub = session.subscribe();
    let printer = tokio::spawn(async move {
        while let Some(event) = sub.next().await {
            reporter.report(&event);
        }
        reporter
    });

    let results = upload_all(&session, &backends.store, &*backends.blobs, &files).await;
    let counters = session.counters();
    drop(session);
    if let Ok(reporter) = printer.await {
        reporter.finish(&counters);
    }

    for result in &results {
        match result {
            Ok(doc) => println!("{}\t{}\t{}", doc.id, doc.status.as_str(), doc.file_name),
            Err(e) => eprintln!("Error: {:#}", e),
        }
    }
    backends.close().await;

    let errors = results.iter().filter(|r| r.is_err()).count();
    let failed = counters.failed.max(errors);
    if failed > 0 {
        bail!("{} of {} uploads failed", failed, files.len());
    }
    Ok(())
}
