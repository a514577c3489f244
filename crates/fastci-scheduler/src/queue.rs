//! Durable filesystem build queue.
//!
//! One file per job under the queue directory. Filenames are a zero-padded
//! enqueue timestamp plus a process-monotonic sequence number, so
//! lexicographic order is FIFO order and two jobs can never claim the same
//! name. Multiple gateway processes may enqueue; exactly one builder
//! consumes, so files need no locking: write once, read once, delete.

use fastci_core::NormalizedEvent;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};
use thiserror::Error;
use tracing::{debug, warn};

const JOB_SUFFIX: &str = ".yml";

#[derive(Debug, Error)]
pub enum QueueError {
    #[error("queue IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("job serialization error: {0}")]
    Serialize(#[from] serde_yaml::Error),
}

/// Ordered mailbox of pending build jobs.
pub struct BuildQueue {
    dir: PathBuf,
    seq: AtomicU64,
}

impl BuildQueue {
    /// Open the queue, creating the directory if needed.
    pub fn new(dir: &Path) -> std::io::Result<Self> {
        std::fs::create_dir_all(dir)?;
        Ok(Self {
            dir: dir.to_path_buf(),
            seq: AtomicU64::new(0),
        })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Durably enqueue an event as a new job file.
    ///
    /// The YAML is written to a temporary name and hard-linked into place,
    /// so the consumer can never observe a partial file. A name collision
    /// bumps the sequence number and retries instead of overwriting.
    pub async fn enqueue(&self, event: &NormalizedEvent) -> Result<PathBuf, QueueError> {
        let yaml = serde_yaml::to_string(event)?;
        let secs = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_secs();

        let tmp = self.dir.join(format!(
            ".tmp-{}-{}",
            std::process::id(),
            self.seq.fetch_add(1, Ordering::SeqCst)
        ));
        tokio::fs::write(&tmp, &yaml).await?;

        loop {
            let seq = self.seq.fetch_add(1, Ordering::SeqCst);
            let path = self.dir.join(format!("{secs:012}-{seq:08}{JOB_SUFFIX}"));
            match tokio::fs::hard_link(&tmp, &path).await {
                Ok(()) => {
                    let _ = tokio::fs::remove_file(&tmp).await;
                    debug!(path = %path.display(), "job enqueued");
                    return Ok(path);
                }
                Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => continue,
                Err(e) => {
                    let _ = tokio::fs::remove_file(&tmp).await;
                    return Err(e.into());
                }
            }
        }
    }

    /// Path of the oldest pending job, if any.
    pub async fn peek_oldest(&self) -> Result<Option<PathBuf>, QueueError> {
        let mut names = Vec::new();
        let mut entries = tokio::fs::read_dir(&self.dir).await?;
        while let Some(entry) = entries.next_entry().await? {
            let name = entry.file_name().to_string_lossy().into_owned();
            if name.ends_with(JOB_SUFFIX) {
                names.push(name);
            }
        }
        names.sort();
        Ok(names.first().map(|name| self.dir.join(name)))
    }

    /// Read a job's contents and remove it from the queue. The file
    /// leaves the queue even when it cannot be read, so a corrupt job is
    /// never retried.
    pub async fn consume(&self, path: &Path) -> Result<String, QueueError> {
        let contents = tokio::fs::read_to_string(path).await;
        if let Err(e) = tokio::fs::remove_file(path).await {
            warn!(path = %path.display(), error = %e, "could not remove consumed job file");
        }
        Ok(contents?)
    }

    /// Discard every pending job. Used once at builder startup so jobs
    /// left over from a crashed run are never replayed.
    pub async fn clear(&self) -> Result<usize, QueueError> {
        let mut removed = 0;
        let mut entries = tokio::fs::read_dir(&self.dir).await?;
        while let Some(entry) = entries.next_entry().await? {
            if entry.file_type().await?.is_file() {
                tokio::fs::remove_file(entry.path()).await?;
                removed += 1;
            }
        }
        Ok(removed)
    }
}
