//! # Process-wide recipient directory.
//!
//! Append-only set of every recipient id ever observed across all bots:
//! loaded fully into memory at startup, deduplicated in memory, and appended
//! to on disk (one id per line) whenever a new recipient appears.
//!
//! Single durable sink, many writers (every bot supervisor); the in-memory
//! set is the source of truth for dedup, the file is write-behind.

use std::collections::HashSet;
use std::path::PathBuf;

use tokio::fs::OpenOptions;
use tokio::io::AsyncWriteExt;
use tokio::sync::RwLock;

use crate::platform::RecipientId;

/// Durable, deduplicated set of all recipient ids ever seen.
pub struct RecipientDirectory {
    path: PathBuf,
    seen: RwLock<HashSet<RecipientId>>,
}

impl RecipientDirectory {
    /// Loads the directory from `path`. A missing file reads as empty;
    /// malformed lines are skipped.
    pub async fn load(path: PathBuf) -> std::io::Result<Self> {
        let seen = match tokio::fs::read_to_string(&path).await {
            Ok(content) => content
                .lines()
                .filter_map(|line| line.trim().parse::<i64>().ok())
                .map(RecipientId)
                .collect(),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => HashSet::new(),
            Err(e) => return Err(e),
        };
        tracing::info!(file = %path.display(), count = seen.len(), "loaded recipient directory");
        Ok(Self {
            path,
            seen: RwLock::new(seen),
        })
    }

    /// Records a recipient id. Returns `true` if the id was new; new ids are
    /// appended to the durable file (append failures are logged, not fatal).
    pub async fn record(&self, id: RecipientId) -> bool {
        {
            let mut seen = self.seen.write().await;
            if !seen.insert(id) {
                return false;
            }
        }
        if let Err(e) = self.append(id).await {
            tracing::warn!(recipient = %id, error = %e, "failed to persist recipient id");
        }
        true
    }

    /// Number of distinct recipients ever seen.
    pub async fn len(&self) -> usize {
        self.seen.read().await.len()
    }

    /// True if no recipient has ever been seen.
    pub async fn is_empty(&self) -> bool {
        self.seen.read().await.is_empty()
    }

    async fn append(&self, id: RecipientId) -> std::io::Result<()> {
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .await?;
        file.write_all(format!("{}\n", id.0).as_bytes()).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn records_are_deduplicated_and_durable() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("user_ids.txt");

        let directory = RecipientDirectory::load(path.clone()).await.unwrap();
        assert!(directory.record(RecipientId(42)).await);
        assert!(!directory.record(RecipientId(42)).await);
        assert!(directory.record(RecipientId(7)).await);
        assert_eq!(directory.len().await, 2);

        // Reload from disk: same set.
        let reloaded = RecipientDirectory::load(path).await.unwrap();
        assert_eq!(reloaded.len().await, 2);
        assert!(!reloaded.record(RecipientId(7)).await);
    }

    #[tokio::test]
    async fn malformed_lines_are_skipped() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("user_ids.txt");
        tokio::fs::write(&path, "12\nnot-a-number\n34\n").await.unwrap();
        let directory = RecipientDirectory::load(path).await.unwrap();
        assert_eq!(directory.len().await, 2);
    }
}
