//! # Durable identity ceiling.
//!
//! The ceiling is a single integer in its own file, overwritten in full on
//! every successful `set_limit`.

use std::path::PathBuf;

use tokio::fs;

/// File-backed store for the identity ceiling.
#[derive(Clone, Debug)]
pub struct LimitStore {
    path: PathBuf,
}

impl LimitStore {
    /// Creates a store over `path`.
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    /// Reads the ceiling. Returns `None` when the file is missing or does
    /// not hold a positive integer.
    pub async fn load(&self) -> Option<usize> {
        let content = fs::read_to_string(&self.path).await.ok()?;
        match content.trim().parse::<usize>() {
            Ok(n) if n >= 1 => Some(n),
            _ => {
                tracing::warn!(file = %self.path.display(), "limit file is malformed, ignoring");
                None
            }
        }
    }

    /// Overwrites the ceiling file with `limit`.
    pub async fn save(&self, limit: usize) -> std::io::Result<()> {
        fs::write(&self.path, limit.to_string()).await
    }
}
