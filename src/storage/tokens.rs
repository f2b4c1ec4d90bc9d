//! # Credential extraction and token files.
//!
//! Credentials are scanned out of arbitrary text with a fixed lexical
//! pattern: digits, a colon, then an alphanumeric/hyphen/underscore run.
//! Extraction is tolerant by design — token files may contain comments,
//! blank lines, or whole exported chat logs.

use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use regex::Regex;
use tokio::fs;

use crate::platform::Credential;

/// Lexical pattern for one credential: 6-10 digits, colon, 20+ chars of
/// `[A-Za-z0-9_-]`.
const TOKEN_PATTERN: &str = r"\d{6,10}:[A-Za-z0-9_-]{20,}";

fn token_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(TOKEN_PATTERN).expect("token pattern is valid"))
}

/// Scans `text` for credentials, in order of appearance.
pub fn extract_credentials(text: &str) -> Vec<Credential> {
    token_regex()
        .find_iter(text)
        .map(|m| Credential::new(m.as_str()))
        .collect()
}

/// True if `text` is exactly one credential (inline token paste).
pub fn is_single_credential(text: &str) -> bool {
    let trimmed = text.trim();
    token_regex()
        .find(trimmed)
        .is_some_and(|m| m.start() == 0 && m.end() == trimmed.len())
}

/// Credential source files plus the overflow spillover file.
#[derive(Clone, Debug)]
pub struct TokenStore {
    sources: Vec<PathBuf>,
    overflow: PathBuf,
}

impl TokenStore {
    /// Creates a store over the given source files and overflow path.
    pub fn new(sources: Vec<PathBuf>, overflow: PathBuf) -> Self {
        Self { sources, overflow }
    }

    /// Scans every source file for credentials. Missing files are skipped;
    /// read errors are logged and the remaining files are still scanned.
    pub async fn load_all(&self) -> Vec<Credential> {
        let mut all = Vec::new();
        for path in &self.sources {
            match fs::read_to_string(path).await {
                Ok(content) => {
                    let found = extract_credentials(&content);
                    tracing::info!(file = %path.display(), count = found.len(), "loaded credentials");
                    all.extend(found);
                }
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                Err(e) => {
                    tracing::warn!(file = %path.display(), error = %e, "failed to read token file");
                }
            }
        }
        all
    }

    /// Source file paths, in scan order.
    pub fn sources(&self) -> &[PathBuf] {
        &self.sources
    }

    /// Path of the overflow file.
    pub fn overflow_path(&self) -> &Path {
        &self.overflow
    }

    /// Writes the overflow file in full (not appended), one credential per
    /// line. Returns the number of credentials written.
    pub async fn save_overflow(&self, credentials: &[Credential]) -> std::io::Result<usize> {
        let mut body = String::new();
        for c in credentials {
            body.push_str(c.reveal());
            body.push('\n');
        }
        fs::write(&self.overflow, body).await?;
        Ok(credentials.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_tokens_embedded_in_noise() {
        let text = "here you go:\n1234567:AAAAAAAAAAAAAAAAAAAA-x_1\njunk 99:zz\n\
                    prefix 7557269432:AAF1scybLhu5sX4E6xkktd5jGXtCFzOz1n0 suffix";
        let found = extract_credentials(text);
        assert_eq!(found.len(), 2);
        assert_eq!(found[0].reveal(), "1234567:AAAAAAAAAAAAAAAAAAAA-x_1");
    }

    #[test]
    fn rejects_short_runs() {
        assert!(extract_credentials("12345:AAAAAAAAAAAAAAAAAAAAAA").is_empty());
        assert!(extract_credentials("1234567:short").is_empty());
    }

    #[test]
    fn single_credential_detection() {
        assert!(is_single_credential("  1234567:AAAAAAAAAAAAAAAAAAAAAA \n"));
        assert!(!is_single_credential("token 1234567:AAAAAAAAAAAAAAAAAAAAAA"));
        assert!(!is_single_credential("/stats"));
    }

    #[tokio::test]
    async fn overflow_is_overwritten_in_full() {
        let dir = tempfile::tempdir().unwrap();
        let store = TokenStore::new(vec![], dir.path().join("remaining.txt"));

        let first = vec![
            Credential::new("1111111:AAAAAAAAAAAAAAAAAAAAAA"),
            Credential::new("2222222:BBBBBBBBBBBBBBBBBBBBBB"),
        ];
        assert_eq!(store.save_overflow(&first).await.unwrap(), 2);

        let second = vec![Credential::new("3333333:CCCCCCCCCCCCCCCCCCCCCC")];
        assert_eq!(store.save_overflow(&second).await.unwrap(), 1);

        let body = tokio::fs::read_to_string(store.overflow_path()).await.unwrap();
        assert_eq!(body, "3333333:CCCCCCCCCCCCCCCCCCCCCC\n");
    }

    #[tokio::test]
    async fn load_all_skips_missing_files() {
        let dir = tempfile::tempdir().unwrap();
        let present = dir.path().join("tokens.txt");
        tokio::fs::write(&present, "1234567:AAAAAAAAAAAAAAAAAAAAAA\n")
            .await
            .unwrap();
        let store = TokenStore::new(
            vec![dir.path().join("missing.txt"), present],
            dir.path().join("remaining.txt"),
        );
        assert_eq!(store.load_all().await.len(), 1);
    }
}
