//! Git operations: repository metadata and commit log access.

use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};

pub mod log;
pub mod repository;

pub use log::{GitLog, LogError, LogQuery, LogSource};
pub use repository::GitRepository;

/// Number of hex characters to show in abbreviated commit hashes.
pub const SHORT_HASH_LEN: usize = 8;

/// Maximum number of commits read when collecting issues.
pub const GIT_LOG_LIMIT: usize = 100;

/// Finds the repository root, the closest directory at or above `start` containing `.git`.
pub fn find_repository_root<P: AsRef<Path>>(start: P) -> Result<PathBuf> {
    let start = start.as_ref();
    let start = start
        .canonicalize()
        .with_context(|| format!("Failed to resolve path: {}", start.display()))?;

    for dir in start.ancestors() {
        if dir.join(".git").exists() {
            return Ok(dir.to_path_buf());
        }
    }

    bail!("Could not find .git in {} or any parent directory", start.display())
}

/// Returns the abbreviated form of a commit hash.
pub fn short_hash(hash: &str) -> &str {
    hash.get(..SHORT_HASH_LEN).unwrap_or(hash)
}
