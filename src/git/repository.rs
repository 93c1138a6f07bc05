//! Git repository operations

use std::path::Path;

use anyhow::{Context, Result};
use git2::Repository;
use url::Url;

use crate::buildinfo::Vcs;

/// Remote consulted first when reading the repository URL.
const DEFAULT_REMOTE: &str = "origin";

/// Git repository wrapper
pub struct GitRepository {
    repo: Repository,
}

impl GitRepository {
    /// Open repository at specified path
    pub fn open_at<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let repo = Repository::open(path)
            .with_context(|| format!("Failed to open git repository at {}", path.display()))?;

        Ok(Self { repo })
    }

    /// Returns the remote URL, preferring `origin` over other remotes.
    ///
    /// Credentials embedded in http(s) URLs are removed.
    pub fn remote_url(&self) -> Result<String> {
        if let Ok(remote) = self.repo.find_remote(DEFAULT_REMOTE) {
            if let Some(url) = remote.url() {
                return Ok(strip_credentials(url));
            }
        }

        let remote_names = self.repo.remotes().context("Failed to get remote names")?;
        for name in remote_names.iter().flatten() {
            if let Ok(remote) = self.repo.find_remote(name) {
                if let Some(url) = remote.url() {
                    return Ok(strip_credentials(url));
                }
            }
        }

        anyhow::bail!("Repository has no remote with a URL")
    }

    /// Returns the full hash of the HEAD commit.
    pub fn revision(&self) -> Result<String> {
        let head = self.repo.head().context("Failed to get HEAD reference")?;
        let commit = head
            .peel_to_commit()
            .context("Failed to peel HEAD to commit")?;

        Ok(commit.id().to_string())
    }

    /// Reads the remote URL and current revision.
    pub fn vcs_info(&self) -> Result<Vcs> {
        Ok(Vcs {
            url: self.remote_url()?,
            revision: self.revision()?,
        })
    }
}

/// Removes `user:password@` from http(s) URLs; other URLs are returned unchanged.
pub fn strip_credentials(raw: &str) -> String {
    match Url::parse(raw) {
        Ok(mut url) if matches!(url.scheme(), "http" | "https") => {
            if url.username().is_empty() && url.password().is_none() {
                return raw.to_string();
            }
            // Both setters only fail for URLs that cannot carry credentials
            let _ = url.set_username("");
            let _ = url.set_password(None);
            url.to_string()
        }
        _ => raw.to_string(),
    }
}
