//! Local persistence of partial build-info records.

use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::debug;

use super::{BuildDetails, Partial};
use crate::utils::settings::get_env_var;

/// Environment variable overriding the builds directory.
pub const BUILDS_DIR_ENV: &str = "BUILDINFO_GIT_BUILDS_DIR";

const DETAILS_FILE: &str = "details.json";
const PARTIALS_DIR: &str = "partials";

/// Partials store errors.
#[derive(Error, Debug)]
pub enum StoreError {
    /// Filesystem operation failed.
    #[error("Failed to {action} {}", .path.display())]
    Io {
        /// What was being attempted.
        action: &'static str,
        /// Path involved.
        path: PathBuf,
        /// Underlying error.
        #[source]
        source: io::Error,
    },

    /// Record could not be serialized.
    #[error("Failed to serialize build-info record")]
    Serialize(#[from] serde_json::Error),
}

/// Stores build-info fragments as JSON files, one directory per build.
#[derive(Debug, Clone)]
pub struct PartialsStore {
    root: PathBuf,
}

impl PartialsStore {
    /// Creates a store rooted at the given directory.
    pub fn new<P: Into<PathBuf>>(root: P) -> Self {
        Self { root: root.into() }
    }

    /// Creates a store at the configured location.
    ///
    /// Uses `BUILDINFO_GIT_BUILDS_DIR` when set (environment or settings file),
    /// otherwise `<tmp>/buildinfo-git/builds`.
    pub fn from_env() -> Self {
        let root = get_env_var(BUILDS_DIR_ENV).map_or_else(
            |_| std::env::temp_dir().join("buildinfo-git").join("builds"),
            PathBuf::from,
        );
        Self::new(root)
    }

    /// Returns the directory holding all fragments of a build.
    pub fn build_dir(&self, build_name: &str, build_number: &str) -> PathBuf {
        self.root.join(format!(
            "{}_{}",
            sanitize(build_name),
            sanitize(build_number)
        ))
    }

    /// Records the build's general details unless they already exist.
    pub fn save_build_general_details(
        &self,
        build_name: &str,
        build_number: &str,
    ) -> Result<(), StoreError> {
        let dir = self.build_dir(build_name, build_number);
        let path = dir.join(DETAILS_FILE);
        if path.exists() {
            return Ok(());
        }

        create_dir(&dir)?;
        let details = BuildDetails {
            started_at: chrono::Utc::now(),
        };
        let content = serde_json::to_vec_pretty(&details)?;
        fs::write(&path, content).map_err(|source| StoreError::Io {
            action: "write",
            path: path.clone(),
            source,
        })?;

        debug!("Recorded build details at {}", path.display());
        Ok(())
    }

    /// Persists a partial, returning the path it was written to.
    pub fn save_partial(
        &self,
        build_name: &str,
        build_number: &str,
        partial: &Partial,
    ) -> Result<PathBuf, StoreError> {
        let dir = self
            .build_dir(build_name, build_number)
            .join(PARTIALS_DIR);
        create_dir(&dir)?;

        let content = serde_json::to_vec_pretty(partial)?;
        let mut attempt = 0u32;
        loop {
            let path = dir.join(format!("{}-{attempt}.json", partial.timestamp));
            match fs::OpenOptions::new()
                .write(true)
                .create_new(true)
                .open(&path)
            {
                Ok(mut file) => {
                    file.write_all(&content)
                        .map_err(|source| StoreError::Io {
                            action: "write",
                            path: path.clone(),
                            source,
                        })?;
                    debug!("Saved partial build-info to {}", path.display());
                    return Ok(path);
                }
                Err(e) if e.kind() == io::ErrorKind::AlreadyExists => attempt += 1,
                Err(source) => {
                    return Err(StoreError::Io {
                        action: "create",
                        path,
                        source,
                    })
                }
            }
        }
    }

    /// Loads all partials recorded for a build, oldest first.
    pub fn load_partials(
        &self,
        build_name: &str,
        build_number: &str,
    ) -> Result<Vec<Partial>, StoreError> {
        let dir = self
            .build_dir(build_name, build_number)
            .join(PARTIALS_DIR);
        if !dir.exists() {
            return Ok(Vec::new());
        }

        let entries = fs::read_dir(&dir).map_err(|source| StoreError::Io {
            action: "read",
            path: dir.clone(),
            source,
        })?;

        let mut partials = Vec::new();
        for entry in entries {
            let path = entry
                .map_err(|source| StoreError::Io {
                    action: "read",
                    path: dir.clone(),
                    source,
                })?
                .path();
            let content = fs::read(&path).map_err(|source| StoreError::Io {
                action: "read",
                path: path.clone(),
                source,
            })?;
            partials.push(serde_json::from_slice::<Partial>(&content)?);
        }
        partials.sort_by_key(|p| p.timestamp);

        Ok(partials)
    }
}

fn create_dir(dir: &Path) -> Result<(), StoreError> {
    fs::create_dir_all(dir).map_err(|source| StoreError::Io {
        action: "create",
        path: dir.to_path_buf(),
        source,
    })
}

/// Maps a build name or number to a safe directory name component.
fn sanitize(value: &str) -> String {
    value
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '-') {
                c
            } else {
                '_'
            }
        })
        .collect()
}
