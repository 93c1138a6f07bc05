//! Server configuration for repository manager connections.
//!
//! Servers are read from a YAML file (by default `$HOME/.buildinfo-git/servers.yaml`):
//!
//! ```yaml
//! servers:
//!   - serverId: main
//!     url: https://artifacts.example.com/artifactory
//!     accessToken: example-token
//!     isDefault: true
//! ```

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::utils::settings::{config_dir, get_env_var};

/// Environment variable overriding the servers file location.
pub const SERVERS_FILE_ENV: &str = "BUILDINFO_GIT_SERVERS_FILE";

/// Server lookup errors.
#[derive(Error, Debug)]
pub enum ServerError {
    /// The registry has no servers at all.
    #[error("No servers are configured")]
    NoServersConfigured,

    /// No server id was given and no default could be chosen.
    #[error("No default server is configured")]
    NoDefaultServer,

    /// The requested server id is unknown.
    #[error("Server ID '{0}' does not exist")]
    ServerNotFound(String),

    /// The servers file could not be read.
    #[error("Failed to read servers file {}", .path.display())]
    Read {
        /// Servers file path.
        path: PathBuf,
        /// Underlying error.
        #[source]
        source: std::io::Error,
    },

    /// The servers file is not valid YAML.
    #[error("Failed to parse servers file {}", .path.display())]
    Parse {
        /// Servers file path.
        path: PathBuf,
        /// Underlying error.
        #[source]
        source: serde_yaml::Error,
    },

    /// The servers file location could not be determined.
    #[error("Failed to locate servers file: {0}")]
    Location(String),
}

/// Connection details of a repository manager.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ServerDetails {
    /// Identifier referenced by `issues.serverID`.
    pub server_id: String,
    /// Base URL, always ending with `/` once loaded through the registry.
    pub url: String,
    /// User for basic authentication.
    #[serde(default)]
    pub user: Option<String>,
    /// Password for basic authentication.
    #[serde(default)]
    pub password: Option<String>,
    /// Access token, preferred over basic authentication.
    #[serde(default)]
    pub access_token: Option<String>,
    /// Whether this server is used when no id is given.
    #[serde(default)]
    pub is_default: bool,
}

#[derive(Debug, Default, Deserialize)]
struct ServersFile {
    #[serde(default)]
    servers: Vec<ServerDetails>,
}

/// Registry of configured servers.
#[derive(Debug, Clone, Default)]
pub struct ServerRegistry {
    servers: Vec<ServerDetails>,
}

impl ServerRegistry {
    /// Creates a registry from already loaded servers.
    pub fn from_servers(servers: Vec<ServerDetails>) -> Self {
        let servers = servers
            .into_iter()
            .map(|mut server| {
                if !server.url.ends_with('/') {
                    server.url.push('/');
                }
                server
            })
            .collect();
        Self { servers }
    }

    /// Loads the registry from the configured location.
    ///
    /// `BUILDINFO_GIT_SERVERS_FILE` overrides the default path.
    pub fn load() -> Result<Self, ServerError> {
        let path = match get_env_var(SERVERS_FILE_ENV) {
            Ok(path) => PathBuf::from(path),
            Err(_) => config_dir()
                .map_err(|e| ServerError::Location(e.to_string()))?
                .join("servers.yaml"),
        };
        Self::load_from_path(path)
    }

    /// Loads the registry from a specific file. A missing file yields an empty registry.
    pub fn load_from_path<P: AsRef<Path>>(path: P) -> Result<Self, ServerError> {
        let path = path.as_ref();
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = fs::read_to_string(path).map_err(|source| ServerError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let file: ServersFile =
            serde_yaml::from_str(&content).map_err(|source| ServerError::Parse {
                path: path.to_path_buf(),
                source,
            })?;

        Ok(Self::from_servers(file.servers))
    }

    /// Resolves a server id. An empty id selects the default server.
    pub fn get(&self, server_id: &str) -> Result<ServerDetails, ServerError> {
        if self.servers.is_empty() {
            return Err(ServerError::NoServersConfigured);
        }

        if server_id.is_empty() {
            if let Some(server) = self.servers.iter().find(|s| s.is_default) {
                return Ok(server.clone());
            }
            if let [only] = self.servers.as_slice() {
                return Ok(only.clone());
            }
            return Err(ServerError::NoDefaultServer);
        }

        self.servers
            .iter()
            .find(|s| s.server_id == server_id)
            .cloned()
            .ok_or_else(|| ServerError::ServerNotFound(server_id.to_string()))
    }
}
