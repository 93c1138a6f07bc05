//! Partial build-info records and their persistence.

use serde::{Deserialize, Serialize};

pub mod client;
pub mod store;

pub use client::{ArtifactoryClient, BuildInfoService, ClientError, PublishedBuildInfo};
pub use store::{PartialsStore, StoreError};

/// Version-control details of a build.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Vcs {
    /// Remote URL of the repository.
    #[serde(rename = "vcsUrl", default)]
    pub url: String,
    /// Revision (commit id) checked out at the time of the build.
    #[serde(rename = "vcsRevision", default)]
    pub revision: String,
}

/// Issue tracker descriptor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tracker {
    /// Tracker name (e.g. "JIRA").
    pub name: String,
    /// Tracker version, left empty when unknown.
    #[serde(default)]
    pub version: String,
}

/// A single issue referenced by a commit in the build.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AffectedIssue {
    /// Issue key as captured from the commit subject.
    pub key: String,
    /// Link to the issue, empty when no tracker URL is configured.
    #[serde(default)]
    pub url: String,
    /// Issue summary as captured from the commit subject.
    pub summary: String,
    /// Whether the issue was aggregated from a previous build.
    pub aggregated: bool,
}

/// Issues section of a partial build-info record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Issues {
    /// Tracker the issues belong to.
    pub tracker: Tracker,
    /// Whether issues of previous builds should be aggregated into this one.
    pub aggregate_build_issues: bool,
    /// Build status that stops aggregation.
    pub aggregation_build_status: String,
    /// Issues found in the commit log.
    pub affected_issues: Vec<AffectedIssue>,
}

/// An incremental fragment of a build's metadata.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Partial {
    /// Creation time in milliseconds since the Unix epoch.
    pub timestamp: i64,
    /// Version-control details.
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub vcs: Option<Vcs>,
    /// Issues collected from the commit log.
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub issues: Option<Issues>,
}

impl Partial {
    /// Creates an empty partial stamped with the current time.
    pub fn now() -> Self {
        Self {
            timestamp: chrono::Utc::now().timestamp_millis(),
            vcs: None,
            issues: None,
        }
    }
}

/// General details recorded once per build.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BuildDetails {
    /// Time the first fragment of this build was recorded.
    pub started_at: chrono::DateTime<chrono::Utc>,
}
