//! Issue collection errors.

use thiserror::Error;

use crate::config::ServerError;
use crate::git::LogError;

/// Errors raised while resolving the issues configuration or collecting issues.
#[derive(Error, Debug)]
pub enum IssuesError {
    /// A required configuration key is absent.
    #[error("Configuration file must contain: {0}")]
    MissingConfiguration(String),

    /// A configuration value could not be parsed.
    #[error("Failed parsing {key} from configuration file: {message}")]
    ParseValue {
        /// Fully qualified key (e.g. `issues.keyGroupIndex`).
        key: String,
        /// Parser message.
        message: String,
    },

    /// The issue pattern is not a valid regular expression.
    #[error("Invalid issues regular expression '{pattern}'")]
    InvalidPattern {
        /// The offending pattern.
        pattern: String,
        /// Compilation failure.
        #[source]
        source: regex::Error,
    },

    /// A configured capture group is missing from an actual match.
    #[error(
        "Unexpected result while parsing issues from git log. Make sure that the regular \
         expression used to find issues, includes two capturing groups, for the issue ID and \
         the summary (matched '{line}' with {groups} capturing groups, key group {key_group}, \
         summary group {summary_group})"
    )]
    CaptureGroupOutOfBounds {
        /// The log line that matched.
        line: String,
        /// Number of capturing groups in the match, excluding the whole match.
        groups: usize,
        /// Configured key group index.
        key_group: usize,
        /// Configured summary group index.
        summary_group: usize,
    },

    /// The configured server could not be resolved.
    #[error(transparent)]
    Server(#[from] ServerError),

    /// The commit log could not be read.
    #[error(transparent)]
    Log(#[from] LogError),
}
