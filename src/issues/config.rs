//! Issues configuration resolution.
//!
//! The configuration file carries an `issues` section:
//!
//! ```yaml
//! issues:
//!   serverID: main
//!   trackerName: JIRA
//!   trackerUrl: https://jira.example.com/browse
//!   regexp: '(\w+-\d+): (.+)'
//!   keyGroupIndex: 1
//!   summaryGroupIndex: 2
//!   aggregate: "true"
//!   aggregationStatus: RELEASED
//! ```

use std::path::Path;

use anyhow::Context;
use serde_yaml::{Mapping, Value};

use super::IssuesError;
use crate::config::{ServerDetails, ServerRegistry};
use crate::git::GIT_LOG_LIMIT;

const ISSUES_SECTION: &str = "issues";

/// Validated settings for collecting issues from the commit log.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IssuesConfiguration {
    /// Name of the issue tracker.
    pub tracker_name: String,
    /// Prefix of issue links, empty or ending with `/`.
    pub tracker_url: String,
    /// Regular expression recognizing issue references in commit subjects.
    pub pattern: String,
    /// Number of most recent commits to scan.
    pub log_limit: usize,
    /// Capture group holding the issue key.
    pub key_group_index: usize,
    /// Capture group holding the issue summary.
    pub summary_group_index: usize,
    /// Whether issues of previous builds are aggregated.
    pub aggregate: bool,
    /// Build status that stops aggregation.
    pub aggregation_status: String,
    /// Repository manager holding the previously published build-info.
    pub server: ServerDetails,
}

impl IssuesConfiguration {
    /// Reads and resolves a YAML configuration file.
    pub fn load<P: AsRef<Path>>(path: P, servers: &ServerRegistry) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read configuration file: {}", path.display()))?;
        let document: Value = serde_yaml::from_str(&content)
            .with_context(|| format!("Failed to parse configuration file: {}", path.display()))?;

        Ok(Self::resolve(&document, servers)?)
    }

    /// Resolves the `issues` section of a parsed configuration document.
    pub fn resolve(document: &Value, servers: &ServerRegistry) -> Result<Self, IssuesError> {
        let section = document
            .get(ISSUES_SECTION)
            .and_then(Value::as_mapping)
            .ok_or_else(|| IssuesError::MissingConfiguration(ISSUES_SECTION.to_string()))?;
        let section = Section(section);

        let server_id = section.require("serverID")?;
        if server_id.is_empty() {
            return Err(missing("serverID"));
        }
        let server = servers.get(&server_id)?;

        let tracker_name = section.require("trackerName")?;
        let pattern = section.require("regexp")?;

        let mut tracker_url = section.get("trackerUrl").unwrap_or_default();
        if !tracker_url.is_empty() && !tracker_url.ends_with('/') {
            tracker_url.push('/');
        }

        let key_group_index = parse_index("keyGroupIndex", &section.require("keyGroupIndex")?)?;
        let summary_group_index =
            parse_index("summaryGroupIndex", &section.require("summaryGroupIndex")?)?;

        let aggregate = match section.get("aggregate") {
            Some(value) => parse_bool(&value).ok_or_else(|| IssuesError::ParseValue {
                key: qualified("aggregate"),
                message: format!("invalid boolean value \"{value}\""),
            })?,
            None => false,
        };
        let aggregation_status = section.get("aggregationStatus").unwrap_or_default();

        Ok(Self {
            tracker_name,
            tracker_url,
            pattern,
            log_limit: GIT_LOG_LIMIT,
            key_group_index,
            summary_group_index,
            aggregate,
            aggregation_status,
            server,
        })
    }
}

/// The `issues` mapping, read as strings.
struct Section<'a>(&'a Mapping);

impl Section<'_> {
    /// Returns the string form of a scalar value; `null` and collections count as absent.
    fn get(&self, key: &str) -> Option<String> {
        match self.0.get(key)? {
            Value::String(s) => Some(s.clone()),
            Value::Number(n) => Some(n.to_string()),
            Value::Bool(b) => Some(b.to_string()),
            Value::Tagged(tagged) => match &tagged.value {
                Value::String(s) => Some(s.clone()),
                _ => None,
            },
            Value::Null | Value::Sequence(_) | Value::Mapping(_) => None,
        }
    }

    fn require(&self, key: &str) -> Result<String, IssuesError> {
        self.get(key).ok_or_else(|| missing(key))
    }
}

fn qualified(key: &str) -> String {
    format!("{ISSUES_SECTION}.{key}")
}

fn missing(key: &str) -> IssuesError {
    IssuesError::MissingConfiguration(qualified(key))
}

fn parse_index(key: &str, value: &str) -> Result<usize, IssuesError> {
    value
        .trim()
        .parse::<usize>()
        .map_err(|e| IssuesError::ParseValue {
            key: qualified(key),
            message: e.to_string(),
        })
}

/// Parses the boolean spellings accepted in configuration files.
fn parse_bool(value: &str) -> Option<bool> {
    match value {
        "1" | "t" | "T" | "TRUE" | "true" | "True" => Some(true),
        "0" | "f" | "F" | "FALSE" | "false" | "False" => Some(false),
        _ => None,
    }
}
