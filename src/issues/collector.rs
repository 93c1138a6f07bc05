//! Issue collection from the commit log.

use std::path::Path;

use tracing::{debug, info};

use super::{IssuesConfiguration, IssuesError, PatternMatcher};
use crate::buildinfo::AffectedIssue;
use crate::git::{LogQuery, LogSource};

/// Collects issues referenced by recent commit subjects.
pub struct IssueCollector<S> {
    config: IssuesConfiguration,
    matcher: PatternMatcher,
    source: S,
}

impl<S: LogSource> IssueCollector<S> {
    /// Creates a collector reading the log through `source`.
    ///
    /// Fails if the configured pattern does not compile.
    pub fn new(config: &IssuesConfiguration, source: S) -> Result<Self, IssuesError> {
        let matcher = PatternMatcher::new(&config.pattern)?;
        Ok(Self {
            config: config.clone(),
            matcher,
            source,
        })
    }

    /// The configuration issues are collected with.
    pub fn config(&self) -> &IssuesConfiguration {
        &self.config
    }

    /// Collects issues from commits after `last_revision`, newest first.
    ///
    /// An empty `last_revision` scans the most recent `log_limit` commits. Any
    /// match lacking the configured capture groups aborts the whole collection,
    /// as does a failing log command.
    pub fn collect(
        &self,
        repository_root: &Path,
        last_revision: &str,
    ) -> Result<Vec<AffectedIssue>, IssuesError> {
        let query = LogQuery::new(repository_root, self.config.log_limit, last_revision);

        let issues = self
            .source
            .log(&query)?
            .filter_map(|line| match line {
                Ok(line) => self
                    .matcher
                    .captures(&line)
                    .map(|groups| self.issue_from_match(&line, &groups)),
                Err(e) => Some(Err(e.into())),
            })
            .collect::<Result<Vec<_>, _>>()?;

        info!("Found {} issues in the git log", issues.len());
        Ok(issues)
    }

    fn issue_from_match(
        &self,
        line: &str,
        groups: &[String],
    ) -> Result<AffectedIssue, IssuesError> {
        let key_group = self.config.key_group_index;
        let summary_group = self.config.summary_group_index;
        let (Some(key), Some(summary)) = (groups.get(key_group), groups.get(summary_group)) else {
            return Err(IssuesError::CaptureGroupOutOfBounds {
                line: line.to_string(),
                groups: groups.len().saturating_sub(1),
                key_group,
                summary_group,
            });
        };

        let url = if self.config.tracker_url.is_empty() {
            String::new()
        } else {
            format!("{}{key}", self.config.tracker_url)
        };

        debug!("Found issue: {key}");
        Ok(AffectedIssue {
            key: key.clone(),
            url,
            summary: summary.clone(),
            aggregated: false,
        })
    }
}
