//! Issue references extracted from the commit log.

pub mod collector;
pub mod config;
pub mod error;
pub mod pattern;

pub use collector::IssueCollector;
pub use config::IssuesConfiguration;
pub use error::IssuesError;
pub use pattern::PatternMatcher;
