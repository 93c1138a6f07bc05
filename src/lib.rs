//! # buildinfo-git
//!
//! Collects git provenance for a build and cross-references its commit log
//! against an issue tracker.
//!
//! The pipeline reads an issues configuration, streams a bounded window of
//! commit subjects, extracts issue keys and summaries with a user-supplied
//! regular expression, and stores the result alongside the revision and
//! remote url as a partial build-info record.
//!
//! ## Quick Start
//!
//! ```no_run
//! use buildinfo_git::add_git::{AddGit, AddGitConfiguration};
//!
//! # async fn example() -> anyhow::Result<()> {
//! let runner = AddGit::from_env()?;
//! let partial = runner
//!     .run(&AddGitConfiguration {
//!         build_name: "my-build".to_string(),
//!         build_number: "17".to_string(),
//!         dot_git_path: None,
//!         config_file_path: Some("issues.yaml".into()),
//!     })
//!     .await?;
//! println!("{:?}", partial.vcs);
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![deny(unsafe_code)]

pub mod add_git;
pub mod buildinfo;
pub mod cli;
pub mod config;
pub mod git;
pub mod issues;
pub mod utils;

pub use crate::cli::Cli;

/// The current version of buildinfo-git.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
