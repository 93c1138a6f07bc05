//! CLI interface for buildinfo-git.

use anyhow::Result;
use clap::{Parser, Subcommand};

pub mod add_git;

pub use add_git::AddGitCommand;

/// buildinfo-git: Records git details and affected issues for builds.
#[derive(Parser)]
#[command(name = "buildinfo-git")]
#[command(about = "Records git details and affected issues for builds", long_about = None)]
#[command(version)]
pub struct Cli {
    /// The main command to execute.
    #[command(subcommand)]
    pub command: Commands,
}

/// Main command categories.
#[derive(Subcommand)]
pub enum Commands {
    /// Collects the git revision, remote url and affected issues of a build.
    #[command(name = "add-git")]
    AddGit(AddGitCommand),
}

impl Cli {
    /// Executes the CLI command.
    pub async fn execute(self) -> Result<()> {
        match self.command {
            Commands::AddGit(add_git_cmd) => add_git_cmd.execute().await,
        }
    }
}
