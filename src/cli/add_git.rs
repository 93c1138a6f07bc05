//! Add-git command: records git details and affected issues of a build.

use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;

use crate::add_git::{AddGit, AddGitConfiguration};

/// Add-git command options.
#[derive(Parser)]
pub struct AddGitCommand {
    /// Build name.
    #[arg(value_name = "BUILD_NAME")]
    pub build_name: String,

    /// Build number.
    #[arg(value_name = "BUILD_NUMBER")]
    pub build_number: String,

    /// Directory containing the .git directory (defaults to searching upwards from the current directory).
    #[arg(value_name = "DOT_GIT_PATH")]
    pub dot_git_path: Option<PathBuf>,

    /// YAML file describing how to collect issues from the commit log.
    #[arg(long, value_name = "FILE")]
    pub config: Option<PathBuf>,
}

impl AddGitCommand {
    /// Executes the add-git command.
    pub async fn execute(self) -> Result<()> {
        let runner = AddGit::from_env()?;
        let configuration = AddGitConfiguration {
            build_name: self.build_name,
            build_number: self.build_number,
            dot_git_path: self.dot_git_path,
            config_file_path: self.config,
        };

        let partial = runner.run(&configuration).await?;

        if let Some(vcs) = &partial.vcs {
            println!("Revision: {}", vcs.revision);
            println!("Url: {}", vcs.url);
        }
        if let Some(issues) = &partial.issues {
            println!("Affected issues: {}", issues.affected_issues.len());
        }

        Ok(())
    }
}
