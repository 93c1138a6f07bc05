//! Records git provenance and affected issues for a build.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use tracing::info;

use crate::buildinfo::{
    AffectedIssue, ArtifactoryClient, BuildInfoService, ClientError, Issues, Partial,
    PartialsStore, Tracker,
};
use crate::config::{ServerDetails, ServerRegistry};
use crate::git::{self, GitLog, GitRepository};
use crate::issues::{IssueCollector, IssuesConfiguration};

/// Inputs of a single `add-git` run.
#[derive(Debug, Clone, Default)]
pub struct AddGitConfiguration {
    /// Build name.
    pub build_name: String,
    /// Build number.
    pub build_number: String,
    /// Directory containing `.git`; searched for upwards from the current directory when absent.
    pub dot_git_path: Option<PathBuf>,
    /// Issues configuration file; issues are collected only when set.
    pub config_file_path: Option<PathBuf>,
}

/// Connects to the repository manager of a resolved server.
pub type Connect<S> = Box<dyn Fn(&ServerDetails) -> Result<S, ClientError> + Send + Sync>;

fn connect_artifactory(server: &ServerDetails) -> Result<ArtifactoryClient, ClientError> {
    ArtifactoryClient::new(server.clone())
}

/// Collects VCS details and issues into a partial build-info record.
pub struct AddGit<S> {
    servers: ServerRegistry,
    store: PartialsStore,
    connect: Connect<S>,
}

impl AddGit<ArtifactoryClient> {
    /// Creates a runner using the configured servers file and builds directory.
    pub fn from_env() -> Result<Self> {
        let servers = ServerRegistry::load().context("Failed to load server configuration")?;
        Ok(Self::new(
            servers,
            PartialsStore::from_env(),
            Box::new(connect_artifactory),
        ))
    }
}

impl<S: BuildInfoService> AddGit<S> {
    /// Creates a runner from its collaborators.
    pub fn new(servers: ServerRegistry, store: PartialsStore, connect: Connect<S>) -> Self {
        Self {
            servers,
            store,
            connect,
        }
    }

    /// Runs the collection and persists the resulting partial, which is also returned.
    pub async fn run(&self, config: &AddGitConfiguration) -> Result<Partial> {
        info!("Collecting git revision and remote url...");
        self.store
            .save_build_general_details(&config.build_name, &config.build_number)
            .context("Failed to record build details")?;

        let repository_root = match &config.dot_git_path {
            Some(path) => git::find_repository_root(path)?,
            None => {
                let cwd = std::env::current_dir().context("Failed to get current directory")?;
                git::find_repository_root(cwd)?
            }
        };

        let vcs = GitRepository::open_at(&repository_root)?
            .vcs_info()
            .context("Failed to read git revision and remote url")?;

        let mut partial = Partial::now();
        if let Some(config_file) = &config.config_file_path {
            let (issues_config, affected_issues) = self
                .collect_issues(&config.build_name, &repository_root, config_file)
                .await?;
            partial.issues = Some(Issues {
                tracker: Tracker {
                    name: issues_config.tracker_name,
                    version: String::new(),
                },
                aggregate_build_issues: issues_config.aggregate,
                aggregation_build_status: issues_config.aggregation_status,
                affected_issues,
            });
        }
        partial.vcs = Some(vcs);

        self.store
            .save_partial(&config.build_name, &config.build_number, &partial)
            .context("Failed to save partial build-info")?;

        info!(
            "Collected VCS details for {}/{}.",
            config.build_name, config.build_number
        );
        Ok(partial)
    }

    async fn collect_issues(
        &self,
        build_name: &str,
        repository_root: &Path,
        config_file: &Path,
    ) -> Result<(IssuesConfiguration, Vec<AffectedIssue>)> {
        info!("Collecting build issues from VCS...");

        let issues_config = IssuesConfiguration::load(config_file, &self.servers)?;
        let collector = IssueCollector::new(&issues_config, GitLog::new())?;

        let service = (self.connect)(&collector.config().server)?;
        let last_revision = service
            .latest_build_info(build_name)
            .await
            .context("Failed to fetch the latest published build-info")?
            .map(|published| published.vcs_revision().to_string())
            .unwrap_or_default();
        if last_revision.is_empty() {
            info!("No previous revision found for {build_name}, scanning the latest commits");
        } else {
            info!(
                "Collecting issues from commits after {}",
                git::short_hash(&last_revision)
            );
        }

        // Reading the log blocks on the git process
        let repository_root = repository_root.to_path_buf();
        let issues = tokio::task::spawn_blocking(move || {
            collector.collect(&repository_root, &last_revision)
        })
        .await
        .context("Issue collection task failed")??;
        Ok((issues_config, issues))
    }
}
