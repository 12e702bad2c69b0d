use std::path::PathBuf;
use std::time::Duration;

use clap::{Args, Parser, Subcommand};
use kiro_bridge_core::FailurePolicy;
use kiro_bridge_tracker::github::DEFAULT_API_URL;

use crate::resolver::TaskSource;
use crate::synchronizer::SyncOptions;

#[derive(Debug, Parser)]
#[command(
    name = "kiro-bridge",
    version,
    about = "Sync Kiro planning documents with GitHub issues and pull requests"
)]
pub struct Cli {
    #[command(flatten)]
    pub github: GitHubConfig,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Clone, Args)]
pub struct GitHubConfig {
    /// Target repository, `owner/name`
    #[arg(long, global = true, env = "GITHUB_REPOSITORY")]
    pub repo: Option<String>,

    /// API token
    #[arg(long, global = true, env = "GITHUB_TOKEN", hide_env_values = true)]
    pub token: Option<String>,

    /// REST API root (GitHub Enterprise: https://host/api/v3)
    #[arg(long, global = true, env = "GITHUB_API_URL", default_value = DEFAULT_API_URL)]
    pub api_url: String,

    /// Per-request timeout (seconds)
    #[arg(long, global = true, env = "KIRO_BRIDGE_TIMEOUT", default_value = "30")]
    pub timeout: u64,
}

impl GitHubConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.timeout)
    }
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Create the milestone, epic and one issue per task
    Sync {
        /// Project name, used in the epic title
        #[arg(long)]
        project_name: String,

        #[arg(long)]
        requirements: PathBuf,

        #[arg(long)]
        design: PathBuf,

        #[arg(long)]
        tasks: PathBuf,

        /// Create a milestone with this name and attach everything to it
        #[arg(long)]
        milestone: Option<String>,

        /// Abort on the first task that fails instead of continuing
        #[arg(long)]
        fail_fast: bool,

        /// Also attach task issues to the epic as native sub-issues
        #[arg(long)]
        native_links: bool,
    },
    /// Open a pull request for a task branch
    Pr {
        /// Task number; when empty it is taken from the branch name
        #[arg(long, env = "INPUT_TASK_NUMBER")]
        task_number: Option<String>,

        /// Branch to open the PR from
        #[arg(long, env = "GITHUB_REF_NAME")]
        branch: Option<String>,

        #[arg(long, env = "INPUT_BASE_BRANCH", default_value = "main")]
        base: String,

        /// Local checkout used for the commit summary
        #[arg(long, default_value = ".")]
        repo_dir: PathBuf,

        /// Requirements document for an acceptance criteria checklist
        #[arg(long)]
        requirements: Option<PathBuf>,

        /// Log epic lookup and issue comment failures instead of failing
        #[arg(long)]
        keep_going: bool,
    },
    /// Print the task records of a tasks document as JSON
    Parse {
        #[arg(long)]
        tasks: PathBuf,
    },
    /// Print a PR description template
    Template {
        #[arg(long)]
        requirements: PathBuf,

        #[arg(long)]
        design: PathBuf,

        #[arg(long)]
        tasks: PathBuf,

        /// Task to render the template for; omitted for the generic template
        #[arg(long)]
        task_number: Option<String>,
    },
}

pub fn sync_options(fail_fast: bool, native_links: bool) -> SyncOptions {
    SyncOptions {
        policy: FailurePolicy::from_fail_fast(fail_fast),
        native_links,
    }
}

/// An explicit task number wins over the branch. Empty values count as unset,
/// since CI passes blank inputs through the environment.
pub fn task_source(task_number: Option<&str>, branch: Option<&str>) -> Option<TaskSource> {
    fn non_empty(v: Option<&str>) -> Option<&str> {
        v.map(str::trim).filter(|v| !v.is_empty())
    }

    match (non_empty(task_number), non_empty(branch)) {
        (Some(n), _) => Some(TaskSource::Explicit(n.to_string())),
        (None, Some(b)) => Some(TaskSource::Branch(b.to_string())),
        (None, None) => None,
    }
}
