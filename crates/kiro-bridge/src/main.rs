use std::path::Path;

use anyhow::{bail, Context, Result};
use clap::Parser;
use kiro_bridge::config::{sync_options, task_source, Cli, Command, GitHubConfig};
use kiro_bridge::materializer::{materialize_pr, PrOutcome, PrRequest};
use kiro_bridge::orchestrator::PlanningDocuments;
use kiro_bridge::pr_template::{find_task, render_pr_template, TemplateInputs, GENERIC_TASK};
use kiro_bridge::sections::extract_acceptance_criteria;
use kiro_bridge::synchronizer::{synchronize, SyncRequest};
use kiro_bridge::task_parser::{parse_tasks, parse_tasks_file};
use kiro_bridge_core::{FailurePolicy, TaskNumber};
use kiro_bridge_tracker::{GitCli, GitHubTracker};
use tracing::{error, info, warn};

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Command::Sync {
            project_name,
            requirements,
            design,
            tasks,
            milestone,
            fail_fast,
            native_links,
        } => {
            let tracker = connect(&cli.github)?;
            let request = SyncRequest {
                project_name,
                documents: PlanningDocuments {
                    requirements,
                    design,
                    tasks,
                },
                milestone_name: milestone,
                options: sync_options(fail_fast, native_links),
            };

            let outcome = synchronize(&tracker, &request).await?;
            for failure in &outcome.report.failures {
                error!("{failure}");
            }
            info!("{}", outcome.report.summary());
            println!("{}", serde_json::to_string_pretty(&outcome.summary())?);
        }
        Command::Pr {
            task_number,
            branch,
            base,
            repo_dir,
            requirements,
            keep_going,
        } => {
            let Some(source) = task_source(task_number.as_deref(), branch.as_deref()) else {
                bail!("no task number: pass --task-number or --branch (GITHUB_REF_NAME)");
            };
            let Some(head) = branch.filter(|b| !b.trim().is_empty()) else {
                bail!("no branch to open the pull request from: pass --branch");
            };

            let acceptance_criteria = match requirements {
                Some(path) => extract_acceptance_criteria(&read_document(&path)?),
                None => Vec::new(),
            };

            let tracker = connect(&cli.github)?;
            let git = GitCli::new(repo_dir);
            let request = PrRequest {
                source,
                head,
                base,
                acceptance_criteria,
                policy: if keep_going {
                    FailurePolicy::CollectErrors
                } else {
                    FailurePolicy::FailFast
                },
            };

            let outcome = materialize_pr(&tracker, &git, &request).await?;
            match &outcome {
                PrOutcome::Existing(pr) => {
                    info!("pull request #{} already exists: {}", pr.number, pr.url);
                }
                PrOutcome::Created { warnings, .. } => {
                    for warning in warnings {
                        warn!("{warning}");
                    }
                }
            }
            println!("{}", outcome.number());
        }
        Command::Parse { tasks } => {
            let content = read_document(&tasks)?;
            let records = parse_tasks(&content);
            if records.is_empty() {
                warn!("no task blocks found in {}", tasks.display());
            }
            println!("{}", serde_json::to_string_pretty(&records)?);
        }
        Command::Template {
            requirements,
            design,
            tasks,
            task_number,
        } => {
            let inputs =
                TemplateInputs::from_documents(&read_document(&requirements)?, &read_document(&design)?);

            let template = match task_number.as_deref().map(str::trim).filter(|n| !n.is_empty()) {
                Some(raw) => {
                    let number = TaskNumber::parse_str(raw)
                        .with_context(|| format!("invalid task number {raw:?}"))?;
                    let records = parse_tasks_file(&tasks);
                    let task = find_task(&records, &number).with_context(|| {
                        format!("task {number} not found in {}", tasks.display())
                    })?;
                    render_pr_template(&task.number, &task.title, &inputs)
                }
                None => render_pr_template(GENERIC_TASK.0, GENERIC_TASK.1, &inputs),
            };
            print!("{template}");
        }
    }

    Ok(())
}

fn connect(config: &GitHubConfig) -> Result<GitHubTracker> {
    let Some(repo) = config.repo.as_deref() else {
        bail!("no repository: pass --repo owner/name or set GITHUB_REPOSITORY");
    };
    if config.token.is_none() {
        warn!("no GITHUB_TOKEN set; write operations will fail");
    }
    let tracker = GitHubTracker::new(
        &config.api_url,
        repo,
        config.token.clone(),
        config.request_timeout(),
    )
    .context("failed to set up GitHub client")?;
    info!("repository: {}", tracker.repository());
    Ok(tracker)
}

fn read_document(path: &Path) -> Result<String> {
    std::fs::read_to_string(path).with_context(|| format!("failed to read {}", path.display()))
}
