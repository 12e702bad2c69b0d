use std::path::{Path, PathBuf};

use async_trait::async_trait;
use kiro_bridge_core::TrackerError;
use tokio::process::Command;
use tracing::debug;

use crate::CommitLog;

/// Reads commit history with the local `git` binary.
#[derive(Debug, Clone)]
pub struct GitCli {
    repo_dir: PathBuf,
}

impl GitCli {
    pub fn new(repo_dir: impl Into<PathBuf>) -> Self {
        Self {
            repo_dir: repo_dir.into(),
        }
    }

    pub fn repo_dir(&self) -> &Path {
        &self.repo_dir
    }
}

#[async_trait]
impl CommitLog for GitCli {
    async fn commit_subjects_between(
        &self,
        base: &str,
        head: &str,
    ) -> Result<Vec<String>, TrackerError> {
        let range = format!("{base}..{head}");
        let output = Command::new("git")
            .args(["log", "--pretty=format:%s", &range])
            .current_dir(&self.repo_dir)
            .output()
            .await
            .map_err(|e| TrackerError::Other(format!("git log: {e}")))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(TrackerError::Other(format!(
                "git log {range} failed: {}",
                stderr.trim()
            )));
        }

        let subjects: Vec<String> = String::from_utf8_lossy(&output.stdout)
            .lines()
            .map(str::trim)
            .filter(|l| !l.is_empty())
            .map(str::to_string)
            .collect();
        debug!("git log {range}: {} commits", subjects.len());
        Ok(subjects)
    }
}
