pub mod git;
pub mod github;
pub mod mock;
mod traits;

pub use git::GitCli;
pub use github::GitHubTracker;
pub use kiro_bridge_core::TrackerError;
pub use traits::{CommitLog, Tracker};
