pub mod error;
pub mod issue;
pub mod policy;
pub mod task;

pub use error::{SyncError, TrackerError};
pub use issue::{Epic, EpicLink, IssueRef, IssueState, PullRequestRef};
pub use policy::{FailurePolicy, ItemFailure};
pub use task::{TaskNumber, TaskRecord};
