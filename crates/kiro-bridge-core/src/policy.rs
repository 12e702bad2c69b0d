use std::fmt;

use crate::SyncError;

/// How a batch operation treats a failing item.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailurePolicy {
    /// Record the failure and move on to the next item.
    CollectErrors,
    /// Stop at the first failure and return it.
    FailFast,
}

impl FailurePolicy {
    pub fn from_fail_fast(fail_fast: bool) -> Self {
        if fail_fast {
            FailurePolicy::FailFast
        } else {
            FailurePolicy::CollectErrors
        }
    }

    /// Apply the policy to one item's error: either hand it back to the
    /// caller or push it onto `failures`.
    pub fn absorb(
        &self,
        item: impl Into<String>,
        error: SyncError,
        failures: &mut Vec<ItemFailure>,
    ) -> Result<(), SyncError> {
        match self {
            FailurePolicy::FailFast => Err(error),
            FailurePolicy::CollectErrors => {
                failures.push(ItemFailure {
                    item: item.into(),
                    error,
                });
                Ok(())
            }
        }
    }
}

#[derive(Debug)]
pub struct ItemFailure {
    pub item: String,
    pub error: SyncError,
}

impl fmt::Display for ItemFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.item, self.error)
    }
}
