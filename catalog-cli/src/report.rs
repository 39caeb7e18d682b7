//! Per-item results for the extract and load commands
//!
//! Each processed image or CSV row produces an [`ItemOutcome`]. A
//! [`RunReport`] collects them so the caller can print a summary, and
//! [`FailurePolicy`] decides whether a failing item aborts the run or is
//! recorded and skipped.

use anyhow::Result;
use std::fmt;
use std::path::PathBuf;

/// What to do when a single image or row fails
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FailurePolicy {
    /// Abort on the first failing item
    #[default]
    FailFast,
    /// Record the failure and continue with the next item
    KeepGoing,
}

impl FailurePolicy {
    pub fn from_keep_going(keep_going: bool) -> Self {
        if keep_going {
            Self::KeepGoing
        } else {
            Self::FailFast
        }
    }
}

/// Final state of one processed item
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ItemStatus {
    /// Image written to disk
    Saved(PathBuf),
    /// Document created remotely, with the store-assigned id
    Created(String),
    /// Item intentionally not processed
    Skipped(String),
    /// Item failed; holds the error chain
    Failed(String),
}

/// Result of processing a single image or row
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ItemOutcome {
    /// Human readable label, e.g. "row 5" or "line 3"
    pub item: String,
    pub status: ItemStatus,
}

impl ItemOutcome {
    pub fn saved(item: impl Into<String>, path: impl Into<PathBuf>) -> Self {
        Self {
            item: item.into(),
            status: ItemStatus::Saved(path.into()),
        }
    }

    pub fn created(item: impl Into<String>, document_id: impl Into<String>) -> Self {
        Self {
            item: item.into(),
            status: ItemStatus::Created(document_id.into()),
        }
    }

    pub fn skipped(item: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            item: item.into(),
            status: ItemStatus::Skipped(reason.into()),
        }
    }

    pub fn failed(item: impl Into<String>, error: &anyhow::Error) -> Self {
        Self {
            item: item.into(),
            status: ItemStatus::Failed(format!("{:#}", error)),
        }
    }

    pub fn is_failure(&self) -> bool {
        matches!(self.status, ItemStatus::Failed(_))
    }
}

impl fmt::Display for ItemOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.status {
            ItemStatus::Saved(path) => write!(f, "{}: saved {}", self.item, path.display()),
            ItemStatus::Created(id) => write!(f, "{}: created document {}", self.item, id),
            ItemStatus::Skipped(reason) => write!(f, "{}: skipped ({})", self.item, reason),
            ItemStatus::Failed(error) => write!(f, "{}: failed: {}", self.item, error),
        }
    }
}

/// Accumulated outcomes of a whole run
#[derive(Debug, Clone, Default)]
pub struct RunReport {
    outcomes: Vec<ItemOutcome>,
}

impl RunReport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, outcome: ItemOutcome) {
        self.outcomes.push(outcome);
    }

    /// Record the result of one item according to `policy`.
    ///
    /// Under [`FailurePolicy::FailFast`] an error is returned unchanged so the
    /// caller's `?` aborts the run. Under [`FailurePolicy::KeepGoing`] it is
    /// stored as a failed outcome and `Ok(())` is returned.
    pub fn handle(
        &mut self,
        policy: FailurePolicy,
        item: &str,
        result: Result<ItemOutcome>,
    ) -> Result<()> {
        match result {
            Ok(outcome) => {
                self.record(outcome);
                Ok(())
            }
            Err(err) => match policy {
                FailurePolicy::FailFast => Err(err),
                FailurePolicy::KeepGoing => {
                    log::warn!("{} failed: {:#}", item, err);
                    self.record(ItemOutcome::failed(item, &err));
                    Ok(())
                }
            },
        }
    }

    #[cfg(test)]
    pub fn outcomes(&self) -> &[ItemOutcome] {
        &self.outcomes
    }

    pub fn saved_count(&self) -> usize {
        self.count(|s| matches!(s, ItemStatus::Saved(_)))
    }

    pub fn created_count(&self) -> usize {
        self.count(|s| matches!(s, ItemStatus::Created(_)))
    }

    pub fn skipped_count(&self) -> usize {
        self.count(|s| matches!(s, ItemStatus::Skipped(_)))
    }

    pub fn failed_count(&self) -> usize {
        self.count(|s| matches!(s, ItemStatus::Failed(_)))
    }

    pub fn failures(&self) -> impl Iterator<Item = &ItemOutcome> {
        self.outcomes.iter().filter(|o| o.is_failure())
    }

    pub fn is_success(&self) -> bool {
        self.failed_count() == 0
    }

    fn count(&self, pred: impl Fn(&ItemStatus) -> bool) -> usize {
        self.outcomes.iter().filter(|o| pred(&o.status)).count()
    }
}
