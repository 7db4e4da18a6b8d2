//! Aggregate results of batch sync operations
//!
//! Batch operations never fail because a single item failed; they collect
//! per-item errors and report counts.

use serde::{Deserialize, Serialize};

/// One failed item inside a batch
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemFailure {
    pub item_id: String,
    pub message: String,
}

/// Outcome of a push or pull batch
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SyncReport {
    pub created: usize,
    pub updated: usize,
    pub failed: usize,
    pub skipped: usize,
    pub errors: Vec<ItemFailure>,
}

impl SyncReport {
    pub fn record_failure(&mut self, item_id: impl Into<String>, message: impl Into<String>) {
        self.failed += 1;
        self.errors.push(ItemFailure { item_id: item_id.into(), message: message.into() });
    }

    /// Total provider/persistence writes performed by the batch
    pub fn writes(&self) -> usize {
        self.created + self.updated
    }

    pub fn is_clean(&self) -> bool {
        self.failed == 0
    }
}

/// Outcome of an orphan cleanup pass
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CleanupReport {
    pub deleted: usize,
    pub failed: usize,
    pub errors: Vec<ItemFailure>,
}

impl CleanupReport {
    pub fn record_failure(&mut self, event_id: impl Into<String>, message: impl Into<String>) {
        self.failed += 1;
        self.errors.push(ItemFailure { item_id: event_id.into(), message: message.into() });
    }
}
