//! The observable output sequence.
//!
//! Entries are append-only: once appended they are never mutated, and the
//! only way to remove them is an explicit [`Journal::clear`]. Readers take
//! snapshots; appends are cheap and never block an in-flight read.

use std::sync::{Arc, Mutex};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Classification of a single output line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntryKind {
    Info,
    Error,
}

/// One timestamped line in the observable output sequence.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutputEntry {
    pub timestamp: DateTime<Utc>,
    pub kind: EntryKind,
    pub text: String,
}

/// Append-only journal of [`OutputEntry`] values.
///
/// Cloning the journal clones a handle to the same sequence.
#[derive(Debug, Clone, Default)]
pub struct Journal {
    entries: Arc<Mutex<Vec<OutputEntry>>>,
}

impl Journal {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append one entry stamped with the current time.
    pub fn append(&self, kind: EntryKind, text: impl Into<String>) {
        let entry = OutputEntry {
            timestamp: Utc::now(),
            kind,
            text: text.into(),
        };
        self.lock().push(entry);
    }

    /// Snapshot of all entries in append order.
    pub fn snapshot(&self) -> Vec<OutputEntry> {
        self.lock().clone()
    }

    /// Entries appended after `since` (an index from a previous snapshot).
    pub fn since(&self, since: usize) -> Vec<OutputEntry> {
        self.lock().iter().skip(since).cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    /// Drop all entries. The only mutation the sequence permits.
    pub fn clear(&self) {
        self.lock().clear();
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Vec<OutputEntry>> {
        // A poisoned journal still holds valid entries; keep appending.
        self.entries
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }
}
