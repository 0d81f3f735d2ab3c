//! Keyed store of job progress records
//!
//! The store is the only state shared between the coordinator, the progress
//! monitors and polling clients. Every write replaces a record as a whole while
//! holding the lock, so readers never observe a half-updated record.
//!
//! Rules enforced here rather than by callers:
//! - a record in a terminal state is never modified again
//! - `current` never decreases while a job is downloading
//! - `total` can only be revised while the job is still starting
//! - records disappear only through [`ProgressStore::remove`]
//! - at most one delivery claim is held per job

use crate::types::{JobId, JobStatus, Progress};
use std::collections::{HashMap, HashSet};
use std::collections::hash_map::Entry;
use std::sync::{Arc, Mutex, RwLock, RwLockReadGuard, RwLockWriteGuard};

/// Outcome of a write attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteOutcome {
    /// Record replaced
    Applied,
    /// Record already terminal; nothing changed
    Terminal,
    /// No record for this id
    Missing,
}

/// Outcome of a delivery claim
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Claim {
    /// The caller now owns the job's output
    Granted,
    /// The job has not reached a terminal state
    Running,
    /// Another delivery already holds the claim
    Taken,
}

/// Thread-safe map of job id to progress record (cheap to clone)
#[derive(Clone, Default)]
pub struct ProgressStore {
    records: Arc<RwLock<HashMap<JobId, Progress>>>,
    claimed: Arc<Mutex<HashSet<JobId>>>,
}

impl ProgressStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    // Critical sections never panic, so a poisoned lock still guards consistent data.
    fn read(&self) -> RwLockReadGuard<'_, HashMap<JobId, Progress>> {
        self.records.read().unwrap_or_else(|e| e.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, HashMap<JobId, Progress>> {
        self.records.write().unwrap_or_else(|e| e.into_inner())
    }

    /// Insert the initial record for a new job
    ///
    /// Returns `false` without touching the existing record if the id is
    /// already live, so the caller can retry with a fresh token.
    pub fn register(&self, id: &JobId, initial: Progress) -> bool {
        match self.write().entry(id.clone()) {
            Entry::Occupied(_) => false,
            Entry::Vacant(slot) => {
                slot.insert(initial);
                true
            }
        }
    }

    /// Snapshot of one record
    pub fn get(&self, id: &JobId) -> Option<Progress> {
        self.read().get(id).cloned()
    }

    /// Whether a record exists for `id`
    pub fn contains(&self, id: &JobId) -> bool {
        self.read().contains_key(id)
    }

    /// Revise the expected total of a job that has not started downloading
    pub fn set_total(&self, id: &JobId, total: u32) -> WriteOutcome {
        let mut records = self.write();
        match records.get_mut(id) {
            None => WriteOutcome::Missing,
            Some(record) if record.status != JobStatus::Starting => WriteOutcome::Terminal,
            Some(record) => {
                *record = Progress {
                    total,
                    ..record.clone()
                };
                WriteOutcome::Applied
            }
        }
    }

    /// Publish a non-terminal downloading sample
    ///
    /// The stored total is kept, and `current` is clamped so it never moves
    /// backwards within the job.
    pub fn publish_downloading(&self, id: &JobId, current: u32) -> WriteOutcome {
        let mut records = self.write();
        match records.get_mut(id) {
            None => WriteOutcome::Missing,
            Some(record) if record.status.is_terminal() => WriteOutcome::Terminal,
            Some(record) => {
                let current = if record.status == JobStatus::Downloading {
                    current.max(record.current)
                } else {
                    current
                };
                *record = Progress::downloading(current, record.total);
                WriteOutcome::Applied
            }
        }
    }

    /// Write the terminal record of a job
    ///
    /// Only the first terminal write for an id takes effect.
    pub fn finish(&self, id: &JobId, terminal: Progress) -> WriteOutcome {
        debug_assert!(terminal.status.is_terminal());
        let mut records = self.write();
        match records.get_mut(id) {
            None => WriteOutcome::Missing,
            Some(record) if record.status.is_terminal() => WriteOutcome::Terminal,
            Some(record) => {
                *record = terminal;
                WriteOutcome::Applied
            }
        }
    }

    /// Reserve a finished job's output for exactly one delivery
    ///
    /// A job without a record (its directory outlived it) can be claimed too.
    /// The claim is held until [`release`](Self::release) or
    /// [`remove`](Self::remove).
    pub fn claim(&self, id: &JobId) -> Claim {
        // Holding the record lock orders the claim against the terminal write
        let records = self.write();
        if records.get(id).is_some_and(|p| !p.status.is_terminal()) {
            return Claim::Running;
        }
        let mut claimed = self.claimed.lock().unwrap_or_else(|e| e.into_inner());
        if claimed.insert(id.clone()) {
            Claim::Granted
        } else {
            Claim::Taken
        }
    }

    /// Give up a delivery claim without touching the record
    pub fn release(&self, id: &JobId) {
        self.claimed
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .remove(id);
    }

    /// Delete a record and any delivery claim on it, returning the record if it existed
    pub fn remove(&self, id: &JobId) -> Option<Progress> {
        let removed = self.write().remove(id);
        self.release(id);
        removed
    }

    /// Number of records in the store
    pub fn len(&self) -> usize {
        self.read().len()
    }

    /// Whether the store holds no records
    pub fn is_empty(&self) -> bool {
        self.read().is_empty()
    }

    /// Number of jobs that have not reached a terminal state
    pub fn active_count(&self) -> usize {
        self.read()
            .values()
            .filter(|p| !p.status.is_terminal())
            .count()
    }
}
