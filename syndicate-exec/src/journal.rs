//! Execution journal for at-most-once execute calls.
//!
//! Routing request ids are single use. The journal records each id before
//! the signed transaction is handed to the execute endpoint, and refuses
//! any later attempt with the same id.
//!
//! # Flow
//!
//! 1. Begin (before the execute call)
//! 2. Execute / broadcast / confirm
//! 3. Complete with the final state
//!
//! Completed entries are dropped once older than the retention window; a
//! routing request id has long expired service-side by then. In-flight
//! entries are never dropped.

use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::RwLock;
use std::time::Duration;

use crate::error::{ExecError, ExecResult};

// =============================================================================
// Entry Types
// =============================================================================

/// State of a journaled execution
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExecutionState {
    /// Handed to the execute endpoint, outcome not yet known
    Submitted,
    /// Confirmed on chain
    Confirmed {
        /// Transaction signature
        signature: String,
    },
    /// Submitted but confirmation was not observed
    Unconfirmed {
        /// Transaction signature
        signature: String,
    },
    /// Refused or failed
    Failed {
        /// Error description
        reason: String,
    },
}

/// One journaled execution
#[derive(Debug, Clone)]
pub struct ExecutionEntry {
    /// Routing request id
    pub request_id: String,
    /// Current state
    pub state: ExecutionState,
    /// When execution began
    pub started_at: DateTime<Utc>,
    /// When the final state was recorded
    pub completed_at: Option<DateTime<Utc>>,
}

// =============================================================================
// Journal
// =============================================================================

/// Default retention for completed entries
pub const DEFAULT_RETENTION: Duration = Duration::from_secs(60 * 60);

/// In-memory journal keyed by routing request id.
///
/// Does not survive restarts.
pub struct ExecutionJournal {
    entries: RwLock<HashMap<String, ExecutionEntry>>,
    retention: Duration,
}

impl Default for ExecutionJournal {
    fn default() -> Self {
        Self::with_retention(DEFAULT_RETENTION)
    }
}

impl ExecutionJournal {
    /// Create an empty journal.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an empty journal keeping completed entries for `retention`.
    pub fn with_retention(retention: Duration) -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            retention,
        }
    }

    /// Record that `request_id` is about to be executed.
    ///
    /// # Errors
    ///
    /// `ExecError::AlreadyExecuted` if the id was seen before.
    pub fn begin(&self, request_id: &str) -> ExecResult<()> {
        let mut entries = self.entries.write().map_err(|e| {
            ExecError::Journal(format!("Failed to acquire write lock: {}", e))
        })?;

        let now = Utc::now();
        prune_expired(&mut entries, self.retention, now);

        if entries.contains_key(request_id) {
            return Err(ExecError::AlreadyExecuted(request_id.to_string()));
        }

        entries.insert(
            request_id.to_string(),
            ExecutionEntry {
                request_id: request_id.to_string(),
                state: ExecutionState::Submitted,
                started_at: now,
                completed_at: None,
            },
        );
        Ok(())
    }

    /// Record the final state of an execution.
    pub fn complete(&self, request_id: &str, state: ExecutionState) -> ExecResult<()> {
        let mut entries = self.entries.write().map_err(|e| {
            ExecError::Journal(format!("Failed to acquire write lock: {}", e))
        })?;

        let entry = entries.get_mut(request_id).ok_or_else(|| {
            ExecError::Journal(format!("Request not found: {}", request_id))
        })?;

        entry.state = state;
        entry.completed_at = Some(Utc::now());
        Ok(())
    }

    /// Look up an execution.
    pub fn get(&self, request_id: &str) -> ExecResult<Option<ExecutionEntry>> {
        let entries = self.entries.read().map_err(|e| {
            ExecError::Journal(format!("Failed to acquire read lock: {}", e))
        })?;

        Ok(entries.get(request_id).cloned())
    }

    /// Drop completed entries older than the retention window.
    ///
    /// Returns the number of entries removed.
    pub fn prune(&self) -> ExecResult<usize> {
        let mut entries = self.entries.write().map_err(|e| {
            ExecError::Journal(format!("Failed to acquire write lock: {}", e))
        })?;
        Ok(prune_expired(&mut entries, self.retention, Utc::now()))
    }

    /// Number of journaled executions.
    pub fn len(&self) -> usize {
        self.entries.read().map(|e| e.len()).unwrap_or(0)
    }

    /// Whether the journal is empty.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

fn prune_expired(
    entries: &mut HashMap<String, ExecutionEntry>,
    retention: Duration,
    now: DateTime<Utc>,
) -> usize {
    let before = entries.len();
    entries.retain(|_, entry| match entry.completed_at {
        // Negative ages (clock moved back) keep the entry
        Some(done) => (now - done).to_std().map_or(true, |age| age <= retention),
        None => true,
    });
    before - entries.len()
}

// =============================================================================
// Tests
// =============================================================================
