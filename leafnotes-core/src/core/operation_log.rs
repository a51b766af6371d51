//! Bounded in-memory journal of committed document operations.

use crate::Operation;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

/// Controls which old operations are dropped from the log.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PurgeStrategy {
    /// Retain only the most recent `keep_last` operations.
    LocalOnly { keep_last: usize },
    /// Never drop operations. Intended for tests and short-lived sessions.
    Unbounded,
}

/// Lightweight listing entry for a logged operation.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OperationSummary {
    pub operation_id: String,
    pub timestamp: i64,
    pub operation_type: String,
}

/// Records committed structural mutations and purges stale entries.
pub struct OperationLog {
    strategy: PurgeStrategy,
    entries: VecDeque<Operation>,
}

impl OperationLog {
    /// Creates an empty `OperationLog` with the given purge strategy.
    pub fn new(strategy: PurgeStrategy) -> Self {
        Self {
            strategy,
            entries: VecDeque::new(),
        }
    }

    /// Appends `op` to the journal.
    pub fn log(&mut self, op: Operation) {
        log::trace!("operation {} {}", op.type_name(), op.operation_id());
        self.entries.push_back(op);
    }

    /// Drops old operations according to the purge strategy.
    ///
    /// Call this after each committed transaction to keep the journal bounded.
    pub fn purge_if_needed(&mut self) {
        match self.strategy {
            PurgeStrategy::LocalOnly { keep_last } => {
                while self.entries.len() > keep_last {
                    self.entries.pop_front();
                }
            }
            PurgeStrategy::Unbounded => {}
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn operations(&self) -> impl Iterator<Item = &Operation> {
        self.entries.iter()
    }

    /// Summaries of logged operations, newest first, optionally filtered by
    /// operation type name.
    pub fn list_operations(&self, type_filter: Option<&str>) -> Vec<OperationSummary> {
        self.entries
            .iter()
            .rev()
            .filter(|op| type_filter.map_or(true, |t| op.type_name() == t))
            .map(|op| OperationSummary {
                operation_id: op.operation_id().to_string(),
                timestamp: op.timestamp(),
                operation_type: op.type_name().to_string(),
            })
            .collect()
    }
}

impl Default for OperationLog {
    fn default() -> Self {
        Self::new(PurgeStrategy::LocalOnly { keep_last: 500 })
    }
}
