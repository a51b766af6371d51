//! Structural mutation records for the document operation log.

use crate::{Node, Path};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A single committed structural mutation of the document tree.
///
/// Operations capture each step of a transaction so that history and
/// diagnostics can replay what a gesture did to the tree. Every variant
/// carries a stable `operation_id` and a wall-clock `timestamp`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Operation {
    /// One or more nodes were inserted starting at `path`.
    InsertNodes {
        /// Stable UUID for this operation.
        operation_id: String,
        /// Unix timestamp (milliseconds) when the operation was recorded.
        timestamp: i64,
        /// Path of the first inserted node.
        path: Path,
        /// Number of consecutive siblings inserted.
        count: usize,
    },
    /// The node at `path` was removed together with its subtree.
    RemoveNode {
        /// Stable UUID for this operation.
        operation_id: String,
        /// Unix timestamp (milliseconds) when the operation was recorded.
        timestamp: i64,
        /// Path the node occupied before removal.
        path: Path,
        /// The removed subtree.
        node: Node,
    },
    /// A node was relocated.
    MoveNode {
        /// Stable UUID for this operation.
        operation_id: String,
        /// Unix timestamp (milliseconds) when the operation was recorded.
        timestamp: i64,
        /// Path before the move.
        from: Path,
        /// Path after the move.
        to: Path,
    },
}

impl Operation {
    pub fn insert_nodes(path: Path, count: usize) -> Self {
        Operation::InsertNodes {
            operation_id: Uuid::new_v4().to_string(),
            timestamp: now_millis(),
            path,
            count,
        }
    }

    pub fn remove_node(path: Path, node: Node) -> Self {
        Operation::RemoveNode {
            operation_id: Uuid::new_v4().to_string(),
            timestamp: now_millis(),
            path,
            node,
        }
    }

    pub fn move_node(from: Path, to: Path) -> Self {
        Operation::MoveNode {
            operation_id: Uuid::new_v4().to_string(),
            timestamp: now_millis(),
            from,
            to,
        }
    }

    pub fn operation_id(&self) -> &str {
        match self {
            Operation::InsertNodes { operation_id, .. }
            | Operation::RemoveNode { operation_id, .. }
            | Operation::MoveNode { operation_id, .. } => operation_id,
        }
    }

    pub fn timestamp(&self) -> i64 {
        match self {
            Operation::InsertNodes { timestamp, .. }
            | Operation::RemoveNode { timestamp, .. }
            | Operation::MoveNode { timestamp, .. } => *timestamp,
        }
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            Operation::InsertNodes { .. } => "InsertNodes",
            Operation::RemoveNode { .. } => "RemoveNode",
            Operation::MoveNode { .. } => "MoveNode",
        }
    }
}

fn now_millis() -> i64 {
    chrono::Utc::now().timestamp_millis()
}
