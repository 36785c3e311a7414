//! Plaintext CRDT operation data model (spec §3).

use crate::identifiers::{OperationId, ParticipantId, WorkspaceId};
use crate::time::Millis;
use serde::{Deserialize, Serialize};

/// The kind of edit an [`Operation`] performs, and its type-specific payload.
///
/// Only `insert` and `delete` exist — the `format` operation type named in
/// the wire enum has no producer anywhere in this core and is excluded
/// (Open Question 4, resolved in `SPEC_FULL.md` §4.7).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum OperationKind {
    /// Insert `content` at `position`.
    Insert {
        /// The text being inserted.
        content: String,
    },
    /// Delete `length` characters starting at `position`.
    Delete {
        /// Number of characters to remove.
        length: u64,
    },
}

impl OperationKind {
    /// The wire `operation_type` tag for this kind.
    pub fn type_tag(&self) -> OperationType {
        match self {
            Self::Insert { .. } => OperationType::Insert,
            Self::Delete { .. } => OperationType::Delete,
        }
    }
}

/// The `operation_type` discriminant carried on the wire, independent of
/// the (possibly still-encrypted) payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OperationType {
    /// An insertion.
    Insert,
    /// A deletion.
    Delete,
}

impl std::fmt::Display for OperationType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Insert => write!(f, "insert"),
            Self::Delete => write!(f, "delete"),
        }
    }
}

/// A single CRDT edit, in plaintext, before encoding (spec §3).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Operation {
    /// Unique id of this operation.
    pub operation_id: OperationId,
    /// Workspace this operation belongs to.
    pub workspace_id: WorkspaceId,
    /// Participant who authored this operation.
    pub participant_id: ParticipantId,
    /// Wall-clock milliseconds at authoring time.
    pub timestamp: Millis,
    /// Zero-based code-unit position the edit applies at.
    pub position: u64,
    /// The edit itself.
    pub kind: OperationKind,
}

impl Operation {
    /// The `operation_type` discriminant for this operation.
    pub fn operation_type(&self) -> OperationType {
        self.kind.type_tag()
    }
}
