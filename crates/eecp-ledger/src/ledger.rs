//! Append-only storage for [`Commitment`]s.
//!
//! Mirrors the teacher's per-resource `Arc<RwLock<...>>` pattern
//! (`SPEC_FULL.md` §5 "Locking discipline"): one lock around a `Vec`,
//! writes only ever push.

use crate::commitment::Commitment;
use eecp_core::{KeyId, WorkspaceId};
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;

/// Append-only, in-memory commitment ledger, keyed by workspace.
///
/// There is no `remove`/`clear` method: once appended, a commitment is
/// durable for the life of the process (invariant 10).
#[derive(Clone, Default)]
pub struct CommitmentLedger {
    inner: Arc<RwLock<HashMap<WorkspaceId, Vec<Commitment>>>>,
}

impl CommitmentLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a commitment for `workspace_id`. Always succeeds; there is no
    /// rejection path because there is no mutation path to reject.
    pub fn append(&self, workspace_id: WorkspaceId, commitment: Commitment) {
        tracing::debug!(
            workspace_id = %workspace_id,
            key_id = %commitment.key_id,
            "commitment appended"
        );
        self.inner.write().entry(workspace_id).or_default().push(commitment);
    }

    /// All commitments recorded for a workspace, oldest first.
    pub fn for_workspace(&self, workspace_id: WorkspaceId) -> Vec<Commitment> {
        self.inner
            .read()
            .get(&workspace_id)
            .cloned()
            .unwrap_or_default()
    }

    /// Whether a commitment has already been recorded for this
    /// `(workspace_id, key_id)` pair — Temporal Cleanup checks this before
    /// appending, so a replayed sweep tick never double-commits a key.
    pub fn has_commitment(&self, workspace_id: WorkspaceId, key_id: KeyId) -> bool {
        self.inner
            .read()
            .get(&workspace_id)
            .map(|cs| cs.iter().any(|c| c.key_id == key_id))
            .unwrap_or(false)
    }

    /// Total commitments recorded across every workspace.
    pub fn len(&self) -> usize {
        self.inner.read().values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
