//! CRDT Engine (CE, component C5, spec §4.3).
//!
//! A deterministic log-replay sequence CRDT: every applied operation,
//! local or remote, lands in a log keyed by `(timestamp, operation_id)`.
//! The visible text is a pure fold over that log in key order, so it is a
//! function of the operation *set* rather than of arrival order — strong
//! eventual consistency (invariant 5) without a predecessor-id addressing
//! scheme. `apply_remote` is idempotent because re-inserting an
//! already-present `operation_id` is a no-op.

use eecp_core::{Operation, OperationId, OperationKind, ParticipantId, WorkspaceId};
use eecp_core::{now_ms, EecpError, Result};
use std::collections::HashMap;

/// A single collaboratively edited text, backed by a log-replay CRDT.
#[derive(Debug, Clone)]
pub struct CrdtDocument {
    workspace_id: WorkspaceId,
    log: HashMap<OperationId, Operation>,
}

impl CrdtDocument {
    pub fn new(workspace_id: WorkspaceId) -> Self {
        Self {
            workspace_id,
            log: HashMap::new(),
        }
    }

    pub fn workspace_id(&self) -> WorkspaceId {
        self.workspace_id
    }

    /// Insert `text` at `pos`, authored locally. Updates the document
    /// in-place and returns the descriptor, ready to hand to the codec.
    pub fn local_insert(&mut self, pos: u64, text: String, participant_id: ParticipantId) -> Operation {
        let op = Operation {
            operation_id: OperationId::new(),
            workspace_id: self.workspace_id,
            participant_id,
            timestamp: now_ms(),
            position: pos,
            kind: OperationKind::Insert { content: text },
        };
        self.log.insert(op.operation_id, op.clone());
        op
    }

    /// Delete `length` characters starting at `pos`, authored locally.
    pub fn local_delete(&mut self, pos: u64, length: u64, participant_id: ParticipantId) -> Operation {
        let op = Operation {
            operation_id: OperationId::new(),
            workspace_id: self.workspace_id,
            participant_id,
            timestamp: now_ms(),
            position: pos,
            kind: OperationKind::Delete { length },
        };
        self.log.insert(op.operation_id, op.clone());
        op
    }

    /// Merge a remote operation. Idempotent: applying the same
    /// `operation_id` twice has no further effect.
    pub fn apply_remote(&mut self, op: Operation) {
        if self.log.contains_key(&op.operation_id) {
            tracing::trace!(operation_id = %op.operation_id, "duplicate remote operation ignored");
            return;
        }
        self.log.entry(op.operation_id).or_insert(op);
    }

    /// The current text, folded deterministically from the log.
    ///
    /// Positions are clamped against the text length accumulated so far in
    /// log order (spec §4.3 edge policies): an insert past the end lands
    /// at the end; a delete whose range runs past the end is clipped.
    pub fn get_text(&self) -> String {
        let mut chars: Vec<char> = Vec::new();
        for op in self.ordered_log() {
            match &op.kind {
                OperationKind::Insert { content } => {
                    let pos = (op.position as usize).min(chars.len());
                    chars.splice(pos..pos, content.chars());
                }
                OperationKind::Delete { length } => {
                    let pos = (op.position as usize).min(chars.len());
                    let end = pos.saturating_add(*length as usize).min(chars.len());
                    chars.drain(pos..end);
                }
            }
        }
        chars.into_iter().collect()
    }

    /// Serialize the full operation log for transfer to a catching-up peer.
    pub fn get_state(&self) -> Result<Vec<u8>> {
        let ops: Vec<&Operation> = self.log.values().collect();
        bincode::serialize(&ops).map_err(|e| EecpError::codec(format!("state encode: {e}")))
    }

    /// Merge a peer's state into this document. Never replaces the
    /// existing log, only adds operations not already present; applying
    /// the same state twice is a no-op (spec §4.3).
    pub fn apply_state(&mut self, bytes: &[u8]) -> Result<()> {
        let ops: Vec<Operation> =
            bincode::deserialize(bytes).map_err(|e| EecpError::codec(format!("state decode: {e}")))?;
        for op in ops {
            self.log.entry(op.operation_id).or_insert(op);
        }
        Ok(())
    }

    /// Number of operations recorded, for diagnostics/tests.
    pub fn operation_count(&self) -> usize {
        self.log.len()
    }

    fn ordered_log(&self) -> Vec<&Operation> {
        let mut ops: Vec<&Operation> = self.log.values().collect();
        ops.sort_by_key(|op| (op.timestamp, op.operation_id));
        ops
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn participant() -> ParticipantId {
        ParticipantId::new()
    }

    #[test]
    fn local_insert_and_delete_update_text() {
        let mut doc = CrdtDocument::new(WorkspaceId::new());
        let p = participant();
        doc.local_insert(0, "Hello".into(), p);
        assert_eq!(doc.get_text(), "Hello");
        doc.local_insert(5, " World".into(), p);
        assert_eq!(doc.get_text(), "Hello World");
        doc.local_delete(5, 6, p);
        assert_eq!(doc.get_text(), "Hello");
    }

    #[test]
    fn insert_past_end_clamps() {
        let mut doc = CrdtDocument::new(WorkspaceId::new());
        doc.local_insert(999, "Hi".into(), participant());
        assert_eq!(doc.get_text(), "Hi");
    }

    #[test]
    fn delete_overrun_clips_to_remaining() {
        let mut doc = CrdtDocument::new(WorkspaceId::new());
        let p = participant();
        doc.local_insert(0, "Hi".into(), p);
        doc.local_delete(0, 999, p);
        assert_eq!(doc.get_text(), "");
    }

    #[test]
    fn apply_remote_is_idempotent() {
        let mut doc = CrdtDocument::new(WorkspaceId::new());
        let op = doc.local_insert(0, "Hi".into(), participant());
        let before = doc.get_text();
        doc.apply_remote(op);
        assert_eq!(doc.get_text(), before);
        assert_eq!(doc.operation_count(), 1);
    }

    #[test]
    fn convergence_is_independent_of_application_order() {
        let ws = WorkspaceId::new();
        let p = participant();
        let mut origin = CrdtDocument::new(ws);
        let op_a = origin.local_insert(0, "A".into(), p);
        let op_b = origin.local_insert(1, "B".into(), p);
        let op_c = origin.local_insert(2, "C".into(), p);

        let mut forward = CrdtDocument::new(ws);
        forward.apply_remote(op_a.clone());
        forward.apply_remote(op_b.clone());
        forward.apply_remote(op_c.clone());

        let mut backward = CrdtDocument::new(ws);
        backward.apply_remote(op_c);
        backward.apply_remote(op_b);
        backward.apply_remote(op_a);

        assert_eq!(forward.get_text(), origin.get_text());
        assert_eq!(backward.get_text(), origin.get_text());
    }

    #[test]
    fn state_round_trips_and_merges() {
        let ws = WorkspaceId::new();
        let p = participant();
        let mut a = CrdtDocument::new(ws);
        a.local_insert(0, "Hi".into(), p);
        let state = a.get_state().unwrap();

        let mut b = CrdtDocument::new(ws);
        b.apply_state(&state).unwrap();
        assert_eq!(b.get_text(), "Hi");

        // applying twice is a no-op
        b.apply_state(&state).unwrap();
        assert_eq!(b.operation_count(), 1);
    }

    proptest::proptest! {
        #[test]
        fn shuffled_application_always_converges(seed in 0u64..1000) {
            use rand::seq::SliceRandom;
            use rand::SeedableRng;

            let ws = WorkspaceId::new();
            let p = participant();
            let mut origin = CrdtDocument::new(ws);
            let mut ops = Vec::new();
            for i in 0..10 {
                ops.push(origin.local_insert(i, format!("{i}"), p));
            }

            let mut rng = rand::rngs::StdRng::seed_from_u64(seed);
            let mut shuffled = ops.clone();
            shuffled.shuffle(&mut rng);

            let mut replica = CrdtDocument::new(ws);
            for op in shuffled {
                replica.apply_remote(op);
            }
            proptest::prop_assert_eq!(replica.get_text(), origin.get_text());
        }
    }
}
