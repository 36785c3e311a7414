//! Per-workspace offline buffer (spec §3, §4.5).
//!
//! FIFO, capped at [`eecp_core::MAX_OFFLINE_BUFFER`]; oldest entry evicted
//! on overflow. Entries older than [`eecp_core::OFFLINE_BUFFER_TTL_MS`] are
//! purged by Temporal Cleanup (modeled here as an explicit sweep call,
//! since this crate has no background task of its own).

use eecp_core::{Millis, MAX_OFFLINE_BUFFER, OFFLINE_BUFFER_TTL_MS};
use eecp_protocol::EncryptedOperation;
use std::collections::VecDeque;

struct BufferedEntry {
    envelope: EncryptedOperation,
    buffered_at: Millis,
}

/// A bounded FIFO queue of envelopes waiting for a transport to come back
/// up.
#[derive(Default)]
pub struct OfflineBuffer {
    entries: VecDeque<BufferedEntry>,
}

impl OfflineBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an envelope, evicting the oldest entry if this would exceed
    /// the cap.
    pub fn push(&mut self, envelope: EncryptedOperation, now: Millis) {
        if self.entries.len() >= MAX_OFFLINE_BUFFER {
            self.entries.pop_front();
        }
        self.entries.push_back(BufferedEntry {
            envelope,
            buffered_at: now,
        });
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Drop entries older than the TTL.
    pub fn purge_expired(&mut self, now: Millis) {
        self.entries
            .retain(|e| now.saturating_sub(e.buffered_at) < OFFLINE_BUFFER_TTL_MS);
    }

    /// Drain the buffer, returning envelopes sorted ascending by
    /// `timestamp` (ties broken by `operation_id`'s textual form) — the
    /// order reconnect draining must replay them in (spec §4.5).
    pub fn drain_sorted(&mut self) -> Vec<EncryptedOperation> {
        let mut envelopes: Vec<EncryptedOperation> =
            self.entries.drain(..).map(|e| e.envelope).collect();
        envelopes.sort_by(|a, b| {
            a.timestamp
                .cmp(&b.timestamp)
                .then_with(|| a.operation_id.uuid().to_string().cmp(&b.operation_id.uuid().to_string()))
        });
        envelopes
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use eecp_core::{OperationId, OperationType, ParticipantId, WorkspaceId};

    fn envelope(timestamp: u64) -> EncryptedOperation {
        EncryptedOperation {
            operation_id: OperationId::new(),
            workspace_id: WorkspaceId::new(),
            participant_id: ParticipantId::new(),
            timestamp,
            position: 0,
            operation_type: OperationType::Insert,
            encrypted_content: vec![0u8; 32],
            signature: vec![],
        }
    }

    #[test]
    fn overflow_evicts_oldest() {
        let mut buf = OfflineBuffer::new();
        for i in 0..(MAX_OFFLINE_BUFFER + 5) {
            buf.push(envelope(i as u64), 0);
        }
        assert_eq!(buf.len(), MAX_OFFLINE_BUFFER);
    }

    #[test]
    fn drain_is_sorted_ascending_by_timestamp() {
        let mut buf = OfflineBuffer::new();
        buf.push(envelope(30), 0);
        buf.push(envelope(10), 0);
        buf.push(envelope(20), 0);
        let drained = buf.drain_sorted();
        let timestamps: Vec<u64> = drained.iter().map(|e| e.timestamp).collect();
        assert_eq!(timestamps, vec![10, 20, 30]);
        assert!(buf.is_empty());
    }

    #[test]
    fn purge_drops_entries_past_ttl() {
        let mut buf = OfflineBuffer::new();
        buf.push(envelope(0), 0);
        buf.push(envelope(1), 3_600_000);
        buf.purge_expired(3_600_000);
        assert_eq!(buf.len(), 1);
    }
}
