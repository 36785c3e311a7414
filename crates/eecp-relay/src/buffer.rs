//! Per-participant offline buffer, as held by the relay (spec §3, §4.7).

use eecp_core::{Millis, MAX_OFFLINE_BUFFER, OFFLINE_BUFFER_TTL_MS};
use eecp_protocol::EncryptedOperation;
use std::collections::VecDeque;

struct Entry {
    envelope: EncryptedOperation,
    buffered_at: Millis,
}

/// FIFO queue of envelopes for a disconnected participant, capped at
/// [`MAX_OFFLINE_BUFFER`]; oldest evicted on overflow.
#[derive(Default)]
pub struct OfflineBuffer {
    entries: VecDeque<Entry>,
}

impl OfflineBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, envelope: EncryptedOperation, now: Millis) {
        if self.entries.len() >= MAX_OFFLINE_BUFFER {
            self.entries.pop_front();
        }
        self.entries.push_back(Entry {
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

    /// Drain every buffered envelope, oldest first, for replay on
    /// reconnect.
    pub fn drain(&mut self) -> Vec<EncryptedOperation> {
        self.entries.drain(..).map(|e| e.envelope).collect()
    }

    /// Purge entries older than [`OFFLINE_BUFFER_TTL_MS`] (Temporal Cleanup
    /// action 3, spec §4.8).
    pub fn purge_expired(&mut self, now: Millis) {
        self.entries
            .retain(|e| now.saturating_sub(e.buffered_at) < OFFLINE_BUFFER_TTL_MS);
    }
}
