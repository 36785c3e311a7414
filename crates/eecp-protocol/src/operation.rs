//! `EncryptedOperation` — the opaque, server-visible wire form of a CRDT
//! operation (spec §3, §4.4).

use eecp_core::{OperationId, OperationType, ParticipantId, WorkspaceId};
use serde::{Deserialize, Serialize};

/// An operation whose payload the relay can route but never read.
///
/// Public fields are deliberately server-visible for routing and ordering;
/// `encrypted_content` is opaque; `signature` binds the public fields and
/// the ciphertext together so neither can be substituted independently.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EncryptedOperation {
    pub operation_id: OperationId,
    pub workspace_id: WorkspaceId,
    pub participant_id: ParticipantId,
    pub timestamp: u64,
    pub position: u64,
    pub operation_type: OperationType,
    /// `nonce(12) ‖ tag(16) ‖ ciphertext`.
    pub encrypted_content: Vec<u8>,
    pub signature: Vec<u8>,
}

impl EncryptedOperation {
    /// The exact byte sequence that is signed and later re-verified
    /// (spec §4.4): `operation_id` (hyphenated UUID text) ‖ `timestamp`
    /// decimal ‖ `position` decimal ‖ `operation_type` ascii ‖
    /// `encrypted_content`.
    pub fn signing_bytes(&self) -> Vec<u8> {
        let mut buf = Vec::with_capacity(64 + self.encrypted_content.len());
        buf.extend_from_slice(self.operation_id.uuid().to_string().as_bytes());
        buf.extend_from_slice(self.timestamp.to_string().as_bytes());
        buf.extend_from_slice(self.position.to_string().as_bytes());
        buf.extend_from_slice(self.operation_type.to_string().as_bytes());
        buf.extend_from_slice(&self.encrypted_content);
        buf
    }
}
