//! `MessageEnvelope` and its payload variants (spec §6).
//!
//! One tagged enum per message kind rather than a dynamic JSON envelope —
//! this is the re-architecture §9's "Dynamic JSON envelopes" note calls
//! for: a single `decode`/`encode` pair that round-trips the wire form,
//! with every payload's shape fixed at compile time.

use crate::operation::EncryptedOperation;
use eecp_core::{ChallengeId, MessageId, OperationId, ParticipantId, WorkspaceId};
use serde::{Deserialize, Serialize};

/// Proof accompanying a `handshake`: a signature over the claimed
/// timestamp, binding the handshake to a specific instant (spec §4.7).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HandshakeProof {
    pub signature: Vec<u8>,
    pub timestamp: u64,
}

/// Every message kind the relay protocol exchanges, tagged by `type` on
/// the wire (spec §6).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload", rename_all = "snake_case")]
pub enum MessagePayload {
    /// server → client: issued at the start of a handshake.
    Challenge {
        challenge_id: ChallengeId,
        /// 32 random bytes, base64 on the wire via serde's byte handling.
        challenge: Vec<u8>,
    },
    /// client → server: response to a `Challenge`.
    Handshake {
        protocol_version: String,
        workspace_id: WorkspaceId,
        participant_id: ParticipantId,
        public_key: Vec<u8>,
        proof: HandshakeProof,
    },
    /// server → client: outcome of a `Handshake`.
    HandshakeAck {
        success: bool,
        current_key_id: Option<String>,
        server_time: u64,
    },
    /// bidirectional: a routed operation.
    Operation { operation: EncryptedOperation },
    /// server → client: acknowledges receipt of an `Operation`.
    OperationAck {
        operation_id: OperationId,
        server_timestamp: u64,
    },
    /// client → server: requests a catch-up of missed operations.
    SyncRequest { from_timestamp: u64 },
    /// server → client: catch-up response.
    SyncResponse {
        operations: Vec<EncryptedOperation>,
        /// The relay's own cached state snapshot — see `SPEC_FULL.md` §4.7
        /// ("Resolves Open Question 3"): never a decrypted reconstruction,
        /// since the relay never decrypts participant ciphertext.
        current_state: Vec<u8>,
    },
    /// server → client: a fatal or advisory protocol error.
    Error {
        code: ErrorCode,
        message: String,
        details: Option<String>,
    },
    /// bidirectional: liveness probe.
    Ping { timestamp: u64 },
    /// bidirectional: liveness response.
    Pong { timestamp: u64 },
}

/// Error codes a relay may report (spec §7, §8 scenarios).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    AuthFailed,
    WorkspaceNotFound,
    WorkspaceExpired,
    InvalidOperation,
    RateLimitExceeded,
    ParticipantRevoked,
}

/// The envelope wrapping every protocol message (spec §6).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageEnvelope {
    pub message_id: MessageId,
    pub timestamp: u64,
    #[serde(flatten)]
    pub payload: MessagePayload,
}

impl MessageEnvelope {
    pub fn new(timestamp: u64, payload: MessagePayload) -> Self {
        Self {
            message_id: MessageId::new(),
            timestamp,
            payload,
        }
    }
}

/// Serialize an envelope to its wire form (JSON, per spec §6).
pub fn encode(envelope: &MessageEnvelope) -> eecp_core::Result<Vec<u8>> {
    serde_json::to_vec(envelope).map_err(eecp_core::EecpError::from)
}

/// Deserialize an envelope from its wire form.
pub fn decode(bytes: &[u8]) -> eecp_core::Result<MessageEnvelope> {
    serde_json::from_slice(bytes).map_err(eecp_core::EecpError::from)
}
