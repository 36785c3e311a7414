//! Participant handshake state machine (spec §4.7).
//!
//! ```text
//! DISCONNECTED --connect--> CHALLENGED --handshake--> AUTHENTICATED
//!                   |                        |
//!                   +--handshake_timeout--> DISCONNECTED
//!                   +--auth_fail----------> DISCONNECTED
//! ```

use eecp_core::{ChallengeId, Millis, ParticipantId, CHALLENGE_TTL_MS, HANDSHAKE_TIMESTAMP_SKEW_MS};
use ed25519_dalek::{Signature, Verifier, VerifyingKey};
use rand::RngCore;

/// A challenge issued to a connecting participant, pending response.
#[derive(Debug, Clone)]
pub struct PendingChallenge {
    pub challenge_id: ChallengeId,
    pub nonce: [u8; 32],
    pub issued_at: Millis,
}

impl PendingChallenge {
    pub fn new(now: Millis) -> Self {
        let mut nonce = [0u8; 32];
        rand::thread_rng().fill_bytes(&mut nonce);
        Self {
            challenge_id: ChallengeId::new(),
            nonce,
            issued_at: now,
        }
    }

    pub fn is_expired(&self, now: Millis) -> bool {
        now.saturating_sub(self.issued_at) >= CHALLENGE_TTL_MS
    }
}

/// The state of one participant's connection to a workspace.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionState {
    Disconnected,
    Challenged,
    Authenticated,
}

/// A participant's handshake proof: a signature over
/// `challenge ‖ timestamp_ascii ‖ participant_id_ascii` (spec §4.7).
pub fn signing_bytes(nonce: &[u8; 32], timestamp: Millis, participant_id: ParticipantId) -> Vec<u8> {
    let mut buf = Vec::with_capacity(32 + 20 + 48);
    buf.extend_from_slice(nonce);
    buf.extend_from_slice(timestamp.to_string().as_bytes());
    buf.extend_from_slice(participant_id.uuid().to_string().as_bytes());
    buf
}

/// Validate a handshake proof against an outstanding challenge
/// (spec §4.7, validations (d) and (e); (a)-(c) are checked by the caller
/// against workspace/session state).
pub fn verify_proof(
    challenge: &PendingChallenge,
    participant_id: ParticipantId,
    public_key: &VerifyingKey,
    signature_bytes: &[u8],
    timestamp: Millis,
    now: Millis,
) -> bool {
    if now.abs_diff(timestamp) > HANDSHAKE_TIMESTAMP_SKEW_MS {
        return false;
    }
    let Ok(sig_array) = <[u8; 64]>::try_from(signature_bytes) else {
        return false;
    };
    let signature = Signature::from_bytes(&sig_array);
    let message = signing_bytes(&challenge.nonce, timestamp, participant_id);
    public_key.verify(&message, &signature).is_ok()
}
