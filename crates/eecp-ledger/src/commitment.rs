//! Commitment Ledger (CL, component C3, spec §3, §4.8).
//!
//! A commitment lets anyone later prove a temporal key existed and was
//! bound to a given validity window, without the ledger ever holding the
//! key material itself.

use eecp_core::{KeyId, Millis};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// Proof that a temporal key existed, recorded just before its destruction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Commitment {
    pub key_id: KeyId,
    pub hash: [u8; 32],
    pub created_at: Millis,
    pub valid_from: Millis,
    pub valid_until: Millis,
}

/// Compute `SHA-256(key_material ‖ key_id ‖ valid_from ‖ valid_until)`
/// (spec §3).
///
/// `key_id` and the timestamps are hashed in their decimal string form,
/// matching the textual encoding used everywhere else a `KeyId` crosses a
/// boundary (e.g. TKD's salt construction).
pub fn compute_hash(key_material: &[u8; 32], key_id: KeyId, valid_from: Millis, valid_until: Millis) -> [u8; 32] {
    let mut hasher = Sha256::new();
    hasher.update(key_material);
    hasher.update(key_id.to_string().as_bytes());
    hasher.update(valid_from.to_string().as_bytes());
    hasher.update(valid_until.to_string().as_bytes());
    hasher.finalize().into()
}

impl Commitment {
    /// Build a commitment for a key about to be destroyed.
    pub fn new(
        key_material: &[u8; 32],
        key_id: KeyId,
        created_at: Millis,
        valid_from: Millis,
        valid_until: Millis,
    ) -> Self {
        Self {
            key_id,
            hash: compute_hash(key_material, key_id, valid_from, valid_until),
            created_at,
            valid_from,
            valid_until,
        }
    }

    /// Recompute the hash from candidate material and compare.
    pub fn matches(&self, key_material: &[u8; 32]) -> bool {
        compute_hash(key_material, self.key_id, self.valid_from, self.valid_until) == self.hash
    }
}
