//! Temporal Key Derivation (TKD, component C1, spec §4.1).
//!
//! `derive_key` is deterministic: identical `(secret, window.start, key_id)`
//! always yields identical material (invariant 3), which is what lets every
//! participant — and the relay, for lifecycle bookkeeping only, see
//! `SPEC_FULL.md` §4.7 — independently arrive at the same key without ever
//! transmitting it.

use eecp_core::{EecpError, KeyId, Result, TimeWindow};
use hkdf::Hkdf;
use sha2::Sha256;
use zeroize::{Zeroize, ZeroizeOnDrop};

/// Domain-separation info string for HKDF expansion (spec §4.1).
const HKDF_INFO_PREFIX: &[u8] = b"EECP-Temporal-Key-v1";
const HKDF_INFO_VERSION: u8 = 0x01;

/// A derived, time-bounded symmetric key.
///
/// Material is zeroized on drop as a defense-in-depth measure; the
/// spec-mandated destruction path is the explicit [`TemporalKey::destroy`]
/// call, invoked only by Temporal Cleanup after a commitment has been
/// appended (spec §4.2, §4.8).
#[derive(Debug, ZeroizeOnDrop)]
pub struct TemporalKey {
    #[zeroize(skip)]
    id: KeyId,
    material: [u8; 32],
    #[zeroize(skip)]
    valid_from: u64,
    #[zeroize(skip)]
    valid_until: u64,
    #[zeroize(skip)]
    grace_period_end: u64,
    #[zeroize(skip)]
    destroyed: bool,
}

impl TemporalKey {
    /// This key's id.
    pub fn id(&self) -> KeyId {
        self.id
    }

    /// Start of this key's validity window, inclusive.
    pub fn valid_from(&self) -> u64 {
        self.valid_from
    }

    /// End of this key's validity window, exclusive (grace period begins
    /// here).
    pub fn valid_until(&self) -> u64 {
        self.valid_until
    }

    /// End of this key's grace period; destruction is due after this point.
    pub fn grace_period_end(&self) -> u64 {
        self.grace_period_end
    }

    /// Whether this key has been destroyed.
    pub fn is_destroyed(&self) -> bool {
        self.destroyed
    }

    /// The 32 bytes of key material, or `KeyDestroyed` if already scrubbed.
    pub fn material(&self) -> Result<&[u8; 32]> {
        if self.destroyed {
            return Err(EecpError::crypto("key destroyed"));
        }
        Ok(&self.material)
    }

    /// Securely destroy this key's material: overwrite with random bytes,
    /// then zero (spec §4.2). Irreversible. Only Temporal Cleanup should
    /// call this, and only after the key's commitment is durable in the
    /// ledger (invariant 10).
    pub fn destroy(&mut self) {
        if self.destroyed {
            return;
        }
        rand::Rng::fill(&mut rand::thread_rng(), &mut self.material[..]);
        self.material.zeroize();
        self.destroyed = true;
        tracing::debug!(key_id = %self.id, "temporal key destroyed");
    }
}

/// Derive the temporal key for `key_id` within `window`, using HKDF-SHA256
/// (spec §4.1).
///
/// `salt = key_id ‖ decimal(window.start)`, `IKM = secret`,
/// `info = "EECP-Temporal-Key-v1" ‖ 0x01`, truncated to 32 bytes. One
/// expansion iteration suffices since the requested output (32 bytes) does
/// not exceed the hash's output length.
pub fn derive_key(secret: &[u8], window: &TimeWindow, key_id: KeyId) -> Result<TemporalKey> {
    if secret.is_empty() {
        return Err(EecpError::crypto("invalid secret: must not be empty"));
    }

    let mut salt = key_id.to_string().into_bytes();
    salt.extend_from_slice(window.start.to_string().as_bytes());

    let mut info = Vec::with_capacity(HKDF_INFO_PREFIX.len() + 1);
    info.extend_from_slice(HKDF_INFO_PREFIX);
    info.push(HKDF_INFO_VERSION);

    let hk = Hkdf::<Sha256>::new(Some(&salt), secret);
    let mut material = [0u8; 32];
    hk.expand(&info, &mut material)
        .map_err(|_| EecpError::crypto("HKDF expand failed"))?;

    let (valid_from, valid_until, grace_period_end) = window.key_bounds(key_id);

    Ok(TemporalKey {
        id: key_id,
        material,
        valid_from,
        valid_until,
        grace_period_end,
        destroyed: false,
    })
}
