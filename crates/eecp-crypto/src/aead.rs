//! Authenticated Encryption (AE, component C2, spec §4.2).
//!
//! Wire layout: `nonce(12) ‖ tag(16) ‖ ciphertext`. AAD binds each ciphertext
//! to the key that produced it (`key_id` as UTF-8) plus whatever
//! caller-supplied context is relevant at that layer (workspace id,
//! operation id, ...).

use crate::key_derivation::TemporalKey;
use aes_gcm::aead::{Aead, KeyInit, Payload};
use aes_gcm::{Aes256Gcm, Nonce};
use eecp_core::EecpError;
use eecp_core::KeyId;
use eecp_core::Result;
use rand::RngCore;

const NONCE_LEN: usize = 12;
const TAG_LEN: usize = 16;

/// Encrypt `plaintext` under `key`, binding `caller_aad` alongside the key's
/// id. Returns `nonce ‖ tag ‖ ciphertext`.
pub fn encrypt(key: &TemporalKey, plaintext: &[u8], caller_aad: &[u8]) -> Result<Vec<u8>> {
    let material = key.material()?;
    let cipher = Aes256Gcm::new_from_slice(material)
        .map_err(|_| EecpError::crypto("invalid AES-256-GCM key length"))?;

    let mut nonce_bytes = [0u8; NONCE_LEN];
    rand::thread_rng().fill_bytes(&mut nonce_bytes);
    let nonce = Nonce::from_slice(&nonce_bytes);

    let aad = bind_aad(key.id(), caller_aad);
    let sealed = cipher
        .encrypt(
            nonce,
            Payload {
                msg: plaintext,
                aad: &aad,
            },
        )
        .map_err(|_| EecpError::crypto("AES-256-GCM encryption failed"))?;

    // `aes-gcm` appends the 16-byte tag to the ciphertext; our wire form
    // keeps the tag immediately after the nonce instead, ahead of the
    // ciphertext body, so split and reorder.
    if sealed.len() < TAG_LEN {
        return Err(EecpError::crypto("ciphertext shorter than auth tag"));
    }
    let (body, tag) = sealed.split_at(sealed.len() - TAG_LEN);

    let mut wire = Vec::with_capacity(NONCE_LEN + TAG_LEN + body.len());
    wire.extend_from_slice(&nonce_bytes);
    wire.extend_from_slice(tag);
    wire.extend_from_slice(body);
    Ok(wire)
}

/// Decrypt a `nonce ‖ tag ‖ ciphertext` blob produced by [`encrypt`].
///
/// `expected_key_id` is the key id the caller looked this ciphertext up
/// under (e.g. the envelope's implied key id); it is checked against
/// `key.id()` before the cipher ever runs, so a caller handed the wrong
/// cached key gets a distinct `key id mismatch` error rather than the
/// generic authentication failure a tampered ciphertext produces.
///
/// Fails with `KeyDestroyed` if `key` has already been scrubbed, with a
/// generic crypto error (never leaking which check failed) if the blob is
/// malformed or authentication fails — spec §7 calls for
/// `AUTHENTICATION_FAILED` without further detail in either case.
pub fn decrypt(key: &TemporalKey, expected_key_id: KeyId, wire: &[u8], caller_aad: &[u8]) -> Result<Vec<u8>> {
    if expected_key_id != key.id() {
        return Err(EecpError::crypto("key id mismatch"));
    }
    let material = key.material()?;
    if wire.len() < NONCE_LEN + TAG_LEN {
        return Err(EecpError::crypto("ciphertext truncated"));
    }
    let (nonce_bytes, rest) = wire.split_at(NONCE_LEN);
    let (tag, body) = rest.split_at(TAG_LEN);

    let cipher = Aes256Gcm::new_from_slice(material)
        .map_err(|_| EecpError::crypto("invalid AES-256-GCM key length"))?;
    let nonce = Nonce::from_slice(nonce_bytes);

    // Reassemble into the `aes-gcm` crate's expected ciphertext‖tag form.
    let mut sealed = Vec::with_capacity(body.len() + TAG_LEN);
    sealed.extend_from_slice(body);
    sealed.extend_from_slice(tag);

    let aad = bind_aad(key.id(), caller_aad);
    cipher
        .decrypt(
            nonce,
            Payload {
                msg: &sealed,
                aad: &aad,
            },
        )
        .map_err(|_| EecpError::crypto("authentication failed"))
}

fn bind_aad(key_id: eecp_core::KeyId, caller_aad: &[u8]) -> Vec<u8> {
    let mut aad = key_id.to_string().into_bytes();
    aad.extend_from_slice(caller_aad);
    aad
}
