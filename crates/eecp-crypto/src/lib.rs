//! # EECP Crypto
//!
//! Temporal Key Derivation (C1) and Authenticated Encryption (C2): the two
//! components every other EECP component builds its guarantees on top of.

#![forbid(unsafe_code)]

pub mod aead;
pub mod key_derivation;

pub use aead::{decrypt, encrypt};
pub use key_derivation::{derive_key, TemporalKey};
