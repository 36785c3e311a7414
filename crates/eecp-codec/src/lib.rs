//! # EECP Codec
//!
//! The Operation Codec (C4): encrypts, signs, verifies, and decrypts CRDT
//! operations into their wire envelope.

#![forbid(unsafe_code)]

pub mod codec;

pub use codec::{check_workspace, decrypt_operation, encrypt_operation, verify};
