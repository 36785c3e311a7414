//! # EECP Protocol
//!
//! Transport-agnostic wire types for the relay protocol (spec §6):
//! `MessageEnvelope`, its payload variants, and the opaque
//! `EncryptedOperation` they carry.

#![forbid(unsafe_code)]

pub mod message;
pub mod operation;

pub use message::{decode, encode, ErrorCode, HandshakeProof, MessageEnvelope, MessagePayload};
pub use operation::EncryptedOperation;
