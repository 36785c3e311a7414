//! # EECP Ledger
//!
//! The Commitment Ledger (C3): an append-only, in-memory record that a
//! temporal key existed with a given validity window, written once per key
//! immediately before Temporal Cleanup destroys its material.

#![forbid(unsafe_code)]

pub mod commitment;
pub mod ledger;

pub use commitment::Commitment;
pub use ledger::CommitmentLedger;
