//! # EECP CRDT Engine
//!
//! The Convergence Engine (C3): a deterministic log-replay sequence CRDT.
//! Operations are never mutated or reordered on disk; rendering folds the
//! log in a fixed `(timestamp, operation_id)` order so any two replicas
//! holding the same operation set converge to the same text regardless of
//! the order operations were applied in.

#![forbid(unsafe_code)]

pub mod document;

pub use document::CrdtDocument;
