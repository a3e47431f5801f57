//! # Braid Crypto
//!
//! Hashing and signing primitives used by the event-creation engine:
//! BLAKE3 for event digests and node identities, Ed25519 for signatures.
//! Both are consumed as fast, synchronous, deterministic services.

pub mod hash;
pub mod keys;

pub use hash::*;
pub use keys::*;
