//! Utility functions and helpers
//!
//! This module contains the cryptographic helpers behind account identities:
//! seed generation, id derivation and timestamps.

pub mod crypto;

pub use crypto::{
    current_timestamp, derive_id, generate_seed, probe_randomness, sha256_digest, ID_LEN,
    SEED_LEN,
};
