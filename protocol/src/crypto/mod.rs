//! # Cryptographic Primitives for QUPI
//!
//! Two jobs: turn a sifted BB84 key into a usable symmetric key, and use that
//! key to seal transaction payloads.
//!
//! - **BLAKE3** `derive_key` for key derivation.
//! - **AES-256-GCM** for payload encryption.
//! - **SHA-256** for key fingerprints in logs.
//!
//! Everything here is a thin wrapper around audited implementations.

pub mod encryption;
pub mod kdf;

pub use encryption::{decrypt, encrypt, encrypted_sample, CipherError};
pub use kdf::{derive_key, DerivedKey, KdfError};
