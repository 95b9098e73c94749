//! # Sifted-Key Derivation
//!
//! A sifted key is a short, variable-length run of bits (about 32 for the
//! default 64-position exchange). AES-256 wants exactly 32 bytes. We bridge
//! the two with BLAKE3 in `derive_key` mode:
//!
//! ```text
//! material = bit_count (u64 LE) || bits packed MSB-first
//! key      = BLAKE3::derive_key(KDF_CONTEXT, material)
//! ```
//!
//! The length prefix keeps `[1]` and `[1, 0]` apart even though both pack to
//! `0x80`. Short inputs are stretched by the hash, never zero-padded into
//! the key itself.

use sha2::{Digest, Sha256};
use std::fmt;
use thiserror::Error;

use crate::config::{AES_KEY_LENGTH, KDF_CONTEXT, KEY_FINGERPRINT_LENGTH};

/// Errors raised while deriving a key.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum KdfError {
    /// Nothing survived sifting, so there is nothing to derive from.
    #[error("insufficient entropy: sifted key is empty")]
    InsufficientEntropy,
}

/// A 32-byte AES-256 key derived from a sifted key.
///
/// `Debug` prints the fingerprint only.
#[derive(Clone, PartialEq, Eq)]
pub struct DerivedKey([u8; AES_KEY_LENGTH]);

impl DerivedKey {
    /// Raw key bytes.
    pub fn as_bytes(&self) -> &[u8; AES_KEY_LENGTH] {
        &self.0
    }

    /// Short hex identifier: the first bytes of SHA-256 over the key.
    pub fn fingerprint(&self) -> String {
        let digest = Sha256::digest(self.0);
        hex::encode(&digest[..KEY_FINGERPRINT_LENGTH])
    }
}

impl fmt::Debug for DerivedKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "DerivedKey({})", self.fingerprint())
    }
}

/// Packs bits MSB-first; a trailing partial byte is left-aligned.
pub fn pack_bits(bits: &[bool]) -> Vec<u8> {
    bits.chunks(8)
        .map(|chunk| {
            chunk
                .iter()
                .enumerate()
                .fold(0u8, |acc, (i, &bit)| acc | ((bit as u8) << (7 - i)))
        })
        .collect()
}

/// Derives the AES-256 key for a sifted key.
///
/// Pure: the same bits always give the same key.
pub fn derive_key(sifted_key: &[bool]) -> Result<DerivedKey, KdfError> {
    if sifted_key.is_empty() {
        return Err(KdfError::InsufficientEntropy);
    }

    let packed = pack_bits(sifted_key);
    let mut material = Vec::with_capacity(8 + packed.len());
    material.extend_from_slice(&(sifted_key.len() as u64).to_le_bytes());
    material.extend_from_slice(&packed);

    Ok(DerivedKey(blake3::derive_key(KDF_CONTEXT, &material)))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bits(s: &str) -> Vec<bool> {
        s.chars().map(|c| c == '1').collect()
    }

    #[test]
    fn empty_sifted_key_rejected() {
        assert_eq!(derive_key(&[]).unwrap_err(), KdfError::InsufficientEntropy);
    }

    #[test]
    fn derivation_is_deterministic() {
        let sifted = bits("1011001110001011");
        let a = derive_key(&sifted).unwrap();
        let b = derive_key(&sifted).unwrap();
        assert_eq!(a.as_bytes(), b.as_bytes());
    }

    #[test]
    fn single_bit_still_gives_full_key() {
        let key = derive_key(&[true]).unwrap();
        assert_eq!(key.as_bytes().len(), AES_KEY_LENGTH);
        assert_ne!(key.as_bytes(), &[0u8; AES_KEY_LENGTH]);
    }

    #[test]
    fn trailing_zero_changes_key() {
        // Both pack to 0x80; the length prefix must tell them apart.
        assert_eq!(pack_bits(&bits("1")), pack_bits(&bits("10")));
        assert_ne!(derive_key(&bits("1")).unwrap(), derive_key(&bits("10")).unwrap());
    }

    #[test]
    fn flipping_one_bit_changes_key() {
        let a = derive_key(&bits("00000000")).unwrap();
        let b = derive_key(&bits("00000001")).unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn pack_bits_msb_first() {
        assert_eq!(pack_bits(&bits("10000000")), vec![0x80]);
        assert_eq!(pack_bits(&bits("0000000111")), vec![0x01, 0xC0]);
    }

    #[test]
    fn debug_hides_key_bytes() {
        let key = derive_key(&bits("110")).unwrap();
        let shown = format!("{:?}", key);
        assert!(shown.contains(&key.fingerprint()));
        assert!(!shown.contains(&hex::encode(key.as_bytes())));
        assert_eq!(key.fingerprint().len(), KEY_FINGERPRINT_LENGTH * 2);
    }
}
