//! # AES-256-GCM Transaction Cipher
//!
//! Encrypts transaction payloads under the BB84-derived key.
//!
//! ## Nonce management
//!
//! Each encryption draws a fresh 96-bit nonce from the OS CSPRNG. A derived
//! key only ever protects one transaction, so the birthday bound is not a
//! concern. Decryption is deterministic: the nonce travels with the payload.
//!
//! ## Wire format
//!
//! ```text
//! nonce (12) || ciphertext (len(plaintext)) || tag (16)
//! ```
//!
//! The transaction id is passed as additional authenticated data. It is not
//! encrypted, but a payload sealed for one transaction will not open under
//! another.

use aes_gcm::{
    aead::{Aead, KeyInit, Payload},
    Aes256Gcm, Nonce,
};
use rand::RngCore;
use thiserror::Error;

use crate::config::{AES_KEY_LENGTH, AES_NONCE_LENGTH, AES_TAG_LENGTH, ENCRYPTED_SAMPLE_BYTES};

/// Errors that can occur during encryption/decryption.
///
/// A wrong key and a tampered payload both surface as `DecryptFailed`.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum CipherError {
    #[error("encryption failed")]
    EncryptFailed,

    #[error("decryption failed -- wrong key or corrupted ciphertext")]
    DecryptFailed,

    #[error("ciphertext too short: must be at least {} bytes", AES_NONCE_LENGTH + AES_TAG_LENGTH)]
    CiphertextTooShort,
}

/// Seals `plaintext` under `key`, authenticating `aad` alongside it.
///
/// Returns `nonce || ciphertext || tag`.
pub fn encrypt(
    key: &[u8; AES_KEY_LENGTH],
    plaintext: &[u8],
    aad: &[u8],
) -> Result<Vec<u8>, CipherError> {
    let cipher = Aes256Gcm::new_from_slice(key).map_err(|_| CipherError::EncryptFailed)?;

    let mut nonce_bytes = [0u8; AES_NONCE_LENGTH];
    rand::rngs::OsRng.fill_bytes(&mut nonce_bytes);
    let nonce = Nonce::from_slice(&nonce_bytes);

    let ciphertext = cipher
        .encrypt(
            nonce,
            Payload {
                msg: plaintext,
                aad,
            },
        )
        .map_err(|_| CipherError::EncryptFailed)?;

    let mut out = Vec::with_capacity(AES_NONCE_LENGTH + ciphertext.len());
    out.extend_from_slice(&nonce_bytes);
    out.extend_from_slice(&ciphertext);
    Ok(out)
}

/// Opens a payload produced by [`encrypt`] with the same key and `aad`.
pub fn decrypt(
    key: &[u8; AES_KEY_LENGTH],
    sealed: &[u8],
    aad: &[u8],
) -> Result<Vec<u8>, CipherError> {
    if sealed.len() < AES_NONCE_LENGTH + AES_TAG_LENGTH {
        return Err(CipherError::CiphertextTooShort);
    }

    let (nonce_bytes, ciphertext) = sealed.split_at(AES_NONCE_LENGTH);
    let cipher = Aes256Gcm::new_from_slice(key).map_err(|_| CipherError::DecryptFailed)?;
    let nonce = Nonce::from_slice(nonce_bytes);

    cipher
        .decrypt(
            nonce,
            Payload {
                msg: ciphertext,
                aad,
            },
        )
        .map_err(|_| CipherError::DecryptFailed)
}

/// Hex of the first [`ENCRYPTED_SAMPLE_BYTES`] bytes of a sealed payload,
/// for display. Never the whole payload.
pub fn encrypted_sample(sealed: &[u8]) -> String {
    let end = sealed.len().min(ENCRYPTED_SAMPLE_BYTES);
    hex::encode(&sealed[..end])
}
