//! The processed-transaction record and its canonical plaintext.

use chrono::{DateTime, Utc};
use serde::Serialize;

use super::types::{Amount, TransactionStatus};
use crate::config::CURRENCY_CODE;
use crate::crypto::encrypted_sample;

/// The plaintext that gets sealed under the BB84 key.
///
/// Serialized as compact JSON with a fixed field order, so the same inputs
/// always produce the same bytes.
#[derive(Debug, Clone, Serialize)]
pub struct TransferMessage<'a> {
    pub sender: &'a str,
    pub receiver: &'a str,
    /// Two-decimal string, e.g. `"150.00"`.
    pub amount: String,
    pub currency: &'static str,
    /// Unix milliseconds.
    pub timestamp: i64,
}

impl<'a> TransferMessage<'a> {
    /// Builds the message for a transfer made at `at`.
    pub fn new(sender: &'a str, receiver: &'a str, amount: Amount, at: DateTime<Utc>) -> Self {
        Self {
            sender,
            receiver,
            amount: amount.to_string(),
            currency: CURRENCY_CODE,
            timestamp: at.timestamp_millis(),
        }
    }

    /// Canonical string form.
    pub fn to_canonical_string(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

/// A transfer that has been through the encryption round-trip.
///
/// Created once per session by the service, never mutated afterwards.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transaction {
    pub transaction_id: String,
    pub sender: String,
    pub receiver: String,
    pub amount: Amount,
    /// `Completed` or `Failed`; never anything else once stored.
    pub status: TransactionStatus,
    pub original_message: String,
    /// `nonce || ciphertext || tag`.
    pub encrypted_payload: Vec<u8>,
    /// What came back out of decryption (lossy UTF-8; empty if decryption
    /// failed outright).
    pub decrypted_payload: String,
    pub decryption_successful: bool,
    pub processed_at: DateTime<Utc>,
}

impl Transaction {
    /// Length of the sealed payload in bytes.
    pub fn encrypted_len(&self) -> usize {
        self.encrypted_payload.len()
    }

    /// Display sample of the sealed payload.
    pub fn encrypted_sample(&self) -> String {
        encrypted_sample(&self.encrypted_payload)
    }
}
