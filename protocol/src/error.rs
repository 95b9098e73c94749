//! Error taxonomy of the transaction service.
//!
//! Every variant is recoverable at the request boundary: the node maps each
//! one to a status code and an `{ "error": … }` body. Broken internal
//! invariants are not represented here; they panic.

use thiserror::Error;

use crate::crypto::KdfError;
use crate::qkd::QkdError;
use crate::session::StoreError;
use crate::transaction::{AmountError, TransactionStatus};

/// Errors returned by [`crate::service::TransactionService`].
#[derive(Debug, Error)]
pub enum ServiceError {
    /// Missing or malformed input (sender, receiver, amount).
    #[error("{0}")]
    Validation(String),

    /// No session exists for this transaction id.
    #[error("transaction {0} not found")]
    NotFound(String),

    /// The operation is not allowed in the session's current state.
    #[error("transaction {transaction_id} is {current}, expected {expected}")]
    InvalidState {
        transaction_id: String,
        current: TransactionStatus,
        expected: TransactionStatus,
    },

    /// No bits survived sifting. Retrying key generation will almost
    /// certainly succeed.
    #[error("insufficient entropy: no key bits survived sifting, generate a new key")]
    InsufficientEntropy,

    #[error(transparent)]
    Qkd(#[from] QkdError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("failed to encode transfer message: {0}")]
    Encoding(#[from] serde_json::Error),
}

impl From<KdfError> for ServiceError {
    fn from(err: KdfError) -> Self {
        match err {
            KdfError::InsufficientEntropy => Self::InsufficientEntropy,
        }
    }
}

impl From<AmountError> for ServiceError {
    fn from(err: AmountError) -> Self {
        Self::Validation(err.to_string())
    }
}
