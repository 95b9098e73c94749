//! # Transaction Service
//!
//! The three operations the front-end calls, wired over the engine, the
//! key derivation, the cipher and the session store.
//!
//! ```text
//! generate_key ──► QkdEngine::run ──► derive_key ──► SessionStore::create
//!
//! process_transaction ──► SessionStore::update ─┐  (per-session lock held)
//!                         status → Processing   │
//!                         encrypt, decrypt      │
//!                         status → Completed/Failed
//!                         attach Transaction ───┘
//!
//! get_status ──► SessionStore::get
//! ```
//!
//! Everything inside `process_transaction` runs under the session's own
//! mutex, so two racing calls on one id cannot both leave `KeyGenerated`.
//! The loser sees [`ServiceError::InvalidState`].

use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::config::{ServiceConfig, MAX_QKD_KEY_LENGTH, TRANSACTION_ID_PREFIX};
use crate::crypto::{decrypt, derive_key, encrypt, CipherError};
use crate::error::ServiceError;
use crate::qkd::{BitSource, OsBitSource, QkdEngine, QkdError, QkdMaterial};
use crate::session::{QkdSession, SessionEntry, SessionStore, StoreConfig};
use crate::transaction::{Amount, Transaction, TransactionStatus, TransferMessage};

/// Result of a successful `generate_key`.
#[derive(Debug, Clone)]
pub struct KeyGeneration {
    pub transaction_id: String,
    /// Full exchange, returned for visualization.
    pub material: QkdMaterial,
    /// Fingerprint of the derived key. Never the key itself.
    pub key_fingerprint: String,
}

/// What `get_status` reports for a session.
#[derive(Debug, Clone)]
pub enum TransactionView {
    /// Keyed but not yet processed.
    KeyGenerated {
        transaction_id: String,
        sender: String,
        receiver: String,
        created_at: DateTime<Utc>,
    },
    /// Processing finished (successfully or not).
    Processed(Transaction),
}

impl TransactionView {
    pub fn transaction_id(&self) -> &str {
        match self {
            Self::KeyGenerated { transaction_id, .. } => transaction_id,
            Self::Processed(tx) => &tx.transaction_id,
        }
    }

    pub fn status(&self) -> TransactionStatus {
        match self {
            Self::KeyGenerated { .. } => TransactionStatus::KeyGenerated,
            Self::Processed(tx) => tx.status,
        }
    }

    pub fn sender(&self) -> &str {
        match self {
            Self::KeyGenerated { sender, .. } => sender,
            Self::Processed(tx) => &tx.sender,
        }
    }

    pub fn receiver(&self) -> &str {
        match self {
            Self::KeyGenerated { receiver, .. } => receiver,
            Self::Processed(tx) => &tx.receiver,
        }
    }
}

/// Orchestrates key generation and transaction processing.
///
/// Owns its session store; construct one per node.
#[derive(Debug)]
pub struct TransactionService {
    engine: QkdEngine,
    store: SessionStore,
    config: ServiceConfig,
}

impl TransactionService {
    /// Builds a service drawing BB84 randomness from `source`.
    ///
    /// Fails if the configured exchange length is out of range.
    pub fn new(config: ServiceConfig, source: Arc<dyn BitSource>) -> Result<Self, QkdError> {
        if config.qkd_key_length == 0 || config.qkd_key_length > MAX_QKD_KEY_LENGTH {
            return Err(QkdError::InvalidLength {
                length: config.qkd_key_length,
                max: MAX_QKD_KEY_LENGTH,
            });
        }

        let store = SessionStore::new(StoreConfig {
            max_sessions: config.max_sessions,
            ttl: config.session_ttl,
        });

        Ok(Self {
            engine: QkdEngine::new(source),
            store,
            config,
        })
    }

    /// Builds a service backed by the OS CSPRNG.
    pub fn with_os_entropy(config: ServiceConfig) -> Result<Self, QkdError> {
        Self::new(config, Arc::new(OsBitSource))
    }

    /// The underlying session store.
    pub fn store(&self) -> &SessionStore {
        &self.store
    }

    /// Runs a BB84 exchange for a new transaction between `sender` and
    /// `receiver` and opens a session for it.
    pub fn generate_key(&self, sender: &str, receiver: &str) -> Result<KeyGeneration, ServiceError> {
        let sender = sender.trim();
        let receiver = receiver.trim();
        if sender.is_empty() || receiver.is_empty() {
            warn!("key generation rejected: missing sender or receiver");
            return Err(ServiceError::Validation(
                "Sender and receiver are required".to_string(),
            ));
        }

        let material = self.engine.run(self.config.qkd_key_length)?;
        let derived_key = derive_key(&material.sifted_key).map_err(|e| {
            warn!(length = material.len(), "no bits survived sifting");
            e
        })?;
        let key_fingerprint = derived_key.fingerprint();

        let transaction_id = new_transaction_id();
        self.store.create(QkdSession {
            transaction_id: transaction_id.clone(),
            sender: sender.to_string(),
            receiver: receiver.to_string(),
            material: material.clone(),
            derived_key,
            created_at: Utc::now(),
        })?;

        info!(
            %transaction_id,
            raw_bits = material.len(),
            sifted_bits = material.sifted_key.len(),
            key = %key_fingerprint,
            "quantum key generated"
        );

        Ok(KeyGeneration {
            transaction_id,
            material,
            key_fingerprint,
        })
    }

    /// Processes a transfer of `amount` rupees under the session's key.
    pub fn process_transaction(
        &self,
        transaction_id: &str,
        amount: f64,
    ) -> Result<Transaction, ServiceError> {
        let amount = Amount::from_major(amount).map_err(|e| {
            warn!(%transaction_id, error = %e, "transaction rejected: bad amount");
            e
        })?;
        self.process_amount(transaction_id, amount)
    }

    /// [`Self::process_transaction`] with an already validated amount.
    pub fn process_amount(
        &self,
        transaction_id: &str,
        amount: Amount,
    ) -> Result<Transaction, ServiceError> {
        let outcome = self
            .store
            .update(transaction_id, |entry| settle(entry, amount))
            .ok_or_else(|| ServiceError::NotFound(transaction_id.to_string()))?;

        match &outcome {
            Ok(tx) => info!(
                %transaction_id,
                status = %tx.status,
                amount = %amount.display_with_currency(),
                encrypted_len = tx.encrypted_len(),
                "transaction processed"
            ),
            Err(e) => warn!(%transaction_id, error = %e, "transaction rejected"),
        }
        outcome
    }

    /// Current view of a session.
    pub fn get_status(&self, transaction_id: &str) -> Result<TransactionView, ServiceError> {
        let entry = self
            .store
            .get(transaction_id)
            .ok_or_else(|| ServiceError::NotFound(transaction_id.to_string()))?;

        match entry.transaction {
            Some(tx) => {
                assert!(
                    entry.status.is_terminal() && entry.status == tx.status,
                    "session {transaction_id} holds a transaction but is {}",
                    entry.status
                );
                Ok(TransactionView::Processed(tx))
            }
            None => {
                assert_eq!(
                    entry.status,
                    TransactionStatus::KeyGenerated,
                    "session {transaction_id} has no transaction but left key_generated"
                );
                let session = entry.session;
                Ok(TransactionView::KeyGenerated {
                    transaction_id: session.transaction_id,
                    sender: session.sender,
                    receiver: session.receiver,
                    created_at: session.created_at,
                })
            }
        }
    }

    /// Drops sessions past their TTL. Returns how many were removed.
    pub fn expire_sessions(&self) -> usize {
        self.store.expire_old()
    }

    pub fn session_count(&self) -> usize {
        self.store.len()
    }
}

/// The state-machine step run under the session lock.
fn settle(entry: &mut SessionEntry, amount: Amount) -> Result<Transaction, ServiceError> {
    let transaction_id = entry.session.transaction_id.clone();

    if entry.status != TransactionStatus::KeyGenerated {
        return Err(ServiceError::InvalidState {
            transaction_id,
            current: entry.status,
            expected: TransactionStatus::KeyGenerated,
        });
    }

    let processed_at = Utc::now();
    let original_message = TransferMessage::new(
        &entry.session.sender,
        &entry.session.receiver,
        amount,
        processed_at,
    )
    .to_canonical_string()?;

    transition(entry, TransactionStatus::Processing);

    let key = entry.session.derived_key.as_bytes();
    let aad = transaction_id.as_bytes();
    let (encrypted_payload, opened) = match encrypt(key, original_message.as_bytes(), aad) {
        Ok(sealed) => {
            let opened = decrypt(key, &sealed, aad);
            (sealed, opened)
        }
        Err(e) => (Vec::new(), Err::<Vec<u8>, CipherError>(e)),
    };

    let (decrypted_payload, decryption_successful) = match opened {
        Ok(bytes) => {
            let matches = bytes == original_message.as_bytes();
            (String::from_utf8_lossy(&bytes).into_owned(), matches)
        }
        Err(e) => {
            error!(%transaction_id, error = %e, "cipher round-trip failed");
            (String::new(), false)
        }
    };
    if !decryption_successful {
        error!(%transaction_id, "decrypted payload does not match the original message");
    }

    let status = if decryption_successful {
        TransactionStatus::Completed
    } else {
        TransactionStatus::Failed
    };
    transition(entry, status);

    let tx = Transaction {
        transaction_id,
        sender: entry.session.sender.clone(),
        receiver: entry.session.receiver.clone(),
        amount,
        status,
        original_message,
        encrypted_payload,
        decrypted_payload,
        decryption_successful,
        processed_at,
    };
    entry.transaction = Some(tx.clone());
    Ok(tx)
}

fn transition(entry: &mut SessionEntry, next: TransactionStatus) {
    if let Err(e) = entry.status.advance(next) {
        panic!("session {}: {e}", entry.session.transaction_id);
    }
}

fn new_transaction_id() -> String {
    format!("{}{}", TRANSACTION_ID_PREFIX, Uuid::new_v4().simple())
}
