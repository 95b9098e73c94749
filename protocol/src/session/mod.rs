//! # Sessions
//!
//! One session per `generate_key` call, keyed by transaction id. A session
//! owns its BB84 material and derived key, and later the single
//! [`Transaction`](crate::transaction::Transaction) processed under it.

pub mod store;

pub use store::{SessionEntry, SessionStore, StoreConfig, StoreError};

use chrono::{DateTime, Utc};

use crate::crypto::DerivedKey;
use crate::qkd::QkdMaterial;

/// Key-generation output for one transaction id. Immutable once created.
#[derive(Debug, Clone)]
pub struct QkdSession {
    pub transaction_id: String,
    pub sender: String,
    pub receiver: String,
    pub material: QkdMaterial,
    pub derived_key: DerivedKey,
    pub created_at: DateTime<Utc>,
}
