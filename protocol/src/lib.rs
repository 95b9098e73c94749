// Copyright (c) 2026 QUPI Contributors. MIT License.
// See LICENSE for details.

//! # QUPI Protocol Core Library
//!
//! A simulated quantum-keyed payment handshake. Two parties run a BB84
//! exchange, the surviving bits become an AES-256-GCM key, and a single
//! transfer message is sealed and opened under that key to prove the key
//! works end to end.
//!
//! ## Architecture
//!
//! - **qkd**: BB84 simulation: random bits and bases, measurement, sifting.
//! - **crypto**: Key derivation from sifted bits and the AEAD cipher.
//! - **transaction**: Amounts, the status state machine, the transfer record.
//! - **session**: Concurrent per-transaction session store.
//! - **service**: The three operations the API exposes.
//! - **config**: Protocol constants and service defaults.
//! - **error**: Service error taxonomy.
//!
//! The quantum channel is simulated and ideal. Nothing here is quantum-secure
//! and nothing moves real money.

pub mod config;
pub mod crypto;
pub mod error;
pub mod qkd;
pub mod service;
pub mod session;
pub mod transaction;

pub use error::ServiceError;
pub use service::{KeyGeneration, TransactionService, TransactionView};
