//! # Transaction Module
//!
//! Value types and the processed-transaction record.
//!
//! ```text
//! types.rs : TransactionStatus (the state machine) and Amount
//! record.rs: Transaction record and the canonical TransferMessage
//! ```
//!
//! ## Design Decisions
//!
//! - Amounts are integer paise. No floating point in stored money.
//! - Status transitions go through [`TransactionStatus::advance`], which
//!   refuses anything but a forward move.
//! - The plaintext is compact JSON with a fixed field order, so the
//!   "original message" shown to the user is stable and parseable.

pub mod record;
pub mod types;

pub use record::{Transaction, TransferMessage};
pub use types::{Amount, AmountError, InvalidTransition, TransactionStatus};
