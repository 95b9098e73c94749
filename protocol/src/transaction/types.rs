//! Core value types for simulated transfers.
//!
//! Kept small and `Copy` so they move freely between the store, the service,
//! and the API layer.

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

use crate::config::{
    CURRENCY_CODE, CURRENCY_DECIMALS, MAX_TRANSACTION_AMOUNT_PAISE, MINOR_UNITS_PER_MAJOR,
};

// ---------------------------------------------------------------------------
// TransactionStatus
// ---------------------------------------------------------------------------

/// Lifecycle state of a transaction.
///
/// ```text
/// KeyGenerated ──► Processing ──┬──► Completed
///                               └──► Failed
/// ```
///
/// Only forward moves are legal. `Completed` and `Failed` are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransactionStatus {
    /// BB84 key agreed, no transfer attempted yet.
    KeyGenerated,
    /// Encryption round-trip in progress.
    Processing,
    /// Payload sealed and opened successfully.
    Completed,
    /// The encryption round-trip did not reproduce the message.
    Failed,
}

/// A transition the state machine does not allow.
#[derive(Debug, Error, PartialEq, Eq)]
#[error("illegal transition from {from} to {to}")]
pub struct InvalidTransition {
    /// State the transaction was in.
    pub from: TransactionStatus,
    /// State that was requested.
    pub to: TransactionStatus,
}

impl TransactionStatus {
    /// Returns `true` for `Completed` and `Failed`.
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Failed)
    }

    /// Returns `true` if `next` is a legal successor of `self`.
    pub fn can_transition_to(self, next: TransactionStatus) -> bool {
        matches!(
            (self, next),
            (Self::KeyGenerated, Self::Processing)
                | (Self::Processing, Self::Completed)
                | (Self::Processing, Self::Failed)
        )
    }

    /// Moves `self` to `next`, or reports the illegal transition and leaves
    /// `self` untouched.
    pub fn advance(&mut self, next: TransactionStatus) -> Result<(), InvalidTransition> {
        if !self.can_transition_to(next) {
            return Err(InvalidTransition {
                from: *self,
                to: next,
            });
        }
        *self = next;
        Ok(())
    }

    /// Wire name, identical to the serde form.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::KeyGenerated => "key_generated",
            Self::Processing => "processing",
            Self::Completed => "completed",
            Self::Failed => "failed",
        }
    }
}

impl fmt::Display for TransactionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Amount
// ---------------------------------------------------------------------------

/// Why a requested amount was refused.
#[derive(Debug, Error, PartialEq)]
pub enum AmountError {
    #[error("amount must be a finite number")]
    NotFinite,

    #[error("amount must be greater than zero")]
    NotPositive,

    #[error("amount exceeds the maximum of {max}")]
    TooLarge {
        /// The ceiling, formatted in major units.
        max: Amount,
    },

    #[error("amount is not a number: {0:?}")]
    Unparseable(String),
}

/// A rupee amount held as an integer count of paise.
///
/// Floats only appear at the edge, in [`Amount::from_major`], where the
/// browser's `parseFloat` output is rounded to the nearest paisa.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Amount {
    paise: u64,
}

impl Amount {
    /// Builds an amount from paise.
    pub fn from_paise(paise: u64) -> Self {
        Self { paise }
    }

    /// Converts a rupee value, rounding to the nearest paisa.
    ///
    /// Rejects NaN/∞, anything that rounds to zero or below, and anything
    /// above [`MAX_TRANSACTION_AMOUNT_PAISE`].
    pub fn from_major(value: f64) -> Result<Self, AmountError> {
        if !value.is_finite() {
            return Err(AmountError::NotFinite);
        }
        let minor = (value * MINOR_UNITS_PER_MAJOR as f64).round();
        if minor < 1.0 {
            return Err(AmountError::NotPositive);
        }
        if minor > MAX_TRANSACTION_AMOUNT_PAISE as f64 {
            return Err(AmountError::TooLarge {
                max: Self::from_paise(MAX_TRANSACTION_AMOUNT_PAISE),
            });
        }
        Ok(Self {
            paise: minor as u64,
        })
    }

    /// Parses a decimal string such as `"150"` or `"150.00"`.
    pub fn parse(text: &str) -> Result<Self, AmountError> {
        let value: f64 = text
            .trim()
            .parse()
            .map_err(|_| AmountError::Unparseable(text.to_string()))?;
        Self::from_major(value)
    }

    /// Value in paise.
    pub fn paise(&self) -> u64 {
        self.paise
    }

    /// Value in rupees. Display and JSON only.
    pub fn as_major(&self) -> f64 {
        self.paise as f64 / MINOR_UNITS_PER_MAJOR as f64
    }

    /// `"150.00 INR"`.
    pub fn display_with_currency(&self) -> String {
        format!("{} {}", self, CURRENCY_CODE)
    }
}

impl fmt::Display for Amount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}.{:0>width$}",
            self.paise / MINOR_UNITS_PER_MAJOR,
            self.paise % MINOR_UNITS_PER_MAJOR,
            width = CURRENCY_DECIMALS as usize
        )
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_wire_names() {
        assert_eq!(TransactionStatus::KeyGenerated.to_string(), "key_generated");
        assert_eq!(TransactionStatus::Completed.to_string(), "completed");
        assert_eq!(
            serde_json::to_string(&TransactionStatus::Failed).unwrap(),
            r#""failed""#
        );
    }

    #[test]
    fn status_forward_path() {
        let mut s = TransactionStatus::KeyGenerated;
        s.advance(TransactionStatus::Processing).unwrap();
        s.advance(TransactionStatus::Completed).unwrap();
        assert!(s.is_terminal());
    }

    #[test]
    fn status_never_moves_backward() {
        let mut s = TransactionStatus::Completed;
        let err = s.advance(TransactionStatus::KeyGenerated).unwrap_err();
        assert_eq!(err.from, TransactionStatus::Completed);
        assert_eq!(s, TransactionStatus::Completed);

        let mut s = TransactionStatus::Processing;
        assert!(s.advance(TransactionStatus::KeyGenerated).is_err());
    }

    #[test]
    fn status_cannot_skip_processing() {
        let mut s = TransactionStatus::KeyGenerated;
        assert!(s.advance(TransactionStatus::Completed).is_err());
        assert!(s.advance(TransactionStatus::Failed).is_err());
        assert_eq!(s, TransactionStatus::KeyGenerated);
    }

    #[test]
    fn amount_display_two_decimals() {
        assert_eq!(Amount::from_paise(15_000).to_string(), "150.00");
        assert_eq!(Amount::from_paise(5).to_string(), "0.05");
        assert_eq!(Amount::from_paise(1_050).display_with_currency(), "10.50 INR");
    }

    #[test]
    fn amount_from_major_rounds_to_paise() {
        assert_eq!(Amount::from_major(150.0).unwrap().paise(), 15_000);
        assert_eq!(Amount::from_major(0.1 + 0.2).unwrap().paise(), 30);
        assert_eq!(Amount::from_major(19.999).unwrap().paise(), 2_000);
    }

    #[test]
    fn amount_rejects_non_positive() {
        assert_eq!(Amount::from_major(0.0), Err(AmountError::NotPositive));
        assert_eq!(Amount::from_major(-5.0), Err(AmountError::NotPositive));
        assert_eq!(Amount::from_major(0.004), Err(AmountError::NotPositive));
    }

    #[test]
    fn amount_rejects_nan_and_infinity() {
        assert_eq!(Amount::from_major(f64::NAN), Err(AmountError::NotFinite));
        assert_eq!(Amount::from_major(f64::INFINITY), Err(AmountError::NotFinite));
    }

    #[test]
    fn amount_rejects_too_large() {
        assert!(matches!(
            Amount::from_major(1e12),
            Err(AmountError::TooLarge { .. })
        ));
    }

    #[test]
    fn amount_parse_strings() {
        assert_eq!(Amount::parse(" 150.00 ").unwrap().paise(), 15_000);
        assert!(matches!(
            Amount::parse("lots"),
            Err(AmountError::Unparseable(_))
        ));
    }
}
