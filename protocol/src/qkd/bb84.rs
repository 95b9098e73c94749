//! # BB84 Exchange
//!
//! One call to [`QkdEngine::run`] plays out a full exchange of `length`
//! positions over an ideal, noiseless channel:
//!
//! 1. Alice draws a bit and a basis for every position.
//! 2. Bob draws a basis for every position.
//! 3. Bob measures. Matching basis: he reads Alice's bit. Mismatched basis:
//!    he reads an independent fair coin.
//! 4. Both sides keep Alice's bits at the matching positions (sifting).
//!
//! The expected sifted length is `length / 2`. The engine never retries or
//! pads to hit that number; whatever the draws give is what the caller gets.

use std::sync::Arc;

use serde::Serialize;
use thiserror::Error;
use tracing::debug;

use super::{Basis, BitSource};
use crate::config::MAX_QKD_KEY_LENGTH;

/// Errors raised by the exchange itself.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum QkdError {
    /// Requested exchange length is zero or above the configured ceiling.
    #[error("invalid exchange length {length}: must be between 1 and {max}")]
    InvalidLength {
        /// The rejected length.
        length: usize,
        /// The largest accepted length.
        max: usize,
    },
}

/// Everything one exchange produced, position by position.
///
/// All four per-position vectors have the same length. `sifted_key` is the
/// order-preserving filter of `alice_bits` by basis agreement.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct QkdMaterial {
    /// Alice's raw bits.
    pub alice_bits: Vec<bool>,
    /// Alice's preparation bases.
    pub alice_bases: Vec<Basis>,
    /// Bob's measurement bases.
    pub bob_bases: Vec<Basis>,
    /// What Bob read at each position.
    pub bob_measurements: Vec<bool>,
    /// Alice's bits at the positions where both bases agree.
    pub sifted_key: Vec<bool>,
}

impl QkdMaterial {
    /// Raw exchange length N.
    pub fn len(&self) -> usize {
        self.alice_bits.len()
    }

    /// Always `false` for material produced by [`QkdEngine::run`].
    pub fn is_empty(&self) -> bool {
        self.alice_bits.is_empty()
    }

    /// Indices where Alice's and Bob's bases agree.
    pub fn matching_positions(&self) -> impl Iterator<Item = usize> + '_ {
        self.alice_bases
            .iter()
            .zip(&self.bob_bases)
            .enumerate()
            .filter(|(_, (a, b))| a == b)
            .map(|(i, _)| i)
    }

    /// Share of positions that survived sifting, as a percentage.
    pub fn matching_bases_percentage(&self) -> f64 {
        if self.is_empty() {
            return 0.0;
        }
        self.sifted_key.len() as f64 / self.len() as f64 * 100.0
    }

    /// Fraction of sifted positions where Bob's reading disagrees with
    /// Alice's bit.
    ///
    /// Always 0.0 over the ideal channel. An eavesdropping check would
    /// sacrifice part of the sifted key and compare it against a threshold
    /// here; nothing in the current pipeline rejects on it.
    pub fn error_rate(&self) -> f64 {
        let mut compared = 0usize;
        let mut errors = 0usize;
        for i in self.matching_positions() {
            compared += 1;
            if self.alice_bits[i] != self.bob_measurements[i] {
                errors += 1;
            }
        }
        if compared == 0 {
            0.0
        } else {
            errors as f64 / compared as f64
        }
    }
}

/// Keeps `alice_bits[i]` wherever `alice_bases[i] == bob_bases[i]`.
pub fn sift(alice_bits: &[bool], alice_bases: &[Basis], bob_bases: &[Basis]) -> Vec<bool> {
    debug_assert_eq!(alice_bits.len(), alice_bases.len());
    debug_assert_eq!(alice_bits.len(), bob_bases.len());

    alice_bits
        .iter()
        .zip(alice_bases.iter().zip(bob_bases))
        .filter(|(_, (a, b))| a == b)
        .map(|(&bit, _)| bit)
        .collect()
}

/// Runs BB84 exchanges against an injected [`BitSource`].
#[derive(Clone)]
pub struct QkdEngine {
    source: Arc<dyn BitSource>,
}

impl std::fmt::Debug for QkdEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("QkdEngine").finish_non_exhaustive()
    }
}

impl QkdEngine {
    /// Creates an engine drawing from `source`.
    pub fn new(source: Arc<dyn BitSource>) -> Self {
        Self { source }
    }

    /// Plays one exchange of `length` positions.
    pub fn run(&self, length: usize) -> Result<QkdMaterial, QkdError> {
        if length == 0 || length > MAX_QKD_KEY_LENGTH {
            return Err(QkdError::InvalidLength {
                length,
                max: MAX_QKD_KEY_LENGTH,
            });
        }

        let mut alice_bits = Vec::with_capacity(length);
        let mut alice_bases = Vec::with_capacity(length);
        for _ in 0..length {
            alice_bits.push(self.source.next_bit());
            alice_bases.push(self.source.next_basis());
        }

        let bob_bases: Vec<Basis> = (0..length).map(|_| self.source.next_basis()).collect();

        let bob_measurements: Vec<bool> = (0..length)
            .map(|i| {
                if bob_bases[i] == alice_bases[i] {
                    alice_bits[i]
                } else {
                    self.source.next_bit()
                }
            })
            .collect();

        let sifted_key = sift(&alice_bits, &alice_bases, &bob_bases);

        let material = QkdMaterial {
            alice_bits,
            alice_bases,
            bob_bases,
            bob_measurements,
            sifted_key,
        };

        debug!(
            length,
            sifted = material.sifted_key.len(),
            error_rate = material.error_rate(),
            "bb84 exchange complete"
        );

        Ok(material)
    }
}
