//! # Simulated Quantum Key Distribution
//!
//! BB84 without the photons. Alice picks random bits and random bases,
//! Bob picks his own random bases and "measures". Wherever the two bases
//! agree Bob reads Alice's bit exactly; everywhere else he reads a coin
//! flip. Sifting keeps only the agreeing positions.
//!
//! ```text
//!   alice_bits   1 0 1 1 0 0 1 0
//!   alice_bases  + x x + + x + x
//!   bob_bases    + + x x + x x x
//!   match?       ✓ . ✓ . ✓ ✓ . ✓
//!   sifted_key   1   1   0 0   0
//! ```
//!
//! Bits are plain `bool` (`true` = 1). Bases are the two-valued [`Basis`].
//! Randomness comes from an injected [`BitSource`] so tests can pin the
//! exact draw sequence.

pub mod bb84;
pub mod source;

pub use bb84::{sift, QkdEngine, QkdError, QkdMaterial};
pub use source::{BitSource, OsBitSource, SeededBitSource};

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::config::{DIAGONAL_SYMBOL, RECTILINEAR_SYMBOL};

/// Measurement/preparation basis.
///
/// Serialized as `"+"` and `"x"`, the symbols the visualizer draws.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Basis {
    /// Horizontal/vertical polarization.
    #[serde(rename = "+")]
    Rectilinear,
    /// ±45° polarization.
    #[serde(rename = "x")]
    Diagonal,
}

impl Basis {
    /// The boundary symbol for this basis.
    pub fn symbol(self) -> &'static str {
        match self {
            Self::Rectilinear => RECTILINEAR_SYMBOL,
            Self::Diagonal => DIAGONAL_SYMBOL,
        }
    }
}

impl From<bool> for Basis {
    fn from(bit: bool) -> Self {
        if bit {
            Self::Diagonal
        } else {
            Self::Rectilinear
        }
    }
}

impl fmt::Display for Basis {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.symbol())
    }
}
