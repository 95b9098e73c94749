//! # Protocol Configuration & Constants
//!
//! Every magic number in QUPI lives here. The runtime-tunable subset is
//! bundled into [`ServiceConfig`]; everything else is fixed at compile time
//! because changing it would change the meaning of keys or payloads.

use std::time::Duration;

// ---------------------------------------------------------------------------
// Protocol Version
// ---------------------------------------------------------------------------

/// The full version string of the core library.
pub const PROTOCOL_VERSION: &str = "0.1.0";

// ---------------------------------------------------------------------------
// BB84 Parameters
// ---------------------------------------------------------------------------

/// Number of raw qubit positions exchanged per key generation.
///
/// With two bases the expected sifted length is half of this, so 64 raw
/// positions yield ~32 sifted bits before derivation stretches them to a
/// full AES key.
pub const DEFAULT_QKD_KEY_LENGTH: usize = 64;

/// Upper bound on the raw exchange length. The whole exchange is returned
/// to the caller for visualization, so this also caps response size.
pub const MAX_QKD_KEY_LENGTH: usize = 4096;

/// Rendering of the rectilinear basis at the API boundary.
pub const RECTILINEAR_SYMBOL: &str = "+";

/// Rendering of the diagonal basis at the API boundary.
pub const DIAGONAL_SYMBOL: &str = "x";

// ---------------------------------------------------------------------------
// Cryptographic Parameters
// ---------------------------------------------------------------------------

/// AES-256-GCM for payload encryption.
pub const SYMMETRIC_ALGORITHM: &str = "AES-256-GCM";

/// AES-256-GCM key length in bytes. The derived key is always this long.
pub const AES_KEY_LENGTH: usize = 32;

/// AES-256-GCM nonce length in bytes.
pub const AES_NONCE_LENGTH: usize = 12;

/// AES-256-GCM authentication tag length in bytes.
pub const AES_TAG_LENGTH: usize = 16;

/// BLAKE3 `derive_key` context for turning a sifted key into an AES key.
/// Changing this string changes every derived key, so it carries a version.
pub const KDF_CONTEXT: &str = "qupi 2026 bb84 sifted-key v1";

/// Bytes of SHA-256 kept for a key fingerprint. Enough to tell keys apart
/// in logs, far too little to help anyone recover them.
pub const KEY_FINGERPRINT_LENGTH: usize = 8;

/// How many leading bytes of the sealed payload are shown to the UI.
pub const ENCRYPTED_SAMPLE_BYTES: usize = 20;

// ---------------------------------------------------------------------------
// Transaction Limits
// ---------------------------------------------------------------------------

/// Display currency for every simulated transfer.
pub const CURRENCY_CODE: &str = "INR";

/// Decimal places of the currency (paise).
pub const CURRENCY_DECIMALS: u32 = 2;

/// Minor units per major unit (100 paise = 1 rupee).
pub const MINOR_UNITS_PER_MAJOR: u64 = 100;

/// Largest accepted amount: 1 crore rupees, in paise. Keeps the float to
/// integer conversion comfortably inside f64's exact-integer range.
pub const MAX_TRANSACTION_AMOUNT_PAISE: u64 = 10_000_000 * MINOR_UNITS_PER_MAJOR;

/// Prefix for generated transaction identifiers.
pub const TRANSACTION_ID_PREFIX: &str = "TXN-";

// ---------------------------------------------------------------------------
// Session Store
// ---------------------------------------------------------------------------

/// Maximum number of live sessions before the oldest are evicted.
pub const DEFAULT_MAX_SESSIONS: usize = 10_000;

/// Sessions older than this are removed by the periodic sweep.
pub const DEFAULT_SESSION_TTL: Duration = Duration::from_secs(3600);

/// How often the node runs the TTL sweep.
pub const DEFAULT_SWEEP_INTERVAL: Duration = Duration::from_secs(60);

// ---------------------------------------------------------------------------
// Node Defaults
// ---------------------------------------------------------------------------

/// Default HTTP API port. The browser UI was written against 5000.
pub const DEFAULT_API_PORT: u16 = 5000;

/// Default metrics (Prometheus) port.
pub const DEFAULT_METRICS_PORT: u16 = 5001;

// ---------------------------------------------------------------------------
// Runtime configuration
// ---------------------------------------------------------------------------

/// Tunable parameters for a [`crate::service::TransactionService`].
#[derive(Debug, Clone)]
pub struct ServiceConfig {
    /// Raw BB84 exchange length per key generation.
    pub qkd_key_length: usize,
    /// Capacity of the session store.
    pub max_sessions: usize,
    /// Session lifetime before the sweep removes it.
    pub session_ttl: Duration,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            qkd_key_length: DEFAULT_QKD_KEY_LENGTH,
            max_sessions: DEFAULT_MAX_SESSIONS,
            session_ttl: DEFAULT_SESSION_TTL,
        }
    }
}
