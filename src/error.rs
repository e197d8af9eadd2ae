//! # Crypto Core Error Types
//!
//! Structured errors for the bundle cryptography core. Follows the
//! workspace convention of one `thiserror` enum per crate, with variants
//! matching the error taxonomy of the subsystem's design document rather
//! than leaking raw primitive errors.

use thiserror::Error;

/// Errors surfaced by the bundle cryptography core.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum CryptoCoreError {
    /// A parameter was out of the range the core accepts (RS length, xor-stream length, offsets).
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// The underlying primitive suite refused the operation (keygen, signature open).
    #[error("crypto primitive failure: {0}")]
    CryptoPrimitive(String),

    /// A bundle key is present but no keyring identity can be shown to own it.
    #[error("not authorized: {0}")]
    NotAuthorized(String),

    /// A supplied bundle secret key does not verify against the bundle id.
    #[error("supplied bundle secret does not match bundle id")]
    SecretMismatch,

    /// No bundle key and no bundle secret was supplied; there is nothing to extract.
    #[error("manifest has no bundle key and no bundle secret was supplied")]
    MissingSecret,

    /// A directed (sender/recipient) bundle where neither party is a local identity.
    #[error("neither sender nor recipient is a known local identity")]
    PartiesUnknown,

    /// A signature block (or its tag) is malformed.
    #[error("corrupt signature block: {0}")]
    Corrupt(String),

    /// Signature-block capacity exceeded; non-fatal, recorded via `Manifest::errors`.
    #[error("manifest exceeds signature block capacity")]
    CacheCapacity,
}

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, CryptoCoreError>;
