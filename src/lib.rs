//! # Bundle cryptography core
//!
//! The cryptographic core of a store-and-forward content-distribution
//! system for delay-tolerant mesh networks. Mints and reconstitutes
//! per-bundle Ed25519 keypairs, binds authorship via a reversible
//! XOR-masked Bundle Key, signs and verifies manifest hashes through a
//! direct-mapped verifier cache, and derives/applies payload keystreams.
//!
//! The persistent manifest database, the identity keyring, manifest text
//! parsing, and any HTTP/CLI surface are out of scope — see [`external`]
//! for the trait boundaries this crate consumes instead.

pub mod author;
pub mod error;
pub mod external;
pub mod keys;
pub mod manifest;
pub mod payload;
pub mod primitives;
pub mod signature_parser;
pub mod signer;
pub mod verifier_cache;

pub use error::{CryptoCoreError, Result};
pub use manifest::{Bid, BundleKey, BundleSecret, HaveSecret, Manifest, PayloadEncryption, Sid};
