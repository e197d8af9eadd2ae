//! # Data Model
//!
//! The fixed-width identifiers and keys of §3, and the `Manifest` record's
//! cryptographic slots. Manifest text parsing, the non-cryptographic
//! fields (version history, service fields, etc.) and persistence are the
//! responsibility of the enclosing system; this crate only owns the
//! slots it reads and writes.

use zeroize::Zeroize;

/// Bundle Identifier: the Ed25519 public key that uniquely names a bundle.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct Bid(pub [u8; 32]);

/// Subscriber/session identifier: names a user identity in the keyring.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct Sid(pub [u8; 32]);

/// Bundle Key: the XOR-masked form of a bundle's signing-secret prefix,
/// the only form in which the secret appears inside a manifest.
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct BundleKey(pub [u8; 32]);

impl core::fmt::Debug for BundleKey {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "BundleKey({})", hex::encode(self.0))
    }
}

/// Bundle Secret: the 64-byte expanded Ed25519 secret key, where bytes
/// `[32..64)` always equal the bundle's [`Bid`] (invariant 1, §3).
#[derive(Clone, Zeroize)]
#[zeroize(drop)]
pub struct BundleSecret(pub [u8; 64]);

impl BundleSecret {
    /// The all-zero secret, used whenever `have_secret == Unknown`.
    pub const fn zero() -> Self {
        Self([0u8; 64])
    }

    /// Whether this secret is the all-zero sentinel.
    pub fn is_zero(&self) -> bool {
        self.0 == [0u8; 64]
    }

    /// The 32-byte Ed25519 seed half (signing key material).
    pub fn seed(&self) -> [u8; 32] {
        self.0[0..32].try_into().expect("slice is 32 bytes")
    }

    /// The 32-byte public-key half, which must equal the bundle's [`Bid`].
    pub fn public_half(&self) -> [u8; 32] {
        self.0[32..64].try_into().expect("slice is 32 bytes")
    }
}

impl core::fmt::Debug for Bid {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "Bid({})", hex::encode(self.0))
    }
}

impl core::fmt::Debug for Sid {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "Sid({})", hex::encode(self.0))
    }
}

impl core::fmt::Debug for BundleSecret {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "BundleSecret(<redacted>)")
    }
}

/// Whether the core currently holds a verified bundle secret.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum HaveSecret {
    /// No secret has been produced, or the last one failed verification.
    Unknown,
    /// A freshly generated secret (from `create_id` or a fresh `from_seed`).
    New,
    /// A secret verified against the bundle's [`Bid`] (extracted or loaded).
    Existing,
}

/// Whether the payload is symmetrically encrypted.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PayloadEncryption {
    None,
    Encrypted,
}

/// The cryptographic slots of a manifest. Non-cryptographic manifest
/// fields (service, name, free-text metadata) live in the enclosing
/// system and are not modeled here.
#[derive(Debug)]
pub struct Manifest {
    pub bid: Bid,
    pub bundle_key: Option<BundleKey>,
    pub author: Option<Sid>,
    pub sender: Option<Sid>,
    pub recipient: Option<Sid>,
    pub secret: BundleSecret,
    pub have_secret: HaveSecret,
    pub manifest_hash: Option<[u8; 64]>,
    /// Accepted signatories, in the order their signature blocks were verified.
    pub signatories: Vec<[u8; 32]>,
    /// On-wire length of each accepted signature block, parallel to `signatories`.
    pub signature_lengths: Vec<usize>,
    /// Count of malformed/overflowing signature blocks encountered.
    pub errors: u32,
    pub payload_key: Option<[u8; 32]>,
    pub payload_nonce: Option<[u8; 24]>,
    pub payload_encryption: PayloadEncryption,
    pub is_journal: bool,
    pub version: u64,
    /// Set once the manifest has been inserted into the database; `find_bundle_author`
    /// only issues its best-effort author update when this is `Some`.
    pub inserttime: Option<u64>,
}

impl Manifest {
    /// A bare manifest carrying only a bundle id, as produced by loading
    /// public data from the database (`have_secret = Unknown`).
    pub fn from_bid(bid: Bid) -> Self {
        Self {
            bid,
            bundle_key: None,
            author: None,
            sender: None,
            recipient: None,
            secret: BundleSecret::zero(),
            have_secret: HaveSecret::Unknown,
            manifest_hash: None,
            signatories: Vec::new(),
            signature_lengths: Vec::new(),
            errors: 0,
            payload_key: None,
            payload_nonce: None,
            payload_encryption: PayloadEncryption::None,
            is_journal: false,
            version: 0,
            inserttime: None,
        }
    }

    pub fn has_bundle_key(&self) -> bool {
        self.bundle_key.is_some()
    }

    pub fn has_author(&self) -> bool {
        self.author.is_some()
    }

    /// Zeroizes the secret and marks it unknown. Called on every failure
    /// path per §5's hard zeroization requirement.
    pub fn clear_secret(&mut self) {
        self.secret.zeroize();
        self.have_secret = HaveSecret::Unknown;
    }
}
