//! # KeyDerivation (C2)
//!
//! BID/BK ↔ bundle-secret conversions, seeded keypair generation, and the
//! XOR-stream derivation that binds a Bundle Key to an author's Rhizome
//! Secret. Grounded on `rhizome_get_bundle_from_seed`, `rhizome_bk_xor_stream`,
//! `rhizome_bk2secret` and `rhizome_secret2bk` in `original_source/rhizome_crypto.c`.

use zeroize::Zeroize;

use crate::author::verify_bundle_privatekey;
use crate::error::{CryptoCoreError, Result};
use crate::external::ManifestDatabase;
use crate::manifest::{Bid, BundleKey, BundleSecret, HaveSecret, Manifest};
use crate::primitives;

const MIN_RS_LEN: usize = 1;
const MAX_RS_LEN: usize = 65536;
const MAX_XOR_OUT_LEN: usize = 64;

/// Draws a fresh random Ed25519 keypair, sets `m.bid`, fills `m.secret`
/// (with the BID copied into its upper half) and marks `have_secret = New`.
#[tracing::instrument(skip(m))]
pub fn create_id(m: &mut Manifest) {
    tracing::debug!("creating fresh bundle id");
    let (seed, public) = primitives::ed25519_keygen();
    let mut secret = [0u8; 64];
    secret[0..32].copy_from_slice(&seed);
    secret[32..64].copy_from_slice(&public);
    m.bid = Bid(public);
    m.secret = BundleSecret(secret);
    m.have_secret = HaveSecret::New;
    tracing::debug!(bid = %hex::encode(public), "bundle id created");
}

/// Outcome of [`from_seed`]: whether the deterministically-derived bundle
/// was already known to the manifest database.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SeedLookup {
    Hit,
    Miss,
}

/// Deterministically derives a bundle id and secret from `seed`, then
/// consults `db` for a matching manifest. `have_secret` becomes `Existing`
/// on a database hit, `New` on a miss.
#[tracing::instrument(skip(m, seed, db))]
pub fn from_seed(m: &mut Manifest, seed: &[u8], db: &dyn ManifestDatabase) -> Result<SeedLookup> {
    tracing::debug!("deriving bundle id from seed");
    let h = primitives::sha512(seed);
    let sk: [u8; 32] = h[0..32].try_into().expect("slice is 32 bytes");
    let public = primitives::ed25519_derive_public(&sk);

    let mut secret = [0u8; 64];
    secret[0..32].copy_from_slice(&sk);
    secret[32..64].copy_from_slice(&public);
    m.bid = Bid(public);
    m.secret = BundleSecret(secret);

    let lookup = match db.retrieve_manifest(&m.bid)? {
        Some(fields) => {
            m.have_secret = HaveSecret::Existing;
            m.author = fields.author;
            SeedLookup::Hit
        }
        None => {
            m.have_secret = HaveSecret::New;
            SeedLookup::Miss
        }
    };
    tracing::debug!(?lookup, bid = %hex::encode(public), "bundle id derived from seed");
    Ok(lookup)
}

/// `SHA512(rs ‖ bid)[0..out_len]` — the single point at which author
/// identity enters bundle-key derivation.
pub fn bk_xor_stream(bid: &Bid, rs: &[u8], out_len: usize) -> Result<Vec<u8>> {
    if rs.is_empty() || rs.len() > MAX_RS_LEN {
        return Err(CryptoCoreError::InvalidInput(format!(
            "rhizome secret length {} outside [{MIN_RS_LEN}, {MAX_RS_LEN}]",
            rs.len()
        )));
    }
    if out_len == 0 || out_len > MAX_XOR_OUT_LEN {
        return Err(CryptoCoreError::InvalidInput(format!(
            "xor-stream output length {out_len} outside [1, {MAX_XOR_OUT_LEN}]"
        )));
    }
    let mut buf = Vec::with_capacity(rs.len() + 32);
    buf.extend_from_slice(rs);
    buf.extend_from_slice(&bid.0);
    let mut digest = primitives::sha512(&buf);
    buf.zeroize();
    let out = digest[0..out_len].to_vec();
    digest.zeroize();
    Ok(out)
}

/// Recovers a bundle secret from a Bundle Key, an author's RS, and the
/// bundle's BID. The result is unverified — callers must check it with
/// [`verify_bundle_privatekey`] before trusting it (this function does so
/// itself, returning [`CryptoCoreError::SecretMismatch`] on failure).
pub fn bk_to_secret(bid: &Bid, rs: &[u8], bk: &BundleKey) -> Result<BundleSecret> {
    let mut stream = bk_xor_stream(bid, rs, 32)?;
    let mut secret = [0u8; 64];
    for i in 0..32 {
        secret[i] = bk.0[i] ^ stream[i];
    }
    stream.zeroize();
    secret[32..64].copy_from_slice(&bid.0);

    let sk: [u8; 32] = secret[0..32].try_into().expect("slice is 32 bytes");
    if !verify_bundle_privatekey(&sk, &bid.0) {
        secret.zeroize();
        return Err(CryptoCoreError::SecretMismatch);
    }
    Ok(BundleSecret(secret))
}

/// Inverse of [`bk_to_secret`]: masks the low half of a possessed secret
/// under the author's RS-derived keystream. Does not verify — the caller
/// already possesses the secret.
pub fn secret_to_bk(bid: &Bid, rs: &[u8], secret: &BundleSecret) -> Result<BundleKey> {
    let mut stream = bk_xor_stream(bid, rs, 32)?;
    let mut bk = [0u8; 32];
    for i in 0..32 {
        bk[i] = secret.0[i] ^ stream[i];
    }
    stream.zeroize();
    Ok(BundleKey(bk))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::external::fakes::FakeManifestDatabase;
    use crate::manifest::Manifest;

    #[test]
    fn create_id_produces_consistent_bid_and_secret() {
        let mut m = Manifest::from_bid(Bid([0u8; 32]));
        create_id(&mut m);
        assert_eq!(m.secret.public_half(), m.bid.0);
        assert_eq!(primitives::ed25519_derive_public(&m.secret.seed()), m.bid.0);
        assert_eq!(m.have_secret, HaveSecret::New);
    }

    #[test]
    fn from_seed_is_deterministic() {
        let db = FakeManifestDatabase::default();
        let mut a = Manifest::from_bid(Bid([0u8; 32]));
        let mut b = Manifest::from_bid(Bid([0u8; 32]));
        from_seed(&mut a, b"test-seed-1", &db).unwrap();
        from_seed(&mut b, b"test-seed-1", &db).unwrap();
        assert_eq!(a.bid.0, b.bid.0);
        assert_eq!(a.secret.0, b.secret.0);
    }

    #[test]
    fn bk_round_trip_recovers_original_secret() {
        let db = FakeManifestDatabase::default();
        let mut m = Manifest::from_bid(Bid([0u8; 32]));
        from_seed(&mut m, b"test-seed-1", &db).unwrap();
        let rs = vec![0x11u8; 32];

        let bk = secret_to_bk(&m.bid, &rs, &m.secret).unwrap();
        let recovered = bk_to_secret(&m.bid, &rs, &bk).unwrap();
        assert_eq!(recovered.0, m.secret.0);
    }

    #[test]
    fn bk_xor_stream_rejects_out_of_range_lengths() {
        let bid = Bid([1u8; 32]);
        assert!(bk_xor_stream(&bid, &[], 32).is_err());
        assert!(bk_xor_stream(&bid, &[0u8; 32], 0).is_err());
        assert!(bk_xor_stream(&bid, &[0u8; 32], 65).is_err());
    }

    #[test]
    fn bk_to_secret_rejects_wrong_key() {
        let db = FakeManifestDatabase::default();
        let mut m = Manifest::from_bid(Bid([0u8; 32]));
        from_seed(&mut m, b"test-seed-1", &db).unwrap();
        let wrong_bk = BundleKey([0xAAu8; 32]);
        assert!(bk_to_secret(&m.bid, &[0x22u8; 32], &wrong_bk).is_err());
    }
}
