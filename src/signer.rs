//! # Signer (C4)
//!
//! Produces the length-compressed Ed25519 signature block over a
//! manifest's hash. Grounded on `rhizome_sign_hash`/`rhizome_sign_hash_with_key`
//! in `original_source/rhizome_crypto.c`.

use crate::author::extract_privatekey;
use crate::error::{CryptoCoreError, Result};
use crate::external::{Keyring, ManifestDatabase};
use crate::manifest::{HaveSecret, Manifest};
use crate::primitives;

/// Tag byte of the only signature block format this crate produces.
pub const SIG_TAG_ED25519: u8 = 0x17;

/// On-wire length of a tag-`0x17` signature block.
pub const SIG_BLOCK_LEN: usize = 97;

/// Signs `manifest_hash` with `m`'s bundle secret, producing a 97-byte
/// block: `[0] = 0x17`, `[1..65) = signature`, `[65..97) = signatory public key`.
///
/// Calls [`extract_privatekey`] first if `m.have_secret` is unknown, per
/// the original's `extract_privatekey_required` precondition.
#[tracing::instrument(skip(m, manifest_hash, keyring, db))]
pub fn sign_hash(
    m: &mut Manifest,
    manifest_hash: &[u8; 64],
    keyring: &dyn Keyring,
    db: &dyn ManifestDatabase,
) -> Result<[u8; SIG_BLOCK_LEN]> {
    if m.have_secret == HaveSecret::Unknown {
        tracing::debug!("have_secret unknown, extracting private key before signing");
        extract_privatekey(m, None, keyring, db)?;
    }
    if m.have_secret == HaveSecret::Unknown {
        return Err(CryptoCoreError::MissingSecret);
    }

    let sk = m.secret.seed();
    let block = sign_hash_with_key(manifest_hash, &sk, &m.bid.0);
    tracing::debug!(bid = %hex::encode(m.bid.0), "signed manifest hash");
    Ok(block)
}

/// Signs `manifest_hash` with an explicit seed/public-key pair, without
/// touching a `Manifest`. `pk` is embedded verbatim as the signatory.
pub fn sign_hash_with_key(manifest_hash: &[u8; 64], sk: &[u8; 32], pk: &[u8; 32]) -> [u8; SIG_BLOCK_LEN] {
    let sig = primitives::ed25519_sign(manifest_hash, sk);
    let mut block = [0u8; SIG_BLOCK_LEN];
    block[0] = SIG_TAG_ED25519;
    block[1..65].copy_from_slice(&sig);
    block[65..97].copy_from_slice(pk);
    block
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::external::fakes::{FakeKeyring, FakeManifestDatabase};
    use crate::keys::create_id;
    use crate::manifest::Bid;
    use crate::primitives::{ed25519_verify, sha512};

    #[test]
    fn sign_then_verify_round_trip() {
        let mut m = Manifest::from_bid(Bid([0u8; 32]));
        create_id(&mut m);
        let hash = sha512(b"hello");

        let keyring = FakeKeyring::new(vec![]);
        let db = FakeManifestDatabase::default();
        let block = sign_hash(&mut m, &hash, &keyring, &db).unwrap();

        assert_eq!(block[0], SIG_TAG_ED25519);
        let sig: [u8; 64] = block[1..65].try_into().unwrap();
        let pk: [u8; 32] = block[65..97].try_into().unwrap();
        assert_eq!(pk, m.bid.0);
        assert!(ed25519_verify(&hash, &sig, &pk).is_ok());
    }

    #[test]
    fn sign_hash_fails_without_any_secret() {
        let mut m = Manifest::from_bid(Bid([1u8; 32]));
        let hash = sha512(b"hello");
        let keyring = FakeKeyring::new(vec![]);
        let db = FakeManifestDatabase::default();
        assert!(sign_hash(&mut m, &hash, &keyring, &db).is_err());
    }
}
