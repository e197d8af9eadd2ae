//! # AuthorResolver (C3)
//!
//! Matches a manifest to a keyring identity that owns its Bundle Key, and
//! verifies candidate bundle secrets. Grounded on `rhizome_find_secret`,
//! `rhizome_extract_privatekey`, `rhizome_find_bundle_author` and
//! `rhizome_verify_bundle_privatekey` in `original_source/rhizome_crypto.c`.

use subtle::ConstantTimeEq;

use crate::error::{CryptoCoreError, Result};
use crate::external::{Keyring, ManifestDatabase};
use crate::keys::bk_to_secret;
use crate::manifest::{BundleSecret, HaveSecret, Manifest};
use crate::primitives;

const MIN_RS_LEN: usize = 16;
const MAX_RS_LEN: usize = 1024;

/// Why [`find_secret`] could not produce a usable Rhizome Secret.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FindSecretError {
    NotInKeyring,
    NoRhizomeSecret,
}

/// Looks up the Rhizome Secret owned by a local identity, validating its
/// length against the `[16, 1024]` byte range the keyring is expected to enforce.
pub fn find_secret(keyring: &dyn Keyring, sid: &crate::manifest::Sid) -> std::result::Result<Vec<u8>, FindSecretError> {
    let cursor = keyring.find_sid(sid).ok_or(FindSecretError::NotInKeyring)?;
    let rs = keyring
        .identity_rhizome_secret(&cursor)
        .ok_or(FindSecretError::NoRhizomeSecret)?;
    if rs.len() < MIN_RS_LEN || rs.len() > MAX_RS_LEN {
        return Err(FindSecretError::NoRhizomeSecret);
    }
    Ok(rs)
}

/// Named replacement for the original's numeric 0–5 return codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExtractOutcome {
    /// Code 0: secret recovered and verified; `have_secret == Existing`.
    Recovered,
    /// Code 1: no BK field and no `bsk` supplied; nothing to do.
    NothingToDo,
}

/// Attempts to recover and verify `m`'s bundle secret, combining the
/// manifest's Bundle Key (if present) with keyring-derived author
/// identity, or an explicitly supplied secret key half (`bsk`).
#[tracing::instrument(skip(m, keyring, db, bsk))]
pub fn extract_privatekey(
    m: &mut Manifest,
    bsk: Option<&[u8; 32]>,
    keyring: &dyn Keyring,
    db: &dyn ManifestDatabase,
) -> Result<ExtractOutcome> {
    tracing::debug!("extracting bundle private key");

    let bundle_key = match m.bundle_key {
        Some(bk) => bk,
        None => {
            return match bsk {
                None => Ok(ExtractOutcome::NothingToDo),
                Some(sk) => {
                    if primitives::ed25519_derive_public(sk) == m.bid.0 {
                        let mut secret = [0u8; 64];
                        secret[0..32].copy_from_slice(sk);
                        secret[32..64].copy_from_slice(&m.bid.0);
                        m.secret = BundleSecret(secret);
                        m.have_secret = HaveSecret::Existing;
                        tracing::debug!("supplied secret key verified against bid");
                        Ok(ExtractOutcome::Recovered)
                    } else {
                        m.clear_secret();
                        tracing::warn!("supplied secret key does not verify against bid");
                        Err(CryptoCoreError::SecretMismatch)
                    }
                }
            };
        }
    };

    let derived = if let Some(author) = m.author {
        let rs = find_secret(keyring, &author).map_err(|e| {
            m.clear_secret();
            match e {
                FindSecretError::NotInKeyring => {
                    CryptoCoreError::NotAuthorized("author not in keyring".into())
                }
                FindSecretError::NoRhizomeSecret => {
                    CryptoCoreError::NotAuthorized("author has no rhizome secret".into())
                }
            }
        })?;
        match bk_to_secret(&m.bid, &rs, &bundle_key) {
            Ok(secret) => secret,
            Err(_) => {
                m.clear_secret();
                return Err(CryptoCoreError::NotAuthorized(
                    "derived secret does not verify against bid".into(),
                ));
            }
        }
    } else {
        return match find_bundle_author(m, keyring, db)? {
            FindAuthorOutcome::Found => Ok(ExtractOutcome::Recovered),
            FindAuthorOutcome::Exhausted => {
                m.clear_secret();
                Err(CryptoCoreError::NotAuthorized(
                    "no keyring identity owns this bundle key".into(),
                ))
            }
        };
    };

    if let Some(sk) = bsk {
        if sk != &derived.seed() {
            tracing::warn!("supplied bsk disagrees with author-derived secret; keeping derived");
        }
    }

    m.secret = derived;
    m.have_secret = HaveSecret::Existing;
    Ok(ExtractOutcome::Recovered)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FindAuthorOutcome {
    Found,
    Exhausted,
}

/// Iterates keyring identities; for each identity possessing a Rhizome
/// Secret, attempts to unmask `m`'s bundle key and verify the result. The
/// first success sets `m.author`, promotes `have_secret`, and issues a
/// best-effort author update through `db` if the manifest is already persisted.
#[tracing::instrument(skip(m, keyring, db))]
pub fn find_bundle_author(m: &mut Manifest, keyring: &dyn Keyring, db: &dyn ManifestDatabase) -> Result<FindAuthorOutcome> {
    let bundle_key = match m.bundle_key {
        Some(bk) => bk,
        None => {
            return Err(CryptoCoreError::MissingSecret);
        }
    };

    let mut cursor = keyring.next_identity(None);
    while let Some(c) = cursor {
        let sid = keyring.identity_sid(&c);
        if let Some(rs) = keyring.identity_rhizome_secret(&c) {
            if rs.len() >= MIN_RS_LEN && rs.len() <= MAX_RS_LEN {
                if let Ok(secret) = bk_to_secret(&m.bid, &rs, &bundle_key) {
                    m.author = Some(sid);
                    m.secret = secret;
                    m.have_secret = HaveSecret::Existing;
                    if m.inserttime.is_some() {
                        db.update_author(&m.bid, &sid);
                        tracing::debug!("updated persisted manifest author");
                    }
                    tracing::debug!(author = %hex::encode(sid.0), "found bundle author");
                    return Ok(FindAuthorOutcome::Found);
                }
            }
        }
        cursor = keyring.next_identity(Some(&c));
    }
    tracing::debug!("exhausted keyring identities without finding bundle author");
    Ok(FindAuthorOutcome::Exhausted)
}

/// Recomputes `derive_public(sk)` and compares it byte-for-byte with `pk`.
pub fn verify_bundle_privatekey(sk: &[u8; 32], pk: &[u8; 32]) -> bool {
    let derived = primitives::ed25519_derive_public(sk);
    derived.ct_eq(pk).into()
}
