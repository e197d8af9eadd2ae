//! # PayloadCrypto (C7)
//!
//! Derives payload key/nonce from either the bundle secret or a
//! sender/recipient Diffie–Hellman shared secret, and performs
//! random-access, page-aligned XSalsa20 XOR over payload ranges. Grounded
//! on `rhizome_derive_key`, `add_nonce` and `rhizome_crypt_xor_block` in
//! `original_source/rhizome_crypto.c`.

use zeroize::Zeroize;

use crate::author::extract_privatekey;
use crate::error::{CryptoCoreError, Result};
use crate::external::{Keyring, ManifestDatabase};
use crate::manifest::{HaveSecret, Manifest};
use crate::primitives;

/// Stream page size; block ciphering never allocates more than one page
/// of scratch space regardless of the requested range's length.
pub const PAGE_SIZE: u64 = 4096;

/// Domain separator for self-key derivation. ASCII, no terminator.
const DOMAIN_SEPARATOR: &[u8] = b"sasquatch";

/// Derives `m.payload_key` for a directed (sender ∧ recipient) bundle: the
/// local party's Curve25519 `beforenm` shared secret with the peer, hashed.
#[tracing::instrument(skip(m, keyring))]
fn derive_directed_key(m: &Manifest, keyring: &dyn Keyring) -> Result<[u8; 32]> {
    let (sender, recipient) = match (m.sender, m.recipient) {
        (Some(s), Some(r)) => (s, r),
        _ => return Err(CryptoCoreError::InvalidInput("directed key derivation requires both sender and recipient".into())),
    };

    let mut nm = keyring
        .nm_bytes(&sender, &recipient)
        .or_else(|| keyring.nm_bytes(&recipient, &sender))
        .ok_or(CryptoCoreError::PartiesUnknown)?;

    let mut digest = primitives::sha512(&nm);
    nm.zeroize();
    let key: [u8; 32] = digest[0..32].try_into().expect("slice is 32 bytes");
    digest.zeroize();
    tracing::debug!("derived directed payload key");
    Ok(key)
}

/// Derives `m.payload_key` for a self (single-author) bundle:
/// `SHA512("sasquatch" ‖ secret)[0..32]`.
fn derive_self_key(m: &Manifest) -> [u8; 32] {
    let mut buf = Vec::with_capacity(DOMAIN_SEPARATOR.len() + 64);
    buf.extend_from_slice(DOMAIN_SEPARATOR);
    buf.extend_from_slice(&m.secret.0);
    let mut digest = primitives::sha512(&buf);
    buf.zeroize();
    let key: [u8; 32] = digest[0..32].try_into().expect("slice is 32 bytes");
    digest.zeroize();
    key
}

/// `write_uint64(v) ‖ bid ‖ write_uint64(v)`, hashed and truncated to 24
/// bytes. Journals pin `v = 0` so appended content shares a keystream
/// with the bundle's existing payload prefix.
fn derive_nonce(m: &Manifest) -> [u8; 24] {
    let v: u64 = if m.is_journal { 0 } else { m.version };
    let mut raw = Vec::with_capacity(48);
    raw.extend_from_slice(&v.to_be_bytes());
    raw.extend_from_slice(&m.bid.0);
    raw.extend_from_slice(&v.to_be_bytes());
    let digest = primitives::sha512(&raw);
    digest[0..24].try_into().expect("slice is 24 bytes")
}

/// Populates `m.payload_key` and `m.payload_nonce`. For directed bundles,
/// neither party being local is `PartiesUnknown`. For self bundles, a
/// missing secret is extracted first via [`extract_privatekey`].
#[tracing::instrument(skip(m, keyring, db))]
pub fn derive_payload_key(m: &mut Manifest, keyring: &dyn Keyring, db: &dyn ManifestDatabase) -> Result<()> {
    let key = if m.sender.is_some() && m.recipient.is_some() {
        derive_directed_key(m, keyring)?
    } else {
        if m.have_secret == HaveSecret::Unknown {
            extract_privatekey(m, None, keyring, db)?;
        }
        if m.have_secret == HaveSecret::Unknown {
            return Err(CryptoCoreError::MissingSecret);
        }
        derive_self_key(m)
    };

    m.payload_key = Some(key);
    m.payload_nonce = Some(derive_nonce(m));
    tracing::debug!("derived payload key and nonce");
    Ok(())
}

/// Adds `delta` to the 24-byte nonce treated as a big-endian integer
/// (lowest-index byte is most significant), with full carry propagation.
pub fn add_nonce(nonce: &[u8; 24], delta: u64) -> [u8; 24] {
    let mut out = *nonce;
    let mut carry = delta as u128;
    for byte in out.iter_mut().rev() {
        if carry == 0 {
            break;
        }
        let sum = *byte as u128 + (carry & 0xff);
        *byte = sum as u8;
        carry = (carry >> 8) + (sum >> 8);
    }
    out
}

/// Encrypts or decrypts `buf` as the payload keystream's bytes
/// `[stream_offset, stream_offset + buf.len())`. Pages the stream into
/// `PAGE_SIZE`-aligned blocks, each keyed by `nonce` advanced by the
/// page's byte offset, so no prefix of the keystream is ever allocated.
#[tracing::instrument(skip(key, nonce, buf))]
pub fn crypt_xor_block(key: &[u8; 32], nonce: &[u8; 24], stream_offset: u64, buf: &mut [u8]) {
    if buf.is_empty() {
        return;
    }

    let page_base = stream_offset & !(PAGE_SIZE - 1);
    let mut block_nonce = add_nonce(nonce, page_base);
    let mut cursor = 0usize;

    if page_base < stream_offset {
        let padding = (stream_offset - page_base) as usize;
        let first_page_data_len = (PAGE_SIZE as usize - padding).min(buf.len());
        let mut scratch = vec![0u8; padding + first_page_data_len];
        scratch[padding..].copy_from_slice(&buf[..first_page_data_len]);
        primitives::xsalsa20_xor(key, &block_nonce, &mut scratch);
        buf[..first_page_data_len].copy_from_slice(&scratch[padding..]);
        scratch.zeroize();

        cursor += first_page_data_len;
        block_nonce = add_nonce(&block_nonce, PAGE_SIZE);
    }

    while cursor < buf.len() {
        let remaining = buf.len() - cursor;
        let page_len = remaining.min(PAGE_SIZE as usize);
        primitives::xsalsa20_xor(key, &block_nonce, &mut buf[cursor..cursor + page_len]);
        cursor += page_len;
        block_nonce = add_nonce(&block_nonce, PAGE_SIZE);
    }

    tracing::debug!(stream_offset, len = buf.len(), "applied payload keystream");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::external::fakes::{FakeKeyring, FakeManifestDatabase};
    use crate::keys::create_id;
    use crate::manifest::{Bid, Sid};

    #[test]
    fn add_nonce_is_monotonic_and_additive() {
        let nonce = [0u8; 24];
        assert_ne!(add_nonce(&nonce, 1), nonce);
        assert_eq!(add_nonce(&nonce, 0), nonce);
        let a = add_nonce(&nonce, 100);
        let b = add_nonce(&a, 200);
        assert_eq!(b, add_nonce(&nonce, 300));
    }

    #[test]
    fn add_nonce_propagates_carry_across_all_bytes() {
        let mut nonce = [0u8; 24];
        nonce[23] = 0xff;
        let bumped = add_nonce(&nonce, 1);
        assert_eq!(bumped[23], 0);
        assert_eq!(bumped[22], 1);
    }

    #[test]
    fn journal_nonce_is_pinned_across_versions() {
        let mut a = Manifest::from_bid(Bid([3u8; 32]));
        create_id(&mut a);
        a.is_journal = true;
        a.version = 1;
        let mut b = Manifest::from_bid(a.bid);
        b.secret = a.secret.clone();
        b.is_journal = true;
        b.version = 99;

        assert_eq!(derive_nonce(&a), derive_nonce(&b));

        a.is_journal = false;
        b.is_journal = false;
        assert_ne!(derive_nonce(&a), derive_nonce(&b));
    }

    #[test]
    fn unaligned_encrypt_single_call_matches_multi_call_decrypt() {
        let mut m = Manifest::from_bid(Bid([4u8; 32]));
        create_id(&mut m);
        let keyring = FakeKeyring::new(vec![]);
        let db = FakeManifestDatabase::default();
        derive_payload_key(&mut m, &keyring, &db).unwrap();
        let key = m.payload_key.unwrap();
        let nonce = m.payload_nonce.unwrap();

        let plaintext: Vec<u8> = (0..8195u32).map(|i| (i % 251) as u8).collect();

        let mut ciphertext = plaintext[3..8195].to_vec();
        crypt_xor_block(&key, &nonce, 3, &mut ciphertext);

        let mut decrypted = ciphertext.clone();
        crypt_xor_block(&key, &nonce, 3, &mut decrypted[0..4093]);
        crypt_xor_block(&key, &nonce, 4096, &mut decrypted[4093..8189]);
        crypt_xor_block(&key, &nonce, 8192, &mut decrypted[8189..8192]);

        assert_eq!(decrypted, plaintext[3..8195]);
    }

    #[test]
    fn directed_key_fails_when_neither_party_local() {
        let mut m = Manifest::from_bid(Bid([5u8; 32]));
        m.sender = Some(Sid([1u8; 32]));
        m.recipient = Some(Sid([2u8; 32]));
        let keyring = FakeKeyring::new(vec![]);
        let db = FakeManifestDatabase::default();
        assert_eq!(derive_payload_key(&mut m, &keyring, &db).unwrap_err(), CryptoCoreError::PartiesUnknown);
    }

    #[test]
    fn directed_key_derivation_agrees_between_parties() {
        let local = Sid([1u8; 32]);
        let peer = Sid([2u8; 32]);
        let shared = [0x42u8; 32];
        let keyring = FakeKeyring::new(vec![(local, vec![0u8; 32])]).with_nm(local, peer, shared);
        let db = FakeManifestDatabase::default();

        let mut m = Manifest::from_bid(Bid([6u8; 32]));
        m.sender = Some(local);
        m.recipient = Some(peer);
        derive_payload_key(&mut m, &keyring, &db).unwrap();
        assert!(m.payload_key.is_some());
    }
}
