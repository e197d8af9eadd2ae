//! # PrimitiveSuite (C1)
//!
//! Thin, deterministic adaptor over the real cryptographic building
//! blocks: Ed25519 keygen/sign/verify/derive-public, SHA-512, XSalsa20
//! keystream XOR, and Curve25519 `beforenm`. Nothing in this module
//! touches a manifest; it is pure functions over byte slices so the rest
//! of the crate can be tested against it without any I/O.

use ed25519_dalek::{Signature, Signer, SigningKey, Verifier, VerifyingKey};
use rand_core::OsRng;
use salsa20::cipher::{KeyIvInit, StreamCipher};
use salsa20::{hsalsa, XSalsa20};
use sha2::{Digest, Sha512};

use crate::error::{CryptoCoreError, Result};

/// Generates a fresh random Ed25519 keypair using the OS CSPRNG.
///
/// Returns `(seed, public_key)`, where `seed` is the 32-byte value that
/// `ed25519_derive_public` and `ed25519_sign` both accept.
pub fn ed25519_keygen() -> ([u8; 32], [u8; 32]) {
    let signing_key = SigningKey::generate(&mut OsRng);
    (signing_key.to_bytes(), signing_key.verifying_key().to_bytes())
}

/// Derives the Ed25519 public key corresponding to a 32-byte seed.
pub fn ed25519_derive_public(seed: &[u8; 32]) -> [u8; 32] {
    SigningKey::from_bytes(seed).verifying_key().to_bytes()
}

/// Signs `message` (the manifest hash, in this crate's usage) with the
/// Ed25519 seed `sk`, returning the raw 64-byte signature.
pub fn ed25519_sign(message: &[u8], sk: &[u8; 32]) -> [u8; 64] {
    let signing_key = SigningKey::from_bytes(sk);
    signing_key.sign(message).to_bytes()
}

/// Verifies a raw 64-byte Ed25519 signature over `message` against `pk`.
///
/// Returns `Ok(())` on a valid signature, `Err(CryptoPrimitive)` otherwise.
pub fn ed25519_verify(message: &[u8], sig: &[u8; 64], pk: &[u8; 32]) -> Result<()> {
    let verifying_key = VerifyingKey::from_bytes(pk)
        .map_err(|e| CryptoCoreError::CryptoPrimitive(format!("invalid public key: {e}")))?;
    let signature = Signature::from_bytes(sig);
    verifying_key
        .verify(message, &signature)
        .map_err(|e| CryptoCoreError::CryptoPrimitive(format!("signature verification failed: {e}")))
}

/// SHA-512 of `data`.
pub fn sha512(data: &[u8]) -> [u8; 64] {
    let mut hasher = Sha512::new();
    hasher.update(data);
    hasher.finalize().into()
}

/// Curve25519 `beforenm`: the precomputed Diffie-Hellman shared secret
/// used by `crypto_box`, i.e. `HSalsa20(0, X25519(local_sk, peer_pk))`.
/// `local_sk` must be the 32-byte Curve25519 scalar of the local party;
/// `peer_pk` the peer's Curve25519 public key.
pub fn curve25519_beforenm(local_sk: &[u8; 32], peer_pk: &[u8; 32]) -> [u8; 32] {
    let secret = x25519_dalek::StaticSecret::from(*local_sk);
    let shared = secret.diffie_hellman(&x25519_dalek::PublicKey::from(*peer_pk));
    hsalsa::<salsa20::cipher::consts::U10>(shared.as_bytes().into(), &Default::default()).into()
}

/// XORs `buf` in place with the XSalsa20 keystream for `key`/`nonce`,
/// starting at keystream position 0. Callers needing random access at an
/// arbitrary stream offset use [`crate::payload::crypt_xor_block`], which
/// derives a page-local nonce and calls this function per page.
pub fn xsalsa20_xor(key: &[u8; 32], nonce: &[u8; 24], buf: &mut [u8]) {
    let mut cipher = XSalsa20::new(key.into(), nonce.into());
    cipher.apply_keystream(buf);
}
