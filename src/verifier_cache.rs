//! # VerifierCache (C5)
//!
//! A process-wide, fixed-size direct-mapped cache of (hash, signature) →
//! validity decisions. Grounded on the `manifest_signature_block_cache`
//! struct, `SIG_CACHE_SIZE`, and `rhizome_manifest_lookup_signature_validity`
//! in `original_source/rhizome_crypto.c`. §5 permits either a single-threaded
//! cache or per-slot guards; this implementation takes the latter, using
//! `parking_lot::Mutex` per slot so concurrent writers to different slots
//! never contend and a reader mid-write only ever observes a consistent slot.

use parking_lot::Mutex;

use crate::primitives;

/// Number of direct-mapped slots.
pub const SIG_CACHE_SIZE: usize = 1024;

/// Result of a signature validity lookup.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Validity {
    Valid,
    Invalid,
}

#[derive(Clone)]
struct CacheSlot {
    hash: [u8; 64],
    signature: [u8; 96],
    len: usize,
    valid: Option<Validity>,
}

impl CacheSlot {
    const fn empty() -> Self {
        Self { hash: [0u8; 64], signature: [0u8; 96], len: 0, valid: None }
    }

    fn matches(&self, hash: &[u8; 64], signature: &[u8], len: usize) -> bool {
        self.len == len && self.len != 0 && &self.hash == hash && &self.signature[..len] == signature
    }
}

/// Direct-mapped signature verification cache.
pub struct VerifierCache {
    slots: Vec<Mutex<CacheSlot>>,
}

impl Default for VerifierCache {
    fn default() -> Self {
        Self::new()
    }
}

impl VerifierCache {
    pub fn new() -> Self {
        let mut slots = Vec::with_capacity(SIG_CACHE_SIZE);
        slots.resize_with(SIG_CACHE_SIZE, || Mutex::new(CacheSlot::empty()));
        Self { slots }
    }

    /// `slot = (rotate_left_1bit(slot) + b) mod 2^32` folded over
    /// `hash ‖ signature`, then reduced mod `SIG_CACHE_SIZE`.
    fn slot_for(hash: &[u8; 64], signature: &[u8]) -> usize {
        let mut slot: u32 = 0;
        for &b in hash.iter().chain(signature.iter()) {
            slot = slot.rotate_left(1).wrapping_add(b as u32);
        }
        (slot as usize) % SIG_CACHE_SIZE
    }

    /// Looks up `(manifest_hash, signature[..len])`. On miss, invokes the
    /// Ed25519 primitive (reconstructing the 128-byte signed blob
    /// `sig[0..64] ‖ hash`) and caches the outcome. Signatures longer than
    /// the 96-byte body field are rejected as `Invalid` without caching.
    #[tracing::instrument(skip(self, manifest_hash, signature, public_key))]
    pub fn lookup_signature_validity(
        &self,
        manifest_hash: &[u8; 64],
        signature: &[u8],
        public_key: &[u8; 32],
    ) -> Validity {
        let len = signature.len();
        if len == 0 || len > 96 {
            tracing::warn!(len, "signature body outside cacheable length range");
            return Validity::Invalid;
        }

        let idx = Self::slot_for(manifest_hash, signature);
        let mut guard = self.slots[idx].lock();
        if guard.matches(manifest_hash, signature, len) {
            tracing::debug!(slot = idx, "verifier cache hit");
            return guard.valid.unwrap_or(Validity::Invalid);
        }

        // sig[0..64] ‖ hash, verified with ed25519_verify(message=hash, sig=sig[0..64], pk).
        let valid = if len < 64 {
            Validity::Invalid
        } else {
            let sig64: [u8; 64] = signature[0..64].try_into().expect("slice is 64 bytes");
            if primitives::ed25519_verify(manifest_hash, &sig64, public_key).is_ok() {
                Validity::Valid
            } else {
                Validity::Invalid
            }
        };

        guard.hash = *manifest_hash;
        guard.signature = [0u8; 96];
        guard.signature[..len].copy_from_slice(signature);
        guard.len = len;
        guard.valid = Some(valid);
        tracing::debug!(slot = idx, ?valid, "verifier cache miss, recorded outcome");
        valid
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::primitives::{ed25519_keygen, ed25519_sign, sha512};

    #[test]
    fn valid_signature_is_cached_and_reported_valid() {
        let cache = VerifierCache::new();
        let (sk, pk) = ed25519_keygen();
        let hash = sha512(b"manifest text");
        let sig = ed25519_sign(&hash, &sk);

        assert_eq!(cache.lookup_signature_validity(&hash, &sig, &pk), Validity::Valid);
        // repeated lookup with unrelated intervening calls still returns Valid (invariant 4).
        let (sk2, pk2) = ed25519_keygen();
        let hash2 = sha512(b"other manifest");
        let sig2 = ed25519_sign(&hash2, &sk2);
        cache.lookup_signature_validity(&hash2, &sig2, &pk2);
        assert_eq!(cache.lookup_signature_validity(&hash, &sig, &pk), Validity::Valid);
    }

    #[test]
    fn tampered_signature_is_invalid_then_restoring_is_valid_again() {
        let cache = VerifierCache::new();
        let (sk, pk) = ed25519_keygen();
        let hash = sha512(b"manifest text");
        let mut sig = ed25519_sign(&hash, &sk);

        assert_eq!(cache.lookup_signature_validity(&hash, &sig, &pk), Validity::Valid);
        sig[0] ^= 0x01;
        assert_eq!(cache.lookup_signature_validity(&hash, &sig, &pk), Validity::Invalid);
        sig[0] ^= 0x01;
        assert_eq!(cache.lookup_signature_validity(&hash, &sig, &pk), Validity::Valid);
    }

    #[test]
    fn slot_selection_is_deterministic() {
        let hash = [7u8; 64];
        let sig = [9u8; 96];
        assert_eq!(VerifierCache::slot_for(&hash, &sig), VerifierCache::slot_for(&hash, &sig));
    }
}
