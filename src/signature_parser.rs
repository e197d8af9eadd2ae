//! # SignatureParser (C6)
//!
//! Walks the trailing signature region of a serialized manifest, appending
//! verified signatories. Grounded on `rhizome_manifest_extract_signature`
//! in `original_source/rhizome_crypto.c`.

use crate::manifest::Manifest;
use crate::signer::{SIG_BLOCK_LEN, SIG_TAG_ED25519};
use crate::verifier_cache::{Validity, VerifierCache};

/// Default signatory capacity when the enclosing system has no stricter
/// policy value; the core only requires this be `>= 16` (§6).
pub const DEFAULT_MAX_MANIFEST_VARS: usize = 64;

pub struct SignatureParser<'a> {
    cache: &'a VerifierCache,
    max_manifest_vars: usize,
}

impl<'a> SignatureParser<'a> {
    pub fn new(cache: &'a VerifierCache) -> Self {
        Self { cache, max_manifest_vars: DEFAULT_MAX_MANIFEST_VARS }
    }

    pub fn with_capacity(cache: &'a VerifierCache, max_manifest_vars: usize) -> Self {
        Self { cache, max_manifest_vars }
    }

    /// Walks `manifestdata[offset..]` one signature block at a time,
    /// appending accepted signatories (and their block lengths) to `m`.
    /// Malformed or unknown-tag blocks increment `m.errors` and are
    /// skipped by advancing past the (tag-defined) block length; overflow
    /// past `max_manifest_vars` likewise increments `errors` rather than
    /// aborting. Returns once `manifestdata` is exhausted.
    #[tracing::instrument(skip(self, m, manifestdata))]
    pub fn parse(&self, m: &mut Manifest, manifestdata: &[u8], offset: usize) {
        let manifest_hash = match m.manifest_hash {
            Some(h) => h,
            None => {
                tracing::warn!("no manifest hash set; cannot verify signature blocks");
                return;
            }
        };

        let mut ofs = offset;
        while ofs < manifestdata.len() {
            let tag = manifestdata[ofs];
            let len = match tag {
                SIG_TAG_ED25519 => SIG_BLOCK_LEN,
                _ => {
                    tracing::warn!(tag, offset = ofs, "unknown or unsupported signature tag");
                    m.errors += 1;
                    break;
                }
            };

            if ofs + len > manifestdata.len() {
                tracing::warn!(offset = ofs, len, "signature block truncated");
                m.errors += 1;
                break;
            }

            let block = &manifestdata[ofs..ofs + len];
            let signature = &block[1..65];
            let public_key: [u8; 32] = block[65..97].try_into().expect("slice is 32 bytes");

            if m.signatories.len() >= self.max_manifest_vars {
                tracing::warn!("signatory capacity exceeded");
                m.errors += 1;
                ofs += len;
                continue;
            }

            match self.cache.lookup_signature_validity(&manifest_hash, signature, &public_key) {
                Validity::Valid => {
                    m.signatories.push(public_key);
                    m.signature_lengths.push(len);
                    tracing::debug!(signatory = %hex::encode(public_key), "accepted signature block");
                }
                Validity::Invalid => {
                    tracing::warn!("signature block failed verification");
                    m.errors += 1;
                }
            }

            ofs += len;
        }
    }
}
