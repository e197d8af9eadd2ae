//! # External Collaborators (§6)
//!
//! Trait boundaries for the two systems this crate leans on but does not
//! own: the identity keyring and the manifest database. A real deployment
//! wires in its own keyring/SQL-backed implementations; tests use the
//! in-memory fakes below, in the teacher's style of exercising core logic
//! against a trait object rather than a live service.

use crate::manifest::Sid;

/// An opaque handle into a keyring's identity list, returned by
/// [`Keyring::find_sid`] and [`Keyring::next_identity`] and otherwise
/// meaningless outside the keyring that produced it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeyringCursor(pub usize);

/// The subset of keyring operations `AuthorResolver` needs: locating a
/// local identity by [`Sid`], reading its Rhizome secret, iterating all
/// local identities, and computing a Curve25519 `beforenm` shared secret
/// between two identities.
pub trait Keyring {
    /// Finds the cursor for a locally-held identity with subscriber id `sid`.
    fn find_sid(&self, sid: &Sid) -> Option<KeyringCursor>;

    /// Returns the identity's stored Rhizome secret (RS), if it has one.
    fn identity_rhizome_secret(&self, cursor: &KeyringCursor) -> Option<Vec<u8>>;

    /// Iterates local identities; `None` starts the iteration.
    fn next_identity(&self, cursor: Option<&KeyringCursor>) -> Option<KeyringCursor>;

    /// The subscriber id of the identity at `cursor`.
    fn identity_sid(&self, cursor: &KeyringCursor) -> Sid;

    /// Curve25519 `beforenm` shared secret between a local identity and a peer,
    /// or `None` if `local` is not a locally-held identity.
    fn nm_bytes(&self, local: &Sid, peer: &Sid) -> Option<[u8; 32]>;
}

/// The public fields of a stored manifest that `find_bundle_author` needs
/// back from the database when re-checking an already-inserted bundle.
#[derive(Debug, Clone)]
pub struct ManifestFields {
    pub author: Option<Sid>,
}

/// The subset of the manifest database `AuthorResolver` needs.
pub trait ManifestDatabase {
    /// Looks up a previously stored manifest by bundle id.
    fn retrieve_manifest(&self, bid: &crate::manifest::Bid) -> crate::error::Result<Option<ManifestFields>>;

    /// Best-effort write of a resolved author back to storage.
    fn update_author(&self, bid: &crate::manifest::Bid, author: &Sid);
}

#[cfg(test)]
pub(crate) mod fakes {
    use super::*;
    use crate::manifest::Bid;
    use parking_lot::Mutex;
    use std::collections::HashMap;

    /// An in-memory keyring fake holding a fixed list of local identities.
    pub struct FakeKeyring {
        identities: Vec<(Sid, Vec<u8>)>,
        nm: HashMap<(Sid, Sid), [u8; 32]>,
    }

    impl FakeKeyring {
        pub fn new(identities: Vec<(Sid, Vec<u8>)>) -> Self {
            Self { identities, nm: HashMap::new() }
        }

        pub fn with_nm(mut self, local: Sid, peer: Sid, shared: [u8; 32]) -> Self {
            self.nm.insert((local, peer), shared);
            self
        }
    }

    impl Keyring for FakeKeyring {
        fn find_sid(&self, sid: &Sid) -> Option<KeyringCursor> {
            self.identities.iter().position(|(s, _)| s == sid).map(KeyringCursor)
        }

        fn identity_rhizome_secret(&self, cursor: &KeyringCursor) -> Option<Vec<u8>> {
            self.identities.get(cursor.0).map(|(_, rs)| rs.clone())
        }

        fn next_identity(&self, cursor: Option<&KeyringCursor>) -> Option<KeyringCursor> {
            let next = cursor.map_or(0, |c| c.0 + 1);
            if next < self.identities.len() {
                Some(KeyringCursor(next))
            } else {
                None
            }
        }

        fn identity_sid(&self, cursor: &KeyringCursor) -> Sid {
            self.identities[cursor.0].0
        }

        fn nm_bytes(&self, local: &Sid, peer: &Sid) -> Option<[u8; 32]> {
            self.nm.get(&(*local, *peer)).copied()
        }
    }

    /// An in-memory manifest database fake.
    #[derive(Default)]
    pub struct FakeManifestDatabase {
        authors: Mutex<HashMap<Bid, Sid>>,
    }

    impl ManifestDatabase for FakeManifestDatabase {
        fn retrieve_manifest(&self, bid: &Bid) -> crate::error::Result<Option<ManifestFields>> {
            Ok(self.authors.lock().get(bid).map(|sid| ManifestFields { author: Some(*sid) }))
        }

        fn update_author(&self, bid: &Bid, author: &Sid) {
            self.authors.lock().insert(*bid, *author);
        }
    }
}
