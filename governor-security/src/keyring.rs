//! Ordered signing/verifier key sets:
//! `entries[0]` is active for signing, every entry remains valid for
//! verification until explicitly removed. `kid` is derived from the key
//! material so rotation never collides.

use blake2::{Blake2b512, Digest};
use jsonwebtoken::{DecodingKey, EncodingKey};

/// Derives a stable, opaque key id from key material.
pub fn derive_kid(material: &[u8]) -> String {
    let mut hasher = Blake2b512::new();
    hasher.update(material);
    let digest = hasher.finalize();
    hex::encode(&digest[..8])
}

pub struct KeyEntry {
    pub kid: String,
    pub encoding: Option<EncodingKey>,
    pub decoding: DecodingKey,
}

/// Holds every known key for one algorithm. `entries[0]`, if present, is the
/// one used for new signatures; the rest remain valid-for-verifying.
#[derive(Default)]
pub struct Keyring {
    entries: Vec<KeyEntry>,
}

impl Keyring {
    pub fn new(entries: Vec<KeyEntry>) -> Self {
        Keyring { entries }
    }

    pub fn active(&self) -> Option<&KeyEntry> {
        self.entries.first()
    }

    pub fn find(&self, kid: &str) -> Option<&KeyEntry> {
        self.entries.iter().find(|e| e.kid == kid)
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn entries(&self) -> &[KeyEntry] {
        &self.entries
    }
}

mod hex {
    pub fn encode(bytes: &[u8]) -> String {
        bytes.iter().map(|b| format!("{b:02x}")).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kid_is_deterministic_and_distinguishes_material() {
        let a = derive_kid(b"secret-one");
        let b = derive_kid(b"secret-one");
        let c = derive_kid(b"secret-two");
        assert_eq!(a, b);
        assert_ne!(a, c);
        assert_eq!(a.len(), 16);
    }

    #[test]
    fn empty_keyring_has_no_active_key() {
        let ring = Keyring::default();
        assert!(ring.active().is_none());
        assert!(ring.is_empty());
    }

    #[test]
    fn first_entry_is_active() {
        let ring = Keyring::new(vec![
            KeyEntry {
                kid: "a".to_string(),
                encoding: Some(EncodingKey::from_secret(b"a")),
                decoding: DecodingKey::from_secret(b"a"),
            },
            KeyEntry {
                kid: "b".to_string(),
                encoding: Some(EncodingKey::from_secret(b"b")),
                decoding: DecodingKey::from_secret(b"b"),
            },
        ]);
        assert_eq!(ring.active().unwrap().kid, "a");
        assert!(ring.find("b").is_some());
    }
}
