//! In-memory API key store: `keyid -> {hash, userid, scope}`. The secret is
//! generated once, hashed with `blake2::Blake2b512` and never stored in
//! plaintext; comparison uses `subtle::ConstantTimeEq`.

use std::collections::HashMap;
use std::sync::RwLock;

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use blake2::{Blake2b512, Digest};
use rand::RngCore;
use subtle::ConstantTimeEq;

use crate::error::AclError;
use governor_core::ErrorKind;

#[derive(Debug, Clone)]
struct StoredKey {
    hash: [u8; 64],
    userid: String,
    scope: String,
}

/// A newly minted key: the caller must show `plaintext` to the user now —
/// it cannot be recovered later.
#[derive(Debug, Clone)]
pub struct IssuedKey {
    pub keyid: String,
    pub plaintext: String,
}

#[derive(Default)]
pub struct InMemoryApiKeyStore {
    keys: RwLock<HashMap<String, StoredKey>>,
}

fn hash_secret(secret: &str) -> [u8; 64] {
    let mut hasher = Blake2b512::new();
    hasher.update(secret.as_bytes());
    hasher.finalize().into()
}

impl InMemoryApiKeyStore {
    pub fn new() -> Self {
        InMemoryApiKeyStore::default()
    }

    /// Mints a new key for `userid` scoped to `scope`. `name`/`desc` are
    /// caller-facing labels, not interpreted by the store.
    pub fn insert(&self, userid: &str, scope: &str, name: &str, desc: &str) -> IssuedKey {
        let _ = (name, desc);
        let keyid = random_token(16);
        let secret = random_token(32);
        let plaintext = format!("{keyid}.{secret}");

        self.keys.write().expect("apikey lock poisoned").insert(
            keyid.clone(),
            StoredKey {
                hash: hash_secret(&plaintext),
                userid: userid.to_string(),
                scope: scope.to_string(),
            },
        );

        IssuedKey { keyid, plaintext }
    }

    /// Returns `(userid, scope)` if `plaintext` matches the stored hash for
    /// `keyid`, in constant time.
    pub fn check(&self, keyid: &str, plaintext: &str) -> Option<(String, String)> {
        let guard = self.keys.read().expect("apikey lock poisoned");
        let stored = guard.get(keyid)?;
        let presented = hash_secret(plaintext);
        if bool::from(stored.hash.ct_eq(&presented)) {
            Some((stored.userid.clone(), stored.scope.clone()))
        } else {
            None
        }
    }

    /// Removes `keyid` if it belongs to `userid`.
    pub fn delete(&self, keyid: &str, userid: &str) -> Result<(), AclError> {
        let mut guard = self.keys.write().expect("apikey lock poisoned");
        match guard.get(keyid) {
            Some(stored) if stored.userid == userid => {
                guard.remove(keyid);
                Ok(())
            }
            Some(_) => Err(AclError::new(ErrorKind::Authz, "key does not belong to userid")),
            None => Err(AclError::not_found(format!("no such key {keyid}"))),
        }
    }
}

fn random_token(bytes: usize) -> String {
    let mut buf = vec![0u8; bytes];
    rand::thread_rng().fill_bytes(&mut buf);
    URL_SAFE_NO_PAD.encode(buf)
}
