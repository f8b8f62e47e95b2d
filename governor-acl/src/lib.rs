//! Flat relation-tuple ACL store and API-key store.
//!
//! Relations are `(Obj{ns,key,pred}, Sub{ns,key,pred})` tuples with no
//! transitive closure — checks are exact-match, ordered for pagination.
//! [`InMemoryAclStore`] is the in-process store; [`SqlAclStore`] is the
//! durable counterpart over any [`governor_data::SqlExecutor`].
//!
//! API keys never retain the plaintext secret: [`InMemoryApiKeyStore`] hashes
//! with `Blake2b512` and compares in constant time.

pub mod apikey;
pub mod error;
pub mod relation;
pub mod store;

pub use apikey::{InMemoryApiKeyStore, IssuedKey};
pub use error::AclError;
pub use relation::{ObjRef, Relation};
pub use store::{AclStore, InMemoryAclStore, SqlAclStore};

pub mod prelude {
    pub use crate::{AclError, AclStore, InMemoryAclStore, InMemoryApiKeyStore, IssuedKey, ObjRef, Relation, SqlAclStore};
}
