//! The single secret blob a [`crate::TokenService`] is rebuilt from on each
//! heartbeat tick: `{Secrets[], ExtKeys[], SysPubKeys[]}`.

/// An RSA keypair in PEM form, used for RS256 signing and verification.
#[derive(Clone)]
pub struct RsaKeyMaterial {
    pub private_pem: String,
    pub public_pem: String,
}

#[derive(Clone, Default)]
pub struct TokenSecrets {
    /// HS512 symmetric secrets. `[0]` is active for signing.
    pub hs512_secrets: Vec<Vec<u8>>,
    /// RS256 keypairs for external relying parties. `[0]` is active for signing.
    pub rs256_keys: Vec<RsaKeyMaterial>,
    /// Ed25519 public keys trusted for system-kind inbound verification
    /// (base64, unpadded, as `jsonwebtoken::DecodingKey::from_ed_components` expects).
    pub eddsa_pub_keys_b64: Vec<String>,
}
