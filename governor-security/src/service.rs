//! `TokenService`: HS512 (internal), RS256 (external, JWKS-advertised) and
//! EdDSA (system inbound verification only) keyrings sourced from a single
//! rotating secret blob.

use std::sync::Arc;
use std::time::Duration;

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine as _;
use governor_core::secret::SecretReader;
use jsonwebtoken::{decode, decode_header, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use rsa::pkcs8::DecodePublicKey;
use rsa::traits::PublicKeyParts;
use tokio::sync::RwLock;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::claims::{Claims, Kind};
use crate::config::TokenConfig;
use crate::error::TokenError;
use crate::keyring::{derive_kid, KeyEntry, Keyring};
use crate::secrets::TokenSecrets;

pub struct TokenService {
    config: TokenConfig,
    hs512: RwLock<Keyring>,
    rs256: RwLock<Keyring>,
    eddsa: RwLock<Keyring>,
    jwks: RwLock<serde_json::Value>,
}

impl TokenService {
    /// Builds the initial keyrings from `secrets` and spawns the background
    /// rotation task, which refetches on every `keyrefresh` tick.
    pub async fn spawn<S>(config: TokenConfig, secrets: Arc<S>, cancel: CancellationToken) -> Result<Arc<Self>, TokenError>
    where
        S: SecretReader<TokenSecrets> + 'static,
    {
        let initial = secrets
            .get_secret("tokens", Duration::from_secs(0))
            .await
            .map_err(|e| TokenError::Generate(e.to_string()))?;
        let (hs512, rs256, eddsa, jwks) = build_keyrings(&initial)?;

        let service = Arc::new(TokenService {
            config,
            hs512: RwLock::new(hs512),
            rs256: RwLock::new(rs256),
            eddsa: RwLock::new(eddsa),
            jwks: RwLock::new(jwks),
        });

        let task_service = Arc::clone(&service);
        tokio::spawn(async move { task_service.refresh_loop(secrets, cancel).await });

        Ok(service)
    }

    async fn refresh_loop<S>(self: Arc<Self>, secrets: Arc<S>, cancel: CancellationToken)
    where
        S: SecretReader<TokenSecrets> + 'static,
    {
        let mut ticker = tokio::time::interval(self.config.keyrefresh);
        loop {
            tokio::select! {
                _ = cancel.cancelled() => return,
                _ = ticker.tick() => {
                    match secrets.get_secret("tokens", Duration::from_secs(0)).await {
                        Ok(blob) => {
                            if let Err(err) = self.rotate(&blob).await {
                                warn!(%err, "token key rotation failed");
                            }
                        }
                        Err(err) => warn!(%err, "token secret refetch failed"),
                    }
                }
            }
        }
    }

    async fn rotate(&self, secrets: &TokenSecrets) -> Result<(), TokenError> {
        let previous_active = self.hs512.read().await.active().map(|e| e.kid.clone());
        let (hs512, rs256, eddsa, jwks) = build_keyrings(secrets)?;
        let new_active = hs512.active().map(|e| e.kid.clone());
        *self.hs512.write().await = hs512;
        *self.rs256.write().await = rs256;
        *self.eddsa.write().await = eddsa;
        *self.jwks.write().await = jwks;
        if previous_active != new_active {
            info!(previous = ?previous_active, current = ?new_active, "active signing key rotated");
        }
        Ok(())
    }

    /// Public RS256 keys, for external relying parties.
    pub async fn get_jwks(&self) -> serde_json::Value {
        self.jwks.read().await.clone()
    }

    /// Signs an internal token with the active HS512 key.
    pub async fn generate(
        &self,
        kind: Kind,
        userid: &str,
        dur: Duration,
        id: &str,
        auth_time: i64,
        scope: &str,
    ) -> Result<(String, Claims), TokenError> {
        let ring = self.hs512.read().await;
        let entry = ring.active().ok_or_else(|| TokenError::NoActiveKey("HS512".to_string()))?;
        let now = unix_now();
        let claims = Claims {
            sub: userid.to_string(),
            iss: self.config.issuer.clone(),
            aud: self.config.audience.clone(),
            exp: now + dur.as_secs() as i64,
            iat: now,
            nbf: now,
            kind,
            auth_time,
            scope: scope.to_string(),
            key: id.to_string(),
            session_id: id.to_string(),
            extra: serde_json::Map::new(),
        };
        let token = sign(Algorithm::HS512, &entry.kid, entry.encoding.as_ref().unwrap(), &claims)?;
        debug!(kid = %entry.kid, %kind, "token generated");
        Ok((token, claims))
    }

    /// Signs an externally-facing token with the active RS256 key.
    #[allow(clippy::too_many_arguments)]
    pub async fn generate_ext(
        &self,
        kind: Kind,
        issuer: &str,
        userid: &str,
        audience: &[String],
        dur: Duration,
        id: &str,
        auth_time: i64,
        extra_claims: serde_json::Map<String, serde_json::Value>,
    ) -> Result<(String, Claims), TokenError> {
        let ring = self.rs256.read().await;
        let entry = ring.active().ok_or_else(|| TokenError::NoActiveKey("RS256".to_string()))?;
        let now = unix_now();
        let claims = Claims {
            sub: userid.to_string(),
            iss: issuer.to_string(),
            aud: audience.join(" "),
            exp: now + dur.as_secs() as i64,
            iat: now,
            nbf: now,
            kind,
            auth_time,
            scope: String::new(),
            key: id.to_string(),
            session_id: id.to_string(),
            extra: extra_claims,
        };
        let token = sign(Algorithm::RS256, &entry.kid, entry.encoding.as_ref().unwrap(), &claims)?;
        debug!(kid = %entry.kid, %kind, "external token generated");
        Ok((token, claims))
    }

    /// Parses, verifies signature, checks `iss`/`aud`/`exp`/`nbf`, and
    /// enforces `claims.kind == kind`.
    pub async fn validate(&self, kind: Kind, token: &str) -> Result<Claims, TokenError> {
        self.decode_with_checks(kind, token, true).await
    }

    /// Same as [`Self::validate`] but used for external-party tokens; the
    /// issuer/audience used for validation are the caller's, not this
    /// service's defaults.
    pub async fn validate_ext(&self, kind: Kind, token: &str, issuer: &str, audience: &str) -> Result<Claims, TokenError> {
        self.decode(kind, token, true, Some((issuer, audience))).await
    }

    /// Same as [`Self::validate`] without `exp`/`nbf` checks, for post-expiry
    /// inspection flows (e.g. refresh).
    pub async fn get_claims(&self, kind: Kind, token: &str) -> Result<Claims, TokenError> {
        self.decode_with_checks(kind, token, false).await
    }

    pub async fn get_claims_ext(&self, kind: Kind, token: &str, issuer: &str, audience: &str) -> Result<Claims, TokenError> {
        self.decode(kind, token, false, Some((issuer, audience))).await
    }

    async fn decode_with_checks(&self, kind: Kind, token: &str, check_time: bool) -> Result<Claims, TokenError> {
        self.decode(kind, token, check_time, None).await
    }

    async fn decode(&self, kind: Kind, token: &str, check_time: bool, override_iss_aud: Option<(&str, &str)>) -> Result<Claims, TokenError> {
        let header = decode_header(token).map_err(|e| TokenError::InvalidToken(e.to_string()))?;
        let kid = header.kid.clone().ok_or_else(|| TokenError::InvalidToken("missing kid".to_string()))?;

        let decoding_key = if matches!(kind, Kind::System) {
            let ring = self.eddsa.read().await;
            ring.find(&kid).map(|e| clone_decoding(&e.decoding)).ok_or_else(|| TokenError::UnknownKeyId(kid.clone()))?
        } else {
            match header.alg {
                Algorithm::HS512 => {
                    let ring = self.hs512.read().await;
                    ring.find(&kid).map(|e| clone_decoding(&e.decoding)).ok_or_else(|| TokenError::UnknownKeyId(kid.clone()))?
                }
                Algorithm::RS256 => {
                    let ring = self.rs256.read().await;
                    ring.find(&kid).map(|e| clone_decoding(&e.decoding)).ok_or_else(|| TokenError::UnknownKeyId(kid.clone()))?
                }
                other => return Err(TokenError::InvalidToken(format!("unsupported algorithm: {other:?}"))),
            }
        };

        let mut validation = Validation::new(header.alg);
        validation.validate_exp = check_time;
        validation.validate_nbf = check_time;
        let (issuer, audience) = override_iss_aud.unwrap_or((self.config.issuer.as_str(), self.config.audience.as_str()));
        if !issuer.is_empty() {
            validation.set_issuer(&[issuer]);
        }
        if !audience.is_empty() {
            validation.set_audience(&[audience]);
        }

        let data = decode::<Claims>(token, &decoding_key, &validation).map_err(|e| match e.kind() {
            jsonwebtoken::errors::ErrorKind::ExpiredSignature => TokenError::Expired,
            _ => TokenError::InvalidToken(e.to_string()),
        })?;

        if data.claims.kind != kind {
            return Err(TokenError::KindMismatch {
                expected: kind.to_string(),
                actual: data.claims.kind.to_string(),
            });
        }
        Ok(data.claims)
    }
}

fn sign(algorithm: Algorithm, kid: &str, key: &EncodingKey, claims: &Claims) -> Result<String, TokenError> {
    let mut header = Header::new(algorithm);
    header.kid = Some(kid.to_string());
    encode(&header, claims, key).map_err(|e| TokenError::Generate(e.to_string()))
}

fn clone_decoding(key: &DecodingKey) -> DecodingKey {
    // `DecodingKey` doesn't implement `Clone`; it's cheap to rebuild from the
    // stored keyring entry since callers only hold it for one `decode` call.
    key.clone()
}

fn unix_now() -> i64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs() as i64
}

fn build_keyrings(secrets: &TokenSecrets) -> Result<(Keyring, Keyring, Keyring, serde_json::Value), TokenError> {
    let mut hs512_entries = Vec::new();
    for secret in &secrets.hs512_secrets {
        let kid = derive_kid(secret);
        hs512_entries.push(KeyEntry {
            kid,
            encoding: Some(EncodingKey::from_secret(secret)),
            decoding: DecodingKey::from_secret(secret),
        });
    }

    let mut rs256_entries = Vec::new();
    let mut jwks_keys = Vec::new();
    for material in &secrets.rs256_keys {
        let kid = derive_kid(material.public_pem.as_bytes());
        let encoding = EncodingKey::from_rsa_pem(material.private_pem.as_bytes())
            .map_err(|e| TokenError::Generate(format!("invalid RS256 private key: {e}")))?;
        let decoding = DecodingKey::from_rsa_pem(material.public_pem.as_bytes())
            .map_err(|e| TokenError::Generate(format!("invalid RS256 public key: {e}")))?;

        if let Ok(public_key) = rsa::RsaPublicKey::from_public_key_pem(&material.public_pem) {
            let n = URL_SAFE_NO_PAD.encode(public_key.n().to_bytes_be());
            let e = URL_SAFE_NO_PAD.encode(public_key.e().to_bytes_be());
            jwks_keys.push(serde_json::json!({
                "kty": "RSA",
                "use": "sig",
                "alg": "RS256",
                "kid": kid,
                "n": n,
                "e": e,
            }));
        }

        rs256_entries.push(KeyEntry { kid, encoding: Some(encoding), decoding });
    }

    let mut eddsa_entries = Vec::new();
    for pub_key_b64 in &secrets.eddsa_pub_keys_b64 {
        let kid = derive_kid(pub_key_b64.as_bytes());
        let decoding = DecodingKey::from_ed_components(pub_key_b64)
            .map_err(|e| TokenError::Generate(format!("invalid EdDSA public key: {e}")))?;
        eddsa_entries.push(KeyEntry { kid, encoding: None, decoding });
    }

    let jwks = serde_json::json!({ "keys": jwks_keys });
    Ok((Keyring::new(hs512_entries), Keyring::new(rs256_entries), Keyring::new(eddsa_entries), jwks))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::secrets::RsaKeyMaterial;
    use governor_core::secret::StaticSecretReader;
    use rsa::pkcs1::{EncodeRsaPrivateKey, EncodeRsaPublicKey};
    use rsa::pkcs8::LineEnding;

    fn rsa_material() -> RsaKeyMaterial {
        let mut rng = rand::thread_rng();
        let private = rsa::RsaPrivateKey::new(&mut rng, 2048).unwrap();
        let public = private.to_public_key();
        RsaKeyMaterial {
            private_pem: private.to_pkcs1_pem(LineEnding::LF).unwrap().to_string(),
            public_pem: public.to_pkcs1_pem(LineEnding::LF).unwrap(),
        }
    }

    async fn test_service() -> Arc<TokenService> {
        let secrets = TokenSecrets {
            hs512_secrets: vec![b"test-secret-one".to_vec()],
            rs256_keys: vec![rsa_material()],
            eddsa_pub_keys_b64: vec![],
        };
        let reader = Arc::new(StaticSecretReader::new(secrets));
        let config = TokenConfig {
            issuer: "governor".to_string(),
            audience: "governor-clients".to_string(),
            ..TokenConfig::default()
        };
        TokenService::spawn(config, reader, CancellationToken::new()).await.unwrap()
    }

    #[tokio::test]
    async fn generate_then_validate_round_trips() {
        let service = test_service().await;
        let (token, claims) = service
            .generate(Kind::Access, "user-1", Duration::from_secs(60), "sess-1", 0, "read write")
            .await
            .unwrap();
        let validated = service.validate(Kind::Access, &token).await.unwrap();
        assert_eq!(validated.sub, claims.sub);
        assert_eq!(validated.scope, "read write");
    }

    #[tokio::test]
    async fn validate_rejects_wrong_kind() {
        let service = test_service().await;
        let (token, _) = service
            .generate(Kind::Access, "user-1", Duration::from_secs(60), "sess-1", 0, "read")
            .await
            .unwrap();
        let err = service.validate(Kind::Refresh, &token).await.unwrap_err();
        assert!(matches!(err, TokenError::KindMismatch { .. }));
    }

    #[tokio::test]
    async fn get_claims_ignores_expiry() {
        let service = test_service().await;
        let (token, _) = service
            .generate(Kind::Access, "user-1", Duration::from_secs(0), "sess-1", 0, "read")
            .await
            .unwrap();
        tokio::time::sleep(Duration::from_secs(1)).await;
        assert!(service.validate(Kind::Access, &token).await.is_err());
        assert!(service.get_claims(Kind::Access, &token).await.is_ok());
    }

    #[tokio::test]
    async fn generate_ext_signs_with_rs256_and_jwks_exposes_it() {
        let service = test_service().await;
        let (token, _) = service
            .generate_ext(
                Kind::OauthAccess,
                "governor",
                "user-1",
                &["client-a".to_string()],
                Duration::from_secs(60),
                "sess-2",
                0,
                serde_json::Map::new(),
            )
            .await
            .unwrap();
        let claims = service.validate_ext(Kind::OauthAccess, &token, "governor", "client-a").await.unwrap();
        assert_eq!(claims.sub, "user-1");

        let jwks = service.get_jwks().await;
        assert_eq!(jwks["keys"].as_array().unwrap().len(), 1);
    }
}
