//! Authorization helpers composed over [`AuthGate::authenticate`]: `admin`,
//! `user`, `owner_param`, `mod_`, `member`, `no_ban`, `system`. Each guard
//! resolves a [`crate::rank::Rank`] via a batched ACL `Check` and applies its
//! own predicate over it. The trait is boxed-future rather than RPITIT so
//! guards can be stored as trait objects.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use axum::http::HeaderMap;
use axum::response::Response;

use crate::context::AuthContext;
use crate::error::GateError;
use crate::gate::AuthGate;
use crate::rank::{self, RankTag};

type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// The implicit group `User`/`NoBan` checks ban status against when no
/// specific group is named.
const IMPLICIT_GROUP: &str = "global";

pub trait Guard: Send + Sync {
    fn check<'a>(&'a self, headers: &'a HeaderMap, path_param: Option<&'a str>) -> BoxFuture<'a, Result<AuthContext, Response>>;
}

/// Rank/role check happens after authentication already succeeded under
/// whatever scheme the caller used, so the challenge defaults to `Bearer`
/// here rather than threading the original credential's scheme through.
fn forbidden(gate: &AuthGate, scope: &str, reason: &str) -> Response {
    GateError::Forbidden { scheme: "Bearer", reason: reason.to_string() }.into_response_with(gate.realm(), scope)
}

pub struct AdminGuard {
    pub gate: Arc<AuthGate>,
    pub scope: String,
}

impl Guard for AdminGuard {
    fn check<'a>(&'a self, headers: &'a HeaderMap, _path_param: Option<&'a str>) -> BoxFuture<'a, Result<AuthContext, Response>> {
        Box::pin(async move {
            let ctx = self.gate.authenticate(headers, &self.scope).await?;
            let rank = rank::resolve(self.gate.acl().as_ref(), &ctx.userid, &[RankTag::Admin])
                .await
                .map_err(|_| forbidden(&self.gate, &self.scope, "acl check failed"))?;
            if rank.admin {
                Ok(ctx)
            } else {
                Err(forbidden(&self.gate, &self.scope, "requires admin"))
            }
        })
    }
}

pub struct UserGuard {
    pub gate: Arc<AuthGate>,
    pub scope: String,
}

impl Guard for UserGuard {
    fn check<'a>(&'a self, headers: &'a HeaderMap, _path_param: Option<&'a str>) -> BoxFuture<'a, Result<AuthContext, Response>> {
        Box::pin(async move {
            let ctx = self.gate.authenticate(headers, &self.scope).await?;
            let rank = rank::resolve(
                self.gate.acl().as_ref(),
                &ctx.userid,
                &[RankTag::Admin, RankTag::User, RankTag::Banned(IMPLICIT_GROUP.to_string())],
            )
            .await
            .map_err(|_| forbidden(&self.gate, &self.scope, "acl check failed"))?;
            if rank.is_banned {
                return Err(forbidden(&self.gate, &self.scope, "banned"));
            }
            if rank.admin || rank.user {
                Ok(ctx)
            } else {
                Err(forbidden(&self.gate, &self.scope, "requires user"))
            }
        })
    }
}

pub struct OwnerParamGuard {
    pub gate: Arc<AuthGate>,
    pub scope: String,
}

impl Guard for OwnerParamGuard {
    fn check<'a>(&'a self, headers: &'a HeaderMap, path_param: Option<&'a str>) -> BoxFuture<'a, Result<AuthContext, Response>> {
        Box::pin(async move {
            let ctx = self.gate.authenticate(headers, &self.scope).await?;
            if path_param == Some(ctx.userid.as_str()) {
                return Ok(ctx);
            }
            let rank = rank::resolve(self.gate.acl().as_ref(), &ctx.userid, &[RankTag::Admin])
                .await
                .map_err(|_| forbidden(&self.gate, &self.scope, "acl check failed"))?;
            if rank.admin {
                Ok(ctx)
            } else {
                Err(forbidden(&self.gate, &self.scope, "not owner"))
            }
        })
    }
}

pub struct ModGuard {
    pub gate: Arc<AuthGate>,
    pub group: String,
    pub scope: String,
}

impl Guard for ModGuard {
    fn check<'a>(&'a self, headers: &'a HeaderMap, _path_param: Option<&'a str>) -> BoxFuture<'a, Result<AuthContext, Response>> {
        Box::pin(async move {
            let ctx = self.gate.authenticate(headers, &self.scope).await?;
            let rank = rank::resolve(self.gate.acl().as_ref(), &ctx.userid, &[RankTag::Admin, RankTag::Mod(self.group.clone())])
                .await
                .map_err(|_| forbidden(&self.gate, &self.scope, "acl check failed"))?;
            if rank.admin || rank.is_mod {
                Ok(ctx)
            } else {
                Err(forbidden(&self.gate, &self.scope, "requires mod"))
            }
        })
    }
}

pub struct MemberGuard {
    pub gate: Arc<AuthGate>,
    pub group: String,
    pub scope: String,
}

impl Guard for MemberGuard {
    fn check<'a>(&'a self, headers: &'a HeaderMap, _path_param: Option<&'a str>) -> BoxFuture<'a, Result<AuthContext, Response>> {
        Box::pin(async move {
            let ctx = self.gate.authenticate(headers, &self.scope).await?;
            let rank = rank::resolve(self.gate.acl().as_ref(), &ctx.userid, &[RankTag::Admin, RankTag::Member(self.group.clone())])
                .await
                .map_err(|_| forbidden(&self.gate, &self.scope, "acl check failed"))?;
            if rank.admin || rank.is_member {
                Ok(ctx)
            } else {
                Err(forbidden(&self.gate, &self.scope, "requires membership"))
            }
        })
    }
}

pub struct NoBanGuard {
    pub gate: Arc<AuthGate>,
    pub group: String,
    pub scope: String,
}

impl Guard for NoBanGuard {
    fn check<'a>(&'a self, headers: &'a HeaderMap, _path_param: Option<&'a str>) -> BoxFuture<'a, Result<AuthContext, Response>> {
        Box::pin(async move {
            let ctx = self.gate.authenticate(headers, &self.scope).await?;
            let rank = rank::resolve(self.gate.acl().as_ref(), &ctx.userid, &[RankTag::Admin, RankTag::Banned(self.group.clone())])
                .await
                .map_err(|_| forbidden(&self.gate, &self.scope, "acl check failed"))?;
            if rank.admin || !rank.is_banned {
                Ok(ctx)
            } else {
                Err(forbidden(&self.gate, &self.scope, "banned"))
            }
        })
    }
}

pub struct SystemGuard {
    pub gate: Arc<AuthGate>,
    pub scope: String,
}

impl Guard for SystemGuard {
    fn check<'a>(&'a self, headers: &'a HeaderMap, _path_param: Option<&'a str>) -> BoxFuture<'a, Result<AuthContext, Response>> {
        Box::pin(async move {
            let ctx = self.gate.authenticate(headers, &self.scope).await?;
            if ctx.is_system {
                Ok(ctx)
            } else {
                Err(forbidden(&self.gate, &self.scope, "requires system credential"))
            }
        })
    }
}

impl AuthGate {
    pub fn admin(self: &Arc<Self>, scope: impl Into<String>) -> AdminGuard {
        AdminGuard { gate: Arc::clone(self), scope: scope.into() }
    }

    pub fn user(self: &Arc<Self>, scope: impl Into<String>) -> UserGuard {
        UserGuard { gate: Arc::clone(self), scope: scope.into() }
    }

    pub fn owner_param(self: &Arc<Self>, scope: impl Into<String>) -> OwnerParamGuard {
        OwnerParamGuard { gate: Arc::clone(self), scope: scope.into() }
    }

    pub fn mod_(self: &Arc<Self>, group: impl Into<String>, scope: impl Into<String>) -> ModGuard {
        ModGuard { gate: Arc::clone(self), group: group.into(), scope: scope.into() }
    }

    pub fn member(self: &Arc<Self>, group: impl Into<String>, scope: impl Into<String>) -> MemberGuard {
        MemberGuard { gate: Arc::clone(self), group: group.into(), scope: scope.into() }
    }

    pub fn no_ban(self: &Arc<Self>, group: impl Into<String>, scope: impl Into<String>) -> NoBanGuard {
        NoBanGuard { gate: Arc::clone(self), group: group.into(), scope: scope.into() }
    }

    pub fn system(self: &Arc<Self>, scope: impl Into<String>) -> SystemGuard {
        SystemGuard { gate: Arc::clone(self), scope: scope.into() }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gate::AuthGate;
    use governor_acl::{AclStore, InMemoryAclStore, InMemoryApiKeyStore, ObjRef, Relation};
    use governor_core::secret::StaticSecretReader;
    use governor_security::{Kind, TokenConfig, TokenSecrets};
    use tokio_util::sync::CancellationToken;

    async fn gate_with_relation() -> (Arc<AuthGate>, String) {
        let secrets = TokenSecrets {
            hs512_secrets: vec![b"test-secret".to_vec()],
            rs256_keys: vec![],
            eddsa_pub_keys_b64: vec![],
        };
        let reader = Arc::new(StaticSecretReader::new(secrets));
        let tokens = governor_security::TokenService::spawn(TokenConfig::default(), reader, CancellationToken::new()).await.unwrap();
        let acl_store = InMemoryAclStore::new();
        acl_store
            .insert_relations(&[Relation::new(ObjRef::new("role", "mod:g1", "member"), ObjRef::new("user", "u1", "self"))])
            .await
            .unwrap();
        let acl: Arc<dyn AclStore> = Arc::new(acl_store);
        let api_keys = Arc::new(InMemoryApiKeyStore::new());
        let gate = Arc::new(AuthGate::new(tokens, acl, api_keys, "governor"));

        let (token, _) = gate.tokens.generate(Kind::Access, "u1", std::time::Duration::from_secs(60), "s1", 0, "all").await.unwrap();
        (gate, token)
    }

    #[tokio::test]
    async fn mod_guard_passes_for_group_mod() {
        let (gate, token) = gate_with_relation().await;
        let mut headers = HeaderMap::new();
        headers.insert(axum::http::header::AUTHORIZATION, format!("Bearer {token}").parse().unwrap());

        let ctx = gate.mod_("g1", "all").check(&headers, None).await.unwrap();
        assert_eq!(ctx.userid, "u1");
    }

    #[tokio::test]
    async fn mod_guard_rejects_non_mod() {
        let (gate, _) = gate_with_relation().await;
        let (token, _) = gate.tokens.generate(Kind::Access, "u2", std::time::Duration::from_secs(60), "s2", 0, "all").await.unwrap();
        let mut headers = HeaderMap::new();
        headers.insert(axum::http::header::AUTHORIZATION, format!("Bearer {token}").parse().unwrap());

        assert!(gate.mod_("g1", "all").check(&headers, None).await.is_err());
    }
}
