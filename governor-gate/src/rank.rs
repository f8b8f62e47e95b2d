//! Role resolution through the ACL store: for a requested rank
//! `{admin?, user?, mod:<g>?, usr:<g>?, ban:<g>?}`, the gate issues a batched
//! `Check` per tag and intersects into a returned rank object.

use std::sync::Arc;

use governor_acl::{AclStore, ObjRef};

/// One relation to probe for a caller: `role:<group>#<pred>` → `user:<id>#self`.
pub enum RankTag {
    Admin,
    User,
    Mod(String),
    Member(String),
    Banned(String),
}

impl RankTag {
    fn obj_ref(&self) -> ObjRef {
        match self {
            RankTag::Admin => ObjRef::new("role", "admin", "member"),
            RankTag::User => ObjRef::new("role", "user", "member"),
            RankTag::Mod(group) => ObjRef::new("role", format!("mod:{group}"), "member"),
            RankTag::Member(group) => ObjRef::new("role", format!("usr:{group}"), "member"),
            RankTag::Banned(group) => ObjRef::new("role", format!("ban:{group}"), "member"),
        }
    }
}

/// The result of a batched rank check, intersected from the individual
/// `Check` calls against `acl`.
#[derive(Debug, Default, Clone)]
pub struct Rank {
    pub admin: bool,
    pub user: bool,
    pub is_mod: bool,
    pub is_member: bool,
    pub is_banned: bool,
}

pub async fn resolve<A: AclStore + ?Sized>(acl: &A, userid: &str, tags: &[RankTag]) -> Result<Rank, governor_core::GovernorError> {
    let sub = ObjRef::new("user", userid, "self");
    let mut rank = Rank::default();
    for tag in tags {
        let allowed = acl.check(&tag.obj_ref(), &sub).await?;
        match tag {
            RankTag::Admin => rank.admin = allowed,
            RankTag::User => rank.user = allowed,
            RankTag::Mod(_) => rank.is_mod = allowed,
            RankTag::Member(_) => rank.is_member = allowed,
            RankTag::Banned(_) => rank.is_banned = allowed,
        }
    }
    Ok(rank)
}

#[cfg(test)]
mod tests {
    use super::*;
    use governor_acl::{InMemoryAclStore, Relation};

    #[tokio::test]
    async fn resolves_mod_membership() {
        let acl = InMemoryAclStore::new();
        acl.insert_relations(&[Relation::new(
            ObjRef::new("role", "mod:g1", "member"),
            ObjRef::new("user", "u1", "self"),
        )])
        .await
        .unwrap();

        let rank = resolve(&acl, "u1", &[RankTag::Admin, RankTag::Mod("g1".to_string())]).await.unwrap();
        assert!(!rank.admin);
        assert!(rank.is_mod);
    }
}
