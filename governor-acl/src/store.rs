//! `AclStore`: `check`, `insert_relations`, `delete_relations`, `read`,
//! `read_by_sub_obj_pred`, backed by a `BTreeSet` of [`Relation`]s ordered by
//! `(ns, key, pred)` so `read` can paginate.
//!
//! [`InMemoryAclStore`] is the in-memory store. [`SqlAclStore`] is the
//! durable counterpart, built generically over [`governor_data::SqlExecutor`]
//! rather than a dedicated driver, so this crate owns its schema without
//! coupling to a specific database crate.

use std::collections::BTreeSet;
use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, RwLock};

use governor_data::{Param, SqlExecutor};

use crate::error::AclError;
use crate::relation::{ObjRef, Relation};

type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Object-safe flat relation-tuple store.
pub trait AclStore: Send + Sync {
    /// Does a relation `obj -> sub` exist, exact-match?
    fn check<'a>(&'a self, obj: &'a ObjRef, sub: &'a ObjRef) -> BoxFuture<'a, Result<bool, AclError>>;

    fn insert_relations<'a>(&'a self, rels: &'a [Relation]) -> BoxFuture<'a, Result<(), AclError>>;

    fn delete_relations<'a>(&'a self, rels: &'a [Relation]) -> BoxFuture<'a, Result<(), AclError>>;

    /// Subjects related to `obj_rel`, paginated in `(ns, key, pred)` order
    /// over the subject side. `after`, when given, excludes results at or
    /// before that cursor.
    fn read<'a>(
        &'a self,
        obj_rel: &'a ObjRef,
        after: Option<&'a ObjRef>,
        limit: usize,
    ) -> BoxFuture<'a, Result<Vec<ObjRef>, AclError>>;

    /// Object keys in `obj_ns` under `pred` that `sub` is related to,
    /// paginated by object key.
    fn read_by_sub_obj_pred<'a>(
        &'a self,
        sub: &'a ObjRef,
        obj_ns: &'a str,
        pred: &'a str,
        after_key: Option<&'a str>,
        limit: usize,
    ) -> BoxFuture<'a, Result<Vec<String>, AclError>>;
}

/// In-memory mock store. Direct tuple lookups only — no transitive closure,
/// matching `MockBackend::has_tuple`.
#[derive(Default)]
pub struct InMemoryAclStore {
    relations: RwLock<BTreeSet<Relation>>,
}

impl InMemoryAclStore {
    pub fn new() -> Self {
        InMemoryAclStore::default()
    }
}

impl AclStore for InMemoryAclStore {
    fn check<'a>(&'a self, obj: &'a ObjRef, sub: &'a ObjRef) -> BoxFuture<'a, Result<bool, AclError>> {
        let found = self
            .relations
            .read()
            .expect("acl lock poisoned")
            .iter()
            .any(|r| &r.obj == obj && &r.sub == sub);
        Box::pin(async move { Ok(found) })
    }

    fn insert_relations<'a>(&'a self, rels: &'a [Relation]) -> BoxFuture<'a, Result<(), AclError>> {
        let mut guard = self.relations.write().expect("acl lock poisoned");
        for rel in rels {
            guard.insert(rel.clone());
        }
        drop(guard);
        Box::pin(async move { Ok(()) })
    }

    fn delete_relations<'a>(&'a self, rels: &'a [Relation]) -> BoxFuture<'a, Result<(), AclError>> {
        let mut guard = self.relations.write().expect("acl lock poisoned");
        for rel in rels {
            guard.remove(rel);
        }
        drop(guard);
        Box::pin(async move { Ok(()) })
    }

    fn read<'a>(
        &'a self,
        obj_rel: &'a ObjRef,
        after: Option<&'a ObjRef>,
        limit: usize,
    ) -> BoxFuture<'a, Result<Vec<ObjRef>, AclError>> {
        let subs: Vec<ObjRef> = self
            .relations
            .read()
            .expect("acl lock poisoned")
            .iter()
            .filter(|r| &r.obj == obj_rel)
            .map(|r| r.sub.clone())
            .filter(|sub| after.is_none_or(|cursor| sub > cursor))
            .take(limit)
            .collect();
        Box::pin(async move { Ok(subs) })
    }

    fn read_by_sub_obj_pred<'a>(
        &'a self,
        sub: &'a ObjRef,
        obj_ns: &'a str,
        pred: &'a str,
        after_key: Option<&'a str>,
        limit: usize,
    ) -> BoxFuture<'a, Result<Vec<String>, AclError>> {
        let keys: Vec<String> = self
            .relations
            .read()
            .expect("acl lock poisoned")
            .iter()
            .filter(|r| &r.sub == sub && r.obj.ns == obj_ns && r.obj.pred == pred)
            .map(|r| r.obj.key.clone())
            .filter(|key| after_key.is_none_or(|cursor| key.as_str() > cursor))
            .take(limit)
            .collect();
        Box::pin(async move { Ok(keys) })
    }
}

/// Postgres-backed durable store, built over any [`SqlExecutor`] rather than
/// a dedicated driver crate — `governor-acl` owns its schema, it doesn't need
/// `governor-data-postgres`'s pool-rotation machinery directly.
pub struct SqlAclStore<E: SqlExecutor> {
    executor: Arc<E>,
}

const CREATE_TABLE: &str = "CREATE TABLE IF NOT EXISTS relations (\
    obj_ns TEXT NOT NULL, obj_key TEXT NOT NULL, obj_pred TEXT NOT NULL, \
    sub_ns TEXT NOT NULL, sub_key TEXT NOT NULL, sub_pred TEXT NOT NULL, \
    PRIMARY KEY (obj_ns, obj_key, obj_pred, sub_ns, sub_key, sub_pred))";

impl<E: SqlExecutor> SqlAclStore<E> {
    pub fn new(executor: Arc<E>) -> Self {
        SqlAclStore { executor }
    }

    /// Idempotent schema setup. Callers run this once at startup.
    pub async fn init_schema(&self) -> Result<(), AclError> {
        self.executor.exec(CREATE_TABLE, &[]).await?;
        Ok(())
    }
}

impl<E: SqlExecutor> AclStore for SqlAclStore<E> {
    fn check<'a>(&'a self, obj: &'a ObjRef, sub: &'a ObjRef) -> BoxFuture<'a, Result<bool, AclError>> {
        Box::pin(async move {
            let params = [
                Param::from(obj.ns.as_str()),
                Param::from(obj.key.as_str()),
                Param::from(obj.pred.as_str()),
                Param::from(sub.ns.as_str()),
                Param::from(sub.key.as_str()),
                Param::from(sub.pred.as_str()),
            ];
            let rows = self
                .executor
                .query(
                    "SELECT 1 FROM relations WHERE obj_ns=$1 AND obj_key=$2 AND obj_pred=$3 \
                     AND sub_ns=$4 AND sub_key=$5 AND sub_pred=$6 LIMIT 1",
                    &params,
                )
                .await?;
            Ok(!rows.is_empty())
        })
    }

    fn insert_relations<'a>(&'a self, rels: &'a [Relation]) -> BoxFuture<'a, Result<(), AclError>> {
        Box::pin(async move {
            for rel in rels {
                let params = [
                    Param::from(rel.obj.ns.as_str()),
                    Param::from(rel.obj.key.as_str()),
                    Param::from(rel.obj.pred.as_str()),
                    Param::from(rel.sub.ns.as_str()),
                    Param::from(rel.sub.key.as_str()),
                    Param::from(rel.sub.pred.as_str()),
                ];
                self.executor
                    .exec(
                        "INSERT INTO relations (obj_ns, obj_key, obj_pred, sub_ns, sub_key, sub_pred) \
                         VALUES ($1, $2, $3, $4, $5, $6) ON CONFLICT DO NOTHING",
                        &params,
                    )
                    .await?;
            }
            Ok(())
        })
    }

    fn delete_relations<'a>(&'a self, rels: &'a [Relation]) -> BoxFuture<'a, Result<(), AclError>> {
        Box::pin(async move {
            for rel in rels {
                let params = [
                    Param::from(rel.obj.ns.as_str()),
                    Param::from(rel.obj.key.as_str()),
                    Param::from(rel.obj.pred.as_str()),
                    Param::from(rel.sub.ns.as_str()),
                    Param::from(rel.sub.key.as_str()),
                    Param::from(rel.sub.pred.as_str()),
                ];
                self.executor
                    .exec(
                        "DELETE FROM relations WHERE obj_ns=$1 AND obj_key=$2 AND obj_pred=$3 \
                         AND sub_ns=$4 AND sub_key=$5 AND sub_pred=$6",
                        &params,
                    )
                    .await?;
            }
            Ok(())
        })
    }

    fn read<'a>(
        &'a self,
        obj_rel: &'a ObjRef,
        after: Option<&'a ObjRef>,
        limit: usize,
    ) -> BoxFuture<'a, Result<Vec<ObjRef>, AclError>> {
        Box::pin(async move {
            let (sql, params): (&str, Vec<Param>) = match after {
                Some(cursor) => (
                    "SELECT sub_ns, sub_key, sub_pred FROM relations \
                     WHERE obj_ns=$1 AND obj_key=$2 AND obj_pred=$3 \
                     AND (sub_ns, sub_key, sub_pred) > ($4, $5, $6) \
                     ORDER BY sub_ns, sub_key, sub_pred LIMIT $7",
                    vec![
                        Param::from(obj_rel.ns.as_str()),
                        Param::from(obj_rel.key.as_str()),
                        Param::from(obj_rel.pred.as_str()),
                        Param::from(cursor.ns.as_str()),
                        Param::from(cursor.key.as_str()),
                        Param::from(cursor.pred.as_str()),
                        Param::Int(limit as i64),
                    ],
                ),
                None => (
                    "SELECT sub_ns, sub_key, sub_pred FROM relations \
                     WHERE obj_ns=$1 AND obj_key=$2 AND obj_pred=$3 \
                     ORDER BY sub_ns, sub_key, sub_pred LIMIT $4",
                    vec![
                        Param::from(obj_rel.ns.as_str()),
                        Param::from(obj_rel.key.as_str()),
                        Param::from(obj_rel.pred.as_str()),
                        Param::Int(limit as i64),
                    ],
                ),
            };
            let rows = self.executor.query(sql, &params).await?;
            Ok(rows
                .into_iter()
                .filter_map(|row| {
                    Some(ObjRef::new(
                        row.text("sub_ns")?.to_string(),
                        row.text("sub_key")?.to_string(),
                        row.text("sub_pred")?.to_string(),
                    ))
                })
                .collect())
        })
    }

    fn read_by_sub_obj_pred<'a>(
        &'a self,
        sub: &'a ObjRef,
        obj_ns: &'a str,
        pred: &'a str,
        after_key: Option<&'a str>,
        limit: usize,
    ) -> BoxFuture<'a, Result<Vec<String>, AclError>> {
        Box::pin(async move {
            let (sql, params): (&str, Vec<Param>) = match after_key {
                Some(cursor) => (
                    "SELECT obj_key FROM relations WHERE sub_ns=$1 AND sub_key=$2 AND sub_pred=$3 \
                     AND obj_ns=$4 AND obj_pred=$5 AND obj_key > $6 ORDER BY obj_key LIMIT $7",
                    vec![
                        Param::from(sub.ns.as_str()),
                        Param::from(sub.key.as_str()),
                        Param::from(sub.pred.as_str()),
                        Param::from(obj_ns),
                        Param::from(pred),
                        Param::from(cursor),
                        Param::Int(limit as i64),
                    ],
                ),
                None => (
                    "SELECT obj_key FROM relations WHERE sub_ns=$1 AND sub_key=$2 AND sub_pred=$3 \
                     AND obj_ns=$4 AND obj_pred=$5 ORDER BY obj_key LIMIT $6",
                    vec![
                        Param::from(sub.ns.as_str()),
                        Param::from(sub.key.as_str()),
                        Param::from(sub.pred.as_str()),
                        Param::from(obj_ns),
                        Param::from(pred),
                        Param::Int(limit as i64),
                    ],
                ),
            };
            let rows = self.executor.query(sql, &params).await?;
            Ok(rows.into_iter().filter_map(|row| row.text("obj_key").map(str::to_string)).collect())
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn role(group: &str) -> ObjRef {
        ObjRef::new("role", format!("mod:{group}"), "member")
    }

    fn user(id: &str) -> ObjRef {
        ObjRef::new("user", id, "self")
    }

    #[tokio::test]
    async fn member_check_matches_scenario_5() {
        let store = InMemoryAclStore::new();
        store
            .insert_relations(&[Relation::new(role("g1"), user("u1"))])
            .await
            .unwrap();

        assert!(store.check(&role("g1"), &user("u1")).await.unwrap());
        assert!(!store.check(&role("g1"), &user("u2")).await.unwrap());
    }

    #[tokio::test]
    async fn delete_relations_removes_tuple() {
        let store = InMemoryAclStore::new();
        let rel = Relation::new(role("g1"), user("u1"));
        store.insert_relations(&[rel.clone()]).await.unwrap();
        store.delete_relations(&[rel]).await.unwrap();
        assert!(!store.check(&role("g1"), &user("u1")).await.unwrap());
    }

    #[tokio::test]
    async fn read_paginates_subjects_in_order() {
        let store = InMemoryAclStore::new();
        store
            .insert_relations(&[
                Relation::new(role("g1"), user("u2")),
                Relation::new(role("g1"), user("u1")),
                Relation::new(role("g1"), user("u3")),
            ])
            .await
            .unwrap();

        let page1 = store.read(&role("g1"), None, 2).await.unwrap();
        assert_eq!(page1, vec![user("u1"), user("u2")]);

        let page2 = store.read(&role("g1"), page1.last(), 2).await.unwrap();
        assert_eq!(page2, vec![user("u3")]);
    }

    #[tokio::test]
    async fn read_by_sub_obj_pred_lists_objects_for_subject() {
        let store = InMemoryAclStore::new();
        store
            .insert_relations(&[
                Relation::new(role("g1"), user("u1")),
                Relation::new(role("g2"), user("u1")),
            ])
            .await
            .unwrap();

        let keys = store.read_by_sub_obj_pred(&user("u1"), "role", "member", None, 10).await.unwrap();
        assert_eq!(keys, vec!["mod:g1".to_string(), "mod:g2".to_string()]);
    }
}
