//! The DB agent: a single task owns the live `PgPool` via [`Lifecycle`] and
//! serializes all access to it behind an operation channel.

use std::sync::Arc;
use std::time::Duration;

use governor_core::secret::SecretReader;
use governor_core::{ErrorKind, GovernorError, Lifecycle};
use governor_data::error::DbError;
use governor_data::value::{Param, Row};
use governor_data::SqlExecutor;
use sqlx::postgres::PgPoolOptions;
use sqlx::{Column, PgPool, Row as _};
use tokio::sync::{mpsc, oneshot};

use crate::config::PgConfig;
use crate::error::PgErrorExt;

/// Credentials fetched from a [`SecretReader`]; the agent rebuilds the pool
/// when these change (auth rotation).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PgCredentials {
    pub user: String,
    pub password: String,
}

enum Operation {
    Exec { sql: String, params: Vec<Param>, reply: oneshot::Sender<Result<u64, DbError>> },
    Query { sql: String, params: Vec<Param>, reply: oneshot::Sender<Result<Vec<Row>, DbError>> },
    QueryOne { sql: String, params: Vec<Param>, reply: oneshot::Sender<Result<Row, DbError>> },
}

/// Handle callers use to talk to the DB agent. Cheap to clone.
#[derive(Clone)]
pub struct PgClient {
    tx: mpsc::Sender<Operation>,
}

const OP_QUEUE_DEPTH: usize = 256;

impl PgClient {
    /// Spawns the agent task and returns a handle to it. The agent owns a
    /// `Lifecycle<PgPool>` and runs its heartbeat until `cancel` fires.
    ///
    /// `SecretReader`'s methods return `impl Future`, which makes the trait
    /// non-dyn-safe — callers plug in a concrete reader type rather than a
    /// `dyn SecretReader`.
    pub fn spawn<S>(config: PgConfig, secrets: Arc<S>, cancel: tokio_util::sync::CancellationToken) -> Self
    where
        S: SecretReader<PgCredentials> + 'static,
    {
        let (tx, rx) = mpsc::channel(OP_QUEUE_DEPTH);
        tokio::spawn(run_agent(config, secrets, rx, cancel));
        PgClient { tx }
    }

    async fn call<T>(&self, make_op: impl FnOnce(oneshot::Sender<Result<T, DbError>>) -> Operation) -> Result<T, DbError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.tx
            .send(make_op(reply_tx))
            .await
            .map_err(|_| DbError::new(ErrorKind::ClientClosed, "db agent closed"))?;
        reply_rx
            .await
            .map_err(|_| DbError::new(ErrorKind::ClientClosed, "db agent dropped reply"))?
    }
}

impl SqlExecutor for PgClient {
    fn exec<'a>(
        &'a self,
        sql: &'a str,
        params: &'a [Param],
    ) -> std::pin::Pin<Box<dyn std::future::Future<Output = Result<u64, DbError>> + Send + 'a>> {
        let sql = sql.to_string();
        let params = params.to_vec();
        Box::pin(async move { self.call(|reply| Operation::Exec { sql, params, reply }).await })
    }

    fn query<'a>(
        &'a self,
        sql: &'a str,
        params: &'a [Param],
    ) -> std::pin::Pin<Box<dyn std::future::Future<Output = Result<Vec<Row>, DbError>> + Send + 'a>> {
        let sql = sql.to_string();
        let params = params.to_vec();
        Box::pin(async move { self.call(|reply| Operation::Query { sql, params, reply }).await })
    }

    fn query_one<'a>(
        &'a self,
        sql: &'a str,
        params: &'a [Param],
    ) -> std::pin::Pin<Box<dyn std::future::Future<Output = Result<Row, DbError>> + Send + 'a>> {
        let sql = sql.to_string();
        let params = params.to_vec();
        Box::pin(async move { self.call(|reply| Operation::QueryOne { sql, params, reply }).await })
    }
}

async fn run_agent<S>(
    config: PgConfig,
    secrets: Arc<S>,
    mut rx: mpsc::Receiver<Operation>,
    cancel: tokio_util::sync::CancellationToken,
) where
    S: SecretReader<PgCredentials> + 'static,
{
    let lifecycle: Lifecycle<PgPool> = Lifecycle::new("postgres");
    let hbinterval = config.hbinterval;
    let hbmaxfail = config.hbmaxfail;

    let builder_config = config.clone();
    let builder_secrets = Arc::clone(&secrets);
    let builder = move |_previous: Option<Arc<PgPool>>| {
        let config = builder_config.clone();
        let secrets = Arc::clone(&builder_secrets);
        async move {
            let creds = secrets
                .get_secret("postgres", Duration::from_secs(3600))
                .await
                .map_err(|e| GovernorError::connection(format!("secret fetch failed: {e}")))?;
            let opts = config.connect_options().username(&creds.user).password(&creds.password);
            let pool = PgPoolOptions::new()
                .max_connections(10)
                .connect_with(opts)
                .await
                .map_err(|e| e.into_db_error())?;
            Ok(Arc::new(pool))
        }
    };

    let pinger = |pool: &PgPool| async move {
        sqlx::query("SELECT 1").execute(pool).await.map_err(|e| e.into_db_error())?;
        Ok(())
    };

    let heartbeat_secrets = Arc::clone(&secrets);
    let heartbeat_lifecycle = lifecycle.clone();
    let heartbeat_cancel = cancel.clone();
    tokio::spawn(async move {
        heartbeat_lifecycle
            .heartbeat(
                hbinterval,
                hbmaxfail,
                builder,
                pinger,
                move || heartbeat_secrets.invalidate_secret("postgres"),
                heartbeat_cancel,
            )
            .await;
    });

    loop {
        tokio::select! {
            _ = cancel.cancelled() => {
                lifecycle.stop().await;
                return;
            }
            Some(op) = rx.recv() => {
                handle_operation(&lifecycle, op).await;
            }
            else => return,
        }
    }
}

async fn handle_operation(lifecycle: &Lifecycle<PgPool>, op: Operation) {
    let Some(pool) = lifecycle.load().await else {
        let err = DbError::connection("no live postgres connection");
        tracing::warn!("rejecting operation: postgres lifecycle has no live pool");
        match op {
            Operation::Exec { reply, .. } => {
                let _ = reply.send(Err(err));
            }
            Operation::Query { reply, .. } => {
                let _ = reply.send(Err(err));
            }
            Operation::QueryOne { reply, .. } => {
                let _ = reply.send(Err(err));
            }
        }
        return;
    };

    match op {
        Operation::Exec { sql, params, reply } => {
            let result = bind_query(sqlx::query(&sql), &params)
                .execute(pool.as_ref())
                .await
                .map(|r| r.rows_affected())
                .map_err(|e| e.into_db_error());
            let _ = reply.send(result);
        }
        Operation::Query { sql, params, reply } => {
            let result = bind_query(sqlx::query(&sql), &params)
                .fetch_all(pool.as_ref())
                .await
                .map(|rows| rows.iter().map(row_to_generic).collect())
                .map_err(|e| e.into_db_error());
            let _ = reply.send(result);
        }
        Operation::QueryOne { sql, params, reply } => {
            let result = bind_query(sqlx::query(&sql), &params)
                .fetch_optional(pool.as_ref())
                .await
                .map_err(|e| e.into_db_error())
                .and_then(|maybe_row| {
                    maybe_row.map(|r| row_to_generic(&r)).ok_or_else(|| DbError::not_found("no rows"))
                });
            let _ = reply.send(result);
        }
    }
}

fn bind_query<'a>(mut query: sqlx::query::Query<'a, sqlx::Postgres, sqlx::postgres::PgArguments>, params: &'a [Param]) -> sqlx::query::Query<'a, sqlx::Postgres, sqlx::postgres::PgArguments> {
    for param in params {
        query = match param {
            Param::Null => query.bind(Option::<String>::None),
            Param::Bool(b) => query.bind(*b),
            Param::Int(i) => query.bind(*i),
            Param::Text(s) => query.bind(s.clone()),
            Param::Bytes(b) => query.bind(b.clone()),
            Param::Json(v) => query.bind(v.clone()),
        };
    }
    query
}

fn row_to_generic(row: &sqlx::postgres::PgRow) -> Row {
    let mut map = std::collections::BTreeMap::new();
    for column in row.columns() {
        let name = column.name().to_string();
        let value = row
            .try_get::<String, _>(name.as_str())
            .map(serde_json::Value::String)
            .or_else(|_| row.try_get::<i64, _>(name.as_str()).map(|v| serde_json::json!(v)))
            .or_else(|_| row.try_get::<bool, _>(name.as_str()).map(serde_json::Value::Bool))
            .unwrap_or(serde_json::Value::Null);
        map.insert(name, value);
    }
    Row(map)
}
