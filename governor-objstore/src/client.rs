//! S3-compatible object store client. Lifecycle-managed exactly like
//! [`governor_data_postgres::PgClient`](../../governor_data_postgres/struct.PgClient.html):
//! the live `aws_sdk_s3::Client` sits behind a [`Lifecycle`] that a heartbeat
//! task rebuilds on credential rotation or repeated ping failure.
//!
//! Unlike the Postgres agent, the AWS SDK client is already safe to share and
//! call concurrently, so operations call `lifecycle.load()` directly instead
//! of routing through an operation channel.

use std::sync::Arc;
use std::time::Duration;

use aws_sdk_s3::primitives::ByteStream;
use bytes::Bytes;
use governor_core::secret::SecretReader;
use governor_core::{ErrorKind, GovernorError, Lifecycle};
use tokio_util::sync::CancellationToken;

use crate::config::S3Config;
use crate::error::{is_not_found, S3ErrorExt};
use crate::value::{ObjectMeta, PutOptions};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct S3Credentials {
    pub access_key: String,
    pub secret_key: String,
}

/// S3-compatible object store client.
#[derive(Clone)]
pub struct ObjectStoreClient {
    lifecycle: Lifecycle<aws_sdk_s3::Client>,
}

impl ObjectStoreClient {
    /// Builds the client and starts its heartbeat task. `secrets` supplies
    /// rotating access/secret keys under the name `"objstore"`.
    pub fn spawn<S>(config: S3Config, secrets: Arc<S>, cancel: CancellationToken) -> Self
    where
        S: SecretReader<S3Credentials> + 'static,
    {
        let lifecycle: Lifecycle<aws_sdk_s3::Client> = Lifecycle::new("objstore");
        let hbinterval = config.hbinterval;
        let hbmaxfail = config.hbmaxfail;

        let builder_config = config.clone();
        let builder_secrets = Arc::clone(&secrets);
        let builder = move |_previous: Option<Arc<aws_sdk_s3::Client>>| {
            let config = builder_config.clone();
            let secrets = Arc::clone(&builder_secrets);
            async move {
                let creds = secrets
                    .get_secret("objstore", Duration::from_secs(3600))
                    .await
                    .map_err(|e| GovernorError::connection(format!("secret fetch failed: {e}")))?;
                let credentials = aws_sdk_s3::config::Credentials::new(
                    creds.access_key.clone(),
                    creds.secret_key.clone(),
                    None,
                    None,
                    "governor-objstore",
                );
                let mut conf_builder = aws_sdk_s3::config::Builder::new()
                    .region(aws_sdk_s3::config::Region::new(config.region.clone()))
                    .credentials_provider(credentials)
                    .force_path_style(config.force_path_style)
                    .behavior_version(aws_sdk_s3::config::BehaviorVersion::latest());
                if let Some(endpoint) = &config.endpoint {
                    conf_builder = conf_builder.endpoint_url(endpoint.clone());
                }
                let client = aws_sdk_s3::Client::from_conf(conf_builder.build());
                Ok(Arc::new(client))
            }
        };

        let pinger_config = config.clone();
        let pinger = move |client: &aws_sdk_s3::Client| {
            let client = client.clone();
            let canary = pinger_config.canary_bucket.clone();
            async move {
                match client.get_bucket_location().bucket(&canary).send().await {
                    Ok(_) => Ok(()),
                    Err(err) if is_not_found(&err) => Ok(()),
                    Err(err) => Err(err.into_store_error()),
                }
            }
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
                    move || heartbeat_secrets.invalidate_secret("objstore"),
                    heartbeat_cancel,
                )
                .await;
        });

        ObjectStoreClient { lifecycle }
    }

    async fn client(&self) -> Result<Arc<aws_sdk_s3::Client>, GovernorError> {
        self.lifecycle.load().await.ok_or_else(|| {
            tracing::warn!("rejecting operation: object store lifecycle has no live client");
            GovernorError::connection("no live object store connection")
        })
    }

    /// Idempotent bucket creation.
    pub async fn init(&self, bucket: &str) -> Result<(), GovernorError> {
        let client = self.client().await?;
        match client.create_bucket().bucket(bucket).send().await {
            Ok(_) => Ok(()),
            Err(err) => {
                let message = err.to_string();
                if message.contains("BucketAlreadyOwnedByYou") || message.contains("BucketAlreadyExists") {
                    Ok(())
                } else {
                    Err(err.into_store_error())
                }
            }
        }
    }

    pub async fn stat(&self, bucket: &str, key: &str) -> Result<ObjectMeta, GovernorError> {
        let client = self.client().await?;
        let output = client.head_object().bucket(bucket).key(key).send().await.map_err(|e| e.into_store_error())?;
        let mut user_meta = std::collections::BTreeMap::new();
        if let Some(metadata) = output.metadata() {
            for (k, v) in metadata {
                user_meta.insert(k.clone(), v.clone());
            }
        }
        Ok(ObjectMeta {
            content_type: output.content_type().map(str::to_string),
            size: output.content_length().unwrap_or_default(),
            user_meta,
        })
    }

    pub async fn get(&self, bucket: &str, key: &str) -> Result<Bytes, GovernorError> {
        let client = self.client().await?;
        let output = client.get_object().bucket(bucket).key(key).send().await.map_err(|e| e.into_store_error())?;
        let bytes = output
            .body
            .collect()
            .await
            .map_err(|e| GovernorError::with_source(ErrorKind::Client, "failed to read object body", e))?
            .into_bytes();
        Ok(bytes)
    }

    pub async fn put(&self, bucket: &str, key: &str, body: Bytes, opts: PutOptions) -> Result<(), GovernorError> {
        let client = self.client().await?;
        let mut request = client.put_object().bucket(bucket).key(key).body(ByteStream::from(body));
        if let Some(content_type) = opts.content_type {
            request = request.content_type(content_type);
        }
        for (k, v) in opts.user_meta {
            request = request.metadata(k, v);
        }
        request.send().await.map_err(|e| e.into_store_error())?;
        Ok(())
    }

    pub async fn del(&self, bucket: &str, key: &str) -> Result<(), GovernorError> {
        let client = self.client().await?;
        client.delete_object().bucket(bucket).key(key).send().await.map_err(|e| e.into_store_error())?;
        Ok(())
    }

    pub async fn del_bucket(&self, bucket: &str) -> Result<(), GovernorError> {
        let client = self.client().await?;
        client.delete_bucket().bucket(bucket).send().await.map_err(|e| e.into_store_error())?;
        Ok(())
    }

    /// GetBucketLocation against the configured canary bucket; a 404
    /// indicates the connection itself is healthy even though the bucket is
    /// absent.
    pub async fn ping(&self, canary_bucket: &str) -> Result<(), GovernorError> {
        let client = self.client().await?;
        match client.get_bucket_location().bucket(canary_bucket).send().await {
            Ok(_) => Ok(()),
            Err(err) if is_not_found(&err) => Ok(()),
            Err(err) => Err(err.into_store_error()),
        }
    }

    /// Returns a view whose operations prefix every key with `prefix + '/'`.
    pub fn subdir(&self, bucket: impl Into<String>, prefix: impl Into<String>) -> Subdir {
        Subdir {
            client: self.clone(),
            bucket: bucket.into(),
            prefix: prefix.into(),
        }
    }
}

/// A namespacing view over a bucket: every key is automatically prefixed.
#[derive(Clone)]
pub struct Subdir {
    client: ObjectStoreClient,
    bucket: String,
    prefix: String,
}

impl Subdir {
    fn full_key(&self, key: &str) -> String {
        format!("{}/{}", self.prefix, key)
    }

    pub async fn stat(&self, key: &str) -> Result<ObjectMeta, GovernorError> {
        self.client.stat(&self.bucket, &self.full_key(key)).await
    }

    pub async fn get(&self, key: &str) -> Result<Bytes, GovernorError> {
        self.client.get(&self.bucket, &self.full_key(key)).await
    }

    pub async fn put(&self, key: &str, body: Bytes, opts: PutOptions) -> Result<(), GovernorError> {
        self.client.put(&self.bucket, &self.full_key(key), body, opts).await
    }

    pub async fn del(&self, key: &str) -> Result<(), GovernorError> {
        self.client.del(&self.bucket, &self.full_key(key)).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn subdir_prefixes_keys_with_a_slash() {
        let subdir = Subdir {
            client: ObjectStoreClient {
                lifecycle: Lifecycle::new("objstore"),
            },
            bucket: "b".to_string(),
            prefix: "uploads".to_string(),
        };
        assert_eq!(subdir.full_key("file.txt"), "uploads/file.txt");
    }
}
