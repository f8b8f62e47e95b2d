//! Classifies `aws-sdk-s3` SDK errors into Governor's shared
//! [`GovernorError`] taxonomy: a 404/`NoSuchKey`/`NoSuchBucket` is
//! `NotFound`, a dispatch/timeout failure is `Connection`, everything else is
//! `Client`. Same orphan-rule-driven extension-trait shape as
//! `governor-data-postgres::error::PgErrorExt`.
//!
//! Classification goes by the error's rendered message rather than matching
//! on SDK-internal variants, since the per-operation error enums (`PutObjectError`,
//! `GetObjectError`, ...) don't share a common trait to match generically over.

use aws_sdk_s3::error::SdkError;
use governor_core::{ErrorKind, GovernorError};

pub trait S3ErrorExt {
    fn into_store_error(self) -> GovernorError;
}

impl<E, R> S3ErrorExt for SdkError<E, R>
where
    E: std::error::Error + Send + Sync + 'static,
    R: std::fmt::Debug + Send + Sync + 'static,
{
    fn into_store_error(self) -> GovernorError {
        let message = self.to_string();
        if is_not_found_message(&message) {
            GovernorError::with_source(ErrorKind::NotFound, message, self)
        } else if matches!(self, SdkError::TimeoutError(_) | SdkError::DispatchFailure(_)) {
            GovernorError::with_source(ErrorKind::Connection, message, self)
        } else {
            GovernorError::with_source(ErrorKind::Client, message, self)
        }
    }
}

fn is_not_found_message(message: &str) -> bool {
    message.contains("NoSuchKey") || message.contains("NoSuchBucket") || message.contains("NotFound") || message.contains("404")
}

/// Treats a bare 404 as healthy for [`crate::client::ObjectStoreClient::ping`]:
/// the request round-tripped, the bucket simply doesn't exist.
pub fn is_not_found<E, R>(err: &SdkError<E, R>) -> bool
where
    E: std::error::Error,
    R: std::fmt::Debug,
{
    is_not_found_message(&err.to_string())
}
