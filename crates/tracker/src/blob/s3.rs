//! S3-backed [`BlobStore`].

use async_trait::async_trait;
use aws_sdk_s3::error::{DisplayErrorContext, SdkError};
use aws_sdk_s3::primitives::ByteStream;
use critwalk_core::storage::public_url;

use super::{validate_path, BlobError, BlobResult, BlobStore};

/// Stores photos in one S3 bucket. Objects are served from
/// `public_base_url` (a CDN or the bucket's website endpoint).
#[derive(Clone)]
pub struct S3BlobStore {
    client: aws_sdk_s3::Client,
    bucket: String,
    public_base_url: String,
}

impl S3BlobStore {
    pub fn new(
        client: aws_sdk_s3::Client,
        bucket: impl Into<String>,
        public_base_url: impl Into<String>,
    ) -> Self {
        Self {
            client,
            bucket: bucket.into(),
            public_base_url: public_base_url.into(),
        }
    }

    /// Build a client from the standard AWS environment (credentials chain,
    /// `AWS_REGION`, optional `AWS_ENDPOINT_URL`).
    pub async fn from_env(bucket: impl Into<String>, public_base_url: impl Into<String>) -> Self {
        let config = aws_config::load_defaults(aws_config::BehaviorVersion::latest()).await;
        Self::new(aws_sdk_s3::Client::new(&config), bucket, public_base_url)
    }
}

/// Transport-level failures are worth retrying; service rejections are not.
fn sdk_error<E, R>(err: SdkError<E, R>) -> BlobError
where
    E: std::error::Error + 'static,
    R: std::fmt::Debug,
{
    let retryable = matches!(
        err,
        SdkError::TimeoutError(_) | SdkError::DispatchFailure(_) | SdkError::ResponseError(_)
    );
    BlobError::Backend {
        message: DisplayErrorContext(&err).to_string(),
        retryable,
    }
}

#[async_trait]
impl BlobStore for S3BlobStore {
    async fn put(&self, path: &str, bytes: &[u8], content_type: &str) -> BlobResult<String> {
        validate_path(path)?;
        self.client
            .put_object()
            .bucket(&self.bucket)
            .key(path)
            .content_type(content_type)
            .body(ByteStream::from(bytes.to_vec()))
            .send()
            .await
            .map_err(sdk_error)?;

        tracing::debug!(bucket = %self.bucket, path, size = bytes.len(), "Uploaded photo");
        Ok(public_url(&self.public_base_url, path))
    }

    async fn delete(&self, path: &str) -> BlobResult<()> {
        validate_path(path)?;
        self.client
            .delete_object()
            .bucket(&self.bucket)
            .key(path)
            .send()
            .await
            .map_err(sdk_error)?;
        Ok(())
    }
}
