use axum::async_trait;
use bytes::Bytes;
use nanoid::nanoid;
use s3::{creds::Credentials, error::S3Error, region::Region, Bucket};

use crate::config::StorageConfig;

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("object store rejected `{key}` with status {status}")]
    Rejected { key: String, status: u16 },
    #[error("object store error: {0}")]
    Internal(String),
}

/// Durable blob storage addressed by object key.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Write `data` under `key` and return the public URL of the object.
    async fn put(&self, key: &str, data: Bytes, content_type: &str) -> Result<String, StoreError>;

    /// Public URL of `key`. Deterministic, does not touch the network.
    fn url(&self, key: &str) -> String;
}

/// Fresh object key under `prefix`, e.g. `files/V1StGXR8_Z5jdHi6B-myT`.
pub fn object_key(prefix: &str) -> String {
    format!("{}/{}", prefix.trim_end_matches('/'), nanoid!())
}

pub struct S3Store {
    bucket: Box<Bucket>,
    public_base: String,
}

impl std::fmt::Debug for S3Store {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("S3Store")
            .field("bucket", &self.bucket.name())
            .field("public_base", &self.public_base)
            .finish_non_exhaustive()
    }
}

impl S3Store {
    pub fn new(config: &StorageConfig) -> Result<Self, StoreError> {
        let region = match &config.endpoint {
            Some(endpoint) => Region::Custom {
                region: config.region.clone(),
                endpoint: endpoint.clone(),
            },
            None => config
                .region
                .parse()
                .map_err(|e| StoreError::Internal(format!("region: {e}")))?,
        };

        // missing keys fall back to the environment / aws profile
        let credentials = Credentials::new(
            config.access_key_id.as_deref(),
            config.secret_access_key.as_deref(),
            None,
            None,
            None,
        )
        .map_err(|e| StoreError::Internal(format!("credentials: {e}")))?;

        let mut bucket = Bucket::new(&config.bucket, region, credentials)
            .map_err(|e| StoreError::Internal(format!("bucket: {e}")))?;
        if config.endpoint.is_some() {
            bucket.set_path_style();
        }

        let public_base = match &config.public_url {
            Some(url) => url.trim_end_matches('/').to_string(),
            None => format!("https://{}.{}", config.bucket, config.public_domain),
        };

        Ok(Self {
            bucket,
            public_base,
        })
    }
}

fn map_s3_error(e: S3Error) -> StoreError {
    StoreError::Internal(format!("s3: {e}"))
}

#[async_trait]
impl ObjectStore for S3Store {
    async fn put(&self, key: &str, data: Bytes, content_type: &str) -> Result<String, StoreError> {
        let response = self
            .bucket
            .put_object_with_content_type(key, &data, content_type)
            .await
            .map_err(map_s3_error)?;

        let status = response.status_code();
        if status >= 300 {
            return Err(StoreError::Rejected {
                key: key.to_string(),
                status,
            });
        }

        tracing::debug!("stored {} bytes as `{key}` in bucket {}", data.len(), self.bucket.name());
        Ok(self.url(key))
    }

    fn url(&self, key: &str) -> String {
        format!("{}/{}", self.public_base, key)
    }
}
