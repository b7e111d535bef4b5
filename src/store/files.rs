//! Attachment object storage (S3-compatible).

use async_trait::async_trait;
use aws_sdk_s3::primitives::ByteStream;

use super::errors::StoreError;
use crate::config::StorageConfig;

#[async_trait]
pub trait FileStore: Send + Sync {
    /// Store an object and return its public URL.
    async fn put(&self, key: &str, bytes: Vec<u8>, content_type: Option<&str>) -> Result<String, StoreError>;

    /// Delete an object. Deleting a missing object is not an error.
    async fn delete(&self, key: &str) -> Result<(), StoreError>;
}

pub struct S3FileStore {
    client: aws_sdk_s3::Client,
    bucket: String,
    public_base_url: String,
}

impl S3FileStore {
    /// Build a client from the storage config. Credentials come from the
    /// standard AWS environment variables.
    pub async fn connect(config: &StorageConfig) -> anyhow::Result<Self> {
        let mut loader = aws_config::from_env().region(aws_config::Region::new(config.region.clone()));
        if let Some(endpoint) = &config.endpoint {
            loader = loader.endpoint_url(endpoint);
        }
        let aws_config = loader.load().await;

        let s3_config = aws_sdk_s3::config::Builder::from(&aws_config)
            .force_path_style(true)
            .build();
        let client = aws_sdk_s3::Client::from_conf(s3_config);

        let public_base_url = match &config.public_base_url {
            Some(url) => url.trim_end_matches('/').to_string(),
            None => {
                let endpoint = config.endpoint.as_deref().unwrap_or("https://s3.amazonaws.com");
                format!("{}/{}", endpoint.trim_end_matches('/'), config.bucket)
            }
        };

        tracing::info!(bucket = %config.bucket, region = %config.region, "Attachment store initialised");

        Ok(Self {
            client,
            bucket: config.bucket.clone(),
            public_base_url,
        })
    }
}

#[async_trait]
impl FileStore for S3FileStore {
    #[tracing::instrument(skip(self, bytes, content_type), fields(size = bytes.len()))]
    async fn put(&self, key: &str, bytes: Vec<u8>, content_type: Option<&str>) -> Result<String, StoreError> {
        let mut request = self
            .client
            .put_object()
            .bucket(&self.bucket)
            .key(key)
            .body(ByteStream::from(bytes));

        if let Some(content_type) = content_type {
            request = request.content_type(content_type);
        }

        request
            .send()
            .await
            .map_err(|e| StoreError::Other(anyhow::Error::from(e)))?;

        Ok(format!("{}/{}", self.public_base_url, key))
    }

    #[tracing::instrument(skip(self))]
    async fn delete(&self, key: &str) -> Result<(), StoreError> {
        self.client
            .delete_object()
            .bucket(&self.bucket)
            .key(key)
            .send()
            .await
            .map_err(|e| StoreError::Other(anyhow::Error::from(e)))?;

        Ok(())
    }
}

#[cfg(test)]
pub use mock::MockFileStore;

#[cfg(test)]
mod mock {
    use super::*;
    use std::collections::HashMap;
    use std::sync::Mutex;

    /// In-memory file store for tests.
    #[derive(Default)]
    pub struct MockFileStore {
        objects: Mutex<HashMap<String, Vec<u8>>>,
    }

    impl MockFileStore {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn contains(&self, key: &str) -> bool {
            self.objects.lock().unwrap().contains_key(key)
        }

        pub fn object_count(&self) -> usize {
            self.objects.lock().unwrap().len()
        }
    }

    #[async_trait]
    impl FileStore for MockFileStore {
        async fn put(&self, key: &str, bytes: Vec<u8>, _content_type: Option<&str>) -> Result<String, StoreError> {
            self.objects.lock().unwrap().insert(key.to_string(), bytes);
            Ok(format!("https://files.test/{key}"))
        }

        async fn delete(&self, key: &str) -> Result<(), StoreError> {
            self.objects.lock().unwrap().remove(key);
            Ok(())
        }
    }
}
