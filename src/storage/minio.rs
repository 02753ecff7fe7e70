use async_trait::async_trait;
use aws_config::{BehaviorVersion, Region};
use aws_sdk_s3::{
    config::Credentials,
    primitives::ByteStream,
    types::{BucketCannedAcl, ObjectCannedAcl},
    Client, Config,
};
use bytes::Bytes;

use super::ObjectStore;
use crate::{
    config::MinioConfig,
    error::{AppError, AppResult},
};

#[derive(Clone)]
pub struct MinioClient {
    client: Client,
    config: MinioConfig,
}

impl MinioClient {
    pub fn new(config: &MinioConfig) -> Self {
        let creds = Credentials::new(
            &config.access_key,
            &config.secret_key,
            None,
            None,
            "minio",
        );

        let s3_config = Config::builder()
            .behavior_version(BehaviorVersion::latest())
            .region(Region::new(config.region.clone()))
            .endpoint_url(&config.endpoint)
            .credentials_provider(creds)
            .force_path_style(true)
            .build();

        let client = Client::from_conf(s3_config);

        Self {
            client,
            config: config.clone(),
        }
    }

    pub async fn ensure_bucket(&self) -> AppResult<()> {
        let bucket = &self.config.bucket;
        let result = self.client.head_bucket().bucket(bucket).send().await;

        if result.is_err() {
            self.client
                .create_bucket()
                .bucket(bucket)
                .acl(BucketCannedAcl::PublicRead)
                .send()
                .await
                .map_err(|e| AppError::Storage(format!("Failed to create bucket: {}", e)))?;
            tracing::info!("Created bucket: {}", bucket);
        }

        Ok(())
    }

    fn base_url(&self) -> String {
        let origin = self
            .config
            .public_url
            .as_deref()
            .unwrap_or(&self.config.endpoint)
            .trim_end_matches('/');
        format!("{}/{}/", origin, self.config.bucket)
    }
}

#[async_trait]
impl ObjectStore for MinioClient {
    async fn put(&self, key: &str, data: Bytes, content_type: &str) -> AppResult<String> {
        self.client
            .put_object()
            .bucket(&self.config.bucket)
            .key(key)
            .body(ByteStream::from(data))
            .content_type(content_type)
            .acl(ObjectCannedAcl::PublicRead)
            .send()
            .await
            .map_err(|e| AppError::Storage(format!("Failed to upload {}: {}", key, e)))?;

        Ok(format!("{}{}", self.base_url(), key))
    }

    async fn get(&self, key: &str) -> AppResult<Option<(Bytes, String)>> {
        let result = match self
            .client
            .get_object()
            .bucket(&self.config.bucket)
            .key(key)
            .send()
            .await
        {
            Ok(result) => result,
            Err(e) => {
                if e.as_service_error().map(|se| se.is_no_such_key()) == Some(true) {
                    return Ok(None);
                }
                return Err(AppError::Storage(format!("Failed to download {}: {}", key, e)));
            }
        };

        let content_type = result
            .content_type()
            .unwrap_or("application/octet-stream")
            .to_string();
        let data = result
            .body
            .collect()
            .await
            .map_err(|e| AppError::Storage(format!("Failed to read {}: {}", key, e)))?;

        Ok(Some((data.into_bytes(), content_type)))
    }

    async fn delete(&self, key: &str) -> AppResult<()> {
        self.client
            .delete_object()
            .bucket(&self.config.bucket)
            .key(key)
            .send()
            .await
            .map_err(|e| AppError::Storage(format!("Failed to delete {}: {}", key, e)))?;

        Ok(())
    }

    fn key_for_url(&self, url: &str) -> Option<String> {
        url.strip_prefix(&self.base_url()).map(str::to_string)
    }
}
