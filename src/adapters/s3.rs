//! S3-compatible object store.
//!
//! Credentials come from the transfer configuration rather than the AWS
//! credential chain, so the same binary can target AWS S3, MinIO or any other
//! S3-compatible service through `SourceStoreConfig::endpoint`.

use crate::domain::model::SourceStoreConfig;
use crate::domain::ports::{ListPage, ObjectStore};
use crate::utils::error::{Result, TransferError};
use crate::utils::validation::Validate;
use async_trait::async_trait;
use aws_sdk_s3::config::{BehaviorVersion, Credentials, Region};
use aws_sdk_s3::error::DisplayErrorContext;
use aws_sdk_s3::Client as S3Client;

#[derive(Debug, Clone)]
pub struct S3Store {
    client: S3Client,
    bucket: String,
}

impl S3Store {
    pub fn new(config: &SourceStoreConfig) -> Result<Self> {
        config
            .validate()
            .map_err(|e| TransferError::configuration(e.to_string()))?;

        Ok(Self {
            client: build_client(config),
            bucket: config.bucket.clone(),
        })
    }

    pub fn bucket(&self) -> &str {
        &self.bucket
    }
}

fn build_client(config: &SourceStoreConfig) -> S3Client {
    let credentials = Credentials::new(
        config.access_key.clone(),
        config.secret_key.clone(),
        None,
        None,
        "media-transfer-config",
    );

    let mut builder = aws_sdk_s3::Config::builder()
        .behavior_version(BehaviorVersion::latest())
        .credentials_provider(credentials)
        .region(Region::new(config.region.clone()));

    if let Some(endpoint) = &config.endpoint {
        // S3 相容服務（MinIO 等）通常需要 path-style
        builder = builder.endpoint_url(endpoint).force_path_style(true);
    }

    S3Client::from_conf(builder.build())
}

#[async_trait]
impl ObjectStore for S3Store {
    fn configure(&mut self, config: &SourceStoreConfig) -> Result<()> {
        config
            .validate()
            .map_err(|e| TransferError::configuration(e.to_string()))?;

        self.client = build_client(config);
        self.bucket = config.bucket.clone();
        Ok(())
    }

    async fn list_page(
        &self,
        prefix: &str,
        delimiter: Option<&str>,
        continuation_token: Option<String>,
    ) -> Result<ListPage> {
        let resp = self
            .client
            .list_objects_v2()
            .bucket(&self.bucket)
            .prefix(prefix)
            .set_delimiter(delimiter.map(str::to_string))
            .set_continuation_token(continuation_token)
            .send()
            .await
            .map_err(|e| {
                TransferError::store(
                    format!(
                        "Failed to list objects under '{}': {}",
                        prefix,
                        DisplayErrorContext(&e)
                    ),
                    e,
                )
            })?;

        let keys = resp
            .contents()
            .iter()
            .filter_map(|obj| obj.key().map(str::to_string))
            .collect();
        let common_prefixes = resp
            .common_prefixes()
            .iter()
            .filter_map(|cp| cp.prefix().map(str::to_string))
            .collect();
        let next_continuation_token = if resp.is_truncated().unwrap_or(false) {
            resp.next_continuation_token().map(str::to_string)
        } else {
            None
        };

        Ok(ListPage {
            keys,
            common_prefixes,
            next_continuation_token,
        })
    }

    async fn get_object(&self, key: &str) -> Result<Vec<u8>> {
        let resp = self
            .client
            .get_object()
            .bucket(&self.bucket)
            .key(key)
            .send()
            .await
            .map_err(|e| {
                TransferError::store(
                    format!("Failed to download '{}': {}", key, DisplayErrorContext(&e)),
                    e,
                )
            })?;

        let data = resp
            .body
            .collect()
            .await
            .map_err(|e| TransferError::store(format!("Failed to read body of '{}'", key), e))?;

        Ok(data.into_bytes().to_vec())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_rejects_invalid_config() {
        let config = SourceStoreConfig::new("", "eu-west-1", "key", "secret");
        let err = S3Store::new(&config).unwrap_err();
        assert!(matches!(err, TransferError::Configuration { .. }));
    }

    #[test]
    fn test_configure_switches_bucket() {
        let config = SourceStoreConfig::new("first-bucket", "eu-west-1", "key", "secret");
        let mut store = S3Store::new(&config).unwrap();
        assert_eq!(store.bucket(), "first-bucket");

        let mut next = SourceStoreConfig::new("second-bucket", "us-east-1", "key", "secret");
        next.endpoint = Some("http://localhost:9000".to_string());
        store.configure(&next).unwrap();
        assert_eq!(store.bucket(), "second-bucket");
    }
}
