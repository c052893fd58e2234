use async_trait::async_trait;
use aws_config::{BehaviorVersion, Region};
use aws_sdk_s3::config::Credentials;
use aws_sdk_s3::{primitives::ByteStream, types::ObjectCannedAcl, Client as S3Client};

use crate::config::Config;
use crate::models::{BackfillError, Result};
use crate::storage::ObjectStore;

/// S3-compatible object storage (AWS or MinIO).
pub struct S3ObjectStore {
    client: S3Client,
    bucket: String,
    region: String,
    endpoint: Option<String>,
    public_base_url: Option<String>,
}

impl S3ObjectStore {
    pub async fn new(config: &Config) -> Result<Self> {
        let mut loader = aws_config::defaults(BehaviorVersion::latest())
            .region(Region::new(config.aws_region.clone()));
        // Without explicit keys the SDK's default chain (env, profile, IMDS) applies
        if let Some(credentials) = static_credentials(config) {
            loader = loader.credentials_provider(credentials);
        }
        let shared = loader.load().await;

        let mut builder = aws_sdk_s3::config::Builder::from(&shared);
        if let Some(endpoint) = &config.aws_endpoint {
            builder = builder.endpoint_url(endpoint).force_path_style(true);
        }
        let client = S3Client::from_conf(builder.build());
        tracing::info!(
            bucket = %config.image_bucket,
            region = %config.aws_region,
            endpoint = ?config.aws_endpoint,
            "Configured S3 image storage"
        );

        Ok(Self {
            client,
            bucket: config.image_bucket.clone(),
            region: config.aws_region.clone(),
            endpoint: config.aws_endpoint.clone(),
            public_base_url: config.aws_public_base_url.clone(),
        })
    }
}

/// Key pair from the configuration, tagged with this crate as the provider name.
pub fn static_credentials(config: &Config) -> Option<Credentials> {
    match (&config.aws_access_key_id, &config.aws_secret_access_key) {
        (Some(access_key), Some(secret_key)) => Some(Credentials::new(
            access_key,
            secret_key,
            None,
            None,
            env!("CARGO_PKG_NAME"),
        )),
        _ => None,
    }
}

#[async_trait]
impl ObjectStore for S3ObjectStore {
    async fn upload(&self, path: &str, data: Vec<u8>, content_type: &str) -> Result<()> {
        let size = data.len();
        // PUT replaces an existing object at the same key
        self.client
            .put_object()
            .bucket(&self.bucket)
            .key(path)
            .body(ByteStream::from(data))
            .content_type(content_type)
            .acl(ObjectCannedAcl::PublicRead)
            .send()
            .await
            .map_err(|e| {
                tracing::error!(error = %e, bucket = %self.bucket, key = %path, "Failed to upload image to S3");
                BackfillError::Upload(format!("S3 upload failed: {}", e))
            })?;

        tracing::debug!(bucket = %self.bucket, key = %path, size_bytes = size, "Uploaded image to S3");
        Ok(())
    }

    fn public_url(&self, path: &str) -> Result<String> {
        Ok(s3_public_url(
            &self.bucket,
            &self.region,
            self.endpoint.as_deref(),
            self.public_base_url.as_deref(),
            path,
        ))
    }
}

/// Public URL for an S3 key: configured base first, then the custom endpoint, then AWS patterns.
pub fn s3_public_url(
    bucket: &str,
    region: &str,
    endpoint: Option<&str>,
    public_base_url: Option<&str>,
    key: &str,
) -> String {
    if let Some(base) = public_base_url {
        let base = base.trim_end_matches('/');
        let sep = if base.ends_with('=') || base.contains('?') { "" } else { "/" };
        return format!("{}{}{}", base, sep, key);
    }
    if let Some(endpoint) = endpoint {
        return format!("{}/{}/{}", endpoint.trim_end_matches('/'), bucket, key);
    }
    if region == "us-east-1" {
        format!("https://{}.s3.amazonaws.com/{}", bucket, key)
    } else {
        format!("https://{}.s3.{}.amazonaws.com/{}", bucket, region, key)
    }
}
