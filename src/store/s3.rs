use anyhow::Context;
use async_trait::async_trait;
use aws_config::BehaviorVersion;
use aws_sdk_s3::error::DisplayErrorContext;
use aws_sdk_s3::presigning::PresigningConfig;
use aws_sdk_s3::{Client, primitives::ByteStream};
use reqwest::Url;
use std::path::Path;
use std::time::Duration;
use tracing::debug;

use super::{Asset, ObjectStore, StoreError, detect_content_type};
use crate::config::S3Settings;

/// AWS presigned URL max is 7 days
pub const MAX_URL_EXPIRY_HOURS: u64 = 168;

/// Stores images as S3 objects.
///
/// Returns the permanent object URL unless presigned URLs were asked for
/// with an expiry in the settings.
pub struct S3Store {
    client: Client,
    bucket: String,
    endpoint: Url,
    presign_hours: Option<u64>,
}

impl S3Store {
    pub async fn new(settings: &S3Settings) -> anyhow::Result<Self> {
        let endpoint = bucket_endpoint(&settings.bucket, &settings.region)?;

        let mut aws_config = aws_config::defaults(BehaviorVersion::latest())
            .region(aws_config::Region::new(settings.region.clone()));

        if let Some(profile) = &settings.profile {
            aws_config = aws_config.profile_name(profile);
        }

        let sdk_config = aws_config.load().await;

        Ok(Self {
            client: Client::new(&sdk_config),
            bucket: settings.bucket.clone(),
            endpoint,
            presign_hours: settings.url_expiry_hours,
        })
    }

    async fn presign(&self, key: &str, hours: u64) -> Result<String, StoreError> {
        let expires_in = Duration::from_secs(hours * 60 * 60);
        let presigning_config = PresigningConfig::expires_in(expires_in)
            .map_err(|e| StoreError::InvalidResponse(e.to_string()))?;

        let presigned_request = self
            .client
            .get_object()
            .bucket(&self.bucket)
            .key(key)
            .presigned(presigning_config)
            .await
            .map_err(|e| from_aws_error(DisplayErrorContext(e)))?;

        Ok(presigned_request.uri().to_string())
    }
}

#[async_trait]
impl ObjectStore for S3Store {
    async fn store(&self, asset: Asset) -> Result<String, StoreError> {
        let key = object_key(&asset.destination, &asset.file_name);
        let content_type = detect_content_type(Path::new(&asset.file_name));
        let size = asset.bytes.len() as i64;
        debug!("PUT s3://{}/{} ({} bytes)", self.bucket, key, size);

        self.client
            .put_object()
            .bucket(&self.bucket)
            .key(&key)
            .content_type(content_type)
            .content_length(size)
            .body(ByteStream::from(asset.bytes))
            .send()
            .await
            .map_err(|e| from_aws_error(DisplayErrorContext(e)))?;

        match self.presign_hours {
            Some(hours) => self.presign(&key, hours).await,
            None => Ok(object_url(&self.endpoint, &key)),
        }
    }

    fn describe(&self) -> String {
        format!("s3://{}", self.bucket)
    }
}

/// Object key for an asset: its destination tag followed by the file name
pub fn object_key(destination: &str, file_name: &str) -> String {
    let destination = destination.trim_matches('/');
    if destination.is_empty() {
        file_name.to_string()
    } else {
        format!("{}/{}", destination, file_name)
    }
}

/// Virtual-hosted style address of a bucket
fn bucket_endpoint(bucket: &str, region: &str) -> anyhow::Result<Url> {
    Url::parse(&format!("https://{}.s3.{}.amazonaws.com/", bucket, region))
        .with_context(|| format!("Cannot build an endpoint URL for bucket '{}'", bucket))
}

/// Permanent URL of `key` under a bucket endpoint, each key segment percent-encoded
pub fn object_url(endpoint: &Url, key: &str) -> String {
    let mut url = endpoint.clone();
    if let Ok(mut segments) = url.path_segments_mut() {
        segments.pop_if_empty().extend(key.split('/'));
    }
    url.into()
}

/// Classify an AWS SDK error: permission problems are rejections, the rest transport
fn from_aws_error<E: std::fmt::Display>(error: E) -> StoreError {
    let message = error.to_string();
    let lower = message.to_lowercase();
    if lower.contains("access denied") || lower.contains("forbidden") {
        StoreError::Rejected {
            status: 403,
            body: message,
        }
    } else {
        StoreError::Transport(message)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_object_key() {
        assert_eq!(
            object_key("products/hoodies/Hoodie_1st", "1st front.png"),
            "products/hoodies/Hoodie_1st/1st front.png"
        );
        assert_eq!(object_key("/products/", "a.png"), "products/a.png");
        assert_eq!(object_key("", "a.png"), "a.png");
    }

    #[test]
    fn test_object_url() {
        let endpoint = bucket_endpoint("garment-photos", "us-west-2").unwrap();

        assert_eq!(
            object_url(&endpoint, "products/sweatshirts/Sweatshirt 5/a.png"),
            "https://garment-photos.s3.us-west-2.amazonaws.com/products/sweatshirts/Sweatshirt%205/a.png"
        );
        assert_eq!(
            object_url(&endpoint, "products/hoodies/Hoodie_1st/1st#front?.png"),
            "https://garment-photos.s3.us-west-2.amazonaws.com/products/hoodies/Hoodie_1st/1st%23front%3F.png"
        );
    }

    #[test]
    fn test_from_aws_error() {
        assert!(matches!(
            from_aws_error("AccessDenied: Access Denied"),
            StoreError::Rejected { status: 403, .. }
        ));
        assert!(matches!(
            from_aws_error("dispatch failure: connection refused"),
            StoreError::Transport(_)
        ));
    }
}
