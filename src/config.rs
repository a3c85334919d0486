use anyhow::{Context, Result};
use std::env;

use crate::store::s3::MAX_URL_EXPIRY_HOURS;

const DEFAULT_TRANSFORMATION: &str = "w_800,h_800,c_fill,q_auto";

/// Which remote store receives the images, with its credentials
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreConfig {
    Cloudinary(CloudinarySettings),
    S3(S3Settings),
}

#[derive(Clone, PartialEq, Eq)]
pub struct CloudinarySettings {
    pub cloud_name: String,
    pub api_key: String,
    pub api_secret: String,
    /// Overrides the upload endpoint derived from `cloud_name`
    pub upload_url: Option<String>,
    pub transformation: String,
}

impl std::fmt::Debug for CloudinarySettings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CloudinarySettings")
            .field("cloud_name", &self.cloud_name)
            .field("api_key", &self.api_key)
            .field("api_secret", &"***")
            .field("upload_url", &self.upload_url)
            .field("transformation", &self.transformation)
            .finish()
    }
}

impl CloudinarySettings {
    pub fn upload_url(&self) -> String {
        self.upload_url.clone().unwrap_or_else(|| {
            format!(
                "https://api.cloudinary.com/v1_1/{}/image/upload",
                self.cloud_name
            )
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct S3Settings {
    pub region: String,
    pub profile: Option<String>,
    pub bucket: String,
    /// Record presigned URLs valid for this many hours instead of permanent object URLs
    pub url_expiry_hours: Option<u64>,
}

impl StoreConfig {
    /// Load configuration from environment variables and .env file
    ///
    /// # Errors
    ///
    /// Returns an error if required environment variables are missing or invalid
    pub fn from_env() -> Result<Self> {
        dotenv::dotenv().ok(); // Load .env file if it exists
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build the configuration from an arbitrary variable source
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let backend = lookup("STORE_BACKEND").unwrap_or_else(|| "cloudinary".to_string());

        match backend.trim().to_lowercase().as_str() {
            "cloudinary" => Ok(Self::Cloudinary(Self::cloudinary_from(&lookup)?)),
            "s3" => Ok(Self::S3(Self::s3_from(&lookup)?)),
            other => anyhow::bail!(
                "STORE_BACKEND '{}' is not supported (expected 'cloudinary' or 's3')",
                other
            ),
        }
    }

    fn cloudinary_from<F>(lookup: &F) -> Result<CloudinarySettings>
    where
        F: Fn(&str) -> Option<String>,
    {
        let required = |key: &str| {
            lookup(key)
                .filter(|v| !v.trim().is_empty())
                .with_context(|| {
                    format!("{} not found in environment. Please set it in .env file", key)
                })
        };

        let cloud_name = required("CLOUDINARY_CLOUD_NAME")?;
        Self::validate_cloud_name(&cloud_name)?;

        Ok(CloudinarySettings {
            cloud_name,
            api_key: required("CLOUDINARY_API_KEY")?,
            api_secret: required("CLOUDINARY_API_SECRET")?,
            upload_url: lookup("CLOUDINARY_UPLOAD_URL").filter(|v| !v.is_empty()),
            transformation: lookup("CLOUDINARY_TRANSFORMATION")
                .unwrap_or_else(|| DEFAULT_TRANSFORMATION.to_string()),
        })
    }

    fn s3_from<F>(lookup: &F) -> Result<S3Settings>
    where
        F: Fn(&str) -> Option<String>,
    {
        let region = lookup("AWS_REGION")
            .context("AWS_REGION not found in environment. Please set it in .env file")?;
        Self::validate_region(&region)?;

        let bucket = lookup("S3_BUCKET")
            .context("S3_BUCKET not found in environment. Please set it in .env file")?;
        Self::validate_bucket_name(&bucket)?;

        let url_expiry_hours = lookup("S3_URL_EXPIRY_HOURS")
            .filter(|v| !v.trim().is_empty())
            .map(|v| Self::parse_expiry_hours(&v))
            .transpose()?;

        Ok(S3Settings {
            region,
            profile: lookup("AWS_PROFILE"),
            bucket,
            url_expiry_hours,
        })
    }

    fn parse_expiry_hours(value: &str) -> Result<u64> {
        let hours: u64 = value
            .trim()
            .parse()
            .with_context(|| format!("S3_URL_EXPIRY_HOURS '{}' is not a number", value))?;

        if hours == 0 || hours > MAX_URL_EXPIRY_HOURS {
            anyhow::bail!(
                "S3_URL_EXPIRY_HOURS must be between 1 and {} (got {})",
                MAX_URL_EXPIRY_HOURS,
                hours
            );
        }
        Ok(hours)
    }

    fn validate_cloud_name(name: &str) -> Result<()> {
        if let Some(c) = name
            .chars()
            .find(|c| !c.is_ascii_alphanumeric() && *c != '-' && *c != '_')
        {
            anyhow::bail!(
                "CLOUDINARY_CLOUD_NAME '{}' contains invalid character '{}'",
                name,
                c
            );
        }
        Ok(())
    }

    /// Validate AWS region format
    fn validate_region(region: &str) -> Result<()> {
        if region.is_empty() {
            anyhow::bail!("AWS_REGION cannot be empty");
        }

        // Basic validation - ensure it looks like a region (contains a dash)
        if !region.contains('-') {
            anyhow::bail!(
                "AWS_REGION '{}' doesn't look like a valid region (e.g., us-west-2, eu-west-1)",
                region
            );
        }

        Ok(())
    }

    /// Validate S3 bucket name according to AWS rules
    fn validate_bucket_name(bucket: &str) -> Result<()> {
        if bucket.len() < 3 || bucket.len() > 63 {
            anyhow::bail!(
                "S3_BUCKET '{}' must be between 3 and 63 characters (got {})",
                bucket,
                bucket.len()
            );
        }

        let edge_ok = |c: Option<char>| c.is_some_and(|c| c.is_ascii_lowercase() || c.is_ascii_digit());
        if !edge_ok(bucket.chars().next()) || !edge_ok(bucket.chars().last()) {
            anyhow::bail!(
                "S3_BUCKET '{}' must start and end with a lowercase letter or number",
                bucket
            );
        }

        if let Some(c) = bucket
            .chars()
            .find(|c| !c.is_ascii_lowercase() && !c.is_ascii_digit() && *c != '-' && *c != '.')
        {
            anyhow::bail!(
                "S3_BUCKET '{}' contains invalid character '{}'. Only lowercase letters, numbers, hyphens, and periods are allowed",
                bucket,
                c
            );
        }

        if bucket.contains("..") {
            anyhow::bail!("S3_BUCKET '{}' cannot contain consecutive periods", bucket);
        }

        if bucket.split('.').all(|part| part.parse::<u8>().is_ok()) {
            anyhow::bail!(
                "S3_BUCKET '{}' cannot be formatted as an IP address",
                bucket
            );
        }

        Ok(())
    }
}
