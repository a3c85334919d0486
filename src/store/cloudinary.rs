use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::{StatusCode, multipart};
use serde::Deserialize;
use std::path::Path;
use tracing::debug;

use super::{Asset, ObjectStore, StoreError, detect_content_type};
use crate::config::CloudinarySettings;

/// Unsigned-form image upload against a Cloudinary-compatible endpoint,
/// authenticated with HTTP basic auth (API key / secret)
#[derive(Clone)]
pub struct CloudinaryStore {
    client: reqwest::Client,
    cloud_name: String,
    upload_url: String,
    api_key: String,
    api_secret: String,
    transformation: String,
}

#[derive(Deserialize)]
struct UploadResponse {
    secure_url: String,
}

impl CloudinaryStore {
    pub fn new(settings: &CloudinarySettings) -> Result<Self> {
        let client = reqwest::Client::builder()
            .use_rustls_tls()
            .build()
            .context("Failed to build HTTP client")?;

        Ok(Self {
            client,
            cloud_name: settings.cloud_name.clone(),
            upload_url: settings.upload_url(),
            api_key: settings.api_key.clone(),
            api_secret: settings.api_secret.clone(),
            transformation: settings.transformation.clone(),
        })
    }

    fn build_form(&self, asset: Asset) -> Result<multipart::Form, StoreError> {
        let mime = detect_content_type(Path::new(&asset.file_name));
        let part = multipart::Part::bytes(asset.bytes)
            .file_name(asset.file_name)
            .mime_str(mime)
            .map_err(|e| StoreError::Transport(e.to_string()))?;

        Ok(multipart::Form::new()
            .part("file", part)
            .text("folder", asset.destination)
            .text("transformation", self.transformation.clone()))
    }
}

#[async_trait]
impl ObjectStore for CloudinaryStore {
    async fn store(&self, asset: Asset) -> Result<String, StoreError> {
        debug!("POST {} folder={}", self.upload_url, asset.destination);
        let form = self.build_form(asset)?;

        let response = self
            .client
            .post(&self.upload_url)
            .basic_auth(&self.api_key, Some(&self.api_secret))
            .multipart(form)
            .send()
            .await
            .map_err(|e| StoreError::Transport(e.to_string()))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| StoreError::Transport(e.to_string()))?;

        interpret_response(status, &body)
    }

    fn describe(&self) -> String {
        format!("cloudinary://{}", self.cloud_name)
    }
}

/// Turn the raw HTTP outcome into a URL or a failure carrying the remote body
fn interpret_response(status: StatusCode, body: &str) -> Result<String, StoreError> {
    if status != StatusCode::OK {
        return Err(StoreError::Rejected {
            status: status.as_u16(),
            body: body.to_string(),
        });
    }

    let parsed: UploadResponse = serde_json::from_str(body)
        .map_err(|e| StoreError::InvalidResponse(format!("{}: {}", e, body)))?;
    Ok(parsed.secure_url)
}
