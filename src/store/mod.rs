//! Remote object stores that accept an image and hand back a retrieval URL.
//!
//! The pipeline only ever talks to [`ObjectStore`]; which backend sits behind
//! it is decided by [`crate::config::StoreConfig`].

pub mod cloudinary;
pub mod content_type;
pub mod s3;

use std::path::PathBuf;

use async_trait::async_trait;
#[cfg(any(test, feature = "test-export-mocks"))]
use mockall::automock;
use thiserror::Error;

pub use cloudinary::CloudinaryStore;
pub use content_type::detect_content_type;
pub use s3::S3Store;

use crate::config::StoreConfig;

/// One image on its way to the store
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Asset {
    pub bytes: Vec<u8>,
    pub file_name: String,
    /// Folder-like tag, e.g. `products/hoodies/Hoodie_1st`
    pub destination: String,
}

/// Why a single store attempt produced no URL
#[derive(Error, Debug)]
pub enum StoreError {
    /// The local image could not be read
    #[error("Cannot read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The store answered with a non-success status
    #[error("Upload rejected ({status}): {body}")]
    Rejected { status: u16, body: String },

    /// The request never produced a response
    #[error("Transport error: {0}")]
    Transport(String),

    /// A success response without a usable URL
    #[error("Unexpected response: {0}")]
    InvalidResponse(String),
}

/// A synchronous-in-effect `store(bytes, tag) -> URL` operation.
///
/// Each call is a single attempt: implementations do not retry and add no
/// timeout beyond their transport default.
#[cfg_attr(any(test, feature = "test-export-mocks"), automock)]
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Upload `asset` and return a stable URL for it
    async fn store(&self, asset: Asset) -> Result<String, StoreError>;

    /// Human-readable target, shown in the run header
    fn describe(&self) -> String;
}

/// Build the store selected by `config`
pub async fn connect(config: &StoreConfig) -> anyhow::Result<Box<dyn ObjectStore>> {
    let store: Box<dyn ObjectStore> = match config {
        StoreConfig::Cloudinary(settings) => Box::new(CloudinaryStore::new(settings)?),
        StoreConfig::S3(settings) => Box::new(S3Store::new(settings).await?),
    };
    Ok(store)
}
