pub mod catalog;
pub mod config;
pub mod error;
pub mod job;
pub mod pipeline;
pub mod store;

pub use catalog::{ItemGroup, Manifest, Side, SourceFile};
pub use config::StoreConfig;
pub use error::PipelineError;
pub use job::{BatchFile, JobOverrides, JobSpec, Layout, Preset};
pub use pipeline::{RunReport, StatusLog};
pub use store::{Asset, ObjectStore, StoreError};
