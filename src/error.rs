use std::path::PathBuf;

use thiserror::Error;

/// Errors that end a run. Individual upload failures never surface here.
#[derive(Error, Debug)]
pub enum PipelineError {
    /// The source directory (or one of its item folders) could not be listed
    #[error("Cannot read source directory {}: {source}", path.display())]
    SourceUnreadable {
        path: PathBuf,
        #[source]
        source: walkdir::Error,
    },

    /// The manifest could not be encoded
    #[error("Failed to serialize manifest: {0}")]
    ManifestSerialize(#[from] serde_json::Error),

    /// The manifest destination could not be written
    #[error("Failed to write manifest {}: {source}", path.display())]
    ManifestWrite {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl PipelineError {
    /// Whether upload work had already been spent when the error occurred
    pub fn after_uploads(&self) -> bool {
        !matches!(self, Self::SourceUnreadable { .. })
    }

    /// Get a user-friendly error message with suggestions
    pub fn user_message(&self) -> String {
        match self {
            Self::SourceUnreadable { path, .. } => {
                format!(
                    "{}\n\nPossible solutions:\n  \
                     1. Check if the directory path is correct\n  \
                     2. Verify it exists and is readable: ls -la \"{}\"",
                    self,
                    path.display()
                )
            }
            Self::ManifestWrite { path, .. } => {
                format!(
                    "{}\n\nUploaded URLs were not saved.\n\nPossible solutions:\n  \
                     1. Ensure the parent directory of {} exists\n  \
                     2. Check write permissions on that directory",
                    self,
                    path.display()
                )
            }
            Self::ManifestSerialize(_) => self.to_string(),
        }
    }
}
