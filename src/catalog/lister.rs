use std::path::{Path, PathBuf};

use tracing::debug;
use walkdir::WalkDir;

use super::SourceFile;
use crate::error::PipelineError;

const HIDDEN_MARKER: char = '.';
const PREVIEW_MARKER: &str = "model";

/// Decides which directory entries count as uploadable images
#[derive(Debug, Clone)]
pub struct ImageFilter {
    extensions: Vec<String>,
}

impl ImageFilter {
    /// Build a filter from extensions such as `png`, `.JPG`.
    /// Matching is case-insensitive.
    pub fn new<I, S>(extensions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let extensions = extensions
            .into_iter()
            .map(|ext| ext.as_ref().trim().trim_start_matches('.').to_lowercase())
            .filter(|ext| !ext.is_empty())
            .collect();
        Self { extensions }
    }

    pub fn extensions(&self) -> &[String] {
        &self.extensions
    }

    /// True when `name` is visible, has an accepted extension and is not a model preview shot.
    /// Used for flat directories and item folders alike.
    pub fn accepts(&self, name: &str) -> bool {
        if name.starts_with(HIDDEN_MARKER) {
            return false;
        }

        let lower = name.to_lowercase();
        if lower.contains(PREVIEW_MARKER) {
            return false;
        }

        match Path::new(&lower).extension() {
            Some(ext) => self
                .extensions
                .iter()
                .any(|allowed| ext.to_string_lossy() == allowed.as_str()),
            None => false,
        }
    }
}

/// List accepted images directly inside `dir`, sorted by file name.
///
/// # Errors
///
/// Returns [`PipelineError::SourceUnreadable`] if the directory cannot be read.
pub fn list_images(dir: &Path, filter: &ImageFilter) -> Result<Vec<SourceFile>, PipelineError> {
    let mut files = Vec::new();

    for entry in shallow_walk(dir) {
        let entry = entry.map_err(|source| PipelineError::SourceUnreadable {
            path: dir.to_path_buf(),
            source,
        })?;

        if !entry.path().is_file() {
            continue;
        }

        let name = entry.file_name().to_string_lossy().to_string();
        if filter.accepts(&name) {
            files.push(SourceFile::new(name, entry.path()));
        } else {
            debug!("Ignoring {}", entry.path().display());
        }
    }

    Ok(files)
}

/// List visible sub-directories of `dir`, sorted by name
///
/// # Errors
///
/// Returns [`PipelineError::SourceUnreadable`] if the directory cannot be read.
pub fn list_folders(dir: &Path) -> Result<Vec<(String, PathBuf)>, PipelineError> {
    let mut folders = Vec::new();

    for entry in shallow_walk(dir) {
        let entry = entry.map_err(|source| PipelineError::SourceUnreadable {
            path: dir.to_path_buf(),
            source,
        })?;

        let name = entry.file_name().to_string_lossy().to_string();
        if name.starts_with(HIDDEN_MARKER) || !entry.path().is_dir() {
            continue;
        }

        folders.push((name, entry.path().to_path_buf()));
    }

    Ok(folders)
}

fn shallow_walk(dir: &Path) -> walkdir::IntoIter {
    WalkDir::new(dir)
        .min_depth(1)
        .max_depth(1)
        .sort_by_file_name()
        .into_iter()
}
