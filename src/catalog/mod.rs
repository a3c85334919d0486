pub mod lister;
pub mod manifest;
pub mod matcher;

use std::fmt;
use std::path::PathBuf;

pub use lister::{ImageFilter, list_folders, list_images};
pub use manifest::{Manifest, write_manifest};
pub use matcher::{Classification, classify, group_by_folder, group_by_token, ordinal};

/// Which view of the garment an image shows
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Side {
    Front,
    Back,
    /// Name carries neither side keyword; the file fills no slot
    Unrecognized,
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Side::Front => write!(f, "front"),
            Side::Back => write!(f, "back"),
            Side::Unrecognized => write!(f, "unknown"),
        }
    }
}

/// An image found on disk during a single run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceFile {
    pub name: String,
    pub path: PathBuf,
}

impl SourceFile {
    pub fn new(name: impl Into<String>, path: impl Into<PathBuf>) -> Self {
        Self {
            name: name.into(),
            path: path.into(),
        }
    }
}

/// The unit of upload: one garment with at most one front and one back image
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ItemGroup {
    pub key: String,
    pub front: Option<SourceFile>,
    pub back: Option<SourceFile>,
}

impl ItemGroup {
    pub fn new(key: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            front: None,
            back: None,
        }
    }

    /// Fill the slot for `side`. A second file for the same slot replaces the first.
    pub fn assign(&mut self, side: Side, file: SourceFile) {
        match side {
            Side::Front => self.front = Some(file),
            Side::Back => self.back = Some(file),
            Side::Unrecognized => {}
        }
    }

    /// Present slots in upload order: front, then back
    pub fn slots(&self) -> impl Iterator<Item = (Side, &SourceFile)> {
        self.front
            .iter()
            .map(|f| (Side::Front, f))
            .chain(self.back.iter().map(|f| (Side::Back, f)))
    }

    pub fn slot_count(&self) -> usize {
        self.front.is_some() as usize + self.back.is_some() as usize
    }
}
