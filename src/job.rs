use anyhow::{Context, Result};
use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::catalog::ImageFilter;
use crate::catalog::matcher::Rename;

const DEFAULT_TAG_ROOT: &str = "products";

/// How a source directory is organised
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Layout {
    /// One directory of loosely named files; key and side come from each name
    Flat,
    /// One folder per item; the first two images are front and back
    Folders,
}

impl Layout {
    fn default_extensions(self) -> Vec<String> {
        let exts: &[&str] = match self {
            Layout::Flat => &["png"],
            Layout::Folders => &["png", "jpg", "jpeg"],
        };
        exts.iter().map(|e| e.to_string()).collect()
    }
}

/// Ready-made settings for the garment categories of the shop catalog
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Preset {
    Hoodies,
    Tshirts,
    Sweatshirts,
}

/// Everything one upload run needs to know besides the store
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobSpec {
    pub category: String,
    /// Prefix for manifest keys (`"Hoodie 1st"`) and destination folders (`Hoodie_1st`)
    pub label: Option<String>,
    pub layout: Layout,
    pub source: PathBuf,
    pub output: PathBuf,
    pub extensions: Vec<String>,
    pub renames: Vec<Rename>,
    pub tag_root: String,
}

impl JobSpec {
    pub fn from_preset(preset: Preset, source: PathBuf, output: PathBuf) -> Self {
        let (category, label, layout, renames) = match preset {
            Preset::Hoodies => ("hoodies", Some("Hoodie"), Layout::Flat, vec![]),
            Preset::Tshirts => (
                "tshirts",
                Some("Tshirt"),
                Layout::Flat,
                vec![Rename {
                    from: "thsirt".to_string(),
                    to: "tshirt".to_string(),
                }],
            ),
            Preset::Sweatshirts => ("sweatshirts", None, Layout::Folders, vec![]),
        };

        Self {
            category: category.to_string(),
            label: label.map(str::to_string),
            layout,
            source,
            output,
            extensions: layout.default_extensions(),
            renames,
            tag_root: DEFAULT_TAG_ROOT.to_string(),
        }
    }

    /// Destination tag handed to the store for `key`, e.g. `products/hoodies/Hoodie_1st`
    pub fn destination(&self, key: &str) -> String {
        let leaf = match &self.label {
            Some(label) => format!("{}_{}", label, key),
            None => key.to_string(),
        };
        let root = self.tag_root.trim_matches('/');
        if root.is_empty() {
            format!("{}/{}", self.category, leaf)
        } else {
            format!("{}/{}/{}", root, self.category, leaf)
        }
    }

    /// Key under which `key`'s URLs are recorded in the manifest
    pub fn manifest_key(&self, key: &str) -> String {
        match &self.label {
            Some(label) => format!("{} {}", label, key),
            None => key.to_string(),
        }
    }

    pub fn filter(&self) -> ImageFilter {
        ImageFilter::new(&self.extensions)
    }

    /// Reject settings that would produce unusable destination tags
    pub fn validate(&self) -> Result<()> {
        if self.category.trim().is_empty() {
            anyhow::bail!("category cannot be empty");
        }
        for (what, value) in [("category", &self.category), ("tag root", &self.tag_root)] {
            if value.contains("..") || value.contains("//") {
                anyhow::bail!("{} '{}' must not contain '..' or '//'", what, value);
            }
        }
        if self.category.contains('/') {
            anyhow::bail!("category '{}' must not contain '/'", self.category);
        }
        if self.extensions.is_empty() {
            anyhow::bail!("at least one image extension is required");
        }
        Ok(())
    }
}

/// Optional settings layered over a preset (or over nothing)
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct JobOverrides {
    #[serde(default)]
    pub preset: Option<Preset>,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub label: Option<String>,
    #[serde(default)]
    pub layout: Option<Layout>,
    #[serde(default)]
    pub extensions: Option<Vec<String>>,
    #[serde(default)]
    pub renames: Option<Vec<Rename>>,
    #[serde(default)]
    pub tag_root: Option<String>,
}

impl JobOverrides {
    /// Merge the overrides into a complete [`JobSpec`]
    ///
    /// # Errors
    ///
    /// Fails when neither a preset nor a category is given, or the result is invalid.
    pub fn resolve(self, source: PathBuf, output: PathBuf) -> Result<JobSpec> {
        let mut spec = match (self.preset, &self.category) {
            (Some(preset), _) => JobSpec::from_preset(preset, source, output),
            (None, Some(category)) => {
                let layout = self.layout.unwrap_or(Layout::Flat);
                JobSpec {
                    category: category.clone(),
                    label: None,
                    layout,
                    source,
                    output,
                    extensions: layout.default_extensions(),
                    renames: vec![],
                    tag_root: DEFAULT_TAG_ROOT.to_string(),
                }
            }
            (None, None) => anyhow::bail!("either a preset or a category is required"),
        };

        if let Some(category) = self.category {
            spec.category = category;
        }
        if let Some(label) = self.label {
            spec.label = Some(label).filter(|l| !l.is_empty());
        }
        if let Some(layout) = self.layout {
            if self.extensions.is_none() {
                spec.extensions = layout.default_extensions();
            }
            spec.layout = layout;
        }
        if let Some(extensions) = self.extensions {
            spec.extensions = extensions;
        }
        if let Some(renames) = self.renames {
            spec.renames = renames;
        }
        if let Some(tag_root) = self.tag_root {
            spec.tag_root = tag_root;
        }

        spec.validate()?;
        Ok(spec)
    }
}

/// One entry of a batch file
#[derive(Debug, Clone, Deserialize)]
pub struct BatchEntry {
    pub source: PathBuf,
    pub output: PathBuf,
    #[serde(flatten)]
    pub overrides: JobOverrides,
}

/// YAML document listing several runs to execute in order
#[derive(Debug, Clone, Deserialize)]
pub struct BatchFile {
    pub jobs: Vec<BatchEntry>,
}

impl BatchFile {
    pub fn load(path: &Path) -> Result<Vec<JobSpec>> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read batch file: {}", path.display()))?;
        Self::parse(&content)
            .with_context(|| format!("Invalid batch file: {}", path.display()))
    }

    pub fn parse(content: &str) -> Result<Vec<JobSpec>> {
        let batch: BatchFile =
            serde_yaml::from_str(content).context("Failed to parse YAML batch file")?;

        if batch.jobs.is_empty() {
            anyhow::bail!("batch file lists no jobs");
        }

        batch
            .jobs
            .into_iter()
            .enumerate()
            .map(|(i, entry)| {
                entry
                    .overrides
                    .resolve(entry.source, entry.output)
                    .with_context(|| format!("job #{}", i + 1))
            })
            .collect()
    }
}
