use std::fs::{self, Permissions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use serde::{Serialize, Serializer};
use tempfile::NamedTempFile;

use crate::error::PipelineError;

/// Item key to the URLs obtained for it, front first.
///
/// Serializes as a JSON object whose fields keep insertion order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Manifest {
    entries: Vec<(String, Vec<String>)>,
}

impl Manifest {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record `urls` for `key`. Empty lists are not recorded; an existing key is replaced in place.
    pub fn insert(&mut self, key: impl Into<String>, urls: Vec<String>) {
        if urls.is_empty() {
            return;
        }

        let key = key.into();
        match self.entries.iter_mut().find(|(k, _)| *k == key) {
            Some((_, existing)) => *existing = urls,
            None => self.entries.push((key, urls)),
        }
    }

    pub fn get(&self, key: &str) -> Option<&[String]> {
        self.entries
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, urls)| urls.as_slice())
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(k, _)| k.as_str())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn url_count(&self) -> usize {
        self.entries.iter().map(|(_, urls)| urls.len()).sum()
    }
}

impl Serialize for Manifest {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_map(self.entries.iter().map(|(k, v)| (k, v)))
    }
}

/// Write the manifest to `path` as indented JSON, replacing any existing file.
///
/// The document is staged in a temporary file next to `path` and renamed into place,
/// so readers never observe a half-written manifest. A replaced file keeps its
/// permissions and a symlinked `path` keeps pointing at the rewritten target.
///
/// # Errors
///
/// Returns an error if serialization fails or the destination cannot be written.
pub fn write_manifest(path: &Path, manifest: &Manifest) -> Result<(), PipelineError> {
    let json = serde_json::to_string_pretty(manifest)?;

    let io_err = |source| PipelineError::ManifestWrite {
        path: path.to_path_buf(),
        source,
    };

    let target = follow_link(path).map_err(io_err)?;
    let dir = match target.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };

    let mut staged = NamedTempFile::new_in(dir).map_err(io_err)?;
    staged.write_all(json.as_bytes()).map_err(io_err)?;
    staged.write_all(b"\n").map_err(io_err)?;
    if let Some(permissions) = target_permissions(&target).map_err(io_err)? {
        staged.as_file().set_permissions(permissions).map_err(io_err)?;
    }
    staged.as_file().sync_all().map_err(io_err)?;
    staged.persist(&target).map_err(|e| io_err(e.error))?;

    Ok(())
}

/// The file a symlinked `path` points at, or `path` itself
fn follow_link(path: &Path) -> io::Result<PathBuf> {
    let is_link = fs::symlink_metadata(path).is_ok_and(|meta| meta.file_type().is_symlink());
    if !is_link {
        return Ok(path.to_path_buf());
    }

    match fs::canonicalize(path) {
        Ok(target) => Ok(target),
        // dangling link: write where it points
        Err(_) => {
            let link = fs::read_link(path)?;
            Ok(match path.parent() {
                Some(parent) => parent.join(link),
                None => link,
            })
        }
    }
}

/// Permissions of the file being replaced, or the default for a new manifest
fn target_permissions(target: &Path) -> io::Result<Option<Permissions>> {
    match fs::metadata(target) {
        Ok(meta) => Ok(Some(meta.permissions())),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(new_file_permissions()),
        Err(e) => Err(e),
    }
}

#[cfg(unix)]
fn new_file_permissions() -> Option<Permissions> {
    use std::os::unix::fs::PermissionsExt;
    Some(Permissions::from_mode(0o644))
}

#[cfg(not(unix))]
fn new_file_permissions() -> Option<Permissions> {
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::fs;
    use tempfile::TempDir;

    fn urls(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_insert_skips_empty_and_replaces() {
        let mut manifest = Manifest::new();
        manifest.insert("1st", urls(&["a", "b"]));
        manifest.insert("2nd", vec![]);
        manifest.insert("1st", urls(&["c"]));

        assert_eq!(manifest.len(), 1);
        assert_eq!(manifest.get("1st"), Some(&["c".to_string()][..]));
        assert_eq!(manifest.get("2nd"), None);
    }

    #[test]
    fn test_serializes_in_insertion_order() {
        let mut manifest = Manifest::new();
        manifest.insert("Hoodie 10th", urls(&["u1"]));
        manifest.insert("Hoodie 2nd", urls(&["u2", "u3"]));

        let json = serde_json::to_string(&manifest).unwrap();
        assert_eq!(json, r#"{"Hoodie 10th":["u1"],"Hoodie 2nd":["u2","u3"]}"#);
    }

    #[test]
    fn test_write_manifest_replaces_existing_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("urls.json");
        fs::write(&path, r#"{"old": ["stale"], "keep": ["me"]}"#).unwrap();

        let mut manifest = Manifest::new();
        manifest.insert("1st", urls(&["a", "b"]));
        write_manifest(&path, &manifest).unwrap();

        let written: HashMap<String, Vec<String>> =
            serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(written.len(), 1);
        assert_eq!(written["1st"], urls(&["a", "b"]));
    }

    #[cfg(unix)]
    #[test]
    fn test_write_manifest_keeps_existing_mode() {
        use std::os::unix::fs::PermissionsExt;

        let dir = TempDir::new().unwrap();
        let path = dir.path().join("urls.json");
        fs::write(&path, "{}").unwrap();
        fs::set_permissions(&path, Permissions::from_mode(0o640)).unwrap();

        let mut manifest = Manifest::new();
        manifest.insert("1st", urls(&["a"]));
        write_manifest(&path, &manifest).unwrap();

        let mode = fs::metadata(&path).unwrap().permissions().mode() & 0o777;
        assert_eq!(mode, 0o640);
    }

    #[cfg(unix)]
    #[test]
    fn test_write_manifest_new_file_is_world_readable() {
        use std::os::unix::fs::PermissionsExt;

        let dir = TempDir::new().unwrap();
        let path = dir.path().join("urls.json");

        write_manifest(&path, &Manifest::new()).unwrap();

        let mode = fs::metadata(&path).unwrap().permissions().mode() & 0o777;
        assert_eq!(mode, 0o644);
    }

    #[cfg(unix)]
    #[test]
    fn test_write_manifest_through_symlink() {
        let dir = TempDir::new().unwrap();
        let real = dir.path().join("real.json");
        let link = dir.path().join("urls.json");
        fs::write(&real, r#"{"old": ["stale"]}"#).unwrap();
        std::os::unix::fs::symlink(&real, &link).unwrap();

        let mut manifest = Manifest::new();
        manifest.insert("1st", urls(&["a"]));
        write_manifest(&link, &manifest).unwrap();

        assert!(fs::symlink_metadata(&link).unwrap().file_type().is_symlink());
        let written: HashMap<String, Vec<String>> =
            serde_json::from_str(&fs::read_to_string(&real).unwrap()).unwrap();
        assert_eq!(written["1st"], urls(&["a"]));
        assert!(!written.contains_key("old"));
    }

    #[test]
    fn test_write_manifest_unwritable_destination() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("missing").join("urls.json");

        let err = write_manifest(&path, &Manifest::new()).unwrap_err();
        assert!(matches!(err, PipelineError::ManifestWrite { .. }));
    }
}
