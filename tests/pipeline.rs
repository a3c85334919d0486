use garment_uploader::job::{JobOverrides, JobSpec, Layout, Preset};
use garment_uploader::pipeline::{self, StatusLog};
use garment_uploader::store::{Asset, MockObjectStore};
use garment_uploader::{PipelineError, StoreError};
use std::collections::HashMap;
use std::fs;
use std::path::Path;
use std::sync::{Arc, Mutex};
use tempfile::TempDir;

fn touch(dir: &Path, name: &str) {
    fs::write(dir.join(name), name.as_bytes()).unwrap();
}

fn url_for(asset: &Asset) -> String {
    format!("https://cdn.test/{}/{}", asset.destination, asset.file_name)
}

/// A store that succeeds for every asset and records what it saw
fn recording_store() -> (MockObjectStore, Arc<Mutex<Vec<Asset>>>) {
    let seen = Arc::new(Mutex::new(Vec::new()));
    let log = Arc::clone(&seen);

    let mut store = MockObjectStore::new();
    store
        .expect_describe()
        .return_const("mock://store".to_string());
    store.expect_store().returning(move |asset| {
        let url = url_for(&asset);
        log.lock().unwrap().push(asset);
        Ok(url)
    });
    (store, seen)
}

fn read_manifest(path: &Path) -> HashMap<String, Vec<String>> {
    serde_json::from_str(&fs::read_to_string(path).unwrap()).unwrap()
}

fn flat_job(source: &Path, output: &Path) -> JobSpec {
    JobOverrides {
        category: Some("hoodies".to_string()),
        layout: Some(Layout::Flat),
        ..Default::default()
    }
    .resolve(source.to_path_buf(), output.to_path_buf())
    .unwrap()
}

#[tokio::test]
async fn flat_directory_produces_front_back_manifest() {
    let src = TempDir::new().unwrap();
    let out = TempDir::new().unwrap();
    for name in [
        "1st_front.png",
        "1st_back.png",
        "2nd_front_model.png",
        "2nd_back.png",
    ] {
        touch(src.path(), name);
    }
    let output = out.path().join("urls.json");
    let (store, seen) = recording_store();

    let report = pipeline::run(&store, &flat_job(src.path(), &output), &StatusLog::quiet())
        .await
        .unwrap();

    assert_eq!(report.uploaded, 3);
    assert_eq!(report.failed, 0);
    assert_eq!(report.manifest.url_count(), 3);

    let manifest = read_manifest(&output);
    assert_eq!(manifest.len(), 2);
    assert_eq!(
        manifest["1st"],
        vec![
            "https://cdn.test/products/hoodies/1st/1st_front.png",
            "https://cdn.test/products/hoodies/1st/1st_back.png",
        ]
    );
    assert_eq!(
        manifest["2nd"],
        vec!["https://cdn.test/products/hoodies/2nd/2nd_back.png"]
    );

    let names: Vec<String> = seen.lock().unwrap().iter().map(|a| a.file_name.clone()).collect();
    assert!(!names.iter().any(|n| n.contains("model")));
}

#[tokio::test]
async fn preset_labels_keys_and_orders_numerically() {
    let src = TempDir::new().unwrap();
    let out = TempDir::new().unwrap();
    for name in [
        "10th Hoodie front.png",
        "10th Hoodie back.png",
        "2nd Hoodie front.png",
        ".1st Hoodie front.png",
        "3rd Hoodie detail.png",
        "readme.txt",
    ] {
        touch(src.path(), name);
    }
    let output = out.path().join("hoodie_urls.json");
    let job = JobSpec::from_preset(Preset::Hoodies, src.path().to_path_buf(), output.clone());
    let (store, seen) = recording_store();

    let report = pipeline::run(&store, &job, &StatusLog::quiet()).await.unwrap();

    assert_eq!(
        report.manifest.keys().collect::<Vec<_>>(),
        vec!["Hoodie 2nd", "Hoodie 10th"]
    );
    let destinations: Vec<String> = seen
        .lock()
        .unwrap()
        .iter()
        .map(|a| a.destination.clone())
        .collect();
    assert_eq!(
        destinations,
        vec![
            "products/hoodies/Hoodie_2nd",
            "products/hoodies/Hoodie_10th",
            "products/hoodies/Hoodie_10th",
        ]
    );

    let raw = fs::read_to_string(&output).unwrap();
    assert!(raw.find("Hoodie 2nd").unwrap() < raw.find("Hoodie 10th").unwrap());
}

#[tokio::test]
async fn folder_layout_uploads_only_first_two_images() {
    let src = TempDir::new().unwrap();
    let out = TempDir::new().unwrap();
    let folder = src.path().join("Sweatshirt 5");
    fs::create_dir(&folder).unwrap();
    for name in ["c.png", "a.png", "b.png"] {
        touch(&folder, name);
    }
    fs::create_dir(src.path().join("Sweatshirt 6")).unwrap();
    fs::create_dir(src.path().join(".thumbs")).unwrap();
    touch(&src.path().join(".thumbs"), "x.png");

    let output = out.path().join("sweatshirt_urls.json");
    let job = JobSpec::from_preset(Preset::Sweatshirts, src.path().to_path_buf(), output.clone());
    let (store, seen) = recording_store();

    let report = pipeline::run(&store, &job, &StatusLog::quiet()).await.unwrap();

    assert_eq!(report.attempts(), 2);
    let names: Vec<String> = seen.lock().unwrap().iter().map(|a| a.file_name.clone()).collect();
    assert_eq!(names, vec!["a.png", "b.png"]);

    let manifest = read_manifest(&output);
    assert_eq!(manifest.len(), 1);
    assert_eq!(
        manifest["Sweatshirt 5"],
        vec![
            "https://cdn.test/products/sweatshirts/Sweatshirt 5/a.png",
            "https://cdn.test/products/sweatshirts/Sweatshirt 5/b.png",
        ]
    );
}

#[test]
fn folder_layout_skips_model_shots() {
    let src = TempDir::new().unwrap();
    let folder = src.path().join("Sweatshirt 7");
    fs::create_dir(&folder).unwrap();
    for name in ["a_Model.png", "b.png", "c.png"] {
        touch(&folder, name);
    }
    let job = JobSpec::from_preset(
        Preset::Sweatshirts,
        src.path().to_path_buf(),
        src.path().join("sweatshirt_urls.json"),
    );

    let groups = pipeline::plan(&job, &StatusLog::quiet()).unwrap();

    assert_eq!(groups.len(), 1);
    let names: Vec<&str> = groups[0].slots().map(|(_, f)| f.name.as_str()).collect();
    assert_eq!(names, vec!["b.png", "c.png"]);
}

#[tokio::test]
async fn existing_manifest_is_replaced() {
    let src = TempDir::new().unwrap();
    let out = TempDir::new().unwrap();
    touch(src.path(), "1st front.png");
    let output = out.path().join("urls.json");
    fs::write(&output, r#"{"old": ["a", "b"]}"#).unwrap();
    let (store, _) = recording_store();

    pipeline::run(&store, &flat_job(src.path(), &output), &StatusLog::quiet())
        .await
        .unwrap();

    let manifest = read_manifest(&output);
    assert!(!manifest.contains_key("old"));
    assert_eq!(manifest.len(), 1);
}

#[tokio::test]
async fn failed_only_slot_drops_item() {
    let src = TempDir::new().unwrap();
    let out = TempDir::new().unwrap();
    touch(src.path(), "1st front.png");
    touch(src.path(), "2nd back.png");
    let output = out.path().join("urls.json");

    let mut store = MockObjectStore::new();
    store.expect_describe().return_const("mock://".to_string());
    store.expect_store().times(2).returning(|asset| {
        if asset.file_name.starts_with("2nd") {
            Err(StoreError::Rejected {
                status: 400,
                body: r#"{"error":{"message":"Invalid image file"}}"#.to_string(),
            })
        } else {
            Ok(url_for(&asset))
        }
    });

    let report = pipeline::run(&store, &flat_job(src.path(), &output), &StatusLog::quiet())
        .await
        .unwrap();

    assert_eq!(report.uploaded, 1);
    assert_eq!(report.failed, 1);
    let manifest = read_manifest(&output);
    assert!(manifest.contains_key("1st"));
    assert!(!manifest.contains_key("2nd"));
}

#[tokio::test]
async fn unreadable_source_fails_before_uploading() {
    let out = TempDir::new().unwrap();
    let output = out.path().join("urls.json");
    let missing = out.path().join("no-such-dir");

    let mut store = MockObjectStore::new();
    store.expect_describe().return_const("mock://".to_string());
    store.expect_store().never();

    let err = pipeline::run(&store, &flat_job(&missing, &output), &StatusLog::quiet())
        .await
        .unwrap_err();

    assert!(matches!(err, PipelineError::SourceUnreadable { .. }));
    assert!(!err.after_uploads());
    assert!(!output.exists());
}

#[tokio::test]
async fn unwritable_manifest_fails_after_uploading() {
    let src = TempDir::new().unwrap();
    touch(src.path(), "1st front.png");
    let output = src.path().join("missing-dir").join("urls.json");
    let (store, seen) = recording_store();

    let err = pipeline::run(&store, &flat_job(src.path(), &output), &StatusLog::quiet())
        .await
        .unwrap_err();

    assert!(matches!(err, PipelineError::ManifestWrite { .. }));
    assert!(err.after_uploads());
    assert_eq!(seen.lock().unwrap().len(), 1);
}

#[test]
fn dry_run_counts_slots_without_writing() {
    let src = TempDir::new().unwrap();
    for name in ["1st front.png", "1st back.png", "2nd back.png", "3rd detail.png"] {
        touch(src.path(), name);
    }
    let output = src.path().join("urls.json");

    let slots = pipeline::dry_run(&flat_job(src.path(), &output), &StatusLog::quiet()).unwrap();

    assert_eq!(slots, 3);
    assert!(!output.exists());
}

#[test]
fn tshirt_preset_fixes_misspelled_key() {
    let src = TempDir::new().unwrap();
    touch(src.path(), "Thsirt_7th front.png");
    touch(src.path(), "Tshirt_7th back.png");
    let job = JobSpec::from_preset(
        Preset::Tshirts,
        src.path().to_path_buf(),
        src.path().join("tshirt_urls.json"),
    );

    let groups = pipeline::plan(&job, &StatusLog::quiet()).unwrap();

    assert_eq!(groups.len(), 1);
    assert_eq!(groups[0].key, "tshirt");
    assert_eq!(groups[0].slot_count(), 2);
}
