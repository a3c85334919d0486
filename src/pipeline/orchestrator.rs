use tracing::{error, info};

use super::report::{RunReport, StatusLog};
use crate::catalog::{ItemGroup, SourceFile};
use crate::job::JobSpec;
use crate::store::{Asset, ObjectStore, StoreError};

/// Upload every present slot of every group, one at a time and in order.
///
/// A failed slot is logged and counted and never stops the run. Items with
/// no successful upload are left out of the manifest.
pub async fn upload_groups<S>(
    store: &S,
    job: &JobSpec,
    groups: &[ItemGroup],
    status: &StatusLog,
) -> RunReport
where
    S: ObjectStore + ?Sized,
{
    let mut report = RunReport::default();
    status.start(groups.len());

    for group in groups {
        let name = job.manifest_key(&group.key);
        let destination = job.destination(&group.key);
        status.item(&name);

        let mut urls = Vec::with_capacity(group.slot_count());
        for (side, file) in group.slots() {
            status.attempt(side, &file.name);

            match upload_slot(store, file, &destination).await {
                Ok(url) => {
                    info!("Uploaded {} ({}) -> {}", file.name, side, url);
                    report.uploaded += 1;
                    status.success(side, &url);
                    urls.push(url);
                }
                Err(e) => {
                    error!("Upload failed for {}: {}", file.path.display(), e);
                    report.failed += 1;
                    status.failure(side, &file.name, &e);
                }
            }
        }

        report.manifest.insert(name, urls);
        status.advance();
    }

    status.finish();
    report
}

async fn upload_slot<S>(store: &S, file: &SourceFile, destination: &str) -> Result<String, StoreError>
where
    S: ObjectStore + ?Sized,
{
    let bytes = tokio::fs::read(&file.path)
        .await
        .map_err(|source| StoreError::Io {
            path: file.path.clone(),
            source,
        })?;

    store
        .store(Asset {
            bytes,
            file_name: file.name.clone(),
            destination: destination.to_string(),
        })
        .await
}
