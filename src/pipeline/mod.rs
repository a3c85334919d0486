//! One upload run: list the source, match files into items, upload each
//! item's slots, then write the manifest.

pub mod orchestrator;
pub mod report;

use tracing::{debug, info, warn};

pub use orchestrator::upload_groups;
pub use report::{RunReport, StatusLog};

use crate::catalog::{
    ItemGroup, group_by_folder, group_by_token, list_folders, list_images, write_manifest,
};
use crate::error::PipelineError;
use crate::job::{JobSpec, Layout};
use crate::store::ObjectStore;

/// List and match the source directory of `job` into upload groups.
///
/// # Errors
///
/// Returns [`PipelineError::SourceUnreadable`] if the source (or an item folder) cannot be listed.
pub fn plan(job: &JobSpec, status: &StatusLog) -> Result<Vec<ItemGroup>, PipelineError> {
    let filter = job.filter();
    debug!("Accepting extensions: {}", filter.extensions().join(", "));

    let groups = match job.layout {
        Layout::Flat => {
            let files = list_images(&job.source, &filter)?;
            info!("Found {} candidate images in {}", files.len(), job.source.display());
            group_by_token(&files, &job.renames)
        }
        Layout::Folders => {
            let mut folders = Vec::new();
            for (name, path) in list_folders(&job.source)? {
                let files = list_images(&path, &filter)?;
                if files.is_empty() {
                    warn!("No images found in {}", path.display());
                    status.warn(format!("No images found in {}", name));
                    continue;
                }
                folders.push((name, files));
            }
            group_by_folder(folders)
        }
    };

    info!("Matched {} items", groups.len());
    Ok(groups)
}

/// Execute one full run against `store` and persist the manifest.
///
/// Upload failures are absorbed into the returned report. If the manifest
/// cannot be written the summary is still shown before the error is returned.
///
/// # Errors
///
/// Returns an error if the source cannot be listed or the manifest cannot be written.
pub async fn run<S>(store: &S, job: &JobSpec, status: &StatusLog) -> Result<RunReport, PipelineError>
where
    S: ObjectStore + ?Sized,
{
    status.header(job, &store.describe());

    let groups = plan(job, status)?;
    let report = upload_groups(store, job, &groups, status).await;

    if let Err(e) = write_manifest(&job.output, &report.manifest) {
        status.summary(job, &report, false);
        return Err(e);
    }

    info!(
        "Wrote {} items ({} URLs) to {}",
        report.manifest.len(),
        report.manifest.url_count(),
        job.output.display()
    );
    status.summary(job, &report, true);
    Ok(report)
}

/// Show what a run would upload without touching the store or the manifest.
/// Returns the number of slots that would be attempted.
///
/// # Errors
///
/// Returns an error if the source cannot be listed.
pub fn dry_run(job: &JobSpec, status: &StatusLog) -> Result<usize, PipelineError> {
    status.dry_run_banner(&job.output);

    let groups = plan(job, status)?;
    let mut slots = 0;
    for group in &groups {
        status.item(&job.manifest_key(&group.key));
        let destination = job.destination(&group.key);
        for (side, file) in group.slots() {
            status.planned(side, &file.name, &destination);
            slots += 1;
        }
    }

    Ok(slots)
}
