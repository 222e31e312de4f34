use serde::Serialize;
use tracing::debug;

use crate::blob::{BlobClient, HierarchyEntry};
use crate::domain::{BlobPrefix, ContainerName, METADATA_FILE_NAME, SAMPLES_SHEET, folder_name};
use crate::error::StatsError;
use crate::walker::{list_flat, list_folder};
use crate::workbook::count_rows;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct FolderSummary {
    pub folder_count: u64,
    /// Folder names in listing order.
    pub names: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ProteomicsRunSummary {
    pub folder_count: u64,
    pub sample_count: u64,
    pub names: Vec<String>,
}

/// Sum of the content length of every blob at or below `prefix`.
/// An empty or nonexistent prefix sums to zero.
pub fn total_size<C: BlobClient + ?Sized>(
    client: &C,
    container: &ContainerName,
    prefix: &BlobPrefix,
) -> Result<u64, StatsError> {
    let mut total = 0u64;
    for page in list_flat(client, container, prefix) {
        let page = page?;
        total += page
            .blobs()
            .filter_map(HierarchyEntry::size_bytes)
            .sum::<u64>();
    }
    debug!(container = %container, prefix = %prefix, bytes = total, "summed blob sizes");
    Ok(total)
}

/// Counts and names the folders directly under `prefix`.
pub fn aggregate_top_level_folders<C: BlobClient + ?Sized>(
    client: &C,
    container: &ContainerName,
    prefix: &BlobPrefix,
) -> Result<FolderSummary, StatsError> {
    let mut summary = FolderSummary::default();
    for page in list_folder(client, container, prefix) {
        let page = page?;
        for folder in page.folders() {
            summary.folder_count += 1;
            summary.names.push(folder_name(folder.path()).to_string());
        }
    }
    Ok(summary)
}

/// Counts the run folders under `root_prefix` and the samples listed in each
/// run's `metadata.xlsx`. Runs without the workbook contribute no samples.
pub fn aggregate_proteomics_runs<C: BlobClient + ?Sized>(
    client: &C,
    container: &ContainerName,
    root_prefix: &BlobPrefix,
) -> Result<ProteomicsRunSummary, StatsError> {
    let mut summary = ProteomicsRunSummary::default();
    for page in list_folder(client, container, root_prefix) {
        let page = page?;
        for folder in page.folders() {
            let run_prefix: BlobPrefix = folder.path().parse()?;
            match find_metadata_workbook(client, container, &run_prefix)? {
                Some(workbook_path) => {
                    let samples = count_rows(client, container, &workbook_path, SAMPLES_SHEET)?;
                    debug!(run = %run_prefix, samples, "counted samples");
                    summary.sample_count += samples;
                }
                None => debug!(run = %run_prefix, "no metadata workbook"),
            }
            summary.folder_count += 1;
            summary.names.push(folder_name(folder.path()).to_string());
        }
    }
    Ok(summary)
}

fn find_metadata_workbook<C: BlobClient + ?Sized>(
    client: &C,
    container: &ContainerName,
    run_prefix: &BlobPrefix,
) -> Result<Option<String>, StatsError> {
    let expected = run_prefix.blob_path(METADATA_FILE_NAME);
    for entry in list_folder(client, container, run_prefix).entries() {
        if let HierarchyEntry::Blob { path, .. } = entry? {
            if path == expected {
                return Ok(Some(path));
            }
        }
    }
    Ok(None)
}
