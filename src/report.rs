use serde::Serialize;

use crate::aggregate::{aggregate_proteomics_runs, aggregate_top_level_folders, total_size};
use crate::blob::BlobClient;
use crate::domain::{BlobPrefix, ContainerName, ReportKind};
use crate::error::StatsError;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ProteomicsStats {
    pub number_of_runs: u64,
    pub number_of_samples: u64,
    pub size_in_bytes: u64,
    pub request_names: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct NgsRunStats {
    pub number_of_runs: u64,
    pub size_in_bytes: u64,
    /// Sequencing machine; stamped by the caller, empty until then.
    pub seq_machine: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct NgsSampleStats {
    pub number_of_samples: u64,
    pub size_in_bytes: u64,
    pub sample_names: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum AggregateReport {
    Proteomics(ProteomicsStats),
    NgsRun(NgsRunStats),
    NgsSample(NgsSampleStats),
}

impl AggregateReport {
    pub fn kind(&self) -> ReportKind {
        match self {
            AggregateReport::Proteomics(_) => ReportKind::Proteomics,
            AggregateReport::NgsRun(_) => ReportKind::NgsRun,
            AggregateReport::NgsSample(_) => ReportKind::NgsSample,
        }
    }

    pub fn size_in_bytes(&self) -> u64 {
        match self {
            AggregateReport::Proteomics(stats) => stats.size_in_bytes,
            AggregateReport::NgsRun(stats) => stats.size_in_bytes,
            AggregateReport::NgsSample(stats) => stats.size_in_bytes,
        }
    }
}

/// Proteomics request runs: one folder per run at the container root.
pub fn build_proteomics_stats<C: BlobClient + ?Sized>(
    client: &C,
    container: &ContainerName,
) -> Result<ProteomicsStats, StatsError> {
    let root = BlobPrefix::root();
    let runs = aggregate_proteomics_runs(client, container, &root)?;
    Ok(ProteomicsStats {
        number_of_runs: runs.folder_count,
        number_of_samples: runs.sample_count,
        size_in_bytes: total_size(client, container, &root)?,
        request_names: runs.names,
    })
}

/// Sequencer output folders below `prefix`. `seq_machine` is left empty.
pub fn build_ngs_run_stats<C: BlobClient + ?Sized>(
    client: &C,
    container: &ContainerName,
    prefix: &BlobPrefix,
) -> Result<NgsRunStats, StatsError> {
    let runs = aggregate_top_level_folders(client, container, prefix)?;
    Ok(NgsRunStats {
        number_of_runs: runs.folder_count,
        size_in_bytes: total_size(client, container, prefix)?,
        seq_machine: String::new(),
    })
}

/// NGS samples: one folder per sample at the container root.
pub fn build_ngs_sample_stats<C: BlobClient + ?Sized>(
    client: &C,
    container: &ContainerName,
) -> Result<NgsSampleStats, StatsError> {
    let root = BlobPrefix::root();
    let samples = aggregate_top_level_folders(client, container, &root)?;
    Ok(NgsSampleStats {
        number_of_samples: samples.folder_count,
        size_in_bytes: total_size(client, container, &root)?,
        sample_names: samples.names,
    })
}
