use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::StatsError;

/// Virtual folder separator used by every listing in the data lake.
pub const SEPARATOR: char = '/';

/// Metadata workbook expected inside each proteomics run folder.
pub const METADATA_FILE_NAME: &str = "metadata.xlsx";

/// Sheet of the metadata workbook that lists one sample per row.
pub const SAMPLES_SHEET: &str = "Samples";

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AccountName(String);

impl AccountName {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for AccountName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for AccountName {
    type Err = StatsError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let normalized = value.trim();
        let is_valid = (3..=24).contains(&normalized.len())
            && normalized
                .chars()
                .all(|ch| ch.is_ascii_lowercase() || ch.is_ascii_digit());
        if !is_valid {
            return Err(StatsError::InvalidAccountName(value.to_string()));
        }
        Ok(Self(normalized.to_string()))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ContainerName(String);

impl ContainerName {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ContainerName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for ContainerName {
    type Err = StatsError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let normalized = value.trim();
        let edges_ok = normalized
            .chars()
            .next()
            .zip(normalized.chars().last())
            .map(|(first, last)| first.is_ascii_alphanumeric() && last.is_ascii_alphanumeric())
            .unwrap_or(false);
        let is_valid = (3..=63).contains(&normalized.len())
            && edges_ok
            && !normalized.contains("--")
            && normalized
                .chars()
                .all(|ch| ch.is_ascii_lowercase() || ch.is_ascii_digit() || ch == '-');
        if !is_valid {
            return Err(StatsError::InvalidContainerName(value.to_string()));
        }
        Ok(Self(normalized.to_string()))
    }
}

/// Path prefix inside a container. Empty means the container root; otherwise
/// it always ends with [`SEPARATOR`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BlobPrefix(String);

impl BlobPrefix {
    pub fn root() -> Self {
        Self(String::new())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_root(&self) -> bool {
        self.0.is_empty()
    }

    /// Path of a blob directly inside this prefix.
    pub fn blob_path(&self, file_name: &str) -> String {
        format!("{}{file_name}", self.0)
    }
}

impl fmt::Display for BlobPrefix {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for BlobPrefix {
    type Err = StatsError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        if value.is_empty() {
            return Ok(Self::root());
        }
        if !value.ends_with(SEPARATOR) {
            return Err(StatsError::InvalidPrefix(value.to_string()));
        }
        Ok(Self(value.to_string()))
    }
}

/// Last segment of a folder path with the trailing separator removed:
/// `"RunA/"` becomes `"RunA"`, `"NextSeqOutput/Run1/"` becomes `"Run1"`.
pub fn folder_name(folder_path: &str) -> &str {
    let trimmed = folder_path.trim_end_matches(SEPARATOR);
    match trimmed.rfind(SEPARATOR) {
        Some(idx) => &trimmed[idx + 1..],
        None => trimmed,
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct JobName(String);

impl JobName {
    pub fn proteomics_runs() -> Self {
        Self("PROTEOMICS_RUNS".to_string())
    }

    pub fn ngs_samples() -> Self {
        Self("NGS_SAMPLES".to_string())
    }

    pub fn ngs_runs(container: &ContainerName) -> Self {
        Self(format!("NGS_RUNS_{}", container.as_str().to_uppercase()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for JobName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReportKind {
    Proteomics,
    NgsRun,
    NgsSample,
}

impl ReportKind {
    pub fn table_name(&self) -> &'static str {
        match self {
            ReportKind::Proteomics => "data_lake.proteomics_stats",
            ReportKind::NgsRun => "data_lake.ngs_run_stats",
            ReportKind::NgsSample => "data_lake.ngs_sample_stats",
        }
    }
}

impl fmt::Display for ReportKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReportKind::Proteomics => write!(f, "proteomics"),
            ReportKind::NgsRun => write!(f, "ngs_run"),
            ReportKind::NgsSample => write!(f, "ngs_sample"),
        }
    }
}
