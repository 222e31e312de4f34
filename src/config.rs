use std::fmt;
use std::str::FromStr;

use crate::blob::{AzureBlobClient, BlobCredential, default_endpoint};
use crate::domain::{AccountName, BlobPrefix, ContainerName};
use crate::error::StatsError;

/// Folder holding NextSeq run output inside its container.
pub const NEXTSEQ_PREFIX: &str = "NextSeqOutput/";

/// Folder holding MiSeq run output inside its container.
pub const MISEQ_PREFIX: &str = "MiSeqOutput/";

pub const DEFAULT_DATABASE_PORT: u16 = 5432;

#[derive(Clone)]
pub struct DatabaseConfig {
    pub host: String,
    pub port: u16,
    pub database: String,
    pub user: String,
    pub password: String,
}

impl fmt::Debug for DatabaseConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DatabaseConfig")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("database", &self.database)
            .field("user", &self.user)
            .finish_non_exhaustive()
    }
}

#[derive(Debug, Clone)]
pub struct StorageAccountConfig {
    pub account: AccountName,
    pub endpoint: Option<String>,
    pub credential: BlobCredential,
}

impl StorageAccountConfig {
    pub fn endpoint(&self) -> String {
        self.endpoint
            .clone()
            .unwrap_or_else(|| default_endpoint(&self.account))
    }

    pub fn client(&self, page_size: Option<u32>) -> Result<AzureBlobClient, StatsError> {
        let client = match &self.endpoint {
            Some(endpoint) => AzureBlobClient::with_endpoint(endpoint, self.credential.clone())?,
            None => AzureBlobClient::new(&self.account, self.credential.clone())?,
        };
        Ok(client.with_page_size(page_size))
    }
}

/// Sequencer output folder scanned by one NGS run job.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NgsRunSource {
    pub container: ContainerName,
    pub prefix: BlobPrefix,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Datasets {
    pub proteomics_container: ContainerName,
    pub ngs_samples_container: ContainerName,
    /// Scanned in this order.
    pub ngs_runs: Vec<NgsRunSource>,
}

#[derive(Debug, Clone)]
pub struct ResolvedConfig {
    pub proteomics: StorageAccountConfig,
    pub ngs: StorageAccountConfig,
    pub datasets: Datasets,
    pub page_size: Option<u32>,
}

pub struct ConfigLoader;

impl ConfigLoader {
    pub fn from_env() -> Result<ResolvedConfig, StatsError> {
        Self::resolve(|name| std::env::var(name).ok())
    }

    pub fn database_from_env() -> Result<DatabaseConfig, StatsError> {
        Self::resolve_database(|name| std::env::var(name).ok())
    }

    pub fn resolve<F>(lookup: F) -> Result<ResolvedConfig, StatsError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let shared_token = optional(&lookup, "AZURE_STORAGE_TOKEN");

        let proteomics = StorageAccountConfig {
            account: parse_var(&lookup, "PROTEOMICS_ACCOUNT")?,
            endpoint: optional(&lookup, "PROTEOMICS_BLOB_ENDPOINT"),
            credential: credential(
                optional(&lookup, "PROTEOMICS_SAS_TOKEN"),
                shared_token.clone(),
            ),
        };
        let ngs = StorageAccountConfig {
            account: parse_var(&lookup, "NGS_ACCOUNT")?,
            endpoint: optional(&lookup, "NGS_BLOB_ENDPOINT"),
            credential: credential(optional(&lookup, "NGS_SAS_TOKEN"), shared_token),
        };

        let datasets = Datasets {
            proteomics_container: parse_var(&lookup, "PROTEOMICS_CONTAINER")?,
            ngs_samples_container: parse_var(&lookup, "NGS_SAMPLES_CONTAINER")?,
            ngs_runs: vec![
                NgsRunSource {
                    container: parse_var(&lookup, "NGS_NEXTSEQ_CONTAINER")?,
                    prefix: NEXTSEQ_PREFIX.parse()?,
                },
                NgsRunSource {
                    container: parse_var(&lookup, "NGS_MISEQ_CONTAINER")?,
                    prefix: MISEQ_PREFIX.parse()?,
                },
            ],
        };

        let page_size = match optional(&lookup, "STATS_PAGE_SIZE") {
            Some(value) => Some(parse_number::<u32>("STATS_PAGE_SIZE", &value)?)
                .filter(|size| *size > 0),
            None => None,
        };

        Ok(ResolvedConfig {
            proteomics,
            ngs,
            datasets,
            page_size,
        })
    }

    pub fn resolve_database<F>(lookup: F) -> Result<DatabaseConfig, StatsError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let port = match optional(&lookup, "DWH_PORT") {
            Some(value) => parse_number::<u16>("DWH_PORT", &value)?,
            None => DEFAULT_DATABASE_PORT,
        };
        Ok(DatabaseConfig {
            host: required(&lookup, "DWH_SERVER_NAME")?,
            port,
            database: required(&lookup, "DWH_DB_NAME")?,
            user: required(&lookup, "DWH_USER_NAME")?,
            password: required(&lookup, "DWH_PASSWORD")?,
        })
    }
}

fn optional<F: Fn(&str) -> Option<String>>(lookup: &F, name: &str) -> Option<String> {
    lookup(name)
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

fn required<F: Fn(&str) -> Option<String>>(lookup: &F, name: &str) -> Result<String, StatsError> {
    optional(lookup, name).ok_or_else(|| StatsError::MissingConfig(name.to_string()))
}

fn parse_var<T, F>(lookup: &F, name: &str) -> Result<T, StatsError>
where
    T: FromStr<Err = StatsError>,
    F: Fn(&str) -> Option<String>,
{
    required(lookup, name)?.parse()
}

fn parse_number<T>(name: &str, value: &str) -> Result<T, StatsError>
where
    T: FromStr,
    T::Err: fmt::Display,
{
    value.parse().map_err(|err: T::Err| StatsError::InvalidConfig {
        var: name.to_string(),
        message: err.to_string(),
    })
}

fn credential(sas_token: Option<String>, bearer_token: Option<String>) -> BlobCredential {
    match (sas_token, bearer_token) {
        (Some(token), _) => BlobCredential::SasToken(token),
        (None, Some(token)) => BlobCredential::Bearer(token),
        (None, None) => BlobCredential::Anonymous,
    }
}
