use miette::Diagnostic;
use thiserror::Error;

#[derive(Debug, Error, Diagnostic)]
pub enum StatsError {
    #[error("invalid storage account name: {0}")]
    InvalidAccountName(String),

    #[error("invalid container name: {0}")]
    InvalidContainerName(String),

    #[error("invalid blob prefix (must be empty or end with '/'): {0}")]
    InvalidPrefix(String),

    #[error("missing required environment variable {0}")]
    #[diagnostic(help("the collector reads its settings from the process environment"))]
    MissingConfig(String),

    #[error("invalid value for {var}: {message}")]
    InvalidConfig { var: String, message: String },

    #[error("blob storage request failed: {0}")]
    BlobHttp(String),

    #[error("blob storage returned status {status}: {message}")]
    BlobStatus { status: u16, message: String },

    #[error("failed to decode blob listing: {0}")]
    ListingDecode(String),

    #[error("failed to read workbook {blob}: {message}")]
    WorkbookParse { blob: String, message: String },

    #[error("sheet {sheet:?} not found in workbook {blob}")]
    SheetNotFound { blob: String, sheet: String },

    #[error("database operation failed: {0}")]
    Database(String),

    #[error("failed to encode name list: {0}")]
    NameEncoding(String),

    #[error("value out of range for warehouse column: {0}")]
    CountOverflow(String),

    #[error("failed to write report output: {0}")]
    Output(String),

    #[error("failed to start database runtime: {0}")]
    Runtime(String),
}

impl StatsError {
    /// Remote failures (network, throttling, auth). Nothing in the collector retries them.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            StatsError::BlobHttp(_) | StatsError::BlobStatus { .. } | StatsError::Database(_)
        )
    }
}
