use sqlx::postgres::{PgArguments, PgConnectOptions, PgSslMode};
use sqlx::query::Query;
use sqlx::{Connection, PgConnection, Postgres};
use tokio::runtime::Runtime;
use tracing::debug;
use uuid::Uuid;

use crate::config::DatabaseConfig;
use crate::domain::JobName;
use crate::error::StatsError;
use crate::report::AggregateReport;

/// Pipeline name recorded with every job in the audit log.
pub const PIPELINE_NAME: &str = "collect-data-lake-stats";

/// Job audit log and stats tables of the warehouse.
pub trait AuditSink: Send + Sync {
    fn begin_job(
        &self,
        run_id: Uuid,
        pipeline_name: &str,
        job_name: &JobName,
        is_delta_load: bool,
    ) -> Result<(), StatsError>;

    fn end_job(
        &self,
        run_id: Uuid,
        job_name: &JobName,
        insert_count: Option<i64>,
        error_message: Option<&str>,
    ) -> Result<(), StatsError>;

    /// Stores one report and returns the number of rows inserted.
    fn insert_report(&self, report: &AggregateReport, run_id: Uuid) -> Result<u64, StatsError>;
}

/// PostgreSQL warehouse. Every call opens its own connection and closes it
/// before returning.
pub struct PostgresSink {
    runtime: Runtime,
    options: PgConnectOptions,
}

impl PostgresSink {
    pub fn new(config: &DatabaseConfig) -> Result<Self, StatsError> {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .map_err(|err| StatsError::Runtime(err.to_string()))?;
        let options = PgConnectOptions::new()
            .host(&config.host)
            .port(config.port)
            .database(&config.database)
            .username(&config.user)
            .password(&config.password)
            .ssl_mode(PgSslMode::Prefer);
        Ok(Self { runtime, options })
    }

    fn execute(&self, query: Query<'_, Postgres, PgArguments>) -> Result<u64, StatsError> {
        self.runtime.block_on(async {
            let mut connection = PgConnection::connect_with(&self.options)
                .await
                .map_err(database_error)?;
            let outcome = query.execute(&mut connection).await;
            let closed = connection.close().await;
            let done = outcome.map_err(database_error)?;
            closed.map_err(database_error)?;
            Ok::<u64, StatsError>(done.rows_affected())
        })
    }
}

impl AuditSink for PostgresSink {
    fn begin_job(
        &self,
        run_id: Uuid,
        pipeline_name: &str,
        job_name: &JobName,
        is_delta_load: bool,
    ) -> Result<(), StatsError> {
        let query = sqlx::query("CALL log.job_begin($1, $2, $3, $4)")
            .bind(run_id)
            .bind(pipeline_name.to_string())
            .bind(job_name.as_str().to_string())
            .bind(is_delta_load);
        self.execute(query)?;
        Ok(())
    }

    fn end_job(
        &self,
        run_id: Uuid,
        job_name: &JobName,
        insert_count: Option<i64>,
        error_message: Option<&str>,
    ) -> Result<(), StatsError> {
        let query = match error_message {
            None => sqlx::query(
                "CALL log.job_end(p_pipeline_run_id => $1, p_job_name => $2, p_insert_count => $3)",
            )
            .bind(run_id)
            .bind(job_name.as_str().to_string())
            .bind(insert_count),
            Some(message) => sqlx::query(
                "CALL log.job_end(p_pipeline_run_id => $1, p_job_name => $2, \
                 p_insert_count => $3, p_error_message => $4)",
            )
            .bind(run_id)
            .bind(job_name.as_str().to_string())
            .bind(insert_count)
            .bind(message.to_string()),
        };
        self.execute(query)?;
        Ok(())
    }

    fn insert_report(&self, report: &AggregateReport, run_id: Uuid) -> Result<u64, StatsError> {
        let collected_at = chrono::Utc::now();
        let query = match report {
            AggregateReport::Proteomics(stats) => sqlx::query(
                "INSERT INTO data_lake.proteomics_stats \
                 (collected_at, no_of_runs, no_of_samples, data_volume_bytes, request_names, pipeline_run_id) \
                 VALUES ($1, $2, $3, $4, $5, $6)",
            )
            .bind(collected_at)
            .bind(to_column(stats.number_of_runs, "no_of_runs")?)
            .bind(to_column(stats.number_of_samples, "no_of_samples")?)
            .bind(to_column(stats.size_in_bytes, "data_volume_bytes")?)
            .bind(encode_names(&stats.request_names)?)
            .bind(run_id),
            AggregateReport::NgsRun(stats) => sqlx::query(
                "INSERT INTO data_lake.ngs_run_stats \
                 (collected_at, no_of_runs, data_volume_bytes, seq_machine, pipeline_run_id) \
                 VALUES ($1, $2, $3, $4, $5)",
            )
            .bind(collected_at)
            .bind(to_column(stats.number_of_runs, "no_of_runs")?)
            .bind(to_column(stats.size_in_bytes, "data_volume_bytes")?)
            .bind(stats.seq_machine.clone())
            .bind(run_id),
            AggregateReport::NgsSample(stats) => sqlx::query(
                "INSERT INTO data_lake.ngs_sample_stats \
                 (collected_at, no_of_samples, data_volume_bytes, sample_names, pipeline_run_id) \
                 VALUES ($1, $2, $3, $4, $5)",
            )
            .bind(collected_at)
            .bind(to_column(stats.number_of_samples, "no_of_samples")?)
            .bind(to_column(stats.size_in_bytes, "data_volume_bytes")?)
            .bind(encode_names(&stats.sample_names)?)
            .bind(run_id),
        };
        let rows = self.execute(query)?;
        debug!(table = report.kind().table_name(), rows, "inserted report");
        Ok(rows)
    }
}

/// Name lists are stored as JSON array text.
pub fn encode_names(names: &[String]) -> Result<String, StatsError> {
    serde_json::to_string(names).map_err(|err| StatsError::NameEncoding(err.to_string()))
}

fn to_column(value: u64, column: &str) -> Result<i64, StatsError> {
    i64::try_from(value).map_err(|_| StatsError::CountOverflow(format!("{column}={value}")))
}

fn database_error(err: sqlx::Error) -> StatsError {
    StatsError::Database(err.to_string())
}
