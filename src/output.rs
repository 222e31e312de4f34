use std::io::{self, Write};

use serde::Serialize;
use tracing::debug;
use uuid::Uuid;

use crate::domain::JobName;
use crate::error::StatsError;
use crate::report::AggregateReport;
use crate::sink::AuditSink;

#[derive(Debug, Clone, Copy)]
pub enum OutputMode {
    Warehouse,
    DryRun,
}

/// Prints reports to stdout instead of storing them. Audit records are
/// only logged.
pub struct JsonOutput;

impl JsonOutput {
    pub fn print_report(report: &AggregateReport) -> io::Result<()> {
        Self::print_json(report)
    }

    fn print_json<T: Serialize>(value: &T) -> io::Result<()> {
        let json = serde_json::to_string_pretty(value).map_err(io::Error::other)?;
        let mut stdout = io::stdout();
        stdout.write_all(json.as_bytes())?;
        stdout.write_all(b"\n")?;
        Ok(())
    }
}

impl AuditSink for JsonOutput {
    fn begin_job(
        &self,
        run_id: Uuid,
        pipeline_name: &str,
        job_name: &JobName,
        is_delta_load: bool,
    ) -> Result<(), StatsError> {
        debug!(%run_id, pipeline_name, job = %job_name, is_delta_load, "dry run: job begin");
        Ok(())
    }

    fn end_job(
        &self,
        run_id: Uuid,
        job_name: &JobName,
        insert_count: Option<i64>,
        error_message: Option<&str>,
    ) -> Result<(), StatsError> {
        debug!(%run_id, job = %job_name, ?insert_count, ?error_message, "dry run: job end");
        Ok(())
    }

    fn insert_report(&self, report: &AggregateReport, _run_id: Uuid) -> Result<u64, StatsError> {
        Self::print_report(report).map_err(|err| StatsError::Output(err.to_string()))?;
        Ok(1)
    }
}
