use serde::Serialize;
use tracing::{debug, error, info};
use uuid::Uuid;

use crate::blob::BlobClient;
use crate::config::{Datasets, NgsRunSource};
use crate::domain::{BlobPrefix, ContainerName, JobName};
use crate::error::StatsError;
use crate::report::{
    AggregateReport, build_ngs_run_stats, build_ngs_sample_stats, build_proteomics_stats,
};
use crate::sink::{AuditSink, PIPELINE_NAME};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    NotStarted,
    Running,
    Finished,
    Failed,
}

impl JobStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, JobStatus::Finished | JobStatus::Failed)
    }
}

/// One audit-logged collection job.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CollectionJob {
    pub pipeline_run_id: Uuid,
    pub job_name: JobName,
    pub status: JobStatus,
    pub insert_count: Option<i64>,
    pub error_message: Option<String>,
}

impl CollectionJob {
    pub fn new(pipeline_run_id: Uuid, job_name: JobName) -> Self {
        Self {
            pipeline_run_id,
            job_name,
            status: JobStatus::NotStarted,
            insert_count: None,
            error_message: None,
        }
    }

    fn begin<S: AuditSink + ?Sized>(&mut self, sink: &S) -> Result<(), StatsError> {
        debug_assert_eq!(self.status, JobStatus::NotStarted);
        sink.begin_job(self.pipeline_run_id, PIPELINE_NAME, &self.job_name, false)?;
        self.status = JobStatus::Running;
        Ok(())
    }

    fn finish<S: AuditSink + ?Sized>(
        &mut self,
        sink: &S,
        insert_count: i64,
    ) -> Result<(), StatsError> {
        debug_assert!(!self.status.is_terminal());
        // A terminal state is final even if recording it fails.
        self.status = JobStatus::Finished;
        self.insert_count = Some(insert_count);
        sink.end_job(self.pipeline_run_id, &self.job_name, Some(insert_count), None)
    }

    fn fail<S: AuditSink + ?Sized>(&mut self, sink: &S, message: String) -> Result<(), StatsError> {
        debug_assert!(!self.status.is_terminal());
        self.status = JobStatus::Failed;
        self.insert_count = Some(0);
        let result = sink.end_job(self.pipeline_run_id, &self.job_name, Some(0), Some(&message));
        self.error_message = Some(message);
        result
    }
}

/// Runs one job: begin record, `collect`, insert, finish record.
///
/// On any error from `collect` or the insert, the job is recorded as failed
/// with the error's message and that error is returned. If the failure record
/// itself cannot be written, that error is returned instead.
pub fn run_job<S, F>(
    sink: &S,
    pipeline_run_id: Uuid,
    job_name: JobName,
    collect: F,
) -> Result<CollectionJob, StatsError>
where
    S: AuditSink + ?Sized,
    F: FnOnce() -> Result<AggregateReport, StatsError>,
{
    let mut job = CollectionJob::new(pipeline_run_id, job_name);
    job.begin(sink)?;
    info!(job = %job.job_name, run_id = %pipeline_run_id, "job started");

    let outcome = collect().and_then(|report| {
        debug!(
            job = %job.job_name,
            kind = %report.kind(),
            bytes = report.size_in_bytes(),
            "aggregated report"
        );
        let rows = sink.insert_report(&report, pipeline_run_id)?;
        i64::try_from(rows).map_err(|_| StatsError::CountOverflow(format!("insert_count={rows}")))
    });

    match outcome {
        Ok(insert_count) => {
            job.finish(sink, insert_count)?;
            info!(job = %job.job_name, insert_count, "job finished");
            Ok(job)
        }
        Err(err) => {
            error!(
                job = %job.job_name,
                transient = err.is_transient(),
                error = %err,
                "job failed"
            );
            job.fail(sink, err.to_string())?;
            Err(err)
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct RunSummary {
    pub pipeline_run_id: Uuid,
    pub jobs: Vec<CollectionJob>,
}

/// Collection jobs over the proteomics and NGS storage accounts.
pub struct App<P: BlobClient, N: BlobClient, S: AuditSink> {
    proteomics: P,
    ngs: N,
    sink: S,
}

impl<P: BlobClient, N: BlobClient, S: AuditSink> App<P, N, S> {
    pub fn new(proteomics: P, ngs: N, sink: S) -> Self {
        Self {
            proteomics,
            ngs,
            sink,
        }
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }

    pub fn collect_proteomics(
        &self,
        pipeline_run_id: Uuid,
        container: &ContainerName,
    ) -> Result<CollectionJob, StatsError> {
        run_job(&self.sink, pipeline_run_id, JobName::proteomics_runs(), || {
            build_proteomics_stats(&self.proteomics, container).map(AggregateReport::Proteomics)
        })
    }

    pub fn collect_ngs_samples(
        &self,
        pipeline_run_id: Uuid,
        container: &ContainerName,
    ) -> Result<CollectionJob, StatsError> {
        run_job(&self.sink, pipeline_run_id, JobName::ngs_samples(), || {
            build_ngs_sample_stats(&self.ngs, container).map(AggregateReport::NgsSample)
        })
    }

    pub fn collect_ngs_runs(
        &self,
        pipeline_run_id: Uuid,
        container: &ContainerName,
        prefix: &BlobPrefix,
    ) -> Result<CollectionJob, StatsError> {
        run_job(&self.sink, pipeline_run_id, JobName::ngs_runs(container), || {
            let mut stats = build_ngs_run_stats(&self.ngs, container, prefix)?;
            stats.seq_machine = container.as_str().to_string();
            Ok(AggregateReport::NgsRun(stats))
        })
    }

    /// Proteomics, then NGS samples, then each sequencer's runs. The first
    /// failing job stops the run.
    pub fn collect_all(
        &self,
        pipeline_run_id: Uuid,
        datasets: &Datasets,
    ) -> Result<RunSummary, StatsError> {
        let mut jobs = Vec::with_capacity(2 + datasets.ngs_runs.len());

        info!(container = %datasets.proteomics_container, "collecting proteomics stats");
        jobs.push(self.collect_proteomics(pipeline_run_id, &datasets.proteomics_container)?);

        info!(container = %datasets.ngs_samples_container, "collecting NGS sample stats");
        jobs.push(self.collect_ngs_samples(pipeline_run_id, &datasets.ngs_samples_container)?);

        for NgsRunSource { container, prefix } in &datasets.ngs_runs {
            info!(container = %container, prefix = %prefix, "collecting NGS run stats");
            jobs.push(self.collect_ngs_runs(pipeline_run_id, container, prefix)?);
        }

        Ok(RunSummary {
            pipeline_run_id,
            jobs,
        })
    }
}
