#![allow(dead_code)]

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

use datalake_stats::blob::{BlobClient, HierarchyEntry, ListingPage};
use datalake_stats::domain::{BlobPrefix, ContainerName, JobName};
use datalake_stats::error::StatsError;
use datalake_stats::report::AggregateReport;
use datalake_stats::sink::AuditSink;
use rust_xlsxwriter::Workbook;
use uuid::Uuid;

pub fn container(name: &str) -> ContainerName {
    name.parse().unwrap()
}

pub fn prefix(value: &str) -> BlobPrefix {
    value.parse().unwrap()
}

/// Blob store held in memory. Listings come back in lexicographic order with
/// at most `page_size` entries per page; continuations are entry offsets.
pub struct MemoryBlobClient {
    containers: BTreeMap<String, BTreeMap<String, Vec<u8>>>,
    page_size: usize,
    fail_on_list_call: Option<usize>,
    list_calls: AtomicUsize,
    download_calls: AtomicUsize,
}

impl MemoryBlobClient {
    pub fn new(page_size: usize) -> Self {
        assert!(page_size > 0);
        Self {
            containers: BTreeMap::new(),
            page_size,
            fail_on_list_call: None,
            list_calls: AtomicUsize::new(0),
            download_calls: AtomicUsize::new(0),
        }
    }

    pub fn with_container(mut self, container: &str) -> Self {
        self.containers.entry(container.to_string()).or_default();
        self
    }

    pub fn with_blob(mut self, container: &str, path: &str, bytes: Vec<u8>) -> Self {
        self.containers
            .entry(container.to_string())
            .or_default()
            .insert(path.to_string(), bytes);
        self
    }

    pub fn with_sized_blob(self, container: &str, path: &str, size: usize) -> Self {
        self.with_blob(container, path, vec![0u8; size])
    }

    /// The `call`-th listing request (1-based) fails with a 503.
    pub fn failing_on_list_call(mut self, call: usize) -> Self {
        self.fail_on_list_call = Some(call);
        self
    }

    pub fn list_calls(&self) -> usize {
        self.list_calls.load(Ordering::SeqCst)
    }

    pub fn download_calls(&self) -> usize {
        self.download_calls.load(Ordering::SeqCst)
    }

    pub fn stored_bytes(&self, container: &str) -> u64 {
        self.containers
            .get(container)
            .map(|blobs| blobs.values().map(|bytes| bytes.len() as u64).sum())
            .unwrap_or(0)
    }

    fn blobs(&self, container: &ContainerName) -> Result<&BTreeMap<String, Vec<u8>>, StatsError> {
        self.containers
            .get(container.as_str())
            .ok_or_else(|| StatsError::BlobStatus {
                status: 404,
                message: "ContainerNotFound".to_string(),
            })
    }
}

impl BlobClient for MemoryBlobClient {
    fn list_page(
        &self,
        container: &ContainerName,
        prefix: &BlobPrefix,
        delimiter: Option<char>,
        cursor: Option<&str>,
    ) -> Result<ListingPage, StatsError> {
        let call = self.list_calls.fetch_add(1, Ordering::SeqCst) + 1;
        if self.fail_on_list_call == Some(call) {
            return Err(StatsError::BlobStatus {
                status: 503,
                message: "ServerBusy".to_string(),
            });
        }

        let blobs = self.blobs(container)?;
        let mut entries = Vec::new();
        let mut seen_folders = BTreeSet::new();
        for (name, bytes) in blobs.range(prefix.as_str().to_string()..) {
            let Some(rest) = name.strip_prefix(prefix.as_str()) else {
                break;
            };
            match delimiter.and_then(|d| rest.find(d).map(|index| index + d.len_utf8())) {
                Some(end) => {
                    let folder = format!("{}{}", prefix.as_str(), &rest[..end]);
                    if seen_folders.insert(folder.clone()) {
                        entries.push(HierarchyEntry::Folder { path: folder });
                    }
                }
                None => entries.push(HierarchyEntry::Blob {
                    path: name.clone(),
                    size_bytes: bytes.len() as u64,
                }),
            }
        }

        let start: usize = cursor.map(|c| c.parse().unwrap()).unwrap_or(0);
        let end = (start + self.page_size).min(entries.len());
        let continuation = (end < entries.len()).then(|| end.to_string());
        Ok(ListingPage {
            entries: entries[start..end].to_vec(),
            continuation,
        })
    }

    fn download(&self, container: &ContainerName, blob_path: &str) -> Result<Vec<u8>, StatsError> {
        self.download_calls.fetch_add(1, Ordering::SeqCst);
        self.blobs(container)?
            .get(blob_path)
            .cloned()
            .ok_or_else(|| StatsError::BlobStatus {
                status: 404,
                message: "BlobNotFound".to_string(),
            })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuditRecord {
    Begin {
        run_id: Uuid,
        pipeline_name: String,
        job_name: String,
        is_delta_load: bool,
    },
    Insert {
        run_id: Uuid,
        report: AggregateReport,
    },
    End {
        run_id: Uuid,
        job_name: String,
        insert_count: Option<i64>,
        error_message: Option<String>,
    },
}

/// Audit sink that keeps every call in memory.
#[derive(Default)]
pub struct RecordingSink {
    records: Mutex<Vec<AuditRecord>>,
    fail_insert: bool,
    fail_end: bool,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing_insert() -> Self {
        Self {
            fail_insert: true,
            ..Self::default()
        }
    }

    pub fn failing_end() -> Self {
        Self {
            fail_end: true,
            ..Self::default()
        }
    }

    pub fn records(&self) -> Vec<AuditRecord> {
        self.records.lock().unwrap().clone()
    }

    pub fn reports(&self) -> Vec<AggregateReport> {
        self.records()
            .into_iter()
            .filter_map(|record| match record {
                AuditRecord::Insert { report, .. } => Some(report),
                _ => None,
            })
            .collect()
    }

    fn push(&self, record: AuditRecord) {
        self.records.lock().unwrap().push(record);
    }
}

impl AuditSink for RecordingSink {
    fn begin_job(
        &self,
        run_id: Uuid,
        pipeline_name: &str,
        job_name: &JobName,
        is_delta_load: bool,
    ) -> Result<(), StatsError> {
        self.push(AuditRecord::Begin {
            run_id,
            pipeline_name: pipeline_name.to_string(),
            job_name: job_name.as_str().to_string(),
            is_delta_load,
        });
        Ok(())
    }

    fn end_job(
        &self,
        run_id: Uuid,
        job_name: &JobName,
        insert_count: Option<i64>,
        error_message: Option<&str>,
    ) -> Result<(), StatsError> {
        if self.fail_end {
            return Err(StatsError::Database("connection refused".to_string()));
        }
        self.push(AuditRecord::End {
            run_id,
            job_name: job_name.as_str().to_string(),
            insert_count,
            error_message: error_message.map(str::to_string),
        });
        Ok(())
    }

    fn insert_report(&self, report: &AggregateReport, run_id: Uuid) -> Result<u64, StatsError> {
        if self.fail_insert {
            return Err(StatsError::Database("relation does not exist".to_string()));
        }
        self.push(AuditRecord::Insert {
            run_id,
            report: report.clone(),
        });
        Ok(1)
    }
}

/// Workbook with one sheet: a header row followed by `data_rows` rows.
pub fn workbook_bytes(sheet_name: &str, data_rows: u32) -> Vec<u8> {
    let mut workbook = Workbook::new();
    let sheet = workbook.add_worksheet();
    sheet.set_name(sheet_name).unwrap();
    sheet.write_string(0, 0, "Sample").unwrap();
    sheet.write_string(0, 1, "Condition").unwrap();
    for row in 1..=data_rows {
        sheet.write_string(row, 0, format!("S{row}")).unwrap();
        sheet.write_number(row, 1, f64::from(row)).unwrap();
    }
    workbook.save_to_buffer().unwrap()
}

pub fn samples_workbook(data_rows: u32) -> Vec<u8> {
    workbook_bytes("Samples", data_rows)
}
