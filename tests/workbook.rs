mod common;

use assert_matches::assert_matches;
use rust_xlsxwriter::Workbook;

use datalake_stats::error::StatsError;
use datalake_stats::workbook::{count_rows, count_sheet_rows};

use common::{MemoryBlobClient, container, samples_workbook, workbook_bytes};

#[test]
fn header_row_is_not_counted() {
    let bytes = samples_workbook(3);
    assert_eq!(count_sheet_rows("RunA/metadata.xlsx", &bytes, "Samples").unwrap(), 3);
}

#[test]
fn header_only_sheet_has_no_rows() {
    let bytes = samples_workbook(0);
    assert_eq!(count_sheet_rows("RunA/metadata.xlsx", &bytes, "Samples").unwrap(), 0);
}

#[test]
fn empty_sheet_has_no_rows() {
    let mut workbook = Workbook::new();
    workbook.add_worksheet().set_name("Samples").unwrap();
    let bytes = workbook.save_to_buffer().unwrap();
    assert_eq!(count_sheet_rows("RunA/metadata.xlsx", &bytes, "Samples").unwrap(), 0);
}

#[test]
fn only_the_named_sheet_is_counted() {
    let mut workbook = Workbook::new();
    let summary = workbook.add_worksheet();
    summary.set_name("Summary").unwrap();
    for row in 0..10 {
        summary.write_number(row, 0, f64::from(row)).unwrap();
    }
    let samples = workbook.add_worksheet();
    samples.set_name("Samples").unwrap();
    samples.write_string(0, 0, "Sample").unwrap();
    samples.write_string(1, 0, "S1").unwrap();
    samples.write_string(2, 0, "S2").unwrap();
    let bytes = workbook.save_to_buffer().unwrap();

    assert_eq!(count_sheet_rows("RunA/metadata.xlsx", &bytes, "Samples").unwrap(), 2);
}

#[test]
fn first_sheet_row_is_the_header_even_when_blank() {
    let mut workbook = Workbook::new();
    let samples = workbook.add_worksheet();
    samples.set_name("Samples").unwrap();
    samples.write_string(1, 0, "Sample").unwrap();
    for row in 2..=4 {
        samples.write_string(row, 0, format!("S{row}")).unwrap();
    }
    let bytes = workbook.save_to_buffer().unwrap();

    assert_eq!(count_sheet_rows("RunA/metadata.xlsx", &bytes, "Samples").unwrap(), 4);
}

#[test]
fn missing_sheet_is_reported() {
    let bytes = workbook_bytes("Sheet1", 4);
    let err = count_sheet_rows("RunA/metadata.xlsx", &bytes, "Samples").unwrap_err();
    assert_matches!(
        err,
        StatsError::SheetNotFound { ref blob, ref sheet }
            if blob == "RunA/metadata.xlsx" && sheet == "Samples"
    );
}

#[test]
fn unreadable_bytes_are_a_parse_error() {
    let err = count_sheet_rows("RunA/metadata.xlsx", b"PK\x03\x04 truncated", "Samples")
        .unwrap_err();
    assert_matches!(err, StatsError::WorkbookParse { .. });
}

#[test]
fn count_rows_downloads_the_blob() {
    let client = MemoryBlobClient::new(10).with_blob(
        "proteomics",
        "RunA/metadata.xlsx",
        samples_workbook(7),
    );
    let proteomics = container("proteomics");

    assert_eq!(
        count_rows(&client, &proteomics, "RunA/metadata.xlsx", "Samples").unwrap(),
        7
    );
    assert_eq!(client.download_calls(), 1);

    let err = count_rows(&client, &proteomics, "RunB/metadata.xlsx", "Samples").unwrap_err();
    assert_matches!(err, StatsError::BlobStatus { status: 404, .. });
}
