use std::io::Cursor;

use calamine::{Reader, open_workbook_auto_from_rs};
use tracing::debug;

use crate::blob::BlobClient;
use crate::domain::ContainerName;
use crate::error::StatsError;

/// Downloads `blob_path` and counts the data rows of `sheet_name`.
pub fn count_rows<C: BlobClient + ?Sized>(
    client: &C,
    container: &ContainerName,
    blob_path: &str,
    sheet_name: &str,
) -> Result<u64, StatsError> {
    let bytes = client.download(container, blob_path)?;
    debug!(container = %container, blob = blob_path, bytes = bytes.len(), "downloaded workbook");
    count_sheet_rows(blob_path, &bytes, sheet_name)
}

/// Rows of `sheet_name` below its header row. The header is row 1 of the
/// sheet even when it is blank, so every later row up to the last used one
/// counts. An empty sheet has zero rows.
///
/// `blob` only labels errors.
pub fn count_sheet_rows(blob: &str, bytes: &[u8], sheet_name: &str) -> Result<u64, StatsError> {
    let mut workbook =
        open_workbook_auto_from_rs(Cursor::new(bytes)).map_err(|err| StatsError::WorkbookParse {
            blob: blob.to_string(),
            message: err.to_string(),
        })?;

    if !workbook.sheet_names().iter().any(|name| name == sheet_name) {
        return Err(StatsError::SheetNotFound {
            blob: blob.to_string(),
            sheet: sheet_name.to_string(),
        });
    }

    let range = workbook
        .worksheet_range(sheet_name)
        .map_err(|err| StatsError::WorkbookParse {
            blob: blob.to_string(),
            message: err.to_string(),
        })?;

    // `end` is an absolute position, unlike `height` which starts at the first used row.
    Ok(range.end().map(|(row, _)| u64::from(row)).unwrap_or(0))
}
