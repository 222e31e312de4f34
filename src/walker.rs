//! Cursor-driven iteration over listing pages.

use tracing::debug;

use crate::blob::{BlobClient, HierarchyEntry, ListingPage};
use crate::domain::{BlobPrefix, ContainerName, SEPARATOR};
use crate::error::StatsError;

/// Lazy, finite sequence of listing pages for one `(container, prefix)`.
///
/// Each call to `next` issues one listing request with the previous page's
/// continuation. Iteration ends after the first page without a continuation,
/// or right after an error is yielded. Errors are passed through untouched.
pub struct FolderPages<'a, C: BlobClient + ?Sized> {
    client: &'a C,
    container: &'a ContainerName,
    prefix: &'a BlobPrefix,
    delimiter: Option<char>,
    cursor: Option<String>,
    pages_read: usize,
    done: bool,
}

impl<'a, C: BlobClient + ?Sized> FolderPages<'a, C> {
    fn new(
        client: &'a C,
        container: &'a ContainerName,
        prefix: &'a BlobPrefix,
        delimiter: Option<char>,
    ) -> Self {
        Self {
            client,
            container,
            prefix,
            delimiter,
            cursor: None,
            pages_read: 0,
            done: false,
        }
    }

    pub fn pages_read(&self) -> usize {
        self.pages_read
    }

    /// Flattens the remaining pages into their entries, in page order.
    pub fn entries(self) -> impl Iterator<Item = Result<HierarchyEntry, StatsError>> + 'a
    where
        C: 'a,
    {
        self.flat_map(|page| -> Box<dyn Iterator<Item = Result<HierarchyEntry, StatsError>>> {
            match page {
                Ok(page) => Box::new(page.entries.into_iter().map(Ok)),
                Err(err) => Box::new(std::iter::once(Err(err))),
            }
        })
    }
}

impl<C: BlobClient + ?Sized> Iterator for FolderPages<'_, C> {
    type Item = Result<ListingPage, StatsError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }

        let result = self.client.list_page(
            self.container,
            self.prefix,
            self.delimiter,
            self.cursor.as_deref(),
        );
        match result {
            Ok(page) => {
                self.pages_read += 1;
                debug!(
                    container = %self.container,
                    prefix = %self.prefix,
                    page = self.pages_read,
                    entries = page.entries.len(),
                    "listing page"
                );
                self.cursor = page.continuation.clone();
                self.done = self.cursor.is_none();
                Some(Ok(page))
            }
            Err(err) => {
                self.done = true;
                Some(Err(err))
            }
        }
    }
}

impl<C: BlobClient + ?Sized> std::iter::FusedIterator for FolderPages<'_, C> {}

/// Pages of the entries directly under `prefix`; deeper paths collapse into folders.
pub fn list_folder<'a, C: BlobClient + ?Sized>(
    client: &'a C,
    container: &'a ContainerName,
    prefix: &'a BlobPrefix,
) -> FolderPages<'a, C> {
    FolderPages::new(client, container, prefix, Some(SEPARATOR))
}

/// Pages of every blob at or below `prefix`, regardless of depth.
pub fn list_flat<'a, C: BlobClient + ?Sized>(
    client: &'a C,
    container: &'a ContainerName,
    prefix: &'a BlobPrefix,
) -> FolderPages<'a, C> {
    FolderPages::new(client, container, prefix, None)
}
