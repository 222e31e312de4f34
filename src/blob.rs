use std::fmt;

use reqwest::Url;
use reqwest::blocking::{Client, RequestBuilder, Response};
use reqwest::header::{HeaderMap, HeaderValue, USER_AGENT};
use serde::Deserialize;

use crate::domain::{AccountName, BlobPrefix, ContainerName, SEPARATOR};
use crate::error::StatsError;

/// REST API version sent with every storage request.
const STORAGE_API_VERSION: &str = "2023-11-03";

/// One result of a listing call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HierarchyEntry {
    /// Virtual folder inferred from the delimiter. The path ends with the separator.
    Folder { path: String },
    Blob { path: String, size_bytes: u64 },
}

impl HierarchyEntry {
    pub fn is_folder(&self) -> bool {
        matches!(self, HierarchyEntry::Folder { .. })
    }

    pub fn path(&self) -> &str {
        match self {
            HierarchyEntry::Folder { path } | HierarchyEntry::Blob { path, .. } => path,
        }
    }

    pub fn size_bytes(&self) -> Option<u64> {
        match self {
            HierarchyEntry::Folder { .. } => None,
            HierarchyEntry::Blob { size_bytes, .. } => Some(*size_bytes),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ListingPage {
    pub entries: Vec<HierarchyEntry>,
    /// Cursor for the next page; `None` once the listing is exhausted.
    pub continuation: Option<String>,
}

impl ListingPage {
    pub fn folders(&self) -> impl Iterator<Item = &HierarchyEntry> {
        self.entries.iter().filter(|entry| entry.is_folder())
    }

    pub fn blobs(&self) -> impl Iterator<Item = &HierarchyEntry> {
        self.entries.iter().filter(|entry| !entry.is_folder())
    }
}

/// Paginated access to one storage account.
pub trait BlobClient: Send + Sync {
    /// Lists one page directly under `prefix`. With a delimiter, nested paths
    /// collapse into folder entries; without one, every blob below `prefix`
    /// is returned. `cursor` is the previous page's continuation.
    fn list_page(
        &self,
        container: &ContainerName,
        prefix: &BlobPrefix,
        delimiter: Option<char>,
        cursor: Option<&str>,
    ) -> Result<ListingPage, StatsError>;

    fn download(&self, container: &ContainerName, blob_path: &str) -> Result<Vec<u8>, StatsError>;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BlobCredential {
    Anonymous,
    /// Shared access signature, appended to every request's query string.
    SasToken(String),
    /// OAuth access token sent as `Authorization: Bearer`.
    Bearer(String),
}

#[derive(Clone)]
pub struct AzureBlobClient {
    client: Client,
    endpoint: Url,
    credential: BlobCredential,
    page_size: Option<u32>,
}

impl fmt::Debug for AzureBlobClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AzureBlobClient")
            .field("endpoint", &self.endpoint.as_str())
            .field("page_size", &self.page_size)
            .finish_non_exhaustive()
    }
}

impl AzureBlobClient {
    pub fn new(account: &AccountName, credential: BlobCredential) -> Result<Self, StatsError> {
        Self::with_endpoint(&default_endpoint(account), credential)
    }

    pub fn with_endpoint(endpoint: &str, credential: BlobCredential) -> Result<Self, StatsError> {
        let endpoint = Url::parse(endpoint).map_err(|err| StatsError::InvalidConfig {
            var: "blob endpoint".to_string(),
            message: format!("{endpoint}: {err}"),
        })?;
        if endpoint.cannot_be_a_base() {
            return Err(StatsError::InvalidConfig {
                var: "blob endpoint".to_string(),
                message: format!("{endpoint} cannot carry a container path"),
            });
        }

        let mut headers = HeaderMap::new();
        headers.insert(
            USER_AGENT,
            HeaderValue::from_str(&format!("datalake-stats/{}", env!("CARGO_PKG_VERSION")))
                .map_err(|err| StatsError::BlobHttp(err.to_string()))?,
        );
        headers.insert("x-ms-version", HeaderValue::from_static(STORAGE_API_VERSION));

        // Listings and downloads run to completion; there is no request deadline.
        let client = Client::builder()
            .default_headers(headers)
            .timeout(None::<std::time::Duration>)
            .build()
            .map_err(|err| StatsError::BlobHttp(err.to_string()))?;

        Ok(Self {
            client,
            endpoint,
            credential,
            page_size: None,
        })
    }

    /// Caps the number of entries per listing page (`maxresults`).
    pub fn with_page_size(mut self, page_size: Option<u32>) -> Self {
        self.page_size = page_size;
        self
    }

    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }

    fn resource_url<'a>(
        &self,
        segments: impl IntoIterator<Item = &'a str>,
    ) -> Result<Url, StatsError> {
        let mut url = self.endpoint.clone();
        url.path_segments_mut()
            .map_err(|_| StatsError::BlobHttp(format!("invalid endpoint {}", self.endpoint)))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    fn apply_sas(&self, url: &mut Url) {
        if let BlobCredential::SasToken(token) = &self.credential {
            let token = token.trim_start_matches('?');
            let query = match url.query() {
                Some(existing) if !existing.is_empty() => format!("{existing}&{token}"),
                _ => token.to_string(),
            };
            url.set_query(Some(&query));
        }
    }

    fn send(&self, mut url: Url) -> Result<Response, StatsError> {
        self.apply_sas(&mut url);
        let request: RequestBuilder = match &self.credential {
            BlobCredential::Bearer(token) => self.client.get(url).bearer_auth(token),
            BlobCredential::Anonymous | BlobCredential::SasToken(_) => self.client.get(url),
        };
        let response = request
            .send()
            .map_err(|err| StatsError::BlobHttp(err.to_string()))?;
        Self::handle_status(response)
    }

    fn handle_status(response: Response) -> Result<Response, StatsError> {
        if response.status().is_success() {
            return Ok(response);
        }
        let status = response.status().as_u16();
        let message = response
            .text()
            .unwrap_or_else(|_| "blob storage request failed".to_string());
        Err(StatsError::BlobStatus { status, message })
    }
}

impl BlobClient for AzureBlobClient {
    fn list_page(
        &self,
        container: &ContainerName,
        prefix: &BlobPrefix,
        delimiter: Option<char>,
        cursor: Option<&str>,
    ) -> Result<ListingPage, StatsError> {
        let mut url = self.resource_url([container.as_str()])?;
        {
            let mut query = url.query_pairs_mut();
            query
                .append_pair("restype", "container")
                .append_pair("comp", "list");
            if !prefix.is_root() {
                query.append_pair("prefix", prefix.as_str());
            }
            if let Some(delimiter) = delimiter {
                query.append_pair("delimiter", delimiter.encode_utf8(&mut [0; 4]));
            }
            if let Some(marker) = cursor {
                query.append_pair("marker", marker);
            }
            if let Some(page_size) = self.page_size {
                query.append_pair("maxresults", &page_size.to_string());
            }
        }

        let body = self
            .send(url)?
            .text()
            .map_err(|err| StatsError::BlobHttp(err.to_string()))?;
        parse_list_blobs(&body)
    }

    fn download(&self, container: &ContainerName, blob_path: &str) -> Result<Vec<u8>, StatsError> {
        let segments = std::iter::once(container.as_str()).chain(blob_path.split(SEPARATOR));
        let url = self.resource_url(segments)?;
        let bytes = self
            .send(url)?
            .bytes()
            .map_err(|err| StatsError::BlobHttp(err.to_string()))?;
        Ok(bytes.to_vec())
    }
}

pub fn default_endpoint(account: &AccountName) -> String {
    format!("https://{}.blob.core.windows.net", account.as_str())
}

#[derive(Debug, Deserialize)]
struct EnumerationResults {
    #[serde(rename = "Blobs", default)]
    blobs: BlobsXml,
    #[serde(rename = "NextMarker", default)]
    next_marker: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct BlobsXml {
    #[serde(rename = "$value", default)]
    items: Vec<BlobItemXml>,
}

#[derive(Debug, Deserialize)]
enum BlobItemXml {
    Blob(BlobXml),
    BlobPrefix(BlobPrefixXml),
}

#[derive(Debug, Deserialize)]
struct BlobXml {
    #[serde(rename = "Name")]
    name: String,
    #[serde(rename = "Properties")]
    properties: BlobPropertiesXml,
}

#[derive(Debug, Deserialize)]
struct BlobPropertiesXml {
    #[serde(rename = "Content-Length", default)]
    content_length: Option<u64>,
    #[serde(rename = "ResourceType", default)]
    resource_type: Option<String>,
}

#[derive(Debug, Deserialize)]
struct BlobPrefixXml {
    #[serde(rename = "Name")]
    name: String,
}

/// Decodes a List Blobs response body into a [`ListingPage`].
///
/// Directory placeholders of hierarchical-namespace accounts are dropped: they
/// are neither delimiter folders nor data.
pub fn parse_list_blobs(xml: &str) -> Result<ListingPage, StatsError> {
    let xml = xml.trim_start_matches('\u{feff}');
    let results: EnumerationResults =
        quick_xml::de::from_str(xml).map_err(|err| StatsError::ListingDecode(err.to_string()))?;

    let entries = results
        .blobs
        .items
        .into_iter()
        .filter_map(|item| match item {
            BlobItemXml::BlobPrefix(prefix) => Some(HierarchyEntry::Folder { path: prefix.name }),
            BlobItemXml::Blob(blob) => {
                let is_directory = blob
                    .properties
                    .resource_type
                    .as_deref()
                    .is_some_and(|kind| kind.eq_ignore_ascii_case("directory"));
                (!is_directory).then(|| HierarchyEntry::Blob {
                    path: blob.name,
                    size_bytes: blob.properties.content_length.unwrap_or(0),
                })
            }
        })
        .collect();

    let continuation = results
        .next_marker
        .map(|marker| marker.trim().to_string())
        .filter(|marker| !marker.is_empty());

    Ok(ListingPage {
        entries,
        continuation,
    })
}
