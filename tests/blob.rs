use assert_matches::assert_matches;

use datalake_stats::blob::{AzureBlobClient, BlobCredential, HierarchyEntry, parse_list_blobs};
use datalake_stats::domain::AccountName;
use datalake_stats::error::StatsError;

fn fixture(name: &str) -> String {
    let path = format!("{}/tests/fixtures/{name}", env!("CARGO_MANIFEST_DIR"));
    std::fs::read_to_string(path).unwrap()
}

#[test]
fn hierarchical_listing_keeps_service_order() {
    let page = parse_list_blobs(&fixture("list_blobs_hierarchy.xml")).unwrap();
    assert_eq!(
        page.entries,
        vec![
            HierarchyEntry::Folder {
                path: "RunA/".to_string()
            },
            HierarchyEntry::Blob {
                path: "README.md".to_string(),
                size_bytes: 2048
            },
            HierarchyEntry::Folder {
                path: "RunB/".to_string()
            },
        ]
    );
    assert_eq!(
        page.continuation.as_deref(),
        Some("2!80!MDAwMDE0IVJ1bkIvMDAwMDI4ITk5OTktMTItMzFUMjM6NTk6NTkuOTk5OTk5OVoh")
    );
    assert_eq!(page.folders().count(), 2);
    assert_eq!(page.blobs().count(), 1);
}

#[test]
fn directory_placeholders_are_dropped() {
    let page = parse_list_blobs(&fixture("list_blobs_flat_hns.xml")).unwrap();
    let sizes: Vec<(&str, Option<u64>)> = page
        .entries
        .iter()
        .map(|entry| (entry.path(), entry.size_bytes()))
        .collect();
    assert_eq!(
        sizes,
        vec![
            ("NextSeqOutput/Run1/RunInfo.xml", Some(4312)),
            ("NextSeqOutput/Run1/Data/L001.bcl.gz", Some(734_003_200)),
        ]
    );
    assert_eq!(page.continuation, None);
}

#[test]
fn byte_order_mark_is_tolerated() {
    let page = parse_list_blobs(&fixture("list_blobs_bom.xml")).unwrap();
    assert_eq!(
        page.entries,
        vec![HierarchyEntry::Folder {
            path: "S-001/".to_string()
        }]
    );
    assert_eq!(page.continuation, None);
}

#[test]
fn malformed_listing_is_a_decode_error() {
    let err = parse_list_blobs("<EnumerationResults><Blobs>").unwrap_err();
    assert_matches!(err, StatsError::ListingDecode(_));
}

#[test]
fn default_endpoint_uses_account_host() {
    let account: AccountName = "proteomicslake".parse().unwrap();
    let client = AzureBlobClient::new(&account, BlobCredential::Anonymous).unwrap();
    assert_eq!(
        client.endpoint().as_str(),
        "https://proteomicslake.blob.core.windows.net/"
    );
}

#[test]
fn invalid_endpoint_is_rejected() {
    let result = AzureBlobClient::with_endpoint("not a url", BlobCredential::Anonymous);
    assert_matches!(result, Err(StatsError::InvalidConfig { .. }));
}

#[test]
fn debug_output_hides_the_credential() {
    let client = AzureBlobClient::with_endpoint(
        "http://127.0.0.1:10000/devstoreaccount1",
        BlobCredential::SasToken("sv=2023-11-03&sig=secret".to_string()),
    )
    .unwrap();
    let printed = format!("{client:?}");
    assert!(printed.contains("127.0.0.1:10000"));
    assert!(!printed.contains("secret"));
}
