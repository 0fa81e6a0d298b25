//! End-to-end export against in-process Elasticsearch and Cloud Storage stubs

mod common;

use cloud_storage_dump::error::{ConnectionError, DumpError, RetrievalError, UploadError};
use cloud_storage_dump::export::ExportService;
use cloud_storage_dump::retrieval::SearchClient;
use cloud_storage_dump::storage::GcsStorage;
use serde_json::{Value, json};
use tempfile::TempDir;

use common::{ACCESS_TOKEN, BUCKET, CLIENT_EMAIL, KEY_ID, SearchStub, StorageStub};

struct Harness {
    search: SearchStub,
    storage: StorageStub,
    service: ExportService,
    storage_addr: std::net::SocketAddr,
    scratch: TempDir,
    _keys: TempDir,
}

async fn harness(search: SearchStub, storage: StorageStub, page_size: u32) -> Harness {
    let search_addr = search.start().await;
    let storage_addr = storage.start().await;

    let keys = tempfile::tempdir().unwrap();
    let key_file = common::write_key_file(keys.path(), storage_addr);
    let scratch = tempfile::tempdir().unwrap();

    let source = SearchClient::connect(&common::search_config(search_addr, page_size))
        .await
        .expect("search stub should accept the probe");
    let sink = GcsStorage::connect(&common::storage_config(storage_addr, &key_file))
        .await
        .expect("storage stub should accept the bucket probe");
    let service = ExportService::new(Box::new(source), Box::new(sink))
        .with_scratch_root(Some(scratch.path().to_path_buf()));

    Harness {
        search,
        storage,
        service,
        storage_addr,
        scratch,
        _keys: keys,
    }
}

fn scratch_is_empty(dir: &TempDir) -> bool {
    std::fs::read_dir(dir.path()).unwrap().next().is_none()
}

fn orders() -> Vec<Value> {
    vec![
        json!({ "id": 1, "customer": "Alice", "total": 19.99 }),
        json!({ "id": 2, "customer": "Bob", "total": 5 }),
        json!({ "id": 3, "customer": "Carol, Jr.", "total": 42.5, "gift": true }),
        json!({ "id": 4, "customer": "Dave" }),
        json!({ "id": 5, "customer": "Eve", "total": 0, "tags": ["new", "eu"] }),
    ]
}

#[tokio::test]
async fn csv_export_walks_every_scroll_page() {
    let h = harness(SearchStub::new(orders()), StorageStub::new(), 2).await;

    let report = h.service.export_to_storage("orders", "csv").await.unwrap();

    assert_eq!(report.blob_name, "orders.csv");
    // Uploads go to the stub endpoint, the URL uses the public base
    assert_eq!(
        report.public_url,
        format!("https://storage.googleapis.com/{}/orders.csv", BUCKET)
    );
    assert_eq!(report.records, 5);

    {
        let search = h.search.state();
        assert_eq!(search.searches.len(), 1);
        let (index, body) = &search.searches[0];
        assert_eq!(index, "orders");
        assert_eq!(body["size"], 2);
        assert_eq!(body["query"], json!({ "match_all": {} }));
        assert_eq!(body["track_total_hits"], true);
        // 2 + 2 + 1 documents, then one empty page ends the scan
        assert_eq!(search.scroll_requests, 3);
        assert_eq!(search.released.len(), 1);
    }

    let storage = h.storage.state();
    assert_eq!(storage.uploads.len(), 1);
    let upload = &storage.uploads[0];
    assert_eq!(upload.bucket, BUCKET);
    assert_eq!(upload.name, "orders.csv");
    assert_eq!(upload.content_type, "text/csv");
    assert_eq!(upload.authorization, format!("Bearer {}", ACCESS_TOKEN));
    assert_eq!(report.bytes, upload.body.len() as u64);

    let text = String::from_utf8(upload.body.clone()).unwrap();
    let lines: Vec<&str> = text.lines().collect();
    assert_eq!(lines[0], "id,customer,total,gift,tags");
    assert_eq!(lines[3], "3,\"Carol, Jr.\",42.5,true,");
    assert_eq!(lines[4], "4,Dave,,,");
    assert_eq!(lines[5], r#"5,Eve,0,,"[""new"",""eu""]""#);
    assert_eq!(lines.len(), 6);

    assert!(scratch_is_empty(&h.scratch));
}

#[tokio::test]
async fn public_url_follows_the_configured_public_base() {
    let search = SearchStub::new(orders());
    let storage = StorageStub::new();
    let search_addr = search.start().await;
    let storage_addr = storage.start().await;
    let keys = tempfile::tempdir().unwrap();
    let key_file = common::write_key_file(keys.path(), storage_addr);
    let mut config = common::storage_config(storage_addr, &key_file);
    config.public_base = "https://downloads.example.com/".to_string();

    let source = SearchClient::connect(&common::search_config(search_addr, 10))
        .await
        .unwrap();
    let sink = GcsStorage::connect(&config).await.unwrap();
    let report = ExportService::new(Box::new(source), Box::new(sink))
        .export_to_storage("orders", "json")
        .await
        .unwrap();

    assert_eq!(
        report.public_url,
        format!("https://downloads.example.com/{}/orders.json", BUCKET)
    );
    assert_eq!(storage.state().uploads[0].name, "orders.json");
}

#[tokio::test]
async fn storage_token_is_a_signed_service_account_assertion() {
    let h = harness(SearchStub::new(orders()), StorageStub::new(), 10).await;

    h.service.export_to_storage("orders", "json").await.unwrap();

    let storage = h.storage.state();
    // Bucket probe and upload share one cached token
    assert_eq!(storage.token_requests, 1);
    assert_eq!(storage.bucket_probes, vec![BUCKET.to_string()]);
    assert_eq!(storage.key_ids, vec![Some(KEY_ID.to_string())]);

    let claims = &storage.claims[0];
    assert_eq!(claims["iss"], CLIENT_EMAIL);
    assert_eq!(claims["aud"], common::token_uri(h.storage_addr));
    assert_eq!(
        claims["scope"],
        "https://www.googleapis.com/auth/devstorage.read_write"
    );
    assert!(claims["exp"].as_i64().unwrap() > claims["iat"].as_i64().unwrap());

    let upload = &storage.uploads[0];
    assert_eq!(upload.content_type, "application/json");
    let parsed: Value = serde_json::from_slice(&upload.body).unwrap();
    assert_eq!(parsed.as_array().unwrap().len(), 5);
    assert_eq!(parsed[3]["total"], Value::Null);
}

#[tokio::test]
async fn unknown_format_never_scans_the_index() {
    let h = harness(SearchStub::new(orders()), StorageStub::new(), 2).await;

    let result = h.service.export_to_storage("orders", "parquet").await;

    assert!(matches!(result, Err(DumpError::InvalidFormat(ref tag)) if tag == "parquet"));
    assert!(h.search.state().searches.is_empty());
    assert!(h.storage.state().uploads.is_empty());
}

#[tokio::test]
async fn short_scan_is_reported_as_incomplete() {
    let search = SearchStub::new(orders()).with_reported_total(7);
    let h = harness(search, StorageStub::new(), 2).await;

    let result = h.service.export_to_storage("orders", "csv").await;

    assert!(matches!(
        result,
        Err(DumpError::Retrieval(RetrievalError::Incomplete {
            expected: 7,
            retrieved: 5
        }))
    ));
    assert!(h.storage.state().uploads.is_empty());
    assert_eq!(h.search.state().released.len(), 1);
}

#[tokio::test]
async fn mid_scan_failure_aborts_the_export() {
    let search = SearchStub::new(orders()).with_scroll_failure_at(2);
    let h = harness(search, StorageStub::new(), 2).await;

    let result = h.service.export_to_storage("orders", "xlsx").await;

    assert!(matches!(
        result,
        Err(DumpError::Retrieval(RetrievalError::Status { status: 500, .. }))
    ));
    assert!(h.storage.state().uploads.is_empty());
    assert!(scratch_is_empty(&h.scratch));
}

#[tokio::test]
async fn rejected_upload_still_cleans_scratch() {
    let h = harness(
        SearchStub::new(orders()),
        StorageStub::new().with_upload_status(503),
        10,
    )
    .await;

    let result = h.service.export_to_storage("orders", "xlsx").await;

    assert!(matches!(
        result,
        Err(DumpError::Upload(UploadError::Rejected { status: 503, .. }))
    ));
    assert!(scratch_is_empty(&h.scratch));
}

#[tokio::test]
async fn failed_health_probe_is_a_connection_error() {
    let stub = SearchStub::new(orders()).with_health_status(503);
    let addr = stub.start().await;

    let result = SearchClient::connect(&common::search_config(addr, 10)).await;

    assert!(matches!(
        result,
        Err(DumpError::Connection(ConnectionError::Rejected { status: 503, .. }))
    ));
    assert!(stub.state().searches.is_empty());
}

#[tokio::test]
async fn basic_auth_is_sent_when_configured() {
    let stub = SearchStub::new(Vec::new());
    let addr = stub.start().await;
    let mut config = common::search_config(addr, 10);
    config.username = Some("elastic".to_string());
    config.password = Some("changeme".to_string());

    SearchClient::connect(&config).await.unwrap();

    // base64("elastic:changeme")
    assert_eq!(
        stub.state().authorization.as_deref(),
        Some("Basic ZWxhc3RpYzpjaGFuZ2VtZQ==")
    );
}

#[tokio::test]
async fn missing_bucket_fails_before_any_upload() {
    let storage = StorageStub::new();
    let addr = storage.start().await;
    let keys = tempfile::tempdir().unwrap();
    let key_file = common::write_key_file(keys.path(), addr);
    let mut config = common::storage_config(addr, &key_file);
    config.bucket = Some("no-such-bucket".to_string());

    let result = GcsStorage::connect(&config).await;

    assert!(matches!(
        result,
        Err(DumpError::Upload(UploadError::BucketUnavailable { ref bucket, .. })) if bucket == "no-such-bucket"
    ));
    assert!(storage.state().uploads.is_empty());
}

#[tokio::test]
async fn empty_index_uploads_an_empty_array() {
    let h = harness(SearchStub::new(Vec::new()), StorageStub::new(), 10).await;

    let report = h.service.export_to_storage("empty", "json").await.unwrap();

    assert_eq!(report.records, 0);
    assert_eq!(h.storage.state().uploads[0].body, b"[]".to_vec());
}
