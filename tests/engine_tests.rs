use async_trait::async_trait;
use chrono::{TimeZone, Utc};
use floe::aws::flow_logs::{FlowLogCatalog, FlowLogPage};
use floe::aws::s3::{ObjectStore, ObjectSummary};
use floe::aws::AwsError;
use floe::engine::{EngineError, IngestionEngine};
use floe::family::{BucketLayout, VpcFlowFamily};
use floe::sink::{EventSink, SinkError};
use floe::store::duckdb::DuckDbTrackingStore;
use floe::store::{Partition, Tracker, TrackingStore};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

const ACCOUNT: &str = "123456789012";
const REGION: &str = "us-east-1";
const FLOW_LOG_ID: &str = "fl-1234";

const SAMPLE_LINE: &str = "2 123456789123 eni-12345678912345678 0.0.0.0 0.0.0.0 3500 52000 6 39 4698 1622505433 1622505730 ACCEPT OK";

/// Bucket fixture: objects keyed by full key, grouped under prefixes the
/// way S3 listing would group them.
#[derive(Default)]
struct FakeBucket {
    accounts: Vec<String>,
    regions: HashMap<String, Vec<String>>,
    objects: Vec<(String, Vec<u8>)>,
    fail_fetch_keys: Vec<String>,
    list_calls: Mutex<Vec<String>>,
}

#[async_trait]
impl ObjectStore for FakeBucket {
    async fn list_objects(&self, prefix: &str) -> Result<Vec<ObjectSummary>, AwsError> {
        self.list_calls.lock().unwrap().push(prefix.to_string());
        Ok(self
            .objects
            .iter()
            .filter(|(key, _)| key.starts_with(prefix))
            .map(|(key, content)| ObjectSummary {
                key: key.clone(),
                size: content.len() as i64,
                created: Utc.with_ymd_and_hms(2023, 1, 5, 8, 0, 0).unwrap(),
            })
            .collect())
    }

    async fn fetch_object(&self, key: &str) -> Result<Vec<u8>, AwsError> {
        if self.fail_fetch_keys.iter().any(|k| k == key) {
            return Err(AwsError::Api("fetch refused".into()));
        }
        self.objects
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, content)| content.clone())
            .ok_or_else(|| AwsError::Api(format!("no such key: {}", key)))
    }

    async fn account_ids(&self) -> Result<Vec<String>, AwsError> {
        Ok(self.accounts.clone())
    }

    async fn regions(&self, account_id: &str) -> Result<Vec<String>, AwsError> {
        Ok(self.regions.get(account_id).cloned().unwrap_or_default())
    }
}

struct FakeCatalog {
    ids_by_region: HashMap<String, Vec<String>>,
    reject_credentials: bool,
}

#[async_trait]
impl FlowLogCatalog for FakeCatalog {
    async fn describe_flow_logs(
        &self,
        region: &str,
        _next_token: Option<String>,
    ) -> Result<FlowLogPage, AwsError> {
        if self.reject_credentials {
            return Err(AwsError::Credentials("AuthFailure: rejected".into()));
        }
        Ok(FlowLogPage {
            ids: self
                .ids_by_region
                .get(region)
                .cloned()
                .unwrap_or_default(),
            next_token: None,
        })
    }
}

#[derive(Default)]
struct CollectingSink {
    batches: Mutex<Vec<Vec<Value>>>,
}

#[async_trait]
impl EventSink for CollectingSink {
    async fn forward(&self, records: &[Value]) -> Result<(), SinkError> {
        self.batches.lock().unwrap().push(records.to_vec());
        Ok(())
    }
}

struct FailingSink;

#[async_trait]
impl EventSink for FailingSink {
    async fn forward(&self, _records: &[Value]) -> Result<(), SinkError> {
        Err(SinkError::Io(std::io::Error::new(
            std::io::ErrorKind::Other,
            "sink down",
        )))
    }
}

fn object_key(date: &str, name: &str) -> String {
    format!(
        "AWSLogs/{acct}/vpcflowlogs/{region}/{date}/{acct}_vpcflowlogs_{region}_{flid}_{name}.log",
        acct = ACCOUNT,
        region = REGION,
        date = date,
        flid = FLOW_LOG_ID,
        name = name
    )
}

fn today() -> String {
    Utc::now().format("%Y/%m/%d").to_string()
}

struct Harness {
    engine: IngestionEngine<VpcFlowFamily>,
    store: Arc<DuckDbTrackingStore>,
    sink: Arc<CollectingSink>,
    bucket: Arc<FakeBucket>,
}

async fn harness_with(
    bucket: FakeBucket,
    catalog: FakeCatalog,
    reparse: bool,
    sink: Option<Arc<dyn EventSink>>,
) -> Harness {
    let store = Arc::new(DuckDbTrackingStore::in_memory("vpcflow").unwrap());
    store.init_schema().await.unwrap();

    let layout = BucketLayout {
        bucket: "test-bucket".into(),
        prefix: "".into(),
        suffix: "".into(),
    };
    let tracker = Tracker::new(store.clone(), layout.bucket_path(), reparse, None, 500);

    let collecting = Arc::new(CollectingSink::default());
    let sink: Arc<dyn EventSink> = sink.unwrap_or_else(|| collecting.clone());

    let bucket = Arc::new(bucket);
    let engine = IngestionEngine::new(
        VpcFlowFamily,
        layout,
        bucket.clone(),
        Arc::new(catalog),
        sink,
        tracker,
        "%Y/%m/%d".into(),
    );

    Harness {
        engine,
        store,
        sink: collecting,
        bucket,
    }
}

fn default_bucket() -> FakeBucket {
    FakeBucket {
        accounts: vec![ACCOUNT.into()],
        regions: HashMap::from([(ACCOUNT.to_string(), vec![REGION.to_string()])]),
        objects: vec![(
            object_key(&today(), "20230105T0800Z_c23ab7"),
            format!("{}\n{}\n", SAMPLE_LINE, SAMPLE_LINE).into_bytes(),
        )],
        ..Default::default()
    }
}

fn default_catalog() -> FakeCatalog {
    FakeCatalog {
        ids_by_region: HashMap::from([(REGION.to_string(), vec![FLOW_LOG_ID.to_string()])]),
        reject_credentials: false,
    }
}

fn partition() -> Partition {
    Partition::new(ACCOUNT, REGION, FLOW_LOG_ID)
}

#[tokio::test]
async fn test_end_to_end_run_forwards_and_marks() {
    let h = harness_with(default_bucket(), default_catalog(), false, None).await;

    h.engine.run(&[], &[]).await.unwrap();

    let batches = h.sink.batches.lock().unwrap();
    assert_eq!(batches.len(), 1);
    assert_eq!(batches[0].len(), 2);
    assert_eq!(batches[0][0]["source"], "vpc");
    assert_eq!(batches[0][0]["start"], "2021-06-01T00:17:13Z");
    drop(batches);

    assert_eq!(h.store.count(&partition()).await.unwrap(), 1);
}

#[tokio::test]
async fn test_second_run_skips_processed_objects() {
    let h = harness_with(default_bucket(), default_catalog(), false, None).await;

    h.engine.run(&[], &[]).await.unwrap();
    h.engine.run(&[], &[]).await.unwrap();

    // Only the first run reached the sink.
    assert_eq!(h.sink.batches.lock().unwrap().len(), 1);
    assert_eq!(h.store.count(&partition()).await.unwrap(), 1);
}

#[tokio::test]
async fn test_reparse_rereads_without_duplicating_rows() {
    let h = harness_with(default_bucket(), default_catalog(), false, None).await;
    h.engine.run(&[], &[]).await.unwrap();

    let h2 = {
        // Same store, reparse tracker.
        let layout = BucketLayout {
            bucket: "test-bucket".into(),
            prefix: "".into(),
            suffix: "".into(),
        };
        let tracker = Tracker::new(h.store.clone(), layout.bucket_path(), true, None, 500);
        let sink = Arc::new(CollectingSink::default());
        let engine = IngestionEngine::new(
            VpcFlowFamily,
            layout,
            Arc::new(default_bucket()),
            Arc::new(default_catalog()),
            sink.clone() as Arc<dyn EventSink>,
            tracker,
            "%Y/%m/%d".into(),
        );
        (engine, sink)
    };

    h2.0.run(&[], &[]).await.unwrap();

    // Reparse re-read the object but did not add a second row.
    assert_eq!(h2.1.batches.lock().unwrap().len(), 1);
    assert_eq!(h.store.count(&partition()).await.unwrap(), 1);
}

#[tokio::test]
async fn test_credential_rejection_aborts_run() {
    let catalog = FakeCatalog {
        ids_by_region: HashMap::new(),
        reject_credentials: true,
    };
    let h = harness_with(default_bucket(), catalog, false, None).await;

    let result = h.engine.run(&[], &[]).await;
    assert!(matches!(result, Err(EngineError::Credentials(_))));
}

#[tokio::test]
async fn test_fetch_failure_skips_only_that_object() {
    let failing_key = object_key(&today(), "bad");
    let good_key = object_key(&today(), "good");
    let mut bucket = default_bucket();
    bucket.objects = vec![
        (failing_key.clone(), b"unused".to_vec()),
        (good_key.clone(), format!("{}\n", SAMPLE_LINE).into_bytes()),
    ];
    bucket.fail_fetch_keys = vec![failing_key.clone()];

    let h = harness_with(bucket, default_catalog(), false, None).await;
    h.engine.run(&[], &[]).await.unwrap();

    assert_eq!(h.sink.batches.lock().unwrap().len(), 1);
    assert_eq!(h.store.count(&partition()).await.unwrap(), 1);
    assert!(!h.store.contains(&partition(), &failing_key).await.unwrap());
    assert!(h.store.contains(&partition(), &good_key).await.unwrap());
}

#[tokio::test]
async fn test_forward_failure_leaves_object_unmarked() {
    let h = harness_with(
        default_bucket(),
        default_catalog(),
        false,
        Some(Arc::new(FailingSink)),
    )
    .await;

    h.engine.run(&[], &[]).await.unwrap();

    // Unmarked: the next run retries it.
    assert_eq!(h.store.count(&partition()).await.unwrap(), 0);
}

#[tokio::test]
async fn test_explicit_accounts_and_regions_bypass_discovery() {
    // Discovery would find nothing; explicit lists drive the run anyway.
    let mut bucket = default_bucket();
    bucket.accounts = vec![];
    bucket.regions = HashMap::new();

    let h = harness_with(bucket, default_catalog(), false, None).await;
    h.engine
        .run(&[ACCOUNT.to_string()], &[REGION.to_string()])
        .await
        .unwrap();

    assert_eq!(h.sink.batches.lock().unwrap().len(), 1);
}

#[tokio::test]
async fn test_account_without_regions_is_skipped() {
    let mut bucket = default_bucket();
    bucket.regions = HashMap::new();

    let h = harness_with(bucket, default_catalog(), false, None).await;
    h.engine.run(&[], &[]).await.unwrap();

    assert!(h.sink.batches.lock().unwrap().is_empty());
}

#[tokio::test]
async fn test_listing_prefixes_target_partition_oldest_first() {
    let h = harness_with(default_bucket(), default_catalog(), false, None).await;

    h.engine.run(&[], &[]).await.unwrap();

    let calls = h.bucket.list_calls.lock().unwrap();
    assert!(!calls.is_empty());

    // Fresh store: the window runs to today, oldest date first.
    let expected_last = format!(
        "AWSLogs/{acct}/vpcflowlogs/{region}/{date}/{acct}_vpcflowlogs_{region}_{flid}",
        acct = ACCOUNT,
        region = REGION,
        date = today(),
        flid = FLOW_LOG_ID
    );
    assert_eq!(calls.last().unwrap(), &expected_last);

    let mut sorted = calls.clone();
    sorted.sort();
    assert_eq!(*calls, sorted);
}

#[tokio::test]
async fn test_retention_applied_after_partition_scan() {
    let store = Arc::new(DuckDbTrackingStore::in_memory("vpcflow").unwrap());
    store.init_schema().await.unwrap();

    let layout = BucketLayout {
        bucket: "test-bucket".into(),
        prefix: "".into(),
        suffix: "".into(),
    };
    // retain_rows = 1 forces eviction down to a single row per partition.
    let tracker = Tracker::new(store.clone(), layout.bucket_path(), false, None, 1);

    let mut bucket = default_bucket();
    bucket.objects = vec![
        (
            object_key(&today(), "a"),
            format!("{}\n", SAMPLE_LINE).into_bytes(),
        ),
        (
            object_key(&today(), "b"),
            format!("{}\n", SAMPLE_LINE).into_bytes(),
        ),
        (
            object_key(&today(), "c"),
            format!("{}\n", SAMPLE_LINE).into_bytes(),
        ),
    ];

    let sink = Arc::new(CollectingSink::default());
    let engine = IngestionEngine::new(
        VpcFlowFamily,
        layout,
        Arc::new(bucket),
        Arc::new(default_catalog()),
        sink.clone() as Arc<dyn EventSink>,
        tracker,
        "%Y/%m/%d".into(),
    );

    engine.run(&[], &[]).await.unwrap();

    assert_eq!(sink.batches.lock().unwrap().len(), 3);
    assert_eq!(store.count(&partition()).await.unwrap(), 1);
}
