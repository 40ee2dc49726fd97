use async_trait::async_trait;

/// The `(account, region, flow-log-id)` scope for dedup and retention.
/// Every tracking query is bounded by one of these.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Partition {
    pub account_id: String,
    pub region: String,
    pub flow_log_id: String,
}

impl Partition {
    pub fn new(
        account_id: impl Into<String>,
        region: impl Into<String>,
        flow_log_id: impl Into<String>,
    ) -> Self {
        Self {
            account_id: account_id.into(),
            region: region.into(),
            flow_log_id: flow_log_id.into(),
        }
    }
}

impl std::fmt::Display for Partition {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}/{}", self.account_id, self.region, self.flow_log_id)
    }
}

/// One tracking row: a log object that has been fully parsed and forwarded.
#[derive(Debug, Clone)]
pub struct ProcessedObject {
    pub bucket_path: String,
    pub account_id: String,
    pub region: String,
    pub flow_log_id: String,
    pub log_key: String,
    /// Date partition the object belongs to, `YYYYMMDD`.
    pub created_date: String,
}

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(String),
}

impl From<duckdb::Error> for StoreError {
    fn from(e: duckdb::Error) -> Self {
        StoreError::Database(e.to_string())
    }
}

/// Row-level tracking operations. Policy (empty-key guards, reparse
/// handling, error swallowing, retention looping) lives in `Tracker`.
#[async_trait]
pub trait TrackingStore: Send + Sync {
    async fn init_schema(&self) -> Result<(), StoreError>;

    /// True iff a row exists for the exact `(partition, log_key)` tuple.
    async fn contains(&self, partition: &Partition, log_key: &str) -> Result<bool, StoreError>;

    /// Insert a tracking row. Inserting an already-present tuple is a no-op.
    async fn insert(&self, row: &ProcessedObject) -> Result<(), StoreError>;

    /// `created_date` of the partition's row with the greatest `log_key`.
    /// Key order, not a date aggregate: the last-inserted key is the proxy
    /// for the latest date.
    async fn last_created_date(
        &self,
        partition: &Partition,
    ) -> Result<Option<String>, StoreError>;

    async fn count(&self, partition: &Partition) -> Result<u64, StoreError>;

    /// Delete the partition's single oldest row by ascending `log_key`.
    async fn evict_oldest(&self, partition: &Partition) -> Result<(), StoreError>;
}
