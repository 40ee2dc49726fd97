use super::traits::{Partition, ProcessedObject, TrackingStore};
use crate::aws::s3::ObjectSummary;
use chrono::NaiveDate;
use std::sync::Arc;
use tracing::{debug, warn};

/// Date used when a partition has no history and no lower bound is
/// configured: scan from the epoch.
pub const DEFAULT_DATE: &str = "19700101";

/// Dedup policy over a `TrackingStore`.
///
/// The store answers row-level questions; this layer owns the rules the
/// ingestion loop depends on: empty keys are never "processed", reparse
/// re-reads without re-inserting, bookkeeping failures never stop a run,
/// and retention converges the partition to the configured row cap.
pub struct Tracker {
    store: Arc<dyn TrackingStore>,
    bucket_path: String,
    reparse: bool,
    only_logs_after: Option<NaiveDate>,
    retain_rows: u64,
}

impl Tracker {
    pub fn new(
        store: Arc<dyn TrackingStore>,
        bucket_path: String,
        reparse: bool,
        only_logs_after: Option<NaiveDate>,
        retain_rows: u64,
    ) -> Self {
        Self {
            store,
            bucket_path,
            reparse,
            only_logs_after,
            retain_rows,
        }
    }

    pub fn reparse(&self) -> bool {
        self.reparse
    }

    /// True iff the exact `(partition, log_key)` tuple is already tracked.
    ///
    /// An empty `log_key` or account id can never match a stored row, so it
    /// answers false without querying. Store errors also answer false: an
    /// object must never be skipped because bookkeeping is unavailable.
    pub async fn already_processed(&self, partition: &Partition, log_key: &str) -> bool {
        if log_key.is_empty() || partition.account_id.is_empty() {
            return false;
        }
        match self.store.contains(partition, log_key).await {
            Ok(known) => known,
            Err(e) => {
                warn!(partition = %partition, key = log_key, error = %e,
                      "dedup lookup failed, treating object as new");
                false
            }
        }
    }

    /// Record an object as fully processed.
    ///
    /// In reparse mode an already-tracked object is left alone (it was
    /// re-read on purpose; a second row would corrupt retention ordering).
    /// Insert failures are logged and swallowed.
    pub async fn mark_complete(&self, partition: &Partition, object: &ObjectSummary) {
        if self.reparse && self.already_processed(partition, &object.key).await {
            debug!(
                "file already marked complete, but reparse flag set: {}",
                object.key
            );
            return;
        }

        let row = ProcessedObject {
            bucket_path: self.bucket_path.clone(),
            account_id: partition.account_id.clone(),
            region: partition.region.clone(),
            flow_log_id: partition.flow_log_id.clone(),
            log_key: object.key.clone(),
            created_date: object.created.format("%Y%m%d").to_string(),
        };

        if let Err(e) = self.store.insert(&row).await {
            warn!(partition = %partition, key = %object.key, error = %e,
                  "failed to mark object complete");
        }
    }

    /// Date of the most recently tracked object in the partition, `YYYYMMDD`.
    ///
    /// Reparse mode with a configured lower bound starts there regardless of
    /// history. Otherwise the store's key-ordered last date is used, clamped
    /// up to the bound when one is set. Any store failure, or an empty
    /// partition, falls back to the bound or the epoch default. Never errors.
    pub async fn last_log_date(&self, partition: &Partition) -> String {
        if self.reparse {
            if let Some(bound) = self.only_logs_after {
                return bound.format("%Y%m%d").to_string();
            }
        }

        match self.store.last_created_date(partition).await {
            Ok(Some(db_date)) => match self.only_logs_after {
                Some(bound) => match NaiveDate::parse_from_str(&db_date, "%Y%m%d") {
                    Ok(parsed) if parsed > bound => db_date,
                    _ => bound.format("%Y%m%d").to_string(),
                },
                None => db_date,
            },
            Ok(None) => self.fallback_date(),
            Err(e) => {
                debug!(partition = %partition, error = %e,
                       "last-date query failed, using fallback");
                self.fallback_date()
            }
        }
    }

    fn fallback_date(&self) -> String {
        match self.only_logs_after {
            Some(bound) => bound.format("%Y%m%d").to_string(),
            None => DEFAULT_DATE.to_string(),
        }
    }

    pub async fn count(&self, partition: &Partition) -> Result<u64, super::traits::StoreError> {
        self.store.count(partition).await
    }

    /// Evict oldest-by-key rows until the partition holds at most
    /// `retain_rows`. Store failures end the pass with a warning; the next
    /// run picks retention back up.
    pub async fn maintenance(&self, partition: &Partition) {
        loop {
            let count = match self.store.count(partition).await {
                Ok(count) => count,
                Err(e) => {
                    warn!(partition = %partition, error = %e, "retention count failed");
                    return;
                }
            };
            if count <= self.retain_rows {
                return;
            }
            if let Err(e) = self.store.evict_oldest(partition).await {
                warn!(partition = %partition, error = %e, "retention eviction failed");
                return;
            }
        }
    }
}
