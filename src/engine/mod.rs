pub mod scanner;
pub mod window;

use crate::aws::flow_logs::{flow_log_ids, FlowLogCatalog};
use crate::aws::s3::ObjectStore;
use crate::aws::AwsError;
use crate::family::{BucketLayout, LogFamily};
use crate::sink::EventSink;
use crate::store::{Partition, Tracker};
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, error, warn};

#[derive(Debug, Error)]
pub enum EngineError {
    /// The only fatal error: the SDK rejected the configured credentials.
    /// Everything else is logged and skipped at its own boundary.
    #[error("invalid AWS credentials: {0}")]
    Credentials(String),
}

/// Drives one collection run: accounts → regions → flow-log ids → date
/// partitions → objects, strictly in that order. Date order within a
/// partition matters because the tracker's last-date query assumes
/// monotonic forward progress.
pub struct IngestionEngine<F: LogFamily> {
    pub(crate) family: F,
    pub(crate) layout: BucketLayout,
    pub(crate) objects: Arc<dyn ObjectStore>,
    pub(crate) catalog: Arc<dyn FlowLogCatalog>,
    pub(crate) sink: Arc<dyn EventSink>,
    pub(crate) tracker: Tracker,
    pub(crate) date_format: String,
}

impl<F: LogFamily> IngestionEngine<F> {
    pub fn new(
        family: F,
        layout: BucketLayout,
        objects: Arc<dyn ObjectStore>,
        catalog: Arc<dyn FlowLogCatalog>,
        sink: Arc<dyn EventSink>,
        tracker: Tracker,
        date_format: String,
    ) -> Self {
        Self {
            family,
            layout,
            objects,
            catalog,
            sink,
            tracker,
            date_format,
        }
    }

    /// Enumerate and process everything. `accounts`/`regions` restrict the
    /// run when non-empty; otherwise both are discovered from the bucket.
    /// Failures never cross an account/region/flow-log boundary.
    pub async fn run(&self, accounts: &[String], regions: &[String]) -> Result<(), EngineError> {
        let accounts = if accounts.is_empty() {
            match self.objects.account_ids().await {
                Ok(discovered) => discovered,
                Err(AwsError::Credentials(msg)) => return Err(EngineError::Credentials(msg)),
                Err(e) => {
                    error!(error = %e, "account discovery failed, nothing to scan");
                    return Ok(());
                }
            }
        } else {
            accounts.to_vec()
        };

        for account_id in &accounts {
            let regions = if regions.is_empty() {
                match self.objects.regions(account_id).await {
                    Ok(discovered) => discovered,
                    Err(e) => {
                        warn!(account = %account_id, error = %e,
                              "region discovery failed, skipping account");
                        continue;
                    }
                }
            } else {
                regions.to_vec()
            };
            if regions.is_empty() {
                debug!(account = %account_id, "no regions found, skipping account");
                continue;
            }

            for region in &regions {
                let flow_logs = match flow_log_ids(self.catalog.as_ref(), region).await {
                    Ok(ids) => ids,
                    Err(AwsError::Credentials(msg)) => return Err(EngineError::Credentials(msg)),
                    Err(e) => {
                        warn!(account = %account_id, region = %region, error = %e,
                              "flow log discovery failed, skipping region");
                        continue;
                    }
                };

                for flow_log_id in flow_logs {
                    let partition = Partition::new(account_id.clone(), region.clone(), flow_log_id);
                    self.process_partition(&partition).await;
                }
            }
        }

        Ok(())
    }

    async fn process_partition(&self, partition: &Partition) {
        let last_date = self.tracker.last_log_date(partition).await;
        let dates = window::date_list(&last_date, &self.date_format);
        debug!(partition = %partition, family = self.family.source(),
               from = %last_date, days = dates.len(), "scanning window");

        for date in &dates {
            self.scan_date(partition, date).await;
        }

        self.tracker.maintenance(partition).await;
        if let Ok(rows) = self.tracker.count(partition).await {
            debug!(partition = %partition, rows, "partition maintenance complete");
        }
    }
}
