use super::IngestionEngine;
use crate::family::LogFamily;
use crate::store::Partition;
use tracing::{debug, warn};

impl<F: LogFamily> IngestionEngine<F> {
    /// Process every object under one partition's date prefix. A failure
    /// fetching, parsing, or forwarding one object skips that object only;
    /// an object is marked complete only after its records reach the sink.
    pub(crate) async fn scan_date(&self, partition: &Partition, date: &str) {
        let prefix = self.family.object_prefix(&self.layout, partition, date);

        let objects = match self.objects.list_objects(&prefix).await {
            Ok(objects) => objects,
            Err(e) => {
                warn!(partition = %partition, date = %date, error = %e,
                      "listing failed, skipping date");
                return;
            }
        };

        for object in objects {
            if !self.tracker.reparse() && self.tracker.already_processed(partition, &object.key).await
            {
                debug!("skipping previously processed file: {}", object.key);
                continue;
            }

            let raw = match self.objects.fetch_object(&object.key).await {
                Ok(raw) => raw,
                Err(e) => {
                    warn!(key = %object.key, error = %e, "fetch failed, skipping object");
                    continue;
                }
            };

            let records = self.family.parse_object(&raw);
            if let Err(e) = self.sink.forward(&records).await {
                warn!(key = %object.key, error = %e,
                      "forward failed, object left unmarked for retry");
                continue;
            }

            self.tracker.mark_complete(partition, &object).await;
        }
    }
}
