pub mod vpcflow;

use crate::store::Partition;

pub use vpcflow::VpcFlowFamily;

/// Where the log objects live inside the bucket.
#[derive(Debug, Clone, Default)]
pub struct BucketLayout {
    pub bucket: String,
    /// Key prefix ahead of the `AWSLogs/` root.
    pub prefix: String,
    /// Organization path between `AWSLogs/` and the account id.
    pub suffix: String,
}

impl BucketLayout {
    /// `bucket/prefix`, the value stored in each tracking row.
    pub fn bucket_path(&self) -> String {
        format!("{}/{}", self.bucket, self.prefix)
    }
}

/// Capability set for one log family: how its objects are addressed in the
/// bucket and how their bytes become sink-ready records. The ingestion
/// engine is generic over this, so adding a family never touches the
/// discovery or dedup machinery.
pub trait LogFamily: Send + Sync {
    /// Service segment of the key layout, e.g. `vpcflowlogs`.
    fn service(&self) -> &'static str;

    /// Tag stamped on every parsed record.
    fn source(&self) -> &'static str;

    /// Key prefix selecting one partition's objects for one date.
    fn object_prefix(&self, layout: &BucketLayout, partition: &Partition, date: &str) -> String;

    /// Parse one object's full content. Malformed lines are skipped and
    /// reported, never fatal to the rest of the object.
    fn parse_object(&self, raw: &[u8]) -> Vec<serde_json::Value>;
}
