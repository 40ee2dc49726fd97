use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub bucket: BucketConfig,
    #[serde(default)]
    pub aws: AwsConfig,
    pub database: DatabaseConfig,
    #[serde(default)]
    pub scan: ScanConfig,
    #[serde(default)]
    pub sink: SinkConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BucketConfig {
    /// S3 bucket holding the flow logs.
    pub name: String,
    /// Key prefix ahead of the `AWSLogs/` root.
    #[serde(default)]
    pub prefix: String,
    /// Organization path between `AWSLogs/` and the account id.
    #[serde(default)]
    pub suffix: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AwsConfig {
    pub access_key: Option<String>,
    pub secret_key: Option<String>,
    pub profile: Option<String>,
    /// Explicit account ids; empty means discover from the bucket.
    #[serde(default)]
    pub accounts: Vec<String>,
    /// Explicit regions; empty means discover per account.
    #[serde(default)]
    pub regions: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    pub path: PathBuf,
    #[serde(default = "default_table")]
    pub table: String,
    /// Tracking rows kept per (account, region, flow-log-id) partition.
    #[serde(default = "default_retain_rows")]
    pub retain_rows: u64,
}

fn default_table() -> String {
    "vpcflow".to_string()
}

fn default_retain_rows() -> u64 {
    500
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScanConfig {
    /// Lower bound for the scan window, `YYYYMMDD`.
    pub only_logs_after: Option<String>,
    /// Re-read objects already marked processed (without re-inserting).
    #[serde(default)]
    pub reparse: bool,
    /// Date partition format in the key layout.
    #[serde(default = "default_date_format")]
    pub date_format: String,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            only_logs_after: None,
            reparse: false,
            date_format: default_date_format(),
        }
    }
}

impl ScanConfig {
    /// Parsed lower bound; call after validation.
    pub fn only_logs_after_date(&self) -> Option<NaiveDate> {
        self.only_logs_after
            .as_deref()
            .and_then(|raw| NaiveDate::parse_from_str(raw, "%Y%m%d").ok())
    }
}

fn default_date_format() -> String {
    "%Y/%m/%d".to_string()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SinkConfig {
    #[serde(rename = "type", default)]
    pub sink_type: SinkType,
    /// Output path when `type: file`.
    pub path: Option<PathBuf>,
}

impl Default for SinkConfig {
    fn default() -> Self {
        Self {
            sink_type: SinkType::Stdout,
            path: None,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SinkType {
    #[default]
    Stdout,
    File,
}
