use crate::aws::client::{s3_client, AwsCredentials};
use crate::aws::flow_logs::Ec2FlowLogCatalog;
use crate::aws::s3::S3ObjectStore;
use crate::config::load_config;
use crate::config::types::SinkType;
use crate::engine::{EngineError, IngestionEngine};
use crate::family::{BucketLayout, LogFamily, VpcFlowFamily};
use crate::sink::{EventSink, JsonLinesSink};
use crate::store::duckdb::DuckDbTrackingStore;
use crate::store::{Tracker, TrackingStore};
use chrono::NaiveDate;
use std::path::PathBuf;
use std::sync::Arc;
use thiserror::Error;
use tracing::info;

/// Region used to build the S3 client when none is configured; bucket
/// listing follows redirects from here.
const DEFAULT_S3_REGION: &str = "us-east-1";

#[derive(Debug, Error)]
pub enum RunError {
    #[error("config error: {0}")]
    Config(#[from] crate::config::ConfigError),

    #[error("storage error: {0}")]
    Store(#[from] crate::store::StoreError),

    #[error("sink error: {0}")]
    Sink(#[from] crate::sink::SinkError),

    #[error(transparent)]
    Engine(#[from] EngineError),

    #[error("invalid --only-logs-after '{0}': expected YYYYMMDD")]
    BadDateOverride(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// Per-run flags layered over the config file.
#[derive(Debug, Default)]
pub struct RunOverrides {
    pub reparse: bool,
    pub only_logs_after: Option<String>,
    pub accounts: Vec<String>,
    pub regions: Vec<String>,
}

pub async fn run(config_path: Option<PathBuf>, overrides: RunOverrides) -> Result<(), RunError> {
    let config_path = match config_path {
        Some(path) => path,
        None => {
            eprintln!("Error: config not found");
            eprintln!("Searched locations:");
            eprintln!("  ~/.config/floe/config.yml");
            eprintln!("  /etc/floe/config.yml");
            eprintln!("\nUse --config <path> to specify a config file, or run 'floe config init' to generate one.");
            std::process::exit(1);
        }
    };

    info!(config_path = %config_path.display(), "Loading configuration");
    let mut config = load_config(&config_path)?;

    // CLI flags win over the file.
    if overrides.reparse {
        config.scan.reparse = true;
    }
    if let Some(raw) = &overrides.only_logs_after {
        if NaiveDate::parse_from_str(raw, "%Y%m%d").is_err() {
            return Err(RunError::BadDateOverride(raw.clone()));
        }
        config.scan.only_logs_after = Some(raw.clone());
    }
    if !overrides.accounts.is_empty() {
        config.aws.accounts = overrides.accounts;
    }
    if !overrides.regions.is_empty() {
        config.aws.regions = overrides.regions;
    }

    if let Some(parent) = config.database.path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    info!(path = %config.database.path.display(), "Opening tracking store");
    let store = Arc::new(DuckDbTrackingStore::open(
        &config.database.path,
        &config.database.table,
    )?);
    store.init_schema().await?;

    let family = VpcFlowFamily;
    let layout = BucketLayout {
        bucket: config.bucket.name.clone(),
        prefix: config.bucket.prefix.clone(),
        suffix: config.bucket.suffix.clone(),
    };

    let tracker = Tracker::new(
        store,
        layout.bucket_path(),
        config.scan.reparse,
        config.scan.only_logs_after_date(),
        config.database.retain_rows,
    );

    let credentials = AwsCredentials {
        access_key: config.aws.access_key.clone(),
        secret_key: config.aws.secret_key.clone(),
        profile: config.aws.profile.clone(),
    };

    let s3_region = config
        .aws
        .regions
        .first()
        .map(String::as_str)
        .unwrap_or(DEFAULT_S3_REGION);
    let objects = Arc::new(S3ObjectStore::new(
        s3_client(&credentials, s3_region).await,
        config.bucket.name.clone(),
        config.bucket.prefix.clone(),
        config.bucket.suffix.clone(),
        family.service().to_string(),
    ));

    let catalog = Arc::new(Ec2FlowLogCatalog::new(credentials));

    let sink: Arc<dyn EventSink> = match config.sink.sink_type {
        SinkType::Stdout => Arc::new(JsonLinesSink::stdout()),
        SinkType::File => {
            // Validation guarantees the path.
            let path = config.sink.path.clone().unwrap_or_default();
            Arc::new(JsonLinesSink::file(&path).await?)
        }
    };

    let engine = IngestionEngine::new(
        family,
        layout,
        objects,
        catalog,
        sink,
        tracker,
        config.scan.date_format.clone(),
    );

    info!(bucket = %config.bucket.name, reparse = config.scan.reparse, "Starting collection run");
    engine.run(&config.aws.accounts, &config.aws.regions).await?;
    info!("Collection run complete");

    Ok(())
}
