use super::types::*;
use super::{expand_env_vars, expand_tilde};
use chrono::NaiveDate;
use std::fs;
use std::path::Path;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse YAML: {0}")]
    YamlParse(#[from] serde_yaml::Error),

    #[error("validation failed:\n{}", .0.join("\n"))]
    ValidationList(Vec<String>),
}

pub fn load_config(path: &Path) -> Result<Config, ConfigError> {
    let yaml = fs::read_to_string(path).map_err(|e| {
        ConfigError::Io(std::io::Error::new(
            e.kind(),
            format!("failed to open config file '{}': {}", path.display(), e),
        ))
    })?;

    // Expand environment variables before parsing so credentials can live
    // outside the file.
    let yaml = expand_env_vars(&yaml);

    let mut config: Config = serde_yaml::from_str(&yaml)?;

    config.database.path = expand_tilde(&config.database.path);
    if let Some(sink_path) = &config.sink.path {
        config.sink.path = Some(expand_tilde(sink_path));
    }

    validate_config(&config)?;

    Ok(config)
}

fn is_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(first) if first.is_ascii_alphabetic() || first == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

pub fn validate_config(config: &Config) -> Result<(), ConfigError> {
    let mut errors = Vec::new();

    if config.bucket.name.is_empty() {
        errors.push("bucket.name must not be empty".to_string());
    }

    if !is_identifier(&config.database.table) {
        errors.push(format!(
            "database.table '{}' is not a valid identifier",
            config.database.table
        ));
    }

    match (&config.aws.access_key, &config.aws.secret_key) {
        (Some(_), None) => {
            errors.push("aws.access_key is set without aws.secret_key".to_string())
        }
        (None, Some(_)) => {
            errors.push("aws.secret_key is set without aws.access_key".to_string())
        }
        _ => {}
    }

    if let Some(raw) = &config.scan.only_logs_after {
        if NaiveDate::parse_from_str(raw, "%Y%m%d").is_err() {
            errors.push(format!(
                "scan.only_logs_after '{}' is not a YYYYMMDD date",
                raw
            ));
        }
    }

    if config.scan.date_format.is_empty() {
        errors.push("scan.date_format must not be empty".to_string());
    }

    if config.sink.sink_type == SinkType::File && config.sink.path.is_none() {
        errors.push("sink.path is required when sink.type is 'file'".to_string());
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(ConfigError::ValidationList(errors))
    }
}
