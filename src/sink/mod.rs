use async_trait::async_trait;
use serde_json::Value;
use std::path::Path;
use thiserror::Error;
use tokio::io::{AsyncWrite, AsyncWriteExt, BufWriter};
use tokio::sync::Mutex;

#[derive(Debug, Error)]
pub enum SinkError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// External consumer of parsed records: one call per successfully parsed
/// object, in the object's processing order.
#[async_trait]
pub trait EventSink: Send + Sync {
    async fn forward(&self, records: &[Value]) -> Result<(), SinkError>;
}

/// JSON-lines forwarder writing to stdout or an append-only file.
pub struct JsonLinesSink {
    writer: Mutex<Box<dyn AsyncWrite + Send + Unpin>>,
}

impl JsonLinesSink {
    pub fn stdout() -> Self {
        Self {
            writer: Mutex::new(Box::new(tokio::io::stdout())),
        }
    }

    pub async fn file(path: &Path) -> Result<Self, SinkError> {
        let file = tokio::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .await?;
        Ok(Self {
            writer: Mutex::new(Box::new(BufWriter::new(file))),
        })
    }
}

#[async_trait]
impl EventSink for JsonLinesSink {
    async fn forward(&self, records: &[Value]) -> Result<(), SinkError> {
        let mut writer = self.writer.lock().await;
        for record in records {
            let mut line = serde_json::to_vec(record)?;
            line.push(b'\n');
            writer.write_all(&line).await?;
        }
        writer.flush().await?;
        Ok(())
    }
}
