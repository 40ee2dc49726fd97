use super::traits::{Partition, ProcessedObject, StoreError, TrackingStore};
use async_trait::async_trait;
use duckdb::Connection;
use std::path::Path;
use std::sync::{Arc, Mutex};

/// DuckDB implementation of the tracking store.
///
/// One table per log family; the table name comes from configuration and is
/// validated against identifier rules before it is interpolated into SQL.
pub struct DuckDbTrackingStore {
    conn: Arc<Mutex<Connection>>,
    table: String,
}

impl DuckDbTrackingStore {
    pub fn open<P: AsRef<Path>>(path: P, table: &str) -> Result<Self, StoreError> {
        let conn = Connection::open(path)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
            table: table.to_string(),
        })
    }

    /// In-memory store for testing.
    pub fn in_memory(table: &str) -> Result<Self, StoreError> {
        let conn = Connection::open_in_memory()?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
            table: table.to_string(),
        })
    }
}

fn lock_err<T>(e: std::sync::PoisonError<T>) -> StoreError {
    StoreError::Database(e.to_string())
}

fn join_err(e: tokio::task::JoinError) -> StoreError {
    StoreError::Database(format!("task join error: {}", e))
}

#[async_trait]
impl TrackingStore for DuckDbTrackingStore {
    async fn init_schema(&self) -> Result<(), StoreError> {
        let conn = self.conn.clone();
        let table = self.table.clone();
        tokio::task::spawn_blocking(move || {
            let conn = conn.lock().map_err(lock_err)?;
            conn.execute(
                &format!(
                    "CREATE TABLE IF NOT EXISTS {} (
                        bucket_path VARCHAR NOT NULL,
                        aws_account_id VARCHAR NOT NULL,
                        aws_region VARCHAR NOT NULL,
                        flow_log_id VARCHAR NOT NULL,
                        log_key VARCHAR NOT NULL,
                        created_date VARCHAR NOT NULL,
                        PRIMARY KEY (aws_account_id, aws_region, flow_log_id, log_key)
                    )",
                    table
                ),
                [],
            )?;
            Ok::<(), StoreError>(())
        })
        .await
        .map_err(join_err)?
    }

    async fn contains(&self, partition: &Partition, log_key: &str) -> Result<bool, StoreError> {
        let conn = self.conn.clone();
        let table = self.table.clone();
        let partition = partition.clone();
        let log_key = log_key.to_string();
        tokio::task::spawn_blocking(move || {
            let conn = conn.lock().map_err(lock_err)?;
            let mut stmt = conn.prepare(&format!(
                "SELECT count(*) FROM {}
                 WHERE aws_account_id = ? AND aws_region = ? AND flow_log_id = ? AND log_key = ?",
                table
            ))?;
            let count: i64 = stmt.query_row(
                duckdb::params![
                    partition.account_id,
                    partition.region,
                    partition.flow_log_id,
                    log_key
                ],
                |row| row.get(0),
            )?;
            Ok::<bool, StoreError>(count > 0)
        })
        .await
        .map_err(join_err)?
    }

    async fn insert(&self, row: &ProcessedObject) -> Result<(), StoreError> {
        let conn = self.conn.clone();
        let table = self.table.clone();
        let row = row.clone();
        tokio::task::spawn_blocking(move || {
            let conn = conn.lock().map_err(lock_err)?;
            conn.execute(
                &format!(
                    "INSERT OR IGNORE INTO {}
                     (bucket_path, aws_account_id, aws_region, flow_log_id, log_key, created_date)
                     VALUES (?, ?, ?, ?, ?, ?)",
                    table
                ),
                duckdb::params![
                    row.bucket_path,
                    row.account_id,
                    row.region,
                    row.flow_log_id,
                    row.log_key,
                    row.created_date,
                ],
            )?;
            Ok::<(), StoreError>(())
        })
        .await
        .map_err(join_err)?
    }

    async fn last_created_date(
        &self,
        partition: &Partition,
    ) -> Result<Option<String>, StoreError> {
        let conn = self.conn.clone();
        let table = self.table.clone();
        let partition = partition.clone();
        tokio::task::spawn_blocking(move || {
            let conn = conn.lock().map_err(lock_err)?;
            let mut stmt = conn.prepare(&format!(
                "SELECT created_date FROM {}
                 WHERE aws_account_id = ? AND aws_region = ? AND flow_log_id = ?
                 ORDER BY log_key DESC LIMIT 1",
                table
            ))?;
            let mut rows = stmt.query(duckdb::params![
                partition.account_id,
                partition.region,
                partition.flow_log_id
            ])?;
            match rows.next()? {
                Some(row) => Ok(Some(row.get::<_, String>(0)?)),
                None => Ok(None),
            }
        })
        .await
        .map_err(join_err)?
    }

    async fn count(&self, partition: &Partition) -> Result<u64, StoreError> {
        let conn = self.conn.clone();
        let table = self.table.clone();
        let partition = partition.clone();
        tokio::task::spawn_blocking(move || {
            let conn = conn.lock().map_err(lock_err)?;
            let mut stmt = conn.prepare(&format!(
                "SELECT count(*) FROM {}
                 WHERE aws_account_id = ? AND aws_region = ? AND flow_log_id = ?",
                table
            ))?;
            let count: i64 = stmt.query_row(
                duckdb::params![
                    partition.account_id,
                    partition.region,
                    partition.flow_log_id
                ],
                |row| row.get(0),
            )?;
            Ok::<u64, StoreError>(count as u64)
        })
        .await
        .map_err(join_err)?
    }

    async fn evict_oldest(&self, partition: &Partition) -> Result<(), StoreError> {
        let conn = self.conn.clone();
        let table = self.table.clone();
        let partition = partition.clone();
        tokio::task::spawn_blocking(move || {
            let conn = conn.lock().map_err(lock_err)?;
            conn.execute(
                &format!(
                    "DELETE FROM {table}
                     WHERE aws_account_id = ? AND aws_region = ? AND flow_log_id = ?
                       AND log_key = (
                           SELECT log_key FROM {table}
                           WHERE aws_account_id = ? AND aws_region = ? AND flow_log_id = ?
                           ORDER BY log_key ASC LIMIT 1
                       )",
                    table = table
                ),
                duckdb::params![
                    partition.account_id,
                    partition.region,
                    partition.flow_log_id,
                    partition.account_id,
                    partition.region,
                    partition.flow_log_id,
                ],
            )?;
            Ok::<(), StoreError>(())
        })
        .await
        .map_err(join_err)?
    }
}
