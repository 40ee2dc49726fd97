use super::{classify_sdk_error, AwsError};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use flate2::read::MultiGzDecoder;
use std::io::Read;

/// One listed log object.
#[derive(Debug, Clone)]
pub struct ObjectSummary {
    pub key: String,
    pub size: i64,
    pub created: DateTime<Utc>,
}

/// Object-storage collaborator: listing, fetching (already decompressed),
/// and account/region discovery from the bucket's key layout.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    async fn list_objects(&self, prefix: &str) -> Result<Vec<ObjectSummary>, AwsError>;

    /// Full object content, gunzipped when the key says so.
    async fn fetch_object(&self, key: &str) -> Result<Vec<u8>, AwsError>;

    async fn account_ids(&self) -> Result<Vec<String>, AwsError>;

    async fn regions(&self, account_id: &str) -> Result<Vec<String>, AwsError>;
}

pub struct S3ObjectStore {
    client: aws_sdk_s3::Client,
    bucket: String,
    prefix: String,
    suffix: String,
    service: String,
}

impl S3ObjectStore {
    pub fn new(
        client: aws_sdk_s3::Client,
        bucket: String,
        prefix: String,
        suffix: String,
        service: String,
    ) -> Self {
        Self {
            client,
            bucket,
            prefix,
            suffix,
            service,
        }
    }

    fn logs_prefix(&self) -> String {
        format!("{}AWSLogs/{}", self.prefix, self.suffix)
    }

    /// Delimiter listing: returns the path segment directly under `prefix`
    /// for each common prefix, e.g. account ids under `AWSLogs/`.
    async fn list_subdirectories(&self, prefix: &str) -> Result<Vec<String>, AwsError> {
        let mut names = Vec::new();
        let mut continuation_token: Option<String> = None;

        loop {
            let mut request = self
                .client
                .list_objects_v2()
                .bucket(&self.bucket)
                .prefix(prefix)
                .delimiter("/");
            if let Some(token) = continuation_token.take() {
                request = request.continuation_token(token);
            }
            let response = request.send().await.map_err(classify_sdk_error)?;

            for common_prefix in response.common_prefixes() {
                if let Some(full) = common_prefix.prefix() {
                    let segment = full
                        .strip_prefix(prefix)
                        .unwrap_or(full)
                        .trim_end_matches('/');
                    if !segment.is_empty() {
                        names.push(segment.to_string());
                    }
                }
            }

            continuation_token = response.next_continuation_token().map(str::to_string);
            if continuation_token.is_none() {
                return Ok(names);
            }
        }
    }
}

#[async_trait]
impl ObjectStore for S3ObjectStore {
    async fn list_objects(&self, prefix: &str) -> Result<Vec<ObjectSummary>, AwsError> {
        let mut objects = Vec::new();
        let mut continuation_token: Option<String> = None;

        loop {
            let mut request = self
                .client
                .list_objects_v2()
                .bucket(&self.bucket)
                .prefix(prefix);
            if let Some(token) = continuation_token.take() {
                request = request.continuation_token(token);
            }
            let response = request.send().await.map_err(classify_sdk_error)?;

            for object in response.contents() {
                let Some(key) = object.key() else { continue };
                let created = object
                    .last_modified()
                    .and_then(|ts| DateTime::from_timestamp(ts.secs(), ts.subsec_nanos()))
                    .unwrap_or_else(Utc::now);
                objects.push(ObjectSummary {
                    key: key.to_string(),
                    size: object.size().unwrap_or(0),
                    created,
                });
            }

            continuation_token = response.next_continuation_token().map(str::to_string);
            if continuation_token.is_none() {
                return Ok(objects);
            }
        }
    }

    async fn fetch_object(&self, key: &str) -> Result<Vec<u8>, AwsError> {
        let response = self
            .client
            .get_object()
            .bucket(&self.bucket)
            .key(key)
            .send()
            .await
            .map_err(classify_sdk_error)?;

        let body = response
            .body
            .collect()
            .await
            .map_err(|e| AwsError::Body(e.to_string()))?
            .into_bytes();

        if key.ends_with(".gz") {
            gunzip(&body)
        } else {
            Ok(body.to_vec())
        }
    }

    async fn account_ids(&self) -> Result<Vec<String>, AwsError> {
        self.list_subdirectories(&self.logs_prefix()).await
    }

    async fn regions(&self, account_id: &str) -> Result<Vec<String>, AwsError> {
        let prefix = format!("{}{}/{}/", self.logs_prefix(), account_id, self.service);
        self.list_subdirectories(&prefix).await
    }
}

fn gunzip(raw: &[u8]) -> Result<Vec<u8>, AwsError> {
    let mut decoder = MultiGzDecoder::new(raw);
    let mut decompressed = Vec::new();
    decoder.read_to_end(&mut decompressed)?;
    Ok(decompressed)
}
