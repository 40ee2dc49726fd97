use super::client::{ec2_client, AwsCredentials};
use super::{classify_sdk_error, AwsError};
use async_trait::async_trait;
use std::collections::HashMap;
use tokio::sync::Mutex;

/// One page of the flow-log listing.
#[derive(Debug, Clone, Default)]
pub struct FlowLogPage {
    pub ids: Vec<String>,
    pub next_token: Option<String>,
}

/// Compute-metadata collaborator: enumerates the flow-log ids active in a
/// region, one page per call.
#[async_trait]
pub trait FlowLogCatalog: Send + Sync {
    async fn describe_flow_logs(
        &self,
        region: &str,
        next_token: Option<String>,
    ) -> Result<FlowLogPage, AwsError>;
}

/// Drain every page for a region, concatenating ids in page order.
pub async fn flow_log_ids(
    catalog: &dyn FlowLogCatalog,
    region: &str,
) -> Result<Vec<String>, AwsError> {
    let mut ids = Vec::new();
    let mut next_token = None;
    loop {
        let page = catalog.describe_flow_logs(region, next_token).await?;
        ids.extend(page.ids);
        next_token = page.next_token;
        if next_token.is_none() {
            return Ok(ids);
        }
    }
}

/// EC2-backed catalog. Clients are built lazily per region and reused; a
/// credential rejection on the first call surfaces as the fatal
/// `AwsError::Credentials`.
pub struct Ec2FlowLogCatalog {
    credentials: AwsCredentials,
    clients: Mutex<HashMap<String, aws_sdk_ec2::Client>>,
}

impl Ec2FlowLogCatalog {
    pub fn new(credentials: AwsCredentials) -> Self {
        Self {
            credentials,
            clients: Mutex::new(HashMap::new()),
        }
    }

    async fn client_for(&self, region: &str) -> aws_sdk_ec2::Client {
        let mut clients = self.clients.lock().await;
        if let Some(client) = clients.get(region) {
            return client.clone();
        }
        let client = ec2_client(&self.credentials, region).await;
        clients.insert(region.to_string(), client.clone());
        client
    }
}

#[async_trait]
impl FlowLogCatalog for Ec2FlowLogCatalog {
    async fn describe_flow_logs(
        &self,
        region: &str,
        next_token: Option<String>,
    ) -> Result<FlowLogPage, AwsError> {
        let client = self.client_for(region).await;

        let mut request = client.describe_flow_logs();
        if let Some(token) = next_token {
            request = request.next_token(token);
        }
        let response = request.send().await.map_err(classify_sdk_error)?;

        let ids = response
            .flow_logs()
            .iter()
            .filter_map(|flow_log| flow_log.flow_log_id().map(str::to_string))
            .collect();

        Ok(FlowLogPage {
            ids,
            next_token: response.next_token().map(str::to_string),
        })
    }
}
