use crate::error::RemoteQueryError;
use async_trait::async_trait;
use tracing::{debug, error};
use wreq::{Client, ClientBuilder};
use wreq::header::{AUTHORIZATION, HeaderValue, USER_AGENT};

const MAX_ERROR_BODY_CHARS: usize = 200;

/// Anything that can count the tasks matching a filter
#[async_trait]
pub trait TaskSource: Send + Sync {
    async fn count_tasks(&self, token: &str, filter: &str) -> Result<usize, RemoteQueryError>;
}

/// Task counter backed by the Todoist REST API
#[derive(Debug, Clone)]
pub struct TodoistClient {
    client: Client,
    base_url: String,
}

impl TodoistClient {
    pub fn with_base_url(base_url: &str) -> Result<Self, RemoteQueryError> {
        let client = ClientBuilder::new().build()?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }
}

#[async_trait]
impl TaskSource for TodoistClient {
    async fn count_tasks(&self, token: &str, filter: &str) -> Result<usize, RemoteQueryError> {
        fetch_task_count_with_client(&self.client, &self.base_url, token, filter)
            .await
            .inspect_err(|e| {
                error!(
                    filter,
                    error_category = e.category(),
                    "Failed to fetch task count: {}",
                    e
                )
            })
    }
}

/// Fetch the number of tasks matching `filter` from a custom base URL (for testing)
#[doc(hidden)]
pub async fn fetch_task_count_with_base_url(
    base_url: &str,
    token: &str,
    filter: &str,
) -> Result<usize, RemoteQueryError> {
    let client = ClientBuilder::new().build()?;
    fetch_task_count_with_client(&client, base_url.trim_end_matches('/'), token, filter).await
}

async fn fetch_task_count_with_client(
    client: &Client,
    base_url: &str,
    token: &str,
    filter: &str,
) -> Result<usize, RemoteQueryError> {
    let url = format!("{}/tasks?filter={}", base_url, urlencoding::encode(filter));
    let auth = HeaderValue::from_str(&format!("Bearer {}", token))?;

    debug!(filter, "Querying task count");

    let response = client
        .get(&url)
        .header(AUTHORIZATION, auth)
        .header(
            USER_AGENT,
            HeaderValue::from_static(concat!("task-counter/", env!("CARGO_PKG_VERSION"))),
        )
        .send()
        .await
        .map_err(|e| RemoteQueryError::Network(format!("Failed to send request: {}", e)))?;

    let status = response.status();
    let response_text = response
        .text()
        .await
        .map_err(|e| RemoteQueryError::Network(format!("Failed to read response: {}", e)))?;

    if status.is_success() {
        // Only the length matters, so tasks stay untyped
        serde_json::from_str::<Vec<serde_json::Value>>(&response_text)
            .map(|tasks| tasks.len())
            .map_err(|e| RemoteQueryError::Parse(format!("Failed to parse response: {}", e)))
    } else {
        let message = response_text.trim();
        let message = if message.is_empty() {
            status
                .canonical_reason()
                .unwrap_or("Unknown status")
                .to_string()
        } else {
            message.chars().take(MAX_ERROR_BODY_CHARS).collect()
        };
        Err(RemoteQueryError::Status {
            status: status.as_u16(),
            message,
        })
    }
}
