// client.rs — NotionClient: pages.create / pages.update over HTTPS.
//
// Uses reqwest's blocking client. The engine processes events strictly one
// at a time, so there is nothing to gain from an async runtime here.

use std::time::Duration;

use ns_events::RecordProperties;
use ns_sync::{RemoteClient, RemoteError};
use serde_json::{json, Value};

use crate::render::render_properties;

pub const DEFAULT_BASE_URL: &str = "https://api.notion.com/v1";
pub const DEFAULT_API_VERSION: &str = "2022-06-28";
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Longest response body kept in an error message.
const MAX_ERROR_BODY: usize = 500;

/// Notion REST client bound to one integration token.
pub struct NotionClient {
    http: reqwest::blocking::Client,
    token: String,
    api_version: String,
    base_url: String,
}

impl std::fmt::Debug for NotionClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NotionClient")
            .field("api_version", &self.api_version)
            .field("base_url", &self.base_url)
            .finish_non_exhaustive()
    }
}

/// Builder for [`NotionClient`].
#[derive(Debug, Clone)]
pub struct NotionClientBuilder {
    token: String,
    api_version: String,
    base_url: String,
    timeout: Duration,
}

impl NotionClientBuilder {
    pub fn api_version(mut self, version: impl Into<String>) -> Self {
        self.api_version = version.into();
        self
    }

    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn build(self) -> Result<NotionClient, RemoteError> {
        let http = reqwest::blocking::Client::builder()
            .timeout(self.timeout)
            .build()
            .map_err(|e| RemoteError::Transport(e.to_string()))?;
        Ok(NotionClient {
            http,
            token: self.token,
            api_version: self.api_version,
            base_url: self.base_url.trim_end_matches('/').to_string(),
        })
    }
}

impl NotionClient {
    pub fn builder(token: impl Into<String>) -> NotionClientBuilder {
        NotionClientBuilder {
            token: token.into(),
            api_version: DEFAULT_API_VERSION.to_string(),
            base_url: DEFAULT_BASE_URL.to_string(),
            timeout: DEFAULT_TIMEOUT,
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn api_version(&self) -> &str {
        &self.api_version
    }

    fn send(&self, request: reqwest::blocking::RequestBuilder, body: &Value) -> Result<Value, RemoteError> {
        let response = request
            .bearer_auth(&self.token)
            .header("Notion-Version", &self.api_version)
            .json(body)
            .send()
            .map_err(|e| RemoteError::Transport(e.to_string()))?;

        let status = response.status().as_u16();
        let text = response
            .text()
            .map_err(|e| RemoteError::Transport(e.to_string()))?;
        check_status(status, &text)?;
        parse_body(&text)
    }
}

impl RemoteClient for NotionClient {
    fn create(&self, parent_id: &str, properties: &RecordProperties) -> Result<String, RemoteError> {
        let url = format!("{}/pages", self.base_url);
        let body = json!({
            "parent": { "database_id": parent_id },
            "properties": render_properties(properties),
        });
        tracing::debug!(url = %url, parent_id, "creating Notion page");

        let response = self.send(self.http.post(&url), &body)?;
        page_id(&response)
    }

    fn update(&self, record_id: &str, properties: &RecordProperties) -> Result<(), RemoteError> {
        let url = format!("{}/pages/{}", self.base_url, record_id);
        let body = json!({ "properties": render_properties(properties) });
        tracing::debug!(url = %url, record_id, "updating Notion page");

        self.send(self.http.patch(&url), &body)?;
        Ok(())
    }

    fn name(&self) -> &str {
        "notion"
    }
}

/// Map an HTTP status to success or a [`RemoteError`].
fn check_status(status: u16, body: &str) -> Result<(), RemoteError> {
    match status {
        200..=299 => Ok(()),
        401 | 403 => Err(RemoteError::Unauthorized { status }),
        _ => Err(RemoteError::Api {
            status,
            body: body.chars().take(MAX_ERROR_BODY).collect(),
        }),
    }
}

/// A success body as JSON. An empty body (e.g. 204) is `Null`.
fn parse_body(text: &str) -> Result<Value, RemoteError> {
    if text.trim().is_empty() {
        return Ok(Value::Null);
    }
    serde_json::from_str(text).map_err(|e| RemoteError::InvalidResponse(e.to_string()))
}

fn page_id(response: &Value) -> Result<String, RemoteError> {
    response
        .get("id")
        .and_then(Value::as_str)
        .filter(|id| !id.is_empty())
        .map(str::to_string)
        .ok_or_else(|| RemoteError::InvalidResponse("response has no page id".to_string()))
}
