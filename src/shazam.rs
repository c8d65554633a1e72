use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use reqwest::Client;
use serde_json::Value;
use std::path::Path;
use std::time::Duration;

/// Submits canonical audio to a remote matcher. `Ok(None)` means the service
/// answered but found no match.
#[async_trait]
pub trait Recognizer: Send + Sync {
    async fn recognize(&self, audio_path: &Path) -> Result<Option<Value>>;
}

/// HTTP client for a Shazam-compatible recognition endpoint.
///
/// The canonical MP3 is posted as the multipart field `file`; the response body
/// is the service's raw match JSON (`{"track": {...}, ...}`), or `null` / `{}`
/// when nothing matched.
pub struct ShazamClient {
    client: Client,
    endpoint: String,
    api_key: Option<String>,
}

impl ShazamClient {
    /// `timeout` of `None` leaves the request unbounded.
    pub fn new(endpoint: String, api_key: Option<String>, timeout: Option<Duration>) -> Result<Self> {
        let mut builder = Client::builder().user_agent(concat!(
            env!("CARGO_PKG_NAME"),
            "/",
            env!("CARGO_PKG_VERSION")
        ));
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }
        let client = builder.build().context("Failed to build HTTP client")?;

        Ok(Self {
            client,
            endpoint,
            api_key,
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

#[async_trait]
impl Recognizer for ShazamClient {
    async fn recognize(&self, audio_path: &Path) -> Result<Option<Value>> {
        let audio = tokio::fs::read(audio_path)
            .await
            .context("Failed to read canonical audio")?;

        let part = Part::bytes(audio)
            .file_name("audio.mp3")
            .mime_str("audio/mpeg")?;
        let form = Form::new().part("file", part);

        let mut request = self.client.post(&self.endpoint).multipart(form);
        if let Some(key) = &self.api_key {
            request = request.bearer_auth(key);
        }

        let resp = request
            .send()
            .await
            .context("Failed to send request to Shazam")?;

        if !resp.status().is_success() {
            return Err(anyhow::anyhow!("Shazam API returned error: {}", resp.status()));
        }

        let body: Value = resp
            .json()
            .await
            .context("Failed to parse Shazam response")?;
        Ok(match_payload(body))
    }
}

fn match_payload(body: Value) -> Option<Value> {
    match &body {
        Value::Null => None,
        Value::Object(map) if map.is_empty() => None,
        _ => Some(body),
    }
}
