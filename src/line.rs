//! Outbound delivery through the LINE Messaging API push endpoint.
use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use reqwest::{Client, StatusCode, Url};
use serde_json::{json, Value};
use std::fmt;
use std::time::Duration;
use tracing::{info, instrument};
use uuid::Uuid;

use crate::retry::{retry, RetryPolicy};

const LINE_API_BASE: &str = "https://api.line.me/";
const RETRY_KEY_HEADER: &str = "X-Line-Retry-Key";
const ACCEPTED_REQUEST_HEADER: &str = "x-line-accepted-request-id";

#[async_trait]
pub trait Messenger: Send + Sync {
    /// Push one text message to one recipient. `retry_key` is stable across
    /// the attempts of a single delivery.
    async fn push_text(&self, recipient: &str, text: &str, retry_key: Uuid) -> Result<()>;
}

#[derive(Clone)]
pub struct LineClient {
    http: Client,
    base_url: Url,
    token: String,
}

impl fmt::Debug for LineClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LineClient")
            .field("base_url", &self.base_url)
            .finish_non_exhaustive()
    }
}

impl LineClient {
    pub fn new(token: String) -> Result<Self> {
        let base_url = Url::parse(LINE_API_BASE).context("invalid LINE API URL")?;
        Self::with_base_url(token, base_url)
    }

    pub fn with_base_url(token: String, base_url: Url) -> Result<Self> {
        let http = Client::builder()
            .user_agent("bamboo-bank/0.1")
            .timeout(Duration::from_secs(15))
            .build()
            .context("failed to build LINE HTTP client")?;
        Ok(Self {
            http,
            base_url,
            token,
        })
    }

    pub fn build_request(
        &self,
        recipient: &str,
        text: &str,
        retry_key: Uuid,
    ) -> Result<reqwest::Request> {
        let endpoint = self
            .base_url
            .join("v2/bot/message/push")
            .context("invalid LINE base URL")?;
        self.http
            .post(endpoint)
            .bearer_auth(&self.token)
            .header(RETRY_KEY_HEADER, retry_key.to_string())
            .json(&build_push_body(recipient, text))
            .build()
            .context("failed to build LINE push request")
    }
}

#[async_trait]
impl Messenger for LineClient {
    async fn push_text(&self, recipient: &str, text: &str, retry_key: Uuid) -> Result<()> {
        let request = self.build_request(recipient, text, retry_key)?;
        let res = self
            .http
            .execute(request)
            .await
            .context("failed to reach LINE")?;

        let status = res.status();
        if status.is_success() {
            return Ok(());
        }
        // Same retry key already accepted by an earlier attempt.
        if status == StatusCode::CONFLICT && res.headers().contains_key(ACCEPTED_REQUEST_HEADER) {
            info!(%retry_key, "push already accepted");
            return Ok(());
        }
        let body = res.text().await.unwrap_or_default();
        Err(anyhow!("LINE push failed {}: {}", status, error_message(&body)))
    }
}

pub fn build_push_body(recipient: &str, text: &str) -> Value {
    json!({
        "to": recipient,
        "messages": [
            { "type": "text", "text": text }
        ],
    })
}

/// Pull `message` out of a LINE error body, falling back to the raw text.
fn error_message(body: &str) -> String {
    serde_json::from_str::<Value>(body)
        .ok()
        .and_then(|v| v.get("message").and_then(Value::as_str).map(str::to_owned))
        .unwrap_or_else(|| body.to_string())
}

/// Deliver `text` to one recipient under the delivery retry policy. The
/// error of the final attempt is returned.
#[instrument(skip(messenger, text, policy))]
pub async fn deliver(
    messenger: &dyn Messenger,
    recipient: &str,
    text: &str,
    policy: RetryPolicy,
) -> Result<()> {
    let retry_key = Uuid::new_v4();
    retry(policy, move |_| messenger.push_text(recipient, text, retry_key)).await?;
    info!("delivered");
    Ok(())
}
