use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use reqwest::{Client, Url};
use serde::Deserialize;
use serde_json::Value;
use std::fmt;
use std::time::Duration;
use tracing::{debug, instrument, warn};

use super::DayLedger;

/// Upstash Redis over its REST interface: one POST of a JSON command array
/// per primitive.
#[derive(Clone)]
pub struct UpstashLedger {
    http: Client,
    base_url: Url,
    token: String,
}

impl fmt::Debug for UpstashLedger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UpstashLedger")
            .field("base_url", &self.base_url)
            .finish_non_exhaustive()
    }
}

#[derive(Debug, Deserialize)]
struct CommandResponse {
    #[serde(default)]
    result: Value,
    #[serde(default)]
    error: Option<String>,
}

impl UpstashLedger {
    pub fn new(base_url: Url, token: String) -> Result<Self> {
        let http = Client::builder()
            .user_agent("bamboo-bank/0.1")
            .timeout(Duration::from_secs(10))
            .build()
            .context("failed to build ledger HTTP client")?;
        Ok(Self {
            http,
            base_url,
            token,
        })
    }

    pub fn build_request(&self, command: &[String]) -> Result<reqwest::Request> {
        self.http
            .post(self.base_url.clone())
            .bearer_auth(&self.token)
            .json(command)
            .build()
            .context("failed to build ledger request")
    }

    async fn execute(&self, command: Vec<String>) -> Result<Value> {
        let name = command.first().cloned().unwrap_or_default();
        let request = self.build_request(&command)?;
        let res = self
            .http
            .execute(request)
            .await
            .with_context(|| format!("failed to reach ledger for {name}"))?;
        let status = res.status();
        let body = res.text().await.context("failed to read ledger response")?;
        debug!(command = %name, %status, "ledger response");

        let parsed: Option<CommandResponse> = serde_json::from_str(&body).ok();
        if let Some(msg) = parsed.as_ref().and_then(|p| p.error.as_deref()) {
            warn!(command = %name, %status, error = msg, "ledger command rejected");
            return Err(anyhow!("ledger {name} failed: {msg}"));
        }
        if !status.is_success() {
            return Err(anyhow!("ledger {name} failed with {status}: {body}"));
        }
        parsed
            .map(|p| p.result)
            .ok_or_else(|| anyhow!("invalid ledger response for {name}: {body}"))
    }
}

#[async_trait]
impl DayLedger for UpstashLedger {
    #[instrument(skip(self, value))]
    async fn set_if_absent(&self, key: &str, value: &str, ttl_secs: u64) -> Result<bool> {
        let result = self
            .execute(vec![
                "SET".into(),
                key.into(),
                value.into(),
                "NX".into(),
                "EX".into(),
                ttl_secs.to_string(),
            ])
            .await?;
        parse_set_result(&result)
    }

    #[instrument(skip(self))]
    async fn incr(&self, key: &str) -> Result<i64> {
        let result = self.execute(vec!["INCR".into(), key.into()]).await?;
        parse_incr_result(&result)
    }

    #[instrument(skip(self))]
    async fn get(&self, key: &str) -> Result<Option<String>> {
        let result = self.execute(vec!["GET".into(), key.into()]).await?;
        parse_get_result(&result)
    }
}

/// `SET .. NX` replies `OK` when the key was written and nil when it existed.
pub fn parse_set_result(result: &Value) -> Result<bool> {
    match result {
        Value::String(s) if s == "OK" => Ok(true),
        Value::Null => Ok(false),
        other => Err(anyhow!("unexpected SET reply: {other}")),
    }
}

pub fn parse_incr_result(result: &Value) -> Result<i64> {
    result
        .as_i64()
        .ok_or_else(|| anyhow!("unexpected INCR reply: {result}"))
}

pub fn parse_get_result(result: &Value) -> Result<Option<String>> {
    match result {
        Value::Null => Ok(None),
        Value::String(s) => Ok(Some(s.clone())),
        Value::Number(n) => Ok(Some(n.to_string())),
        other => Err(anyhow!("unexpected GET reply: {other}")),
    }
}
