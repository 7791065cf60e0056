#![allow(dead_code)]

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use axum::Router;
use bamboo_bank::content::ContentStore;
use bamboo_bank::dispatch::Dispatcher;
use bamboo_bank::ledger::DayLedger;
use bamboo_bank::line::Messenger;
use bamboo_bank::retry::RetryPolicy;
use reqwest::Url;
use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::sync::Mutex;
use uuid::Uuid;

pub const RECIPIENT: &str = "U1234567890abcdef1234567890abcdef";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LedgerCall {
    SetIfAbsent { key: String, value: String, ttl_secs: u64 },
    Incr(String),
    Get(String),
}

/// Ledger fake answering from per-primitive reply queues. Empty queues
/// answer "claimed", 1 and nil respectively.
#[derive(Clone, Default)]
pub struct ScriptedLedger {
    set_replies: Arc<Mutex<VecDeque<Result<bool>>>>,
    incr_replies: Arc<Mutex<VecDeque<Result<i64>>>>,
    get_replies: Arc<Mutex<VecDeque<Result<Option<String>>>>>,
    calls: Arc<Mutex<Vec<LedgerCall>>>,
}

impl ScriptedLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn reply_set(self, reply: Result<bool>) -> Self {
        self.set_replies.lock().await.push_back(reply);
        self
    }

    pub async fn reply_incr(self, reply: Result<i64>) -> Self {
        self.incr_replies.lock().await.push_back(reply);
        self
    }

    pub async fn reply_get(self, reply: Result<Option<String>>) -> Self {
        self.get_replies.lock().await.push_back(reply);
        self
    }

    pub async fn calls(&self) -> Vec<LedgerCall> {
        self.calls.lock().await.clone()
    }
}

#[async_trait]
impl DayLedger for ScriptedLedger {
    async fn set_if_absent(&self, key: &str, value: &str, ttl_secs: u64) -> Result<bool> {
        self.calls.lock().await.push(LedgerCall::SetIfAbsent {
            key: key.to_string(),
            value: value.to_string(),
            ttl_secs,
        });
        self.set_replies.lock().await.pop_front().unwrap_or(Ok(true))
    }

    async fn incr(&self, key: &str) -> Result<i64> {
        self.calls.lock().await.push(LedgerCall::Incr(key.to_string()));
        self.incr_replies.lock().await.pop_front().unwrap_or(Ok(1))
    }

    async fn get(&self, key: &str) -> Result<Option<String>> {
        self.calls.lock().await.push(LedgerCall::Get(key.to_string()));
        self.get_replies.lock().await.pop_front().unwrap_or(Ok(None))
    }
}

#[derive(Debug, Clone)]
pub struct Push {
    pub recipient: String,
    pub text: String,
    pub retry_key: Uuid,
}

/// Messenger fake recording every push. Replies come from the queue, then
/// `always_fail_for` decides, then success.
#[derive(Clone, Default)]
pub struct RecordingMessenger {
    responses: Arc<Mutex<VecDeque<Result<()>>>>,
    always_fail_for: Option<String>,
    pushes: Arc<Mutex<Vec<Push>>>,
}

impl RecordingMessenger {
    pub fn with_responses(responses: Vec<Result<()>>) -> Self {
        Self {
            responses: Arc::new(Mutex::new(VecDeque::from(responses))),
            ..Default::default()
        }
    }

    pub fn failing_for(recipient: &str) -> Self {
        Self {
            always_fail_for: Some(recipient.to_string()),
            ..Default::default()
        }
    }

    pub async fn pushes(&self) -> Vec<Push> {
        self.pushes.lock().await.clone()
    }
}

#[async_trait]
impl Messenger for RecordingMessenger {
    async fn push_text(&self, recipient: &str, text: &str, retry_key: Uuid) -> Result<()> {
        self.pushes.lock().await.push(Push {
            recipient: recipient.to_string(),
            text: text.to_string(),
            retry_key,
        });
        if let Some(reply) = self.responses.lock().await.pop_front() {
            return reply;
        }
        if self.always_fail_for.as_deref() == Some(recipient) {
            return Err(anyhow!("LINE rejected {recipient}"));
        }
        Ok(())
    }
}

pub fn content() -> ContentStore {
    ContentStore::builtin().unwrap()
}

/// Dispatcher over the given fakes, retrying deliveries without a pause.
pub fn dispatcher<L, M>(ledger: &L, messenger: &M, recipients: &[&str]) -> Dispatcher
where
    L: DayLedger + Clone + 'static,
    M: Messenger + Clone + 'static,
{
    Dispatcher::new(
        Arc::new(ledger.clone()),
        Arc::new(messenger.clone()),
        Arc::new(content()),
        recipients.iter().map(|r| r.to_string()).collect(),
    )
    .with_retry_policy(RetryPolicy::DELIVERY.with_delay(Duration::ZERO))
}

/// Serve `app` on an ephemeral local port and return its base URL.
pub async fn serve(app: Router) -> Url {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });
    Url::parse(&format!("http://{addr}/")).unwrap()
}
