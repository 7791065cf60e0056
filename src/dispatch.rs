//! Daily dispatch coordination: claim the day, derive the day number, compose
//! the message and deliver it to every recipient.
//!
//! The claim (`SET sent:<date> NX`) completes before the counter moves or any
//! message leaves. It is the only mutual exclusion in the system; the process
//! holds no lock. Once claimed, the day stays spent even if delivery fails.

use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use std::sync::Arc;
use thiserror::Error;
use tracing::{info, instrument, warn};

use crate::compose::format_message;
use crate::config::Config;
use crate::content::ContentStore;
use crate::ledger::{
    sent_marker_key, DayLedger, UpstashLedger, DAY_COUNT_KEY, SENT_MARKER_TTL_SECS,
};
use crate::line::{deliver, LineClient, Messenger};
use crate::model::{DispatchOptions, DispatchOutcome};
use crate::retry::RetryPolicy;

/// Calendar dates are taken in this zone regardless of the host clock.
pub const DISPATCH_TZ: Tz = chrono_tz::Asia::Taipei;

#[derive(Debug, Error)]
pub enum DispatchError {
    #[error("day ledger error: {0:#}")]
    Ledger(#[source] anyhow::Error),
    #[error("day ledger holds a non-numeric day count: {0:?}")]
    InvalidDayCount(String),
    #[error("delivery to {recipient} failed: {source:#}")]
    Delivery {
        recipient: String,
        #[source]
        source: anyhow::Error,
    },
}

/// `YYYY-MM-DD` of `now` in [`DISPATCH_TZ`].
pub fn dispatch_date(now: DateTime<Utc>) -> String {
    now.with_timezone(&DISPATCH_TZ)
        .format("%Y-%m-%d")
        .to_string()
}

#[derive(Clone)]
pub struct Dispatcher {
    ledger: Arc<dyn DayLedger>,
    messenger: Arc<dyn Messenger>,
    content: Arc<ContentStore>,
    recipients: Arc<[String]>,
    retry: RetryPolicy,
}

impl Dispatcher {
    /// `recipients` must already be validated as non-empty.
    pub fn new(
        ledger: Arc<dyn DayLedger>,
        messenger: Arc<dyn Messenger>,
        content: Arc<ContentStore>,
        recipients: Vec<String>,
    ) -> Self {
        debug_assert!(!recipients.is_empty(), "dispatcher needs a recipient");
        Self {
            ledger,
            messenger,
            content,
            recipients: recipients.into(),
            retry: RetryPolicy::DELIVERY,
        }
    }

    /// Production wiring: Upstash ledger and LINE delivery.
    pub fn from_config(cfg: &Config, content: ContentStore) -> anyhow::Result<Self> {
        let ledger = UpstashLedger::new(
            cfg.upstash.rest_url.clone(),
            cfg.upstash.rest_token.clone(),
        )?;
        let messenger = LineClient::new(cfg.line.channel_access_token.clone())?;
        Ok(Self::new(
            Arc::new(ledger),
            Arc::new(messenger),
            Arc::new(content),
            cfg.line.recipients.clone(),
        ))
    }

    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub async fn dispatch(
        &self,
        options: DispatchOptions,
    ) -> Result<DispatchOutcome, DispatchError> {
        self.dispatch_at(Utc::now(), options).await
    }

    #[instrument(skip(self, now, options), fields(force = options.force))]
    pub async fn dispatch_at(
        &self,
        now: DateTime<Utc>,
        options: DispatchOptions,
    ) -> Result<DispatchOutcome, DispatchError> {
        let day_count = if options.force {
            self.preview_day_count().await?
        } else {
            let today = dispatch_date(now);
            match self.claim(&today).await? {
                Some(day_count) => day_count,
                None => {
                    info!(%today, "already sent today");
                    return Ok(DispatchOutcome::AlreadySent);
                }
            }
        };

        let (quote, deed) = self.content.pick(day_count);
        let text = format_message(quote, deed, day_count);

        // Sequential fan-out; the first recipient that still fails after its
        // retry aborts the rest.
        for recipient in self.recipients.iter() {
            deliver(self.messenger.as_ref(), recipient, &text, self.retry)
                .await
                .map_err(|source| {
                    warn!(%recipient, day_count, "delivery failed; day stays claimed");
                    DispatchError::Delivery {
                        recipient: recipient.clone(),
                        source,
                    }
                })?;
        }

        info!(day_count, recipients = self.recipients.len(), preview = options.force, "dispatched");
        Ok(DispatchOutcome::Sent {
            day_count,
            preview: options.force,
        })
    }

    /// Claim `date` and advance the counter. `None` when the date was already
    /// claimed, in which case the counter is left alone.
    async fn claim(&self, date: &str) -> Result<Option<i64>, DispatchError> {
        let claimed = self
            .ledger
            .set_if_absent(&sent_marker_key(date), "1", SENT_MARKER_TTL_SECS)
            .await
            .map_err(DispatchError::Ledger)?;
        if !claimed {
            return Ok(None);
        }
        let day_count = self
            .ledger
            .incr(DAY_COUNT_KEY)
            .await
            .map_err(DispatchError::Ledger)?;
        Ok(Some(day_count))
    }

    /// The day number the next claimed dispatch would get, read without
    /// touching the ledger.
    async fn preview_day_count(&self) -> Result<i64, DispatchError> {
        let current = self
            .ledger
            .get(DAY_COUNT_KEY)
            .await
            .map_err(DispatchError::Ledger)?;
        let current = match current {
            None => 0,
            Some(raw) => raw
                .trim()
                .parse::<i64>()
                .map_err(|_| DispatchError::InvalidDayCount(raw.clone()))?,
        };
        Ok(current.saturating_add(1))
    }
}
