//! HTTP surface: health check, dispatch trigger, and the signed webhook.
use axum::body::Bytes;
use axum::extract::rejection::QueryRejection;
use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::middleware;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tower_http::trace::TraceLayer;
use tracing::{debug, error, info, warn};

use crate::dispatch::{DispatchError, Dispatcher};
use crate::model::{DispatchOptions, DispatchOutcome};
use crate::webhook::{require_signature, WebhookSecret};

/// JSON body of `GET /send`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SendResponse {
    Sent {
        sent: bool,
        #[serde(rename = "dayCount")]
        day_count: i64,
        preview: bool,
    },
    Skipped {
        sent: bool,
        reason: String,
    },
    Failed {
        error: String,
    },
}

impl SendResponse {
    /// Map a dispatch result to its status and body.
    pub fn from_result(result: &Result<DispatchOutcome, DispatchError>) -> (StatusCode, Self) {
        match result {
            Ok(DispatchOutcome::Sent { day_count, preview }) => (
                StatusCode::OK,
                SendResponse::Sent {
                    sent: true,
                    day_count: *day_count,
                    preview: *preview,
                },
            ),
            Ok(outcome @ DispatchOutcome::AlreadySent) => (
                StatusCode::TOO_MANY_REQUESTS,
                SendResponse::Skipped {
                    sent: false,
                    reason: outcome.as_str().to_string(),
                },
            ),
            Err(err) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                SendResponse::Failed {
                    error: err.to_string(),
                },
            ),
        }
    }
}

pub fn router(dispatcher: Dispatcher, secret: WebhookSecret) -> Router {
    let webhook = Router::new()
        .route("/webhook", post(webhook))
        .layer(middleware::from_fn_with_state(secret, require_signature));

    Router::new()
        .route("/", get(health))
        .route("/send", get(send))
        .with_state(dispatcher)
        .merge(webhook)
        .layer(TraceLayer::new_for_http())
}

async fn health() -> &'static str {
    "Bamboo Bank is running"
}

async fn send(
    State(dispatcher): State<Dispatcher>,
    query: Result<Query<DispatchOptions>, QueryRejection>,
) -> Response {
    // An unreadable query string is a normal dispatch, same as a missing one.
    let options = match query {
        Ok(Query(options)) => options,
        Err(rejection) => {
            warn!(%rejection, "ignoring unreadable query string");
            DispatchOptions::default()
        }
    };
    let result = dispatcher.dispatch(options).await;
    if let Err(err) = &result {
        error!(error = %err, "dispatch failed");
    }
    let (status, body) = SendResponse::from_result(&result);
    (status, Json(body)).into_response()
}

/// Events are acknowledged, not processed.
async fn webhook(body: Bytes) -> StatusCode {
    match serde_json::from_slice::<Value>(&body) {
        Ok(payload) => {
            let events = payload
                .get("events")
                .and_then(Value::as_array)
                .map_or(0, Vec::len);
            info!(events, "webhook received");
        }
        Err(err) => debug!(%err, "webhook body is not JSON"),
    }
    StatusCode::OK
}
