//! Proxy routes forwarding to the settlement service

use axum::{
    extract::{rejection::JsonRejection, Query, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{debug, error, info, warn};

use crate::settlement::SettlementClient;

/// Shared state for HTTP handlers
struct AppState {
    settlement: SettlementClient,
}

type Reply = (StatusCode, Json<Value>);

/// Build the proxy router
pub fn router(settlement: SettlementClient) -> Router {
    let state = Arc::new(AppState { settlement });

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/health", get(health))
        .route("/api/statistics", get(statistics))
        .route("/api/donate", post(donate))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

/// Health check endpoint
async fn health() -> &'static str {
    "OK"
}

fn error_reply(status: StatusCode, message: impl Into<String>) -> Reply {
    (status, Json(json!({ "error": message.into() })))
}

/// Keep non-JSON remote bodies as JSON strings
fn remote_body(text: &str) -> Value {
    serde_json::from_str(text).unwrap_or_else(|_| Value::String(text.to_string()))
}

#[derive(Debug, Deserialize)]
struct StatisticsQuery {
    address: Option<String>,
}

/// `GET /api/statistics?address=`
async fn statistics(
    State(state): State<Arc<AppState>>,
    Query(query): Query<StatisticsQuery>,
) -> Reply {
    let Some(address) = query.address.filter(|a| !a.is_empty()) else {
        return error_reply(StatusCode::BAD_REQUEST, "Missing address");
    };

    let reply = match state.settlement.statistics(&address).await {
        Ok(reply) => reply,
        Err(e) => {
            error!("Statistics request for {} failed: {}", address, e);
            return error_reply(StatusCode::INTERNAL_SERVER_ERROR, e.to_string());
        }
    };

    if !reply.status.is_success() {
        warn!("Statistics for {} returned {}", address, reply.status);
        return (
            reply.status,
            Json(json!({ "error": "Failed to fetch", "details": reply.text })),
        );
    }

    match serde_json::from_str::<Value>(&reply.text) {
        Ok(body) => {
            debug!("Statistics for {} forwarded", address);
            (StatusCode::OK, Json(body))
        }
        Err(e) => {
            error!("Statistics for {} returned invalid JSON: {}", address, e);
            error_reply(StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct DonatePayload {
    donate_address: Option<String>,
    user_address: Option<String>,
    signature: Option<String>,
}

fn present(field: Option<String>) -> Option<String> {
    field.filter(|v| !v.is_empty())
}

/// `POST /api/donate`
async fn donate(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<DonatePayload>, JsonRejection>,
) -> Reply {
    let Json(payload) = match payload {
        Ok(payload) => payload,
        Err(rejection) => {
            warn!("Rejected donate body: {}", rejection);
            return error_reply(StatusCode::BAD_REQUEST, "Invalid request body");
        }
    };

    let (Some(donate_address), Some(user_address), Some(signature)) = (
        present(payload.donate_address),
        present(payload.user_address),
        present(payload.signature),
    ) else {
        return error_reply(StatusCode::BAD_REQUEST, "Missing fields");
    };

    info!("Forwarding donation from {} to {}", user_address, donate_address);

    let reply = match state
        .settlement
        .donate_to(&donate_address, &user_address, &signature)
        .await
    {
        Ok(reply) => reply,
        Err(e) => {
            error!("Donation request failed: {}", e);
            return error_reply(StatusCode::INTERNAL_SERVER_ERROR, e.to_string());
        }
    };

    let data = remote_body(&reply.text);

    if !reply.status.is_success() {
        warn!("Donation from {} rejected with {}", user_address, reply.status);
        return (
            reply.status,
            Json(json!({ "error": "Donate failed", "details": data })),
        );
    }

    (StatusCode::OK, Json(json!({ "success": true, "data": data })))
}
