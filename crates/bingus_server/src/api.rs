//! HTTP API: `/health`, `/tools` and `/call`.
//!
//! Each `/call` runs its tool invocation on a blocking task, so a slow or
//! pathological tool occupies one blocking thread rather than the runtime.

use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use bingus_tool::ToolRegistry;
use serde::{Deserialize, Serialize};
use serde_json::json;
use serde_json::value::RawValue;
use std::sync::Arc;

/// Body of a `/call` request
#[derive(Debug, Deserialize)]
pub struct CallRequest {
    /// Tool name
    pub name: String,
    /// Arguments JSON, passed to the tool verbatim
    pub arguments: Option<Box<RawValue>>,
}

/// Body of a `/call` response; exactly one field is set
#[derive(Debug, Serialize)]
pub struct CallResponse {
    /// Tool result on success
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<String>,
    /// Error text on failure
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl CallResponse {
    fn result(result: String) -> Self {
        Self {
            result: Some(result),
            error: None,
        }
    }

    fn error(error: String) -> Self {
        Self {
            result: None,
            error: Some(error),
        }
    }
}

/// Build the daemon router over a loaded registry.
pub fn router(registry: Arc<ToolRegistry>) -> Router {
    Router::new()
        .route("/health", get(handle_health))
        .route("/tools", get(handle_tools))
        .route("/call", post(handle_call))
        .with_state(registry)
}

async fn handle_health() -> Json<serde_json::Value> {
    Json(json!({"status": "ok"}))
}

async fn handle_tools(State(registry): State<Arc<ToolRegistry>>) -> Response {
    Json(registry.schemas().to_vec()).into_response()
}

async fn handle_call(
    State(registry): State<Arc<ToolRegistry>>,
    payload: Result<Json<CallRequest>, JsonRejection>,
) -> Response {
    let Json(request) = match payload {
        Ok(payload) => payload,
        Err(rejection) => {
            return (
                StatusCode::BAD_REQUEST,
                Json(CallResponse::error(format!(
                    "invalid request body: {}",
                    rejection.body_text()
                ))),
            )
                .into_response();
        }
    };

    let args = request
        .arguments
        .map(|raw| raw.get().to_string())
        .unwrap_or_else(|| "null".to_string());

    tracing::debug!(tool = %request.name, "invoking tool");
    let name = request.name;
    let outcome =
        tokio::task::spawn_blocking(move || registry.call(&name, &args)).await;

    match outcome {
        Ok(Ok(result)) => Json(CallResponse::result(result)).into_response(),
        Ok(Err(err)) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(CallResponse::error(err.to_string())),
        )
            .into_response(),
        Err(join_err) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(CallResponse::error(join_err.to_string())),
        )
            .into_response(),
    }
}
