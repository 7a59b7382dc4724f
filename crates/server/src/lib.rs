//! HTTP signaling surface
//!
//! A thin axum boundary over the call manager: create and terminate calls,
//! read per-call stats, report liveness. SIP/SDP negotiation itself lives
//! outside the gateway; this API carries only the media-relevant answer
//! (where to send RTP).

pub mod http;
pub mod state;

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use thiserror::Error;
use voice_gateway_telephony::TelephonyError;

pub use http::create_router;
pub use state::AppState;

/// Errors surfaced through the HTTP API
#[derive(Error, Debug)]
pub enum ServerError {
    #[error(transparent)]
    Telephony(#[from] TelephonyError),

    #[error("invalid request: {0}")]
    BadRequest(String),
}

impl From<&ServerError> for StatusCode {
    fn from(error: &ServerError) -> Self {
        match error {
            ServerError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ServerError::Telephony(TelephonyError::SessionNotFound(_)) => StatusCode::NOT_FOUND,
            ServerError::Telephony(TelephonyError::ResourceExhausted) => {
                StatusCode::SERVICE_UNAVAILABLE
            }
            ServerError::Telephony(TelephonyError::CallSetupTimeout(_)) => {
                StatusCode::GATEWAY_TIMEOUT
            }
            ServerError::Telephony(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ServerError {
    fn into_response(self) -> Response {
        let status = StatusCode::from(&self);
        tracing::warn!(%status, error = %self, "request failed");
        (status, Json(json!({ "error": self.to_string() }))).into_response()
    }
}
