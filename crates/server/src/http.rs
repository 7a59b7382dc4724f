//! Route definitions and handlers

use crate::{AppState, ServerError};
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use std::net::{IpAddr, SocketAddr};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::info;
use uuid::Uuid;
use voice_gateway_telephony::{CallCodec, CallSnapshot};

pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/calls", post(create_call))
        .route("/calls/:id", axum::routing::delete(delete_call))
        .route("/calls/:id/stats", get(call_stats))
        .route("/health", get(health))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

#[derive(Debug, Deserialize)]
struct CreateCallRequest {
    /// Generated when the signaling side does not supply one
    call_id: Option<String>,
    remote_ip: IpAddr,
    remote_port: u16,
    #[serde(default)]
    codec: CallCodec,
}

#[derive(Debug, Serialize)]
struct CreateCallResponse {
    call_id: String,
    local_ip: IpAddr,
    local_port: u16,
}

async fn create_call(
    State(state): State<AppState>,
    Json(request): Json<CreateCallRequest>,
) -> Result<(StatusCode, Json<CreateCallResponse>), ServerError> {
    if request.remote_port == 0 {
        return Err(ServerError::BadRequest("remote_port must be non-zero".into()));
    }
    let call_id = request
        .call_id
        .unwrap_or_else(|| Uuid::new_v4().to_string());
    let remote = SocketAddr::new(request.remote_ip, request.remote_port);

    let answer = state
        .manager
        .create_call(&call_id, remote, request.codec)
        .await?;
    info!(%call_id, %remote, "call accepted");
    Ok((
        StatusCode::CREATED,
        Json(CreateCallResponse {
            call_id,
            local_ip: answer.local_ip,
            local_port: answer.local_port,
        }),
    ))
}

async fn delete_call(
    State(state): State<AppState>,
    Path(call_id): Path<String>,
) -> Result<StatusCode, ServerError> {
    state.manager.terminate_call(&call_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn call_stats(
    State(state): State<AppState>,
    Path(call_id): Path<String>,
) -> Result<Json<CallSnapshot>, ServerError> {
    Ok(Json(state.manager.call_snapshot(&call_id)?))
}

#[derive(Debug, Serialize)]
struct HealthResponse {
    status: &'static str,
    active_calls: usize,
}

async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        active_calls: state.manager.active_calls(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use axum::body::Body;
    use axum::http::Request;
    use std::sync::Arc;
    use tokio::sync::mpsc;
    use tower::ServiceExt;
    use voice_gateway_config::Settings;
    use voice_gateway_core::{
        AudioFrame, LanguageModel, Result as CoreResult, SpeechToText, TextToSpeech, Transcript,
        Turn,
    };
    use voice_gateway_pipeline::PipelineBackends;
    use voice_gateway_telephony::CallManager;

    struct NullStt;

    #[async_trait]
    impl SpeechToText for NullStt {
        async fn transcribe(
            &self,
            _audio: AudioFrame,
            _partial_tx: mpsc::Sender<Transcript>,
        ) -> CoreResult<Transcript> {
            Ok(Transcript::final_result("", 0.0))
        }

        fn name(&self) -> &str {
            "null"
        }
    }

    struct NullLlm;

    #[async_trait]
    impl LanguageModel for NullLlm {
        async fn generate(&self, _turns: &[Turn], _tx: mpsc::Sender<String>) -> CoreResult<String> {
            Ok(String::new())
        }

        fn name(&self) -> &str {
            "null"
        }
    }

    struct NullTts;

    #[async_trait]
    impl TextToSpeech for NullTts {
        async fn synthesize(
            &self,
            _text: &str,
            _audio_tx: mpsc::Sender<AudioFrame>,
        ) -> CoreResult<usize> {
            Ok(0)
        }

        fn name(&self) -> &str {
            "null"
        }
    }

    fn router(port_min: u16, port_max: u16) -> Router {
        let mut settings = Settings::default();
        settings.media.rtp_ip = "127.0.0.1".to_string();
        settings.media.port_min = port_min;
        settings.media.port_max = port_max;
        let backends = PipelineBackends {
            stt: Arc::new(NullStt),
            llm: Arc::new(NullLlm),
            tts: Arc::new(NullTts),
        };
        let manager = Arc::new(CallManager::new(&settings, backends));
        create_router(AppState::new(Arc::new(settings), manager))
    }

    async fn body_json(response: axum::response::Response) -> serde_json::Value {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn health_reports_active_calls() {
        let app = router(47050, 47050);
        let response = app
            .oneshot(Request::get("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        assert_eq!(body["status"], "ok");
        assert_eq!(body["active_calls"], 0);
    }

    #[tokio::test]
    async fn call_lifecycle_over_http() {
        let app = router(47060, 47060);

        let create = Request::post("/calls")
            .header("content-type", "application/json")
            .body(Body::from(
                r#"{"call_id":"c1","remote_ip":"127.0.0.1","remote_port":40000}"#,
            ))
            .unwrap();
        let response = app.clone().oneshot(create).await.unwrap();
        assert_eq!(response.status(), StatusCode::CREATED);
        let body = body_json(response).await;
        assert_eq!(body["call_id"], "c1");
        assert_eq!(body["local_port"], 47060);

        let stats = Request::get("/calls/c1/stats").body(Body::empty()).unwrap();
        let response = app.clone().oneshot(stats).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        assert_eq!(body["call_id"], "c1");
        assert_eq!(body["codec"], "pcmu");

        let delete = Request::delete("/calls/c1").body(Body::empty()).unwrap();
        let response = app.clone().oneshot(delete).await.unwrap();
        assert_eq!(response.status(), StatusCode::NO_CONTENT);

        let stats = Request::get("/calls/c1/stats").body(Body::empty()).unwrap();
        let response = app.oneshot(stats).await.unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn exhausted_ports_map_to_service_unavailable() {
        let app = router(47070, 47070);
        for (id, expected) in [("a", StatusCode::CREATED), ("b", StatusCode::SERVICE_UNAVAILABLE)]
        {
            let request = Request::post("/calls")
                .header("content-type", "application/json")
                .body(Body::from(format!(
                    r#"{{"call_id":"{id}","remote_ip":"127.0.0.1","remote_port":40000}}"#
                )))
                .unwrap();
            let response = app.clone().oneshot(request).await.unwrap();
            assert_eq!(response.status(), expected);
        }
    }

    #[tokio::test]
    async fn zero_remote_port_rejected() {
        let app = router(47080, 47080);
        let request = Request::post("/calls")
            .header("content-type", "application/json")
            .body(Body::from(
                r#"{"remote_ip":"127.0.0.1","remote_port":0}"#,
            ))
            .unwrap();
        let response = app.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }
}
