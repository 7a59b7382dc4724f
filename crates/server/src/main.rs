use anyhow::Context;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};
use voice_gateway_backends::{HttpLanguageModel, HttpSpeechToText, HttpTextToSpeech};
use voice_gateway_config::{load_settings, Settings};
use voice_gateway_pipeline::PipelineBackends;
use voice_gateway_server::{create_router, AppState};
use voice_gateway_telephony::CallManager;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let env = std::env::var("VOICE_GATEWAY_ENV").ok();
    let settings = load_settings(env.as_deref()).context("failed to load settings")?;
    info!(
        http_port = settings.server.http_port,
        rtp_range = %format!("{}-{}", settings.media.port_min, settings.media.port_max),
        "starting voice gateway"
    );

    let backends = build_backends(&settings)?;
    let manager = Arc::new(CallManager::new(&settings, backends));
    let state = AppState::new(Arc::new(settings.clone()), manager.clone());

    let addr = format!("{}:{}", settings.server.host, settings.server.http_port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;
    info!(%addr, "listening");

    axum::serve(listener, create_router(state))
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            info!("shutdown signal received");
        })
        .await
        .context("server error")?;

    manager.terminate_all().await;
    info!("all calls drained, exiting");
    Ok(())
}

fn build_backends(settings: &Settings) -> anyhow::Result<PipelineBackends> {
    Ok(PipelineBackends {
        stt: Arc::new(
            HttpSpeechToText::new(settings.backends.stt.clone())
                .context("stt client construction failed")?,
        ),
        llm: Arc::new(
            HttpLanguageModel::new(settings.backends.llm.clone())
                .context("llm client construction failed")?,
        ),
        tts: Arc::new(
            HttpTextToSpeech::new(
                settings.backends.tts.clone(),
                settings.pipeline.sample_rate,
                settings.pipeline.frame_ms,
            )
            .context("tts client construction failed")?,
        ),
    })
}
