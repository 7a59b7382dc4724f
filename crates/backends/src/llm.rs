//! Language model HTTP adapter

use crate::http::{build_client, ndjson_lines, send_with_retry};
use async_trait::async_trait;
use futures::{pin_mut, StreamExt};
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use voice_gateway_config::BackendServiceConfig;
use voice_gateway_core::{LanguageModel, Result, Turn};

#[derive(Serialize)]
struct GenerateRequest<'a> {
    turns: &'a [Turn],
}

/// One NDJSON line of the generation stream
#[derive(Debug, Deserialize)]
struct ChunkLine {
    #[serde(default)]
    delta: String,
    #[serde(default)]
    done: bool,
}

/// Client for an NDJSON-streaming generation service.
///
/// The whole conversation is posted as JSON; the reply streams back as
/// `delta` lines which concatenate into the full text.
pub struct HttpLanguageModel {
    client: reqwest::Client,
    config: BackendServiceConfig,
}

impl HttpLanguageModel {
    pub fn new(config: BackendServiceConfig) -> Result<Self> {
        Ok(Self {
            client: build_client(&config)?,
            config,
        })
    }
}

#[async_trait]
impl LanguageModel for HttpLanguageModel {
    async fn generate(&self, turns: &[Turn], chunk_tx: mpsc::Sender<String>) -> Result<String> {
        let url = format!("{}/v1/generate", self.config.endpoint);
        let body = serde_json::to_value(GenerateRequest { turns })?;

        let response = send_with_retry("llm", &self.config, || {
            self.client.post(&url).json(&body)
        })
        .await?;

        let lines = ndjson_lines::<ChunkLine>(response);
        pin_mut!(lines);

        let mut reply = String::new();
        while let Some(line) = lines.next().await {
            let line = line?;
            if !line.delta.is_empty() {
                reply.push_str(&line.delta);
                let _ = chunk_tx.send(line.delta).await;
            }
            if line.done {
                break;
            }
        }
        Ok(reply)
    }

    fn name(&self) -> &str {
        "http-llm"
    }
}
