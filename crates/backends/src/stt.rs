//! Speech-to-text HTTP adapter

use crate::http::{build_client, ndjson_lines, send_with_retry};
use async_trait::async_trait;
use futures::{pin_mut, StreamExt};
use serde::Deserialize;
use tokio::sync::mpsc;
use tracing::warn;
use voice_gateway_config::BackendServiceConfig;
use voice_gateway_core::{AudioFrame, Result, SpeechToText, Transcript};

/// One NDJSON line from the transcription service
#[derive(Debug, Deserialize)]
struct TranscriptLine {
    text: String,
    #[serde(default)]
    is_final: bool,
    #[serde(default)]
    confidence: f32,
}

/// Client for an NDJSON-streaming transcription service.
///
/// The utterance is posted as raw little-endian PCM16 with the sample
/// rate in the query string; the response is one JSON hypothesis per
/// line, with `is_final` set on the last.
pub struct HttpSpeechToText {
    client: reqwest::Client,
    config: BackendServiceConfig,
}

impl HttpSpeechToText {
    pub fn new(config: BackendServiceConfig) -> Result<Self> {
        Ok(Self {
            client: build_client(&config)?,
            config,
        })
    }
}

#[async_trait]
impl SpeechToText for HttpSpeechToText {
    async fn transcribe(
        &self,
        audio: AudioFrame,
        partial_tx: mpsc::Sender<Transcript>,
    ) -> Result<Transcript> {
        let url = format!("{}/v1/transcribe", self.config.endpoint);
        let body = audio.to_pcm16();
        let sample_rate = audio.sample_rate;

        let response = send_with_retry("stt", &self.config, || {
            self.client
                .post(&url)
                .query(&[("sample_rate", sample_rate)])
                .header(reqwest::header::CONTENT_TYPE, "application/octet-stream")
                .body(body.clone())
        })
        .await?;

        let lines = ndjson_lines::<TranscriptLine>(response);
        pin_mut!(lines);

        let mut last_partial: Option<Transcript> = None;
        while let Some(line) = lines.next().await {
            let line = line?;
            if line.is_final {
                return Ok(Transcript::final_result(line.text, line.confidence));
            }
            let partial = Transcript::partial(line.text, line.confidence);
            // a closed partial receiver only means nobody wants partials
            let _ = partial_tx.send(partial.clone()).await;
            last_partial = Some(partial);
        }

        // stream ended without a final line; promote the best hypothesis
        warn!(backend = self.name(), "no final transcript in response");
        Ok(match last_partial {
            Some(partial) => Transcript::final_result(partial.text, partial.confidence),
            None => Transcript::final_result("", 0.0),
        })
    }

    fn name(&self) -> &str {
        "http-stt"
    }
}
