//! Text-to-speech HTTP adapter

use crate::http::{build_client, send_with_retry};
use async_trait::async_trait;
use futures::StreamExt;
use serde_json::json;
use tokio::sync::mpsc;
use voice_gateway_config::BackendServiceConfig;
use voice_gateway_core::{AudioFrame, Error, Result, TextToSpeech};

/// Client for a synthesis service that streams raw PCM16.
///
/// The response body is little-endian PCM16 at the requested rate, sliced
/// here into fixed-duration frames as bytes arrive so playback can start
/// before synthesis finishes.
pub struct HttpTextToSpeech {
    client: reqwest::Client,
    config: BackendServiceConfig,
    sample_rate: u32,
    frame_samples: usize,
}

impl HttpTextToSpeech {
    pub fn new(config: BackendServiceConfig, sample_rate: u32, frame_ms: u32) -> Result<Self> {
        Ok(Self {
            client: build_client(&config)?,
            config,
            sample_rate,
            frame_samples: (sample_rate as usize * frame_ms as usize) / 1000,
        })
    }
}

/// Slice whole frames off the front of `buf`, leaving the remainder
fn drain_frames(buf: &mut Vec<u8>, frame_samples: usize, sample_rate: u32) -> Vec<AudioFrame> {
    let frame_bytes = frame_samples * 2;
    let mut frames = Vec::new();
    while buf.len() >= frame_bytes {
        let chunk: Vec<u8> = buf.drain(..frame_bytes).collect();
        if let Some(frame) = AudioFrame::from_pcm16(&chunk, sample_rate) {
            frames.push(frame);
        }
    }
    frames
}

#[async_trait]
impl TextToSpeech for HttpTextToSpeech {
    async fn synthesize(&self, text: &str, audio_tx: mpsc::Sender<AudioFrame>) -> Result<usize> {
        let url = format!("{}/v1/synthesize", self.config.endpoint);
        let body = json!({ "text": text, "sample_rate": self.sample_rate });

        let response = send_with_retry("tts", &self.config, || {
            self.client.post(&url).json(&body)
        })
        .await?;

        let mut emitted = 0usize;
        let mut buf: Vec<u8> = Vec::new();
        let mut stream = response.bytes_stream();
        while let Some(chunk) = stream.next().await {
            let chunk = chunk
                .map_err(|e| Error::BackendUnavailable(format!("audio stream failed: {e}")))?;
            buf.extend_from_slice(&chunk);
            for frame in drain_frames(&mut buf, self.frame_samples, self.sample_rate) {
                emitted += frame.len();
                if audio_tx.send(frame).await.is_err() {
                    // playback side went away; stop pulling audio
                    return Ok(emitted);
                }
            }
        }

        // whatever remains is the final short frame
        if !buf.is_empty() {
            let frame = AudioFrame::from_pcm16(&buf, self.sample_rate).ok_or_else(|| {
                Error::InvalidAudioFormat(format!(
                    "synthesis stream ended with {} dangling bytes",
                    buf.len() % 2
                ))
            })?;
            emitted += frame.len();
            let _ = audio_tx.send(frame).await;
        }
        Ok(emitted)
    }

    fn name(&self) -> &str {
        "http-tts"
    }
}
