//! End-to-end call tests over real UDP sockets

use async_trait::async_trait;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::UdpSocket;
use tokio::sync::mpsc;
use tokio::time::timeout;
use voice_gateway_config::Settings;
use voice_gateway_core::{
    AudioFrame, LanguageModel, Result as CoreResult, SpeechToText, TextToSpeech, Transcript, Turn,
    TurnRole,
};
use voice_gateway_media::{mulaw, RtpPacket};
use voice_gateway_pipeline::PipelineBackends;
use voice_gateway_telephony::{CallCodec, CallManager, TelephonyError};

struct ScriptedStt;

#[async_trait]
impl SpeechToText for ScriptedStt {
    async fn transcribe(
        &self,
        _audio: AudioFrame,
        partial_tx: mpsc::Sender<Transcript>,
    ) -> CoreResult<Transcript> {
        let _ = partial_tx.send(Transcript::partial("hello", 0.5)).await;
        Ok(Transcript::final_result("hello there", 0.9))
    }

    fn name(&self) -> &str {
        "scripted"
    }
}

struct EchoLlm;

#[async_trait]
impl LanguageModel for EchoLlm {
    async fn generate(&self, turns: &[Turn], _tx: mpsc::Sender<String>) -> CoreResult<String> {
        let last = turns
            .iter()
            .rev()
            .find(|t| t.role == TurnRole::User)
            .map(|t| t.content.clone())
            .unwrap_or_default();
        Ok(format!("you said {last}"))
    }

    fn name(&self) -> &str {
        "echo"
    }
}

struct ToneTts;

#[async_trait]
impl TextToSpeech for ToneTts {
    async fn synthesize(&self, _text: &str, audio_tx: mpsc::Sender<AudioFrame>) -> CoreResult<usize> {
        for _ in 0..2 {
            let _ = audio_tx
                .send(AudioFrame::new(vec![1000i16; 320], 16000))
                .await;
        }
        Ok(640)
    }

    fn name(&self) -> &str {
        "tone"
    }
}

fn backends() -> PipelineBackends {
    PipelineBackends {
        stt: Arc::new(ScriptedStt),
        llm: Arc::new(EchoLlm),
        tts: Arc::new(ToneTts),
    }
}

fn settings(port_min: u16, port_max: u16) -> Settings {
    let mut settings = Settings::default();
    settings.media.rtp_ip = "127.0.0.1".to_string();
    settings.media.port_min = port_min;
    settings.media.port_max = port_max;
    settings
}

fn remote() -> SocketAddr {
    "127.0.0.1:9".parse().unwrap()
}

#[tokio::test]
async fn concurrent_duplicate_creates_share_one_session() {
    let manager = Arc::new(CallManager::new(&settings(47000, 47003), backends()));

    let creates = (0..4).map(|_| {
        let manager = manager.clone();
        tokio::spawn(async move { manager.create_call("call-1", remote(), CallCodec::Pcmu).await })
    });
    let answers: Vec<_> = futures::future::join_all(creates)
        .await
        .into_iter()
        .map(|r| r.unwrap().unwrap())
        .collect();

    assert!(answers.windows(2).all(|w| w[0] == w[1]), "answers differ: {answers:?}");
    assert_eq!(manager.active_calls(), 1);

    // the duplicates released their ports: three more calls fit, a fourth does not
    for i in 0..3 {
        manager
            .create_call(&format!("extra-{i}"), remote(), CallCodec::Pcmu)
            .await
            .unwrap();
    }
    assert!(matches!(
        manager.create_call("one-too-many", remote(), CallCodec::Pcmu).await,
        Err(TelephonyError::ResourceExhausted)
    ));
}

#[tokio::test]
async fn terminate_frees_the_port() {
    let manager = CallManager::new(&settings(47010, 47010), backends());

    let first = manager
        .create_call("call-a", remote(), CallCodec::Pcmu)
        .await
        .unwrap();
    assert!(matches!(
        manager.create_call("call-b", remote(), CallCodec::Pcmu).await,
        Err(TelephonyError::ResourceExhausted)
    ));

    manager.terminate_call("call-a").await.unwrap();
    assert_eq!(manager.active_calls(), 0);

    let second = manager
        .create_call("call-b", remote(), CallCodec::Pcmu)
        .await
        .unwrap();
    assert_eq!(first.local_port, second.local_port);
}

#[tokio::test]
async fn terminating_unknown_call_fails() {
    let manager = CallManager::new(&settings(47020, 47020), backends());
    assert!(matches!(
        manager.terminate_call("ghost").await,
        Err(TelephonyError::SessionNotFound(_))
    ));
    assert!(matches!(
        manager.call_snapshot("ghost"),
        Err(TelephonyError::SessionNotFound(_))
    ));
}

#[tokio::test]
async fn caller_speech_comes_back_as_synthesized_rtp() {
    let caller = UdpSocket::bind("127.0.0.1:0").await.unwrap();
    let caller_addr = caller.local_addr().unwrap();

    let manager = CallManager::new(&settings(47030, 47030), backends());
    let answer = manager
        .create_call("call-rt", caller_addr, CallCodec::Pcmu)
        .await
        .unwrap();
    let gateway: SocketAddr = (answer.local_ip, answer.local_port).into();

    // one malformed datagram is dropped, not fatal
    caller.send_to(&[0u8; 5], gateway).await.unwrap();

    let speech = mulaw::encode(&vec![4000i16; 160]);
    let silence = mulaw::encode(&vec![0i16; 160]);
    let mut sequence: u16 = 100;
    let mut timestamp: u32 = 0;
    let settings = Settings::default();
    let total_silence = settings.pipeline.vad.silence_threshold_frames as usize;
    for payload in std::iter::repeat(&speech)
        .take(3)
        .chain(std::iter::repeat(&silence).take(total_silence))
    {
        let packet = RtpPacket::new(0, sequence, timestamp, 7, payload.clone());
        caller.send_to(&packet.encode(), gateway).await.unwrap();
        sequence = sequence.wrapping_add(1);
        timestamp = timestamp.wrapping_add(160);
    }

    // the pipeline transcribes, replies, synthesizes, and RTP comes back
    let mut buf = [0u8; 2048];
    let mut received = Vec::new();
    for _ in 0..2 {
        let (len, from) = timeout(Duration::from_secs(5), caller.recv_from(&mut buf))
            .await
            .expect("no synthesized RTP within deadline")
            .unwrap();
        assert_eq!(from, gateway);
        received.push(RtpPacket::decode(&buf[..len]).unwrap());
    }

    assert_eq!(received[0].payload_type, 0);
    assert_eq!(received[0].payload.len(), 160, "20ms of PCMU per packet");
    assert_eq!(
        received[0].sequence_number.wrapping_add(1),
        received[1].sequence_number,
        "egress sequence increments in order"
    );
    assert_eq!(received[0].ssrc, received[1].ssrc);

    let snapshot = manager.call_snapshot("call-rt").unwrap();
    assert!(snapshot.packets_received >= 3);
    assert_eq!(snapshot.malformed_dropped, 1);
    assert!(snapshot.packets_sent >= 2);
    // system prompt + user turn + assistant turn
    assert_eq!(snapshot.conversation_turns, 3);

    manager.terminate_call("call-rt").await.unwrap();
}
