//! Per-call UDP media loops
//!
//! The receive loop turns wire packets into pipeline audio, the egress
//! loop turns synthesized audio back into paced RTP. Malformed packets
//! are counted and dropped; neither loop ever takes a call down on its
//! own.

use crate::call::{CallCodec, CallCounters};
use std::net::SocketAddr;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use tokio::net::UdpSocket;
use tokio::sync::{mpsc, watch};
use tracing::{debug, trace, warn};
use voice_gateway_core::{AudioFrame, Frame};
use voice_gateway_media::{resample, transcode, RtpPacket};

const MAX_DATAGRAM: usize = 2048;

/// Egress sequence/timestamp bookkeeping.
///
/// Both counters wrap per RFC 3550; the timestamp advances by the number
/// of wire-rate samples in each packet.
pub struct EgressCursor {
    sequence: u16,
    timestamp: u32,
}

impl EgressCursor {
    /// Start from random offsets, as the RFC recommends
    pub fn new() -> Self {
        Self {
            sequence: rand::random(),
            timestamp: rand::random(),
        }
    }

    pub fn with_start(sequence: u16, timestamp: u32) -> Self {
        Self {
            sequence,
            timestamp,
        }
    }

    /// Values for the next packet carrying `samples` wire-rate samples
    pub fn next(&mut self, samples: u32) -> (u16, u32) {
        let current = (self.sequence, self.timestamp);
        self.sequence = self.sequence.wrapping_add(1);
        self.timestamp = self.timestamp.wrapping_add(samples);
        current
    }
}

impl Default for EgressCursor {
    fn default() -> Self {
        Self::new()
    }
}

/// Convert one inbound payload to pipeline PCM
fn decode_payload(payload: &[u8], codec: CallCodec, pipeline_rate: u32) -> Option<Vec<i16>> {
    match codec {
        CallCodec::Pcmu => Some(transcode::companded_to_rate(payload, pipeline_rate)),
        CallCodec::L16 => {
            if payload.len() % 2 != 0 {
                return None;
            }
            let samples: Vec<i16> = payload
                .chunks_exact(2)
                .map(|c| i16::from_be_bytes([c[0], c[1]]))
                .collect();
            Some(resample::linear(&samples, codec.wire_rate(), pipeline_rate))
        }
    }
}

/// Convert one pipeline audio frame to the wire format
fn encode_payload(frame: &AudioFrame, codec: CallCodec) -> Vec<u8> {
    match codec {
        CallCodec::Pcmu => transcode::samples_to_companded(&frame.samples, frame.sample_rate),
        CallCodec::L16 => {
            let wire = resample::linear(&frame.samples, frame.sample_rate, codec.wire_rate());
            wire.iter().flat_map(|s| s.to_be_bytes()).collect()
        }
    }
}

/// Bytes per wire sample for packet sizing
fn bytes_per_sample(codec: CallCodec) -> usize {
    match codec {
        CallCodec::Pcmu => 1,
        CallCodec::L16 => 2,
    }
}

/// Read RTP from the socket and feed decoded audio into the pipeline.
///
/// Exits when the pipeline input closes or the socket fails.
pub async fn receive_loop(
    socket: Arc<UdpSocket>,
    input: mpsc::Sender<Frame>,
    codec: CallCodec,
    pipeline_rate: u32,
    counters: Arc<CallCounters>,
) {
    let mut buf = [0u8; MAX_DATAGRAM];
    loop {
        let len = match socket.recv_from(&mut buf).await {
            Ok((len, _peer)) => len,
            Err(error) => {
                warn!(%error, "RTP socket read failed, stopping receive loop");
                return;
            }
        };

        let packet = match RtpPacket::decode(&buf[..len]) {
            Ok(packet) => packet,
            Err(error) => {
                counters.malformed_dropped.fetch_add(1, Ordering::Relaxed);
                debug!(%error, "dropping malformed RTP packet");
                continue;
            }
        };
        counters.packets_received.fetch_add(1, Ordering::Relaxed);
        trace!(
            seq = packet.sequence_number,
            ts = packet.timestamp,
            bytes = packet.payload.len(),
            "RTP packet received"
        );

        let Some(samples) = decode_payload(&packet.payload, codec, pipeline_rate) else {
            counters.malformed_dropped.fetch_add(1, Ordering::Relaxed);
            continue;
        };
        let frame = Frame::AudioInput(AudioFrame::new(samples, pipeline_rate));
        if input.send(frame).await.is_err() {
            debug!("pipeline input closed, stopping receive loop");
            return;
        }
    }
}

/// Pull synthesized audio, packetize, and send to the caller.
///
/// A stop signal on the watch channel discards everything queued so
/// playback halts within one packet of the interruption. Exits when the
/// audio channel closes.
#[allow(clippy::too_many_arguments)]
pub async fn egress_loop(
    socket: Arc<UdpSocket>,
    remote: SocketAddr,
    mut audio_rx: mpsc::Receiver<AudioFrame>,
    mut stop_rx: watch::Receiver<u64>,
    codec: CallCodec,
    payload_type: u8,
    ssrc: u32,
    frame_ms: u32,
    counters: Arc<CallCounters>,
) {
    let samples_per_packet = (codec.wire_rate() as usize * frame_ms as usize) / 1000;
    let packet_bytes = samples_per_packet * bytes_per_sample(codec);
    let mut cursor = EgressCursor::new();
    let mut stop_open = true;

    loop {
        tokio::select! {
            changed = stop_rx.changed(), if stop_open => {
                match changed {
                    Ok(()) => {
                        let mut discarded = 0usize;
                        while audio_rx.try_recv().is_ok() {
                            discarded += 1;
                        }
                        debug!(discarded, "playback stop: cleared egress queue");
                    }
                    Err(_) => stop_open = false,
                }
            }
            frame = audio_rx.recv() => {
                let Some(frame) = frame else {
                    debug!("audio channel closed, stopping egress loop");
                    return;
                };
                let wire = encode_payload(&frame, codec);
                for chunk in wire.chunks(packet_bytes) {
                    let chunk_samples = (chunk.len() / bytes_per_sample(codec)) as u32;
                    let (sequence, timestamp) = cursor.next(chunk_samples);
                    let packet =
                        RtpPacket::new(payload_type, sequence, timestamp, ssrc, chunk.to_vec());
                    if let Err(error) = socket.send_to(&packet.encode(), remote).await {
                        warn!(%error, "RTP send failed, stopping egress loop");
                        return;
                    }
                    counters.packets_sent.fetch_add(1, Ordering::Relaxed);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cursor_wraps_sequence() {
        let mut cursor = EgressCursor::with_start(65535, 0);
        assert_eq!(cursor.next(160), (65535, 0));
        let (seq, ts) = cursor.next(160);
        assert_eq!(seq, 0, "sequence wraps mod 2^16");
        assert_eq!(ts, 160);
    }

    #[test]
    fn cursor_wraps_timestamp() {
        let mut cursor = EgressCursor::with_start(10, u32::MAX - 100);
        cursor.next(160);
        let (_, ts) = cursor.next(160);
        assert_eq!(ts, (u32::MAX - 100).wrapping_add(160));
    }

    #[test]
    fn pcmu_payload_round_trips_rates() {
        // 20ms of 16k pipeline audio becomes 160 companded bytes
        let frame = AudioFrame::new(vec![1000i16; 320], 16000);
        let wire = encode_payload(&frame, CallCodec::Pcmu);
        assert_eq!(wire.len(), 160);
        let back = decode_payload(&wire, CallCodec::Pcmu, 16000).unwrap();
        assert_eq!(back.len(), 320);
    }

    #[test]
    fn l16_payload_is_big_endian() {
        let frame = AudioFrame::new(vec![0x0102i16; 320], 16000);
        let wire = encode_payload(&frame, CallCodec::L16);
        assert_eq!(wire.len(), 640);
        assert_eq!(&wire[..2], &[0x01, 0x02]);
        let back = decode_payload(&wire, CallCodec::L16, 16000).unwrap();
        assert_eq!(back[0], 0x0102);
    }

    #[test]
    fn odd_l16_payload_rejected() {
        assert!(decode_payload(&[0u8; 321], CallCodec::L16, 16000).is_none());
    }
}
