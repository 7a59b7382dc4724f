//! RTP packet parsing and serialization
//!
//! Implements the fixed RTP header (RFC 3550) plus CSRC list, header
//! extension, and padding. Header length is 12 + 4×CSRC count, plus the
//! extension block when the X bit is set; any header length exceeding the
//! packet is rejected as malformed rather than read out of bounds.

use crate::MediaError;
use bytes::{Buf, BufMut, Bytes, BytesMut};
use voice_gateway_config::constants::rtp::{HEADER_LEN, VERSION};

/// RTP header extension: profile-defined id plus 32-bit words
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RtpExtension {
    /// Profile-defined identifier
    pub profile: u16,
    /// Extension payload as 32-bit words
    pub words: Vec<u32>,
}

/// A parsed RTP packet
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RtpPacket {
    pub version: u8,
    pub marker: bool,
    pub payload_type: u8,
    /// Wraps mod 65536, incremented once per packet
    pub sequence_number: u16,
    /// Wraps mod 2^32, incremented by samples-per-frame
    pub timestamp: u32,
    pub ssrc: u32,
    pub csrc: Vec<u32>,
    /// Emitted (and the X bit set) only when present
    pub extension: Option<RtpExtension>,
    pub payload: Bytes,
    /// Pad length including the trailing count byte; emitted only when present
    pub padding: Option<u8>,
}

impl RtpPacket {
    /// Create a packet with the usual defaults (version 2, no CSRC,
    /// no extension, no padding).
    pub fn new(
        payload_type: u8,
        sequence_number: u16,
        timestamp: u32,
        ssrc: u32,
        payload: impl Into<Bytes>,
    ) -> Self {
        Self {
            version: VERSION,
            marker: false,
            payload_type,
            sequence_number,
            timestamp,
            ssrc,
            csrc: Vec::new(),
            extension: None,
            payload: payload.into(),
            padding: None,
        }
    }

    /// Parse a raw RTP packet.
    ///
    /// Rejects packets shorter than the fixed header, inconsistent header
    /// lengths, and padding counts that exceed the payload.
    pub fn decode(data: &[u8]) -> Result<Self, MediaError> {
        if data.len() < HEADER_LEN {
            return Err(MediaError::MalformedPacket(format!(
                "packet too short: {} bytes",
                data.len()
            )));
        }

        let mut buf = data;
        let b0 = buf.get_u8();
        let version = b0 >> 6;
        let has_padding = b0 & 0x20 != 0;
        let has_extension = b0 & 0x10 != 0;
        let csrc_count = (b0 & 0x0F) as usize;

        let b1 = buf.get_u8();
        let marker = b1 & 0x80 != 0;
        let payload_type = b1 & 0x7F;

        let sequence_number = buf.get_u16();
        let timestamp = buf.get_u32();
        let ssrc = buf.get_u32();

        if buf.remaining() < csrc_count * 4 {
            return Err(MediaError::MalformedPacket(format!(
                "header claims {csrc_count} CSRCs but only {} bytes remain",
                buf.remaining()
            )));
        }
        let csrc: Vec<u32> = (0..csrc_count).map(|_| buf.get_u32()).collect();

        let extension = if has_extension {
            if buf.remaining() < 4 {
                return Err(MediaError::MalformedPacket(
                    "extension flag set but header truncated".to_string(),
                ));
            }
            let profile = buf.get_u16();
            let word_count = buf.get_u16() as usize;
            if buf.remaining() < word_count * 4 {
                return Err(MediaError::MalformedPacket(format!(
                    "extension claims {word_count} words but only {} bytes remain",
                    buf.remaining()
                )));
            }
            let words: Vec<u32> = (0..word_count).map(|_| buf.get_u32()).collect();
            Some(RtpExtension { profile, words })
        } else {
            None
        };

        let mut payload = buf.to_vec();
        let padding = if has_padding {
            let pad_len = *payload.last().ok_or_else(|| {
                MediaError::MalformedPacket("padding flag set on empty payload".to_string())
            })?;
            if pad_len == 0 || pad_len as usize > payload.len() {
                return Err(MediaError::MalformedPacket(format!(
                    "pad length {pad_len} exceeds payload of {} bytes",
                    payload.len()
                )));
            }
            payload.truncate(payload.len() - pad_len as usize);
            Some(pad_len)
        } else {
            None
        };

        Ok(Self {
            version,
            marker,
            payload_type,
            sequence_number,
            timestamp,
            ssrc,
            csrc,
            extension,
            payload: Bytes::from(payload),
            padding,
        })
    }

    /// Serialize to wire format in network byte order.
    pub fn encode(&self) -> Bytes {
        let pad_len = self.padding.unwrap_or(0) as usize;
        let ext_len = self
            .extension
            .as_ref()
            .map(|e| 4 + e.words.len() * 4)
            .unwrap_or(0);
        let mut buf = BytesMut::with_capacity(
            HEADER_LEN + self.csrc.len() * 4 + ext_len + self.payload.len() + pad_len,
        );

        let mut b0 = (self.version << 6) | (self.csrc.len() as u8 & 0x0F);
        if self.padding.is_some() {
            b0 |= 0x20;
        }
        if self.extension.is_some() {
            b0 |= 0x10;
        }
        buf.put_u8(b0);

        let mut b1 = self.payload_type & 0x7F;
        if self.marker {
            b1 |= 0x80;
        }
        buf.put_u8(b1);

        buf.put_u16(self.sequence_number);
        buf.put_u32(self.timestamp);
        buf.put_u32(self.ssrc);

        for &csrc in &self.csrc {
            buf.put_u32(csrc);
        }

        if let Some(ext) = &self.extension {
            buf.put_u16(ext.profile);
            buf.put_u16(ext.words.len() as u16);
            for &word in &ext.words {
                buf.put_u32(word);
            }
        }

        buf.put_slice(&self.payload);

        if let Some(pad_len) = self.padding {
            for _ in 0..pad_len.saturating_sub(1) {
                buf.put_u8(0);
            }
            buf.put_u8(pad_len);
        }

        buf.freeze()
    }
}

/// Generate a random SSRC for a new stream
pub fn random_ssrc() -> u32 {
    rand::random()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trip_plain() {
        let packet = RtpPacket::new(0, 1234, 160_000, 0xDEADBEEF, vec![0x55u8; 160]);
        let decoded = RtpPacket::decode(&packet.encode()).unwrap();
        assert_eq!(packet, decoded);
    }

    #[test]
    fn round_trip_with_csrc_and_extension() {
        let mut packet = RtpPacket::new(96, 42, 999, 7, vec![1, 2, 3, 4]);
        packet.marker = true;
        packet.csrc = vec![0x11111111, 0x22222222];
        packet.extension = Some(RtpExtension {
            profile: 0xBEDE,
            words: vec![0xCAFEBABE],
        });
        let decoded = RtpPacket::decode(&packet.encode()).unwrap();
        assert_eq!(packet, decoded);
    }

    #[test]
    fn round_trip_with_padding() {
        let mut packet = RtpPacket::new(0, 1, 160, 9, vec![0xAAu8; 10]);
        packet.padding = Some(4);
        let wire = packet.encode();
        // 12 header + 10 payload + 4 padding
        assert_eq!(wire.len(), 26);
        let decoded = RtpPacket::decode(&wire).unwrap();
        assert_eq!(decoded.payload.len(), 10);
        assert_eq!(decoded.padding, Some(4));
        assert_eq!(packet, decoded);
    }

    #[test]
    fn short_packet_rejected() {
        for len in 0..12 {
            let data = vec![0x80u8; len];
            assert!(
                matches!(
                    RtpPacket::decode(&data),
                    Err(MediaError::MalformedPacket(_))
                ),
                "length {len} should be rejected"
            );
        }
    }

    #[test]
    fn truncated_csrc_rejected() {
        // CC = 3 but no CSRC bytes follow the fixed header
        let mut data = vec![0u8; 12];
        data[0] = (2 << 6) | 3;
        assert!(matches!(
            RtpPacket::decode(&data),
            Err(MediaError::MalformedPacket(_))
        ));
    }

    #[test]
    fn truncated_extension_rejected() {
        // X bit set, extension header claims 4 words, nothing follows
        let mut data = vec![0u8; 16];
        data[0] = (2 << 6) | 0x10;
        data[14] = 0;
        data[15] = 4;
        assert!(matches!(
            RtpPacket::decode(&data),
            Err(MediaError::MalformedPacket(_))
        ));
    }

    #[test]
    fn oversized_padding_rejected() {
        let mut packet = RtpPacket::new(0, 1, 1, 1, vec![0u8; 2]);
        packet.padding = None;
        let mut wire = packet.encode().to_vec();
        wire[0] |= 0x20; // claim padding
        let last = wire.len() - 1;
        wire[last] = 200; // pad length larger than payload
        assert!(matches!(
            RtpPacket::decode(&wire),
            Err(MediaError::MalformedPacket(_))
        ));
    }

    #[test]
    fn sequence_wraparound_decodes() {
        let p1 = RtpPacket::new(0, 65535, 1000, 1, vec![0u8; 160]);
        let p2 = RtpPacket::new(0, 0, 1160, 1, vec![0u8; 160]);
        let d1 = RtpPacket::decode(&p1.encode()).unwrap();
        let d2 = RtpPacket::decode(&p2.encode()).unwrap();
        assert_eq!(d1.sequence_number, 65535);
        assert_eq!(d2.sequence_number, 0);
        assert_eq!(d1.sequence_number.wrapping_add(1), d2.sequence_number);
    }
}
