//! Incremental FTMQ stream decoder
//!
//! # State Machine
//!
//! ```text
//!            0x40            0x40
//! WaitSync1 ──────► WaitSync2 ──────► Collect(0..5) ──► emit Frame
//!    ▲  │ other         │ other                              │
//!    │  └──(drop)       └──(drop)                            │
//!    └─────────────────────────────────────────────────────────┘
//! ```
//!
//! Non-header bytes seen while waiting for the header are discarded, which is
//! how the decoder recovers from power-up garbage or a lost byte. Once
//! collecting, every byte is taken as data, including `0x40`.

use super::frame::{Frame, HEADER_BYTE, HEADER_LEN, PACKET_LEN};
use tracing::{debug, trace};

/// Stream parser bound to a single serial connection.
///
/// Partial state survives between calls, so the decoder can be fed one byte
/// or one read chunk at a time. It must only be driven from one task.
#[derive(Clone, Debug, Default)]
pub struct FrameDecoder {
    /// Header bytes seen so far (0..=2)
    sync_count: u8,
    /// Identifier and payload bytes collected after the header
    buffer: [u8; PACKET_LEN],
    /// Valid bytes in `buffer`
    len: usize,
    /// Bytes dropped while hunting for a header
    discarded: u64,
}

impl FrameDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feeds a single byte, returning a frame when it completes one
    pub fn push(&mut self, byte: u8) -> Option<Frame> {
        if (self.sync_count as usize) < HEADER_LEN {
            if byte == HEADER_BYTE {
                self.sync_count += 1;
            } else {
                self.discarded += 1;
                trace!("Discarding 0x{:02X} while waiting for header", byte);
            }
            return None;
        }

        self.buffer[self.len] = byte;
        self.len += 1;

        if self.len == PACKET_LEN {
            let frame = Frame::from_packet(&self.buffer);
            // every frame needs a fresh header pair
            self.reset();
            debug!("Decoded frame: {}", frame);
            return Some(frame);
        }

        None
    }

    /// Lazily decodes `bytes`, yielding frames as they complete.
    ///
    /// Bytes are consumed only as far as the iterator is advanced. Dropping
    /// the iterator early leaves the remaining bytes unfed.
    pub fn decode<'a>(&'a mut self, bytes: &'a [u8]) -> Frames<'a> {
        Frames {
            decoder: self,
            bytes: bytes.iter(),
        }
    }

    /// Feeds a whole chunk and collects every completed frame in order
    pub fn feed(&mut self, bytes: &[u8]) -> Vec<Frame> {
        self.decode(bytes).collect()
    }

    /// Drops any partial frame and waits for a new header.
    ///
    /// Called automatically after each emitted frame; callers use it when the
    /// connection is reopened.
    pub fn reset(&mut self) {
        self.sync_count = 0;
        self.buffer = [0; PACKET_LEN];
        self.len = 0;
    }

    pub fn sync_count(&self) -> u8 {
        self.sync_count
    }

    /// Identifier/payload bytes collected for the frame in progress
    pub fn buffered(&self) -> &[u8] {
        &self.buffer[..self.len]
    }

    /// True when no header byte and no data byte is pending
    pub fn is_idle(&self) -> bool {
        self.sync_count == 0 && self.len == 0
    }

    pub fn discarded(&self) -> u64 {
        self.discarded
    }
}

/// Iterator returned by [`FrameDecoder::decode`]
pub struct Frames<'a> {
    decoder: &'a mut FrameDecoder,
    bytes: std::slice::Iter<'a, u8>,
}

impl Iterator for Frames<'_> {
    type Item = Frame;

    fn next(&mut self) -> Option<Frame> {
        for &byte in self.bytes.by_ref() {
            if let Some(frame) = self.decoder.push(byte) {
                return Some(frame);
            }
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ftmq::frame::encode;

    #[test]
    fn decodes_single_frame() {
        let mut decoder = FrameDecoder::new();
        let frames = decoder.feed(&encode(7, [1, 2, 3, 4]));

        assert_eq!(frames, vec![Frame::new(7, [1, 2, 3, 4])]);
        assert!(decoder.is_idle());
    }

    #[test]
    fn recovers_after_garbage_prefix() {
        let mut stream = vec![0x00, 0xFF, 0x13, 0x3F, 0x41, 0x99];
        stream.extend_from_slice(&encode(0x21, [9, 8, 7, 6]));

        let mut decoder = FrameDecoder::new();
        let frames = decoder.feed(&stream);

        assert_eq!(frames, vec![Frame::new(0x21, [9, 8, 7, 6])]);
        assert_eq!(decoder.sync_count(), 0);
        assert!(decoder.buffered().is_empty());
        assert_eq!(decoder.discarded(), 6);
    }

    #[test]
    fn header_value_inside_packet_is_data() {
        let mut decoder = FrameDecoder::new();
        let frames = decoder.feed(&encode(0x40, [0x40, 0x00, 0x00, 0x00]));

        assert_eq!(frames, vec![Frame::new(0x40, [0x40, 0x00, 0x00, 0x00])]);
        assert!(decoder.is_idle());
    }

    #[test]
    fn all_header_bytes_packet() {
        let mut decoder = FrameDecoder::new();
        let frames = decoder.feed(&[0x40; 7]);

        assert_eq!(frames, vec![Frame::new(0x40, [0x40; 4])]);
    }

    #[test]
    fn byte_by_byte_matches_whole_chunk() {
        let mut stream = Vec::new();
        stream.extend_from_slice(&encode(1, [0xFF, 0xFF, 0xFF, 0xFF]));
        stream.extend_from_slice(&encode(2, [0x40, 0x40, 0x40, 0x40]));

        let mut whole = FrameDecoder::new();
        let expected = whole.feed(&stream);

        let mut incremental = FrameDecoder::new();
        let mut frames = Vec::new();
        for byte in &stream {
            frames.extend(incremental.feed(std::slice::from_ref(byte)));
        }

        assert_eq!(expected.len(), 2);
        assert_eq!(frames, expected);
        assert_eq!(frames[0].identifier, 1);
        assert_eq!(frames[1].identifier, 2);
    }

    #[test]
    fn partial_state_persists_between_calls() {
        let bytes = encode(5, [10, 20, 30, 40]);
        let mut decoder = FrameDecoder::new();

        assert!(decoder.feed(&bytes[..4]).is_empty());
        assert_eq!(decoder.sync_count(), 2);
        assert_eq!(decoder.buffered(), &[5, 10]);

        assert_eq!(decoder.feed(&bytes[4..]), vec![Frame::new(5, [10, 20, 30, 40])]);
    }

    #[test]
    fn sync_bytes_are_not_reused_across_frames() {
        // header, full packet, then a packet without a fresh header
        let mut stream = encode(3, [0; 4]).to_vec();
        stream.extend_from_slice(&[4, 1, 1, 1, 1]);

        let mut decoder = FrameDecoder::new();
        assert_eq!(decoder.feed(&stream), vec![Frame::new(3, [0; 4])]);
        assert!(decoder.is_idle());
    }

    #[test]
    fn reset_drops_partial_frame() {
        let mut decoder = FrameDecoder::new();
        decoder.feed(&[0x40, 0x40, 0x01, 0x02]);
        decoder.reset();

        assert!(decoder.is_idle());
        assert!(decoder.feed(&[0x03, 0x04, 0x05]).is_empty());
    }

    #[test]
    fn lazy_iterator_stops_where_advanced() {
        let mut stream = encode(1, [0; 4]).to_vec();
        stream.extend_from_slice(&encode(2, [0; 4]));

        let mut decoder = FrameDecoder::new();
        let first = decoder.decode(&stream).next();

        assert_eq!(first, Some(Frame::new(1, [0; 4])));
        assert!(decoder.is_idle());
        assert_eq!(decoder.feed(&stream[7..]), vec![Frame::new(2, [0; 4])]);
    }
}
