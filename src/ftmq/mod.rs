//! # FTMQ Serial Protocol
//!
//! Byte-level framing for the FTMQ link between the bridge and the
//! microcontroller network on the other end of the UART.
//!
//! ## Wire Format
//!
//! Every FTMQ message is exactly seven bytes long:
//!
//! ```text
//! ┌──────┬──────┬────────────┬───────────────────────┐
//! │ 0x40 │ 0x40 │ identifier │ payload (4 bytes, LE) │
//! └──────┴──────┴────────────┴───────────────────────┘
//!   header sync    1 byte
//! ```
//!
//! There is no checksum and no length field. The two header bytes are the
//! only synchronization point, which is why the decoder only looks for them
//! while it is *between* frames: once both header bytes were seen, the next
//! five bytes belong to the frame no matter what their value is.
//!
//! ## Module Layout
//!
//! ```text
//! ftmq/
//! ├── frame.rs    - Frame type, constants and the encoder
//! └── decoder.rs  - Incremental stream decoder (sync → collect → emit)
//! ```

pub mod decoder;
pub mod frame;

pub use decoder::{FrameDecoder, Frames};
pub use frame::{encode, Frame, FRAME_LEN, HEADER_BYTE, HEADER_LEN, PACKET_LEN, PAYLOAD_LEN};
