//! Bridge between an FTMQ serial network and an MQTT broker.
//!
//! Values read from the FTMQ link are published as JSON broker messages,
//! broker messages on configured topics are written back as FTMQ frames.
//!
//! - [`ftmq`] - wire format, encoder and stream decoder
//! - [`lookup`] - topic ⇄ identifier ⇄ type ⇄ field name table
//! - [`translation`] - frame ⇄ broker message conversion
//! - [`serial`], [`mqtt`] - the two sides of the bridge loop
//! - [`bridge`] - runs both sides together

pub mod bridge;
pub mod cli;
pub mod config;
pub mod error;
pub mod ftmq;
pub mod lookup;
pub mod mqtt;
pub mod serial;
pub mod translation;

pub use bridge::{Bridge, BridgeHandle, BridgeReport};
pub use error::{BridgeError, TransportError};
pub use ftmq::{Frame, FrameDecoder};
pub use lookup::{LookupTable, TopicEntry, ValueType};
pub use translation::{translate_to_broker, translate_to_frame, TranslationError, TypedValue};
