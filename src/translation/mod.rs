//! # Translation Engine
//!
//! Converts between FTMQ frames and broker messages using the lookup table.
//!
//! ```text
//! Frame { id, [u8; 4] } ──► entry by id ──► TypedValue ──► {"<name>": value} on <topic>
//! <topic> + JSON        ──► entry by topic ─► TypedValue ──► Frame { id, [u8; 4] }
//! ```
//!
//! A frame or message without a matching entry is not an error: most
//! identifiers on a busy FTMQ network and most broker topics are simply not
//! bridged. Conversion failures are reported as [`TranslationError`] and
//! never touch the decoder state or the table.

pub mod value;

pub use value::TypedValue;

use crate::ftmq::Frame;
use crate::lookup::{LookupTable, ValueType};
use crate::mqtt::message::BrokerMessage;
use serde_json::{Map, Value};
use thiserror::Error;
use tracing::debug;

#[derive(Debug, Error)]
pub enum TranslationError {
    #[error("Malformed JSON payload: {0}")]
    MalformedJson(#[from] serde_json::Error),

    #[error("Payload is not a JSON object")]
    NotAnObject,

    #[error("Field '{0}' missing from payload")]
    MissingField(String),

    #[error("Expected {expected} value, found {found}")]
    WrongType { expected: ValueType, found: String },

    #[error("Value {value} does not fit into {expected}")]
    OutOfRange { expected: ValueType, value: String },

    #[error("Expected {expected} bytes, found {found}")]
    WrongLength { expected: usize, found: usize },
}

/// Serial → broker direction.
///
/// Returns `None` when no entry carries the frame identifier.
pub fn translate_to_broker(frame: &Frame, table: &LookupTable) -> Option<BrokerMessage> {
    let Some(entry) = table.find_by_identifier(frame.identifier) else {
        debug!("No lookup entry for identifier {}", frame.identifier);
        return None;
    };

    let value = TypedValue::from_payload(entry.value_type, frame.payload);
    let mut object = Map::new();
    object.insert(entry.field_name.clone(), value.to_json());
    let payload = Value::Object(object).to_string();

    debug!("Frame {} -> {} {}", frame, entry.topic, payload);
    Some(BrokerMessage::new(entry.topic.clone(), payload))
}

/// Broker → serial direction.
///
/// `Ok(None)` means the topic has no entry and the message is ignored.
pub fn translate_to_frame(
    topic: &str,
    payload: &[u8],
    table: &LookupTable,
) -> Result<Option<Frame>, TranslationError> {
    let Some(entry) = table.find_by_topic(topic) else {
        debug!("No lookup entry for topic {}", topic);
        return Ok(None);
    };

    let document: Value = serde_json::from_slice(payload)?;
    let object = document.as_object().ok_or(TranslationError::NotAnObject)?;
    let raw = object
        .get(&entry.field_name)
        .ok_or_else(|| TranslationError::MissingField(entry.field_name.clone()))?;

    let value = TypedValue::from_json(entry.value_type, raw)?;
    let frame = Frame::new(entry.identifier, value.to_payload());

    debug!("{} {} -> frame {}", topic, value, frame);
    Ok(Some(frame))
}
