use super::TranslationError;
use crate::ftmq::PAYLOAD_LEN;
use crate::lookup::ValueType;
use serde_json::Value;
use std::fmt;

/// Payload value tagged with the type of its lookup entry
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum TypedValue {
    Int32(i32),
    Float32(f32),
    ByteArray4([u8; PAYLOAD_LEN]),
}

impl TypedValue {
    /// Interprets raw frame payload bytes (little-endian for numbers)
    pub fn from_payload(value_type: ValueType, payload: [u8; PAYLOAD_LEN]) -> Self {
        match value_type {
            ValueType::Int32 => TypedValue::Int32(i32::from_le_bytes(payload)),
            ValueType::Float32 => TypedValue::Float32(f32::from_le_bytes(payload)),
            ValueType::ByteArray4 => TypedValue::ByteArray4(payload),
        }
    }

    pub fn to_payload(&self) -> [u8; PAYLOAD_LEN] {
        match self {
            TypedValue::Int32(v) => v.to_le_bytes(),
            TypedValue::Float32(v) => v.to_le_bytes(),
            TypedValue::ByteArray4(bytes) => *bytes,
        }
    }

    pub fn value_type(&self) -> ValueType {
        match self {
            TypedValue::Int32(_) => ValueType::Int32,
            TypedValue::Float32(_) => ValueType::Float32,
            TypedValue::ByteArray4(_) => ValueType::ByteArray4,
        }
    }

    /// Converts a JSON value into the requested type.
    ///
    /// Integers must fit `i32`, floats accept any JSON number that fits the
    /// `f32` range, byte arrays need exactly four integers in 0..=255.
    pub fn from_json(value_type: ValueType, value: &Value) -> Result<Self, TranslationError> {
        match value_type {
            ValueType::Int32 => match value {
                Value::Number(n) if n.is_i64() || n.is_u64() => n
                    .as_i64()
                    .and_then(|v| i32::try_from(v).ok())
                    .map(TypedValue::Int32)
                    .ok_or_else(|| TranslationError::OutOfRange {
                        expected: value_type,
                        value: n.to_string(),
                    }),
                other => Err(wrong_type(value_type, other)),
            },
            ValueType::Float32 => match value {
                Value::Number(n) => {
                    let v = n.as_f64().ok_or_else(|| wrong_type(value_type, value))?;
                    if v.is_finite() && v.abs() > f32::MAX as f64 {
                        return Err(TranslationError::OutOfRange {
                            expected: value_type,
                            value: n.to_string(),
                        });
                    }
                    Ok(TypedValue::Float32(v as f32))
                }
                other => Err(wrong_type(value_type, other)),
            },
            ValueType::ByteArray4 => match value {
                Value::Array(items) => {
                    if items.len() != PAYLOAD_LEN {
                        return Err(TranslationError::WrongLength {
                            expected: PAYLOAD_LEN,
                            found: items.len(),
                        });
                    }
                    let mut bytes = [0u8; PAYLOAD_LEN];
                    for (slot, item) in bytes.iter_mut().zip(items) {
                        *slot = json_byte(item)?;
                    }
                    Ok(TypedValue::ByteArray4(bytes))
                }
                other => Err(wrong_type(value_type, other)),
            },
        }
    }

    /// JSON form used in published payloads.
    ///
    /// Non-finite floats have no JSON representation and become `null`.
    pub fn to_json(&self) -> Value {
        match self {
            TypedValue::Int32(v) => Value::from(*v),
            TypedValue::Float32(v) if v.is_finite() => Value::from(f64::from(*v)),
            TypedValue::Float32(_) => Value::Null,
            TypedValue::ByteArray4(bytes) => {
                Value::Array(bytes.iter().map(|b| Value::from(*b)).collect())
            }
        }
    }
}

impl fmt::Display for TypedValue {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            TypedValue::Int32(v) => write!(f, "int32({})", v),
            TypedValue::Float32(v) => write!(f, "float({})", v),
            TypedValue::ByteArray4(b) => write!(f, "array({:?})", b),
        }
    }
}

fn json_byte(item: &Value) -> Result<u8, TranslationError> {
    match item {
        Value::Number(n) if n.is_i64() || n.is_u64() => n
            .as_u64()
            .and_then(|v| u8::try_from(v).ok())
            .ok_or_else(|| TranslationError::OutOfRange {
                expected: ValueType::ByteArray4,
                value: n.to_string(),
            }),
        other => Err(wrong_type(ValueType::ByteArray4, other)),
    }
}

fn wrong_type(expected: ValueType, found: &Value) -> TranslationError {
    let found = match found {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    };
    TranslationError::WrongType {
        expected,
        found: found.to_string(),
    }
}
