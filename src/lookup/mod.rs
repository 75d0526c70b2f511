//! # Topic Lookup Table
//!
//! Maps MQTT topics to FTMQ identifiers, value types and JSON field names.
//! Loaded once at startup and shared read-only by both directions of the
//! bridge, so it lives behind an `Arc` and is never locked.
//!
//! ## Matching Rules
//!
//! Lookups are a linear scan in file order and the first matching entry wins.
//! Duplicate identifiers or topics are accepted (the file format does not
//! forbid them) and reported at load time, never silently merged.

pub mod loader;

pub use loader::{default_lookup_path, LookupError};

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use tracing::warn;

/// How the four payload bytes of a frame are interpreted
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Deserialize, Serialize)]
pub enum ValueType {
    /// Little-endian signed 32-bit integer
    #[serde(rename = "int32", alias = "int")]
    Int32,
    /// Little-endian IEEE-754 single precision float
    #[serde(rename = "float", alias = "float32")]
    Float32,
    /// Four raw bytes, exposed as a list of numbers 0-255
    #[serde(rename = "array", alias = "bytes", alias = "bytearray4")]
    ByteArray4,
}

impl fmt::Display for ValueType {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let name = match self {
            ValueType::Int32 => "int32",
            ValueType::Float32 => "float",
            ValueType::ByteArray4 => "array",
        };
        write!(f, "{}", name)
    }
}

/// One row of the lookup table
#[derive(Clone, Debug, PartialEq, Eq, Deserialize, Serialize)]
pub struct TopicEntry {
    pub topic: String,
    #[serde(rename = "id")]
    pub identifier: u8,
    #[serde(rename = "type")]
    pub value_type: ValueType,
    #[serde(rename = "name")]
    pub field_name: String,
}

impl TopicEntry {
    pub fn new(
        topic: impl Into<String>,
        identifier: u8,
        value_type: ValueType,
        field_name: impl Into<String>,
    ) -> Self {
        Self {
            topic: topic.into(),
            identifier,
            value_type,
            field_name: field_name.into(),
        }
    }
}

/// Subscriptions plus the ordered entry list
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct LookupTable {
    subscriptions: Vec<String>,
    entries: Vec<TopicEntry>,
}

impl LookupTable {
    pub fn new(subscriptions: Vec<String>, entries: Vec<TopicEntry>) -> Self {
        Self {
            subscriptions,
            entries,
        }
    }

    /// Topics the broker side subscribes to after every (re)connect
    pub fn subscriptions(&self) -> &[String] {
        &self.subscriptions
    }

    pub fn entries(&self) -> &[TopicEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// First entry with this FTMQ identifier
    pub fn find_by_identifier(&self, identifier: u8) -> Option<&TopicEntry> {
        self.entries.iter().find(|e| e.identifier == identifier)
    }

    /// First entry bound to this MQTT topic
    pub fn find_by_topic(&self, topic: &str) -> Option<&TopicEntry> {
        self.entries.iter().find(|e| e.topic == topic)
    }

    /// Checks the table before the bridge starts.
    ///
    /// Hard errors: no entries, blank topics or field names. Duplicates and
    /// subscriptions without an entry are only reported.
    pub fn validate(&self) -> Result<(), LookupError> {
        if self.entries.is_empty() {
            return Err(LookupError::Invalid(
                "lookup table contains no entries".to_string(),
            ));
        }

        for (index, entry) in self.entries.iter().enumerate() {
            if entry.topic.trim().is_empty() {
                return Err(LookupError::Invalid(format!(
                    "entry {} (id {}) has an empty topic",
                    index, entry.identifier
                )));
            }
            if entry.field_name.trim().is_empty() {
                return Err(LookupError::Invalid(format!(
                    "entry {} ({}) has an empty field name",
                    index, entry.topic
                )));
            }
        }

        for identifier in self.duplicate_identifiers() {
            warn!(
                "Identifier {} is used by several entries, only the first one is used for serial frames",
                identifier
            );
        }
        for topic in self.duplicate_topics() {
            warn!(
                "Topic {} is used by several entries, only the first one is used for broker messages",
                topic
            );
        }
        for topic in &self.subscriptions {
            if self.find_by_topic(topic).is_none() {
                warn!("Subscription {} has no lookup entry and will be ignored", topic);
            }
        }

        Ok(())
    }

    /// Identifiers appearing more than once, in first-seen order
    pub fn duplicate_identifiers(&self) -> Vec<u8> {
        let mut seen = HashSet::new();
        let mut dupes = Vec::new();
        for entry in &self.entries {
            if !seen.insert(entry.identifier) && !dupes.contains(&entry.identifier) {
                dupes.push(entry.identifier);
            }
        }
        dupes
    }

    /// Topics appearing more than once, in first-seen order
    pub fn duplicate_topics(&self) -> Vec<&str> {
        let mut seen = HashSet::new();
        let mut dupes = Vec::new();
        for entry in &self.entries {
            let topic = entry.topic.as_str();
            if !seen.insert(topic) && !dupes.contains(&topic) {
                dupes.push(topic);
            }
        }
        dupes
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table() -> LookupTable {
        LookupTable::new(
            vec!["led/set".to_string()],
            vec![
                TopicEntry::new("sensor/temp", 1, ValueType::Float32, "temp"),
                TopicEntry::new("sensor/count", 2, ValueType::Int32, "count"),
                TopicEntry::new("sensor/temp_raw", 1, ValueType::Int32, "raw"),
                TopicEntry::new("led/set", 3, ValueType::ByteArray4, "rgba"),
                TopicEntry::new("led/set", 4, ValueType::Int32, "brightness"),
            ],
        )
    }

    #[test]
    fn first_identifier_match_wins() {
        let table = table();
        let entry = table.find_by_identifier(1).unwrap();
        assert_eq!(entry.topic, "sensor/temp");
        assert_eq!(entry.value_type, ValueType::Float32);
    }

    #[test]
    fn first_topic_match_wins() {
        let table = table();
        let entry = table.find_by_topic("led/set").unwrap();
        assert_eq!(entry.identifier, 3);
    }

    #[test]
    fn missing_lookups_return_none() {
        let table = table();
        assert!(table.find_by_identifier(200).is_none());
        assert!(table.find_by_topic("nope").is_none());
    }

    #[test]
    fn duplicates_are_reported_not_removed() {
        let table = table();
        assert_eq!(table.duplicate_identifiers(), vec![1]);
        assert_eq!(table.duplicate_topics(), vec!["led/set"]);
        assert_eq!(table.len(), 5);
        assert!(table.validate().is_ok());
    }

    #[test]
    fn empty_table_is_invalid() {
        let table = LookupTable::new(vec!["a".to_string()], Vec::new());
        assert!(matches!(table.validate(), Err(LookupError::Invalid(_))));
    }

    #[test]
    fn blank_field_name_is_invalid() {
        let table = LookupTable::new(
            Vec::new(),
            vec![TopicEntry::new("a/b", 1, ValueType::Int32, " ")],
        );
        assert!(matches!(table.validate(), Err(LookupError::Invalid(_))));
    }
}
