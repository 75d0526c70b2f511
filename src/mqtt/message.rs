use chrono::NaiveDateTime;
use std::fmt;

const PREVIEW_LEN: usize = 40;

/// A message on the broker side of the bridge.
///
/// Produced by the serial side for publishing, and built from incoming
/// publishes for logging. The payload is JSON text.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BrokerMessage {
    pub topic: String,
    pub payload: String,
    pub timestamp: NaiveDateTime,
}

impl BrokerMessage {
    pub fn new(topic: String, payload: String) -> Self {
        BrokerMessage {
            topic,
            payload,
            timestamp: chrono::Local::now().naive_local(),
        }
    }

    pub fn render(&self) -> String {
        format!("{}: {}\n{}", self.timestamp, self.topic, self.payload)
    }
}

impl fmt::Display for BrokerMessage {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let preview: String = self.payload.chars().take(PREVIEW_LEN).collect();
        if preview.len() < self.payload.len() {
            write!(f, "{} {} {}...", self.timestamp, self.topic, preview)
        } else {
            write!(f, "{} {} {}", self.timestamp, self.topic, preview)
        }
    }
}
