//! # MQTT Side of the Bridge
//!
//! Broker connection for the bridge loop, built on `rumqttc`.
//!
//! ```text
//! mqtt/
//! ├── config.rs        - Broker address, client id, credentials, keep-alive
//! ├── message.rs       - BrokerMessage (topic + JSON payload + timestamp)
//! └── mqtt_handler.rs  - Connection loop: subscribe, receive, publish
//! ```
//!
//! Subscriptions come from the lookup table and are renewed on every
//! ConnAck, so they survive broker restarts. Incoming messages are
//! translated into frames and queued for the serial side; messages from the
//! serial side are published at QoS 0 without the retain flag.
//!
//! Transport details (keep-alive, reconnects, packet framing) stay inside
//! rumqttc. The handler only sees logical publish and receive events.

pub mod config;
pub mod message;
pub mod mqtt_handler;
