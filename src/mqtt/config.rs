use std::time::Duration;

/// Broker connection settings
#[derive(Debug, Clone, PartialEq)]
pub struct MqttConfig {
    pub host: String,
    pub port: u16,
    pub client_id: String,
    pub credentials: Option<(String, String)>,
    pub keep_alive: Duration,
    /// Capacity of the rumqttc request queue
    pub request_capacity: usize,
}

impl Default for MqttConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 1883,
            client_id: "ftmq-bridge".to_string(),
            credentials: None,
            keep_alive: Duration::from_secs(5),
            request_capacity: 100,
        }
    }
}

impl MqttConfig {
    pub fn broker_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}
