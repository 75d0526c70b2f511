//! Command line interface

use crate::config::BridgeSettings;
use crate::lookup::default_lookup_path;
use crate::mqtt::config::MqttConfig;
use clap::Parser;
use std::path::PathBuf;
use std::time::Duration;

/// Connects an FTMQ network to an MQTT broker.
///
/// Values published on the FTMQ network are published to the broker,
/// messages received from the broker are sent to the FTMQ network.
#[derive(Parser, Debug, Clone)]
#[command(name = "ftmq-bridge", version)]
pub struct Cli {
    /// Serial port connected to the FTMQ device
    #[arg(env = "FTMQ_PORT")]
    pub ftmq_port: PathBuf,

    /// Serial port baud rate
    #[arg(env = "FTMQ_BAUD_RATE")]
    pub baud_rate: u32,

    /// TOML file containing the topics lookup table [default: ~/.config/ftmq-bridge/lookup.toml]
    #[arg(env = "FTMQ_LOOKUP")]
    pub lookup: Option<PathBuf>,

    /// Hostname or IP address of the MQTT broker
    #[arg(long, env = "FTMQ_BROKER", default_value = "127.0.0.1")]
    pub broker: String,

    /// MQTT broker port
    #[arg(long, env = "FTMQ_BROKER_PORT", default_value_t = 1883)]
    pub broker_port: u16,

    /// MQTT client identifier
    #[arg(long, env = "FTMQ_CLIENT_ID", default_value = "ftmq-bridge")]
    pub client_id: String,

    /// Broker user name
    #[arg(long, env = "FTMQ_USERNAME", requires = "password")]
    pub username: Option<String>,

    /// Broker password
    #[arg(long, env = "FTMQ_PASSWORD", requires = "username", hide_env_values = true)]
    pub password: Option<String>,

    /// Milliseconds between serial polls
    #[arg(long, env = "FTMQ_POLL_MS", default_value_t = 500,
          value_parser = clap::value_parser!(u64).range(1..))]
    pub poll_ms: u64,

    /// MQTT keep-alive in seconds
    #[arg(long, env = "FTMQ_KEEP_ALIVE", default_value_t = 5,
          value_parser = clap::value_parser!(u64).range(1..))]
    pub keep_alive: u64,

    /// Log every frame and message
    #[arg(short, long)]
    pub verbose: bool,
}

impl Cli {
    pub fn lookup_path(&self) -> PathBuf {
        self.lookup.clone().unwrap_or_else(default_lookup_path)
    }

    pub fn settings(&self) -> BridgeSettings {
        let credentials = match (&self.username, &self.password) {
            (Some(user), Some(pw)) => Some((user.clone(), pw.clone())),
            _ => None,
        };

        BridgeSettings {
            serial_port: self.ftmq_port.clone(),
            baud_rate: self.baud_rate,
            poll_interval: Duration::from_millis(self.poll_ms),
            mqtt: MqttConfig {
                host: self.broker.clone(),
                port: self.broker_port,
                client_id: self.client_id.clone(),
                credentials,
                keep_alive: Duration::from_secs(self.keep_alive),
                ..MqttConfig::default()
            },
            ..BridgeSettings::default()
        }
    }
}
