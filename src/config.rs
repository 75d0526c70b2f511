//! Runtime settings for one bridge instance

use crate::mqtt::config::MqttConfig;
use std::path::PathBuf;
use std::time::Duration;

/// Everything a [`crate::bridge::Bridge`] needs besides the lookup table
///
/// # Examples
///
/// ```rust
/// use ftmq_bridge::config::BridgeSettings;
/// use std::time::Duration;
///
/// let settings = BridgeSettings {
///     serial_port: "/dev/ttyAMA0".into(),
///     baud_rate: 9600,
///     poll_interval: Duration::from_millis(250),
///     ..BridgeSettings::default()
/// };
/// assert_eq!(settings.mqtt.port, 1883);
/// ```
#[derive(Clone, Debug, PartialEq)]
pub struct BridgeSettings {
    /// UART device connected to the FTMQ network
    pub serial_port: PathBuf,
    pub baud_rate: u32,
    /// Delay between two serial reads
    pub poll_interval: Duration,
    /// Capacity of the channels between the serial and the broker side
    pub channel_capacity: usize,
    pub mqtt: MqttConfig,
}

impl Default for BridgeSettings {
    fn default() -> Self {
        Self {
            serial_port: PathBuf::from("/dev/serial0"),
            baud_rate: 115_200,
            poll_interval: Duration::from_millis(500), // keeps the Pi idle between reads
            channel_capacity: 100,
            mqtt: MqttConfig::default(),
        }
    }
}
