//! Bridge-level error types

use crate::lookup::LookupError;
use thiserror::Error;

/// I/O failures on either side of the bridge.
///
/// These end the affected side of the bridge loop. Whether the process
/// reconnects or exits is decided by [`crate::bridge`], never by the codec or
/// the translation code.
#[derive(Debug, Error)]
pub enum TransportError {
    /// UART open, read or write failure
    #[error("Serial transport error: {0}")]
    Serial(String),

    /// Broker client failure
    #[error("Broker transport error: {0}")]
    Broker(String),

    /// The other side of the bridge went away
    #[error("Channel closed: {0}")]
    ChannelClosed(String),
}

impl From<std::io::Error> for TransportError {
    fn from(err: std::io::Error) -> Self {
        TransportError::Serial(err.to_string())
    }
}

impl From<rppal::uart::Error> for TransportError {
    fn from(err: rppal::uart::Error) -> Self {
        TransportError::Serial(err.to_string())
    }
}

impl From<rumqttc::ClientError> for TransportError {
    fn from(err: rumqttc::ClientError) -> Self {
        TransportError::Broker(err.to_string())
    }
}

#[derive(Debug, Error)]
pub enum BridgeError {
    #[error(transparent)]
    Transport(#[from] TransportError),

    #[error(transparent)]
    Lookup(#[from] LookupError),

    #[error("Bridge task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}
