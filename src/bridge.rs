//! Bridge Loop - wires the serial link and the broker connection together
//!
//! ```text
//!              ┌──────────── mpsc<BrokerMessage> ────────────┐
//!              │                                             ▼
//! UART ──► SerialLink ──(decode, translate)       MqttHandler ──► broker
//! UART ◄── SerialLink ◄── mpsc<Frame> ── (translate) ◄── MqttHandler ◄── broker
//! ```
//!
//! Both sides run as independent tokio tasks and share one cancellation
//! token. When either side stops, for a shutdown request or because of a
//! transport failure, the other side is cancelled too.

use crate::config::BridgeSettings;
use crate::error::BridgeError;
use crate::lookup::LookupTable;
use crate::mqtt::mqtt_handler::{MQTTStatus, MqttHandler};
use crate::serial::{LinkStats, SerialLink, SerialTransport, UartTransport};
use std::future::Future;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

/// Final counters of a bridge run
#[derive(Clone, Debug, Default)]
pub struct BridgeReport {
    pub serial: LinkStats,
    pub broker: MQTTStatus,
}

/// One serial port bridged to one broker
pub struct Bridge {
    settings: BridgeSettings,
    table: Arc<LookupTable>,
}

impl Bridge {
    pub fn new(settings: BridgeSettings, table: LookupTable) -> Self {
        Self {
            settings,
            table: Arc::new(table),
        }
    }

    pub fn settings(&self) -> &BridgeSettings {
        &self.settings
    }

    pub fn table(&self) -> &Arc<LookupTable> {
        &self.table
    }

    /// Opens the configured UART and runs until `cancel` fires or a side fails
    pub async fn run(self, cancel: CancellationToken) -> Result<BridgeReport, BridgeError> {
        let transport =
            UartTransport::open(&self.settings.serial_port, self.settings.baud_rate)?;
        self.run_with_transport(Box::new(transport), cancel).await
    }

    /// Same as [`Bridge::run`] over an already opened transport
    pub async fn run_with_transport(
        self,
        transport: Box<dyn SerialTransport>,
        cancel: CancellationToken,
    ) -> Result<BridgeReport, BridgeError> {
        // internal stops must not cancel the caller's token
        let cancel = cancel.child_token();

        let (publish_tx, publish_rx) = mpsc::channel(self.settings.channel_capacity);
        let (frame_tx, frame_rx) = mpsc::channel(self.settings.channel_capacity);

        let link = SerialLink::create(
            transport,
            self.table.clone(),
            publish_tx,
            frame_rx,
            self.settings.poll_interval,
        )
        .start()?;

        let handler = MqttHandler::new(
            self.settings.mqtt.clone(),
            self.table.clone(),
            publish_rx,
            frame_tx,
        );

        info!(
            "Bridging {} to {} with {} lookup entries",
            self.settings.serial_port.display(),
            self.settings.mqtt.broker_addr(),
            self.table.len()
        );

        let serial_task = {
            let cancel = cancel.clone();
            tokio::spawn(async move {
                let result = link.run_until_shutdown(cancel.clone()).await;
                if let Err(e) = &result {
                    error!("Serial side stopped: {}", e);
                }
                cancel.cancel();
                result
            })
        };

        let broker_task = {
            let cancel = cancel.clone();
            tokio::spawn(async move {
                let result = handler.run_until_shutdown(cancel.clone()).await;
                if let Err(e) = &result {
                    error!("Broker side stopped: {}", e);
                }
                cancel.cancel();
                result
            })
        };

        let (serial, broker) = tokio::join!(serial_task, broker_task);
        let serial = serial??;
        let broker = broker??;

        info!("Bridge stopped");
        Ok(BridgeReport {
            serial: serial.into_stats(),
            broker,
        })
    }
}

/// Handle for a bridge running in the background
pub struct BridgeHandle {
    cancel: CancellationToken,
    task: JoinHandle<Result<BridgeReport, BridgeError>>,
}

impl BridgeHandle {
    /// Spawns the bridge on the UART from its settings
    pub fn spawn(bridge: Bridge) -> Self {
        let cancel = CancellationToken::new();
        let task = tokio::spawn(bridge.run(cancel.clone()));
        Self { cancel, task }
    }

    pub fn spawn_with_transport(bridge: Bridge, transport: Box<dyn SerialTransport>) -> Self {
        let cancel = CancellationToken::new();
        let task = tokio::spawn(bridge.run_with_transport(transport, cancel.clone()));
        Self { cancel, task }
    }

    pub fn cancel_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Runs until the bridge stops by itself or `signal` completes
    pub async fn run_until<F>(self, signal: F) -> Result<BridgeReport, BridgeError>
    where
        F: Future<Output = ()>,
    {
        let BridgeHandle { cancel, mut task } = self;

        tokio::select! {
            result = &mut task => return result?,
            _ = signal => info!("Stop requested, shutting down bridge"),
        }

        cancel.cancel();
        task.await?
    }

    pub async fn shutdown(self) -> Result<BridgeReport, BridgeError> {
        self.cancel.cancel();
        self.task.await?
    }
}
