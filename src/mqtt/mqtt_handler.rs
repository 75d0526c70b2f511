use std::sync::Arc;
use std::time::Duration;

use rumqttc::{AsyncClient, ConnectReturnCode, Event, EventLoop, MqttOptions, Outgoing, Packet, QoS};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use super::config::MqttConfig;
use super::message::BrokerMessage;
use crate::error::TransportError;
use crate::ftmq::Frame;
use crate::lookup::LookupTable;
use crate::translation::translate_to_frame;

const RECONNECT_MIN: Duration = Duration::from_secs(1);
const RECONNECT_MAX: Duration = Duration::from_secs(30);
const STATS_INTERVAL: Duration = Duration::from_secs(10);
const DISCONNECT_TIMEOUT: Duration = Duration::from_secs(1);

#[derive(Clone, Default, Debug, PartialEq, Eq)]
pub enum ConnectionState {
    #[default]
    Disconnected,
    Connecting,
    Connected,
    Reconnecting,
}

#[derive(Clone, Debug, Default)]
pub struct MQTTStatus {
    pub connection_state: ConnectionState,
    pub messages_received: usize,
    pub messages_sent: usize,
    pub frames_queued: usize,
    pub messages_dropped: usize,
    pub last_activity: Option<chrono::DateTime<chrono::Local>>,
}

/// Broker side of the bridge.
///
/// Owns the rumqttc client and event loop. Incoming publishes are translated
/// into frames for the serial side, broker messages coming from the serial
/// side are published at QoS 0.
pub struct MqttHandler {
    status: MQTTStatus,
    client: AsyncClient,
    eventloop: EventLoop,
    config: MqttConfig,
    table: Arc<LookupTable>,
    publish_rx: mpsc::Receiver<BrokerMessage>,
    frame_tx: mpsc::Sender<Frame>,
}

impl MqttHandler {
    pub fn new(
        config: MqttConfig,
        table: Arc<LookupTable>,
        publish_rx: mpsc::Receiver<BrokerMessage>,
        frame_tx: mpsc::Sender<Frame>,
    ) -> Self {
        let mut mqtt_options =
            MqttOptions::new(config.client_id.clone(), config.host.clone(), config.port);
        mqtt_options.set_keep_alive(config.keep_alive);
        if let Some((user, pw)) = &config.credentials {
            mqtt_options.set_credentials(user.clone(), pw.clone());
        }

        let (client, eventloop) = AsyncClient::new(mqtt_options, config.request_capacity);

        MqttHandler {
            status: MQTTStatus::default(),
            client,
            eventloop,
            config,
            table,
            publish_rx,
            frame_tx,
        }
    }

    pub fn status(&self) -> &MQTTStatus {
        &self.status
    }

    /// Drives the broker connection until `cancel` fires.
    ///
    /// Connection errors are retried with a capped exponential backoff, the
    /// event loop reconnects on the next poll. Only a closed frame channel
    /// (serial side gone) ends the loop with an error.
    pub async fn run_until_shutdown(
        mut self,
        cancel: CancellationToken,
    ) -> Result<MQTTStatus, TransportError> {
        info!("Connecting to broker at {}", self.config.broker_addr());
        self.status.connection_state = ConnectionState::Connecting;

        let mut backoff = RECONNECT_MIN;
        let mut stats = tokio::time::interval(STATS_INTERVAL);

        loop {
            tokio::select! {
                biased;

                _ = cancel.cancelled() => {
                    info!("Shutdown signal received for broker connection");
                    break;
                }

                event = self.eventloop.poll() => match event {
                    Ok(event) => {
                        backoff = RECONNECT_MIN;
                        self.handle_event(event).await?;
                    }
                    Err(e) => {
                        error!("Broker connection error: {}", e);
                        self.status.connection_state = ConnectionState::Reconnecting;
                        warn!("Reconnecting to {} in {:?}", self.config.broker_addr(), backoff);
                        tokio::select! {
                            _ = cancel.cancelled() => break,
                            _ = tokio::time::sleep(backoff) => {}
                        }
                        backoff = (backoff * 2).min(RECONNECT_MAX);
                    }
                },

                Some(message) = self.publish_rx.recv() => {
                    self.publish(message);
                }

                _ = stats.tick() => {
                    info!(
                        "Broker stats: state {:?}, received {}, published {}, frames queued {}, dropped {}",
                        self.status.connection_state,
                        self.status.messages_received,
                        self.status.messages_sent,
                        self.status.frames_queued,
                        self.status.messages_dropped
                    );
                }
            }
        }

        self.disconnect().await;
        Ok(self.status)
    }

    async fn handle_event(&mut self, event: Event) -> Result<(), TransportError> {
        match event {
            Event::Incoming(Packet::ConnAck(ack)) => {
                if ack.code == ConnectReturnCode::Success {
                    info!("Connected to broker {}", self.config.broker_addr());
                    self.status.connection_state = ConnectionState::Connected;
                    self.subscribe_all();
                } else {
                    error!("Broker refused connection: {:?}", ack.code);
                    self.status.connection_state = ConnectionState::Reconnecting;
                }
            }
            Event::Incoming(Packet::Publish(publish)) => {
                self.status.messages_received += 1;
                self.status.last_activity = Some(chrono::Local::now());
                debug!(
                    "Broker message on {} ({} bytes)",
                    publish.topic,
                    publish.payload.len()
                );

                if let Some(frame) = route_incoming(&self.table, &publish.topic, &publish.payload) {
                    self.frame_tx.send(frame).await.map_err(|_| {
                        TransportError::ChannelClosed("serial frame queue".to_string())
                    })?;
                    self.status.frames_queued += 1;
                }
            }
            Event::Incoming(Packet::SubAck(ack)) => {
                debug!("Subscription acknowledged: {:?}", ack.return_codes);
            }
            Event::Incoming(Packet::Disconnect) => {
                warn!("Broker closed the connection");
                self.status.connection_state = ConnectionState::Reconnecting;
            }
            _ => {}
        }
        Ok(())
    }

    fn subscribe_all(&mut self) {
        for topic in self.table.subscriptions() {
            match self.client.try_subscribe(topic.clone(), QoS::AtMostOnce) {
                Ok(_) => info!("Subscribing to {}", topic),
                Err(e) => error!("Failed to subscribe to {}: {}", topic, e),
            }
        }
    }

    fn publish(&mut self, message: BrokerMessage) {
        match self.client.try_publish(
            message.topic.clone(),
            QoS::AtMostOnce,
            false,
            message.payload.clone().into_bytes(),
        ) {
            Ok(_) => {
                debug!("Published {}", message);
                self.status.messages_sent += 1;
                self.status.last_activity = Some(chrono::Local::now());
            }
            Err(e) => {
                warn!("Dropping message for {}: {}", message.topic, e);
                self.status.messages_dropped += 1;
            }
        }
    }

    async fn disconnect(&mut self) {
        if let Err(e) = self.client.try_disconnect() {
            self.status.connection_state = ConnectionState::Disconnected;
            warn!("Failed to request broker disconnect: {}", e);
            return;
        }

        let flush = async {
            loop {
                match self.eventloop.poll().await {
                    Ok(Event::Outgoing(Outgoing::Disconnect)) | Err(_) => break,
                    Ok(_) => {}
                }
            }
        };
        if tokio::time::timeout(DISCONNECT_TIMEOUT, flush).await.is_err() {
            debug!("Broker disconnect not flushed within {:?}", DISCONNECT_TIMEOUT);
        }
        self.status.connection_state = ConnectionState::Disconnected;
        info!("Disconnected from broker");
    }
}

/// Translates one incoming broker message into a serial frame.
///
/// Unknown topics and untranslatable payloads yield `None`; failures are
/// logged and the message is dropped.
pub fn route_incoming(table: &LookupTable, topic: &str, payload: &[u8]) -> Option<Frame> {
    match translate_to_frame(topic, payload, table) {
        Ok(Some(frame)) => Some(frame),
        Ok(None) => None,
        Err(e) => {
            warn!("Dropping message on {}: {}", topic, e);
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lookup::{TopicEntry, ValueType};

    fn table() -> Arc<LookupTable> {
        Arc::new(LookupTable::new(
            vec!["fan/set".to_string()],
            vec![TopicEntry::new("fan/set", 9, ValueType::Int32, "rpm")],
        ))
    }

    #[test]
    fn routes_known_topic() {
        let frame = route_incoming(&table(), "fan/set", br#"{"rpm": 1200}"#).unwrap();
        assert_eq!(frame, Frame::new(9, 1200i32.to_le_bytes()));
    }

    #[test]
    fn drops_unknown_topic() {
        assert!(route_incoming(&table(), "fan/get", br#"{"rpm": 1}"#).is_none());
    }

    #[test]
    fn drops_untranslatable_payload() {
        assert!(route_incoming(&table(), "fan/set", b"\xFF\xFE").is_none());
        assert!(route_incoming(&table(), "fan/set", br#"{"rpm": "fast"}"#).is_none());
    }

    #[tokio::test]
    async fn handler_starts_disconnected() {
        let (_publish_tx, publish_rx) = mpsc::channel(1);
        let (frame_tx, _frame_rx) = mpsc::channel(1);
        let handler = MqttHandler::new(MqttConfig::default(), table(), publish_rx, frame_tx);

        assert_eq!(
            handler.status().connection_state,
            ConnectionState::Disconnected
        );
        assert_eq!(handler.status().messages_sent, 0);
    }

    #[tokio::test]
    async fn cancelled_handler_returns_status() {
        let (_publish_tx, publish_rx) = mpsc::channel(1);
        let (frame_tx, _frame_rx) = mpsc::channel(1);
        let handler = MqttHandler::new(MqttConfig::default(), table(), publish_rx, frame_tx);

        let cancel = CancellationToken::new();
        cancel.cancel();
        let status = handler.run_until_shutdown(cancel).await.unwrap();

        assert_eq!(status.connection_state, ConnectionState::Disconnected);
        assert_eq!(status.messages_received, 0);
    }
}
