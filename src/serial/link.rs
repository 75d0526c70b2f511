//! Serial link lifecycle with statum typestates
//!
//! ```text
//! Opening ──(start: startup frame)──► Polling ──(shutdown)──► Closed
//! ```
//!
//! While polling, the link drains the UART every `poll_interval`, feeds the
//! bytes to its [`FrameDecoder`], translates each frame and queues the
//! resulting broker message. Frames queued by the broker side are written as
//! soon as they arrive.

use super::SerialTransport;
use crate::error::TransportError;
use crate::ftmq::{Frame, FrameDecoder};
use crate::lookup::LookupTable;
use crate::mqtt::message::BrokerMessage;
use crate::translation::translate_to_broker;
use statum::{machine, state};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

const STATS_INTERVAL: Duration = Duration::from_secs(10);

#[state]
#[derive(Debug, Clone)]
pub enum SerialLinkState {
    Opening, // transport open, nothing written yet
    Polling, // startup frame sent, relaying
    Closed,  // loop finished
}

/// Traffic counters for one serial link
#[derive(Clone, Debug, Default)]
pub struct LinkStats {
    pub bytes_read: usize,
    pub frames_received: usize,
    pub frames_written: usize,
    pub messages_published: usize,
    pub messages_dropped: usize,
    pub last_activity: Option<chrono::DateTime<chrono::Local>>,
}

#[machine]
pub struct SerialLink<S: SerialLinkState> {
    transport: Box<dyn SerialTransport>,
    decoder: FrameDecoder,
    table: Arc<LookupTable>,
    publish_tx: mpsc::Sender<BrokerMessage>,
    frame_rx: mpsc::Receiver<Frame>,
    poll_interval: Duration,
    stats: LinkStats,
}

impl<S: SerialLinkState> SerialLink<S> {
    pub fn stats(&self) -> &LinkStats {
        &self.stats
    }

    pub fn decoder(&self) -> &FrameDecoder {
        &self.decoder
    }
}

impl SerialLink<Opening> {
    pub fn create(
        transport: Box<dyn SerialTransport>,
        table: Arc<LookupTable>,
        publish_tx: mpsc::Sender<BrokerMessage>,
        frame_rx: mpsc::Receiver<Frame>,
        poll_interval: Duration,
    ) -> Self {
        Self::new(
            transport,
            FrameDecoder::new(),
            table,
            publish_tx,
            frame_rx,
            poll_interval,
            LinkStats::default(),
        )
    }

    /// Sends the startup frame and transitions to Polling.
    ///
    /// The decoder starts from a clean state on every (re)open.
    pub fn start(mut self) -> Result<SerialLink<Polling>, TransportError> {
        self.decoder.reset();

        let startup = Frame::startup();
        info!("Sending startup frame {}", startup);
        self.transport.write_all(&startup.to_bytes())?;
        self.stats.frames_written += 1;

        Ok(self.transition())
    }
}

impl SerialLink<Polling> {
    /// Drains the transport once and relays every completed frame.
    ///
    /// Returns the number of frames decoded. Only transport failures are
    /// errors; unknown identifiers and a full publish queue drop the frame.
    pub fn poll_once(&mut self) -> Result<usize, TransportError> {
        let bytes = self.transport.read_available()?;
        if bytes.is_empty() {
            return Ok(0);
        }
        self.stats.bytes_read += bytes.len();
        self.stats.last_activity = Some(chrono::Local::now());

        let mut decoded = 0;
        for frame in self.decoder.decode(&bytes) {
            decoded += 1;
            self.stats.frames_received += 1;

            let Some(message) = translate_to_broker(&frame, &self.table) else {
                continue;
            };

            match self.publish_tx.try_send(message) {
                Ok(()) => self.stats.messages_published += 1,
                Err(TrySendError::Full(message)) => {
                    warn!("Publish queue full, dropping message for {}", message.topic);
                    self.stats.messages_dropped += 1;
                }
                Err(TrySendError::Closed(_)) => {
                    return Err(TransportError::ChannelClosed(
                        "broker publish queue".to_string(),
                    ));
                }
            }
        }

        Ok(decoded)
    }

    /// Encodes and writes one frame to the peer
    pub fn write_frame(&mut self, frame: Frame) -> Result<(), TransportError> {
        debug!("Writing frame {}", frame);
        self.transport.write_all(&frame.to_bytes())?;
        self.stats.frames_written += 1;
        self.stats.last_activity = Some(chrono::Local::now());
        Ok(())
    }

    /// Main loop, runs until `cancel` fires or the transport fails
    pub async fn run_until_shutdown(
        mut self,
        cancel: CancellationToken,
    ) -> Result<SerialLink<Closed>, TransportError> {
        info!(
            "Starting serial polling loop every {:?}",
            self.poll_interval
        );

        let mut poll = tokio::time::interval(self.poll_interval);
        poll.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let mut stats = tokio::time::interval(STATS_INTERVAL);

        loop {
            tokio::select! {
                biased;

                _ = cancel.cancelled() => {
                    info!("Shutdown signal received for serial link");
                    break;
                }

                frame = self.frame_rx.recv() => match frame {
                    Some(frame) => self.write_frame(frame)?,
                    None => {
                        warn!("Broker side closed the frame queue");
                        break;
                    }
                },

                _ = poll.tick() => {
                    if let Err(e) = self.poll_once() {
                        error!("Serial polling failed: {}", e);
                        return Err(e);
                    }
                }

                _ = stats.tick() => {
                    info!(
                        "Serial stats: {} bytes, {} frames in, {} frames out, {} published, {} dropped, {} bytes discarded",
                        self.stats.bytes_read,
                        self.stats.frames_received,
                        self.stats.frames_written,
                        self.stats.messages_published,
                        self.stats.messages_dropped,
                        self.decoder.discarded()
                    );
                }
            }
        }

        Ok(self.shutdown())
    }

    pub fn shutdown(self) -> SerialLink<Closed> {
        info!("Closing serial link");
        self.transition()
    }
}

impl SerialLink<Closed> {
    pub fn into_stats(self) -> LinkStats {
        self.stats
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ftmq::encode;
    use crate::lookup::{TopicEntry, ValueType};
    use crate::serial::testing::ScriptedTransport;

    fn table() -> Arc<LookupTable> {
        Arc::new(LookupTable::new(
            vec!["light/set".to_string()],
            vec![
                TopicEntry::new("sensor/level", 1, ValueType::Int32, "level"),
                TopicEntry::new("sensor/temp", 2, ValueType::Float32, "temp"),
                TopicEntry::new("light/set", 3, ValueType::ByteArray4, "rgba"),
            ],
        ))
    }

    struct Harness {
        transport: ScriptedTransport,
        publish_rx: mpsc::Receiver<BrokerMessage>,
        frame_tx: mpsc::Sender<Frame>,
        link: SerialLink<Opening>,
    }

    fn harness(publish_capacity: usize) -> Harness {
        let transport = ScriptedTransport::default();
        let (publish_tx, publish_rx) = mpsc::channel(publish_capacity);
        let (frame_tx, frame_rx) = mpsc::channel(8);
        let link = SerialLink::create(
            Box::new(transport.clone()),
            table(),
            publish_tx,
            frame_rx,
            Duration::from_millis(500),
        );
        Harness {
            transport,
            publish_rx,
            frame_tx,
            link,
        }
    }

    #[test]
    fn start_writes_startup_frame() {
        let h = harness(8);
        let link = h.link.start().unwrap();

        assert_eq!(h.transport.written(), vec![0x40, 0x40, 0, 0, 0, 0, 0]);
        assert_eq!(link.stats().frames_written, 1);
    }

    #[test]
    fn poll_publishes_known_frames_only() {
        let mut h = harness(8);
        let mut link = h.link.start().unwrap();

        let mut chunk = vec![0x11, 0x22];
        chunk.extend_from_slice(&encode(1, 42i32.to_le_bytes()));
        chunk.extend_from_slice(&encode(77, [0; 4]));
        chunk.extend_from_slice(&encode(2, 3.5f32.to_le_bytes()));
        h.transport.queue(&chunk);

        assert_eq!(link.poll_once().unwrap(), 3);

        let first = h.publish_rx.try_recv().unwrap();
        assert_eq!(first.topic, "sensor/level");
        assert_eq!(first.payload, r#"{"level":42}"#);

        let second = h.publish_rx.try_recv().unwrap();
        assert_eq!(second.topic, "sensor/temp");
        assert_eq!(second.payload, r#"{"temp":3.5}"#);

        assert!(h.publish_rx.try_recv().is_err());
        assert_eq!(link.stats().frames_received, 3);
        assert_eq!(link.stats().messages_published, 2);
    }

    #[test]
    fn frame_split_across_polls() {
        let mut h = harness(8);
        let mut link = h.link.start().unwrap();
        let bytes = encode(3, [1, 2, 3, 4]);

        h.transport.queue(&bytes[..3]);
        h.transport.queue(&bytes[3..]);

        assert_eq!(link.poll_once().unwrap(), 0);
        assert!(!link.decoder().is_idle());
        assert_eq!(link.poll_once().unwrap(), 1);
        assert!(link.decoder().is_idle());

        let message = h.publish_rx.try_recv().unwrap();
        assert_eq!(message.topic, "light/set");
        assert_eq!(message.payload, r#"{"rgba":[1,2,3,4]}"#);
    }

    #[test]
    fn full_publish_queue_drops_message() {
        let mut h = harness(1);
        let mut link = h.link.start().unwrap();

        let mut chunk = encode(1, 1i32.to_le_bytes()).to_vec();
        chunk.extend_from_slice(&encode(1, 2i32.to_le_bytes()));
        h.transport.queue(&chunk);

        assert_eq!(link.poll_once().unwrap(), 2);
        assert_eq!(link.stats().messages_published, 1);
        assert_eq!(link.stats().messages_dropped, 1);
        assert_eq!(h.publish_rx.try_recv().unwrap().payload, r#"{"level":1}"#);
    }

    #[test]
    fn closed_publish_queue_is_error() {
        let h = harness(1);
        let mut link = h.link.start().unwrap();
        drop(h.publish_rx);

        h.transport.queue(&encode(1, [0; 4]));
        assert!(matches!(
            link.poll_once(),
            Err(TransportError::ChannelClosed(_))
        ));
    }

    #[test]
    fn write_frame_encodes_on_the_wire() {
        let h = harness(8);
        let mut link = h.link.start().unwrap();

        link.write_frame(Frame::new(3, [9, 8, 7, 6])).unwrap();

        let written = h.transport.written();
        assert_eq!(&written[7..], &[0x40, 0x40, 3, 9, 8, 7, 6]);
        assert_eq!(link.stats().frames_written, 2);
    }

    #[tokio::test(start_paused = true)]
    async fn loop_relays_both_directions() {
        let mut h = harness(8);
        let link = h.link.start().unwrap();
        h.transport.queue(&encode(1, (-5i32).to_le_bytes()));
        h.frame_tx.send(Frame::new(3, [1, 1, 1, 1])).await.unwrap();

        let cancel = CancellationToken::new();
        let task = tokio::spawn(link.run_until_shutdown(cancel.clone()));

        let message = h.publish_rx.recv().await.unwrap();
        assert_eq!(message.payload, r#"{"level":-5}"#);

        cancel.cancel();
        let closed = task.await.unwrap().unwrap();
        let stats = closed.into_stats();

        assert_eq!(stats.frames_received, 1);
        assert_eq!(stats.frames_written, 2);
        assert_eq!(
            &h.transport.written()[7..],
            &[0x40, 0x40, 3, 1, 1, 1, 1]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn read_failure_ends_loop() {
        let h = harness(8);
        let link = h.link.start().unwrap();
        h.transport.queue_error("device unplugged");

        let result = link.run_until_shutdown(CancellationToken::new()).await;
        assert!(matches!(result, Err(TransportError::Serial(msg)) if msg == "device unplugged"));
    }

    #[tokio::test(start_paused = true)]
    async fn closed_frame_queue_ends_loop() {
        let h = harness(8);
        let link = h.link.start().unwrap();
        drop(h.frame_tx);

        assert!(link.run_until_shutdown(CancellationToken::new()).await.is_ok());
    }
}
