//! # Serial Side of the Bridge
//!
//! The FTMQ network is reached through the Raspberry Pi UART. This module
//! keeps the UART behind the small [`SerialTransport`] trait so the link
//! logic can be driven by an in-memory transport in tests.
//!
//! ```text
//! serial/
//! ├── mod.rs   - SerialTransport trait and the rppal UART implementation
//! └── link.rs  - SerialLink lifecycle: startup frame, polling, frame writes
//! ```
//!
//! The UART handle is owned by the link task alone. Frames coming from the
//! broker side arrive over a channel and are written by that same task, so
//! reads and writes never interleave on the device.

pub mod link;
#[cfg(test)]
pub(crate) mod testing;

pub use link::{LinkStats, SerialLink};

use crate::error::TransportError;
use rppal::uart::{Parity, Uart};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, info};

/// Raw byte pipe to the FTMQ peer
pub trait SerialTransport: Send {
    /// Returns the bytes currently buffered by the device without waiting.
    /// An empty vector means nothing arrived since the last call.
    fn read_available(&mut self) -> Result<Vec<u8>, TransportError>;

    /// Writes all bytes before returning
    fn write_all(&mut self, bytes: &[u8]) -> Result<(), TransportError>;
}

/// UART via rppal, 8 data bits, no parity, 1 stop bit
pub struct UartTransport {
    uart: Uart,
    path: PathBuf,
}

impl UartTransport {
    pub fn open(path: impl AsRef<Path>, baud_rate: u32) -> Result<Self, TransportError> {
        let path = path.as_ref();
        info!("Opening serial port {} at {} baud", path.display(), baud_rate);

        let mut uart = Uart::with_path(path, baud_rate, Parity::None, 8, 1)
            .map_err(|e| TransportError::Serial(format!("{}: {}", path.display(), e)))?;
        // reads return immediately with whatever is buffered
        uart.set_read_mode(0, Duration::ZERO)?;
        uart.set_write_mode(true)?;

        Ok(Self {
            uart,
            path: path.to_path_buf(),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl SerialTransport for UartTransport {
    fn read_available(&mut self) -> Result<Vec<u8>, TransportError> {
        let pending = self.uart.input_len()?;
        if pending == 0 {
            return Ok(Vec::new());
        }

        let mut buffer = vec![0u8; pending];
        let read = self.uart.read(&mut buffer)?;
        buffer.truncate(read);
        debug!("Read {} bytes from {}", read, self.path.display());
        Ok(buffer)
    }

    fn write_all(&mut self, bytes: &[u8]) -> Result<(), TransportError> {
        let mut written = 0;
        while written < bytes.len() {
            let n = self.uart.write(&bytes[written..])?;
            if n == 0 {
                return Err(TransportError::Serial(format!(
                    "{} accepted no data",
                    self.path.display()
                )));
            }
            written += n;
        }
        self.uart.drain()?;
        Ok(())
    }
}
