//! In-memory transport for tests

use super::SerialTransport;
use crate::error::TransportError;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

/// Scripted reads, recorded writes. Clones share the same buffers.
#[derive(Clone, Default)]
pub(crate) struct ScriptedTransport {
    reads: Arc<Mutex<VecDeque<Result<Vec<u8>, String>>>>,
    written: Arc<Mutex<Vec<u8>>>,
}

impl ScriptedTransport {
    pub(crate) fn queue(&self, bytes: &[u8]) {
        self.reads.lock().unwrap().push_back(Ok(bytes.to_vec()));
    }

    pub(crate) fn queue_error(&self, msg: &str) {
        self.reads.lock().unwrap().push_back(Err(msg.to_string()));
    }

    pub(crate) fn written(&self) -> Vec<u8> {
        self.written.lock().unwrap().clone()
    }
}

impl SerialTransport for ScriptedTransport {
    fn read_available(&mut self) -> Result<Vec<u8>, TransportError> {
        match self.reads.lock().unwrap().pop_front() {
            Some(Ok(bytes)) => Ok(bytes),
            Some(Err(msg)) => Err(TransportError::Serial(msg)),
            None => Ok(Vec::new()),
        }
    }

    fn write_all(&mut self, bytes: &[u8]) -> Result<(), TransportError> {
        self.written.lock().unwrap().extend_from_slice(bytes);
        Ok(())
    }
}
