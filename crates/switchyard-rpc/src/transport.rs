//! Envelope transport seam.
//!
//! A transport moves one encoded envelope at a time. Byte-level framing is
//! the transport's business; the routing runtime only sees whole payloads.

use std::fmt;
use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::{Arc, Mutex, PoisonError};

use switchyard_protocol::Message;
use tracing::{debug, trace};

use crate::config::PayloadCodec;
use crate::errors::{CallError, CodecError, TransportError};

/// Log target for transport events.
pub(crate) const TRANSPORT_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::transport");

/// Moves encoded envelopes between peers.
///
/// `send` may be called from several threads at once while one thread is
/// blocked in `receive`.
pub trait Transport: Send + Sync {
    /// Writes one encoded envelope.
    ///
    /// # Errors
    ///
    /// Returns [`TransportError`] when the envelope cannot be written.
    fn send(&self, payload: &[u8]) -> Result<(), TransportError>;

    /// Blocks until the next envelope arrives; `None` on orderly close.
    ///
    /// # Errors
    ///
    /// Returns [`TransportError`] when reading fails.
    fn receive(&self) -> Result<Option<Vec<u8>>, TransportError>;

    /// Stops sending; the peer's next `receive` observes the close.
    fn close(&self) {}
}

/// One end of an in-process transport pair.
pub struct MemoryTransport {
    sender: Mutex<Option<Sender<Vec<u8>>>>,
    receiver: Mutex<Receiver<Vec<u8>>>,
}

impl fmt::Debug for MemoryTransport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MemoryTransport").finish_non_exhaustive()
    }
}

/// Creates two connected in-memory transports.
#[must_use]
pub fn memory_pair() -> (MemoryTransport, MemoryTransport) {
    let (left_sender, right_receiver) = mpsc::channel();
    let (right_sender, left_receiver) = mpsc::channel();
    (
        MemoryTransport {
            sender: Mutex::new(Some(left_sender)),
            receiver: Mutex::new(left_receiver),
        },
        MemoryTransport {
            sender: Mutex::new(Some(right_sender)),
            receiver: Mutex::new(right_receiver),
        },
    )
}

impl Transport for MemoryTransport {
    fn send(&self, payload: &[u8]) -> Result<(), TransportError> {
        let sender = self.sender.lock().unwrap_or_else(PoisonError::into_inner);
        let Some(sender) = sender.as_ref() else {
            return Err(TransportError::Closed);
        };
        sender
            .send(payload.to_vec())
            .map_err(|_| TransportError::Closed)
    }

    fn receive(&self) -> Result<Option<Vec<u8>>, TransportError> {
        let receiver = self.receiver.lock().unwrap_or_else(PoisonError::into_inner);
        Ok(receiver.recv().ok())
    }

    fn close(&self) {
        let mut sender = self.sender.lock().unwrap_or_else(PoisonError::into_inner);
        if sender.take().is_some() {
            debug!(target: TRANSPORT_TARGET, "memory transport closed");
        }
    }
}

/// Encodes and writes outbound envelopes for one connection.
pub(crate) struct Outbox {
    transport: Arc<dyn Transport>,
    codec: Arc<dyn PayloadCodec>,
    max_message_bytes: usize,
}

impl Outbox {
    pub(crate) fn new(
        transport: Arc<dyn Transport>,
        codec: Arc<dyn PayloadCodec>,
        max_message_bytes: usize,
    ) -> Self {
        Self {
            transport,
            codec,
            max_message_bytes,
        }
    }

    pub(crate) fn send(&self, message: &Message) -> Result<(), CallError> {
        let value = message.to_value().map_err(CodecError::from)?;
        let payload = self.codec.encode(&value)?;
        if payload.len() > self.max_message_bytes {
            return Err(TransportError::MessageTooLarge {
                size: payload.len(),
                limit: self.max_message_bytes,
            }
            .into());
        }
        trace!(
            target: TRANSPORT_TARGET,
            method = message.method(),
            id = ?message.id(),
            bytes = payload.len(),
            "sending envelope"
        );
        self.transport.send(&payload)?;
        Ok(())
    }

    pub(crate) fn close(&self) {
        self.transport.close();
    }
}
