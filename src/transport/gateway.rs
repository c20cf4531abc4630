//! # Gateway Transport
//!
//! Bounded outbound queue of MySensors lines.
//!
//! `publish` only enqueues, so it never blocks the polling loop. The main loop
//! drains the queue to the gateway port with [`GatewayTransport::drain`].
//! When the queue is full the event is rejected and the dispatcher keeps
//! its previous baseline.

use bytes::{Bytes, BytesMut};
use tracing::{debug, warn};

use super::mysensors::{encode_presentation, encode_set};
use super::{PublishEvent, Transport};
use crate::error::{BridgeError, Result};
use crate::serial::port_trait::SerialPortIO;

/// MySensors gateway transport backed by an in-memory line queue
#[derive(Debug)]
pub struct GatewayTransport {
    node_id: u8,
    queue: BytesMut,
    max_pending_bytes: usize,
}

impl GatewayTransport {
    /// # Arguments
    ///
    /// * `node_id` - MySensors node id used in every line
    /// * `max_pending_bytes` - Queue capacity; lines that would exceed it are rejected
    pub fn new(node_id: u8, max_pending_bytes: usize) -> Self {
        Self {
            node_id,
            queue: BytesMut::with_capacity(max_pending_bytes),
            max_pending_bytes,
        }
    }

    /// Bytes waiting to be written to the gateway
    pub fn pending_len(&self) -> usize {
        self.queue.len()
    }

    /// Queue the node presentation (sketch info and children)
    ///
    /// # Returns
    ///
    /// * `bool` - `false` if the queue could not hold the whole sequence
    pub fn present(&mut self, sketch_name: &str, sketch_version: &str) -> bool {
        let lines = encode_presentation(self.node_id, sketch_name, sketch_version);
        let total: usize = lines.iter().map(String::len).sum();

        if self.queue.len() + total > self.max_pending_bytes {
            warn!("Gateway queue too small for node presentation ({} bytes)", total);
            return false;
        }

        for line in &lines {
            self.queue.extend_from_slice(line.as_bytes());
        }
        debug!("Queued node presentation ({} lines)", lines.len());
        true
    }

    fn enqueue(&mut self, line: &str) -> bool {
        if self.queue.len() + line.len() > self.max_pending_bytes {
            warn!(
                "Gateway queue full ({} of {} bytes), dropping {:?}",
                self.queue.len(),
                self.max_pending_bytes,
                line.trim_end()
            );
            return false;
        }

        self.queue.extend_from_slice(line.as_bytes());
        debug!("Queued {:?}", line.trim_end());
        true
    }

    /// Remove and return everything queued so far
    pub fn take_pending(&mut self) -> Bytes {
        self.queue.split().freeze()
    }

    /// Put lines that failed to reach the gateway back in front of the queue
    fn requeue(&mut self, lines: Bytes) {
        let mut restored = BytesMut::with_capacity(self.max_pending_bytes);
        restored.extend_from_slice(&lines);
        restored.extend_from_slice(&self.queue);
        // Nothing can be queued while a drain holds `&mut self`
        debug_assert!(restored.len() <= self.max_pending_bytes);
        self.queue = restored;
    }

    /// Write all queued lines to `port`
    ///
    /// # Returns
    ///
    /// * `Result<usize>` - Number of bytes written
    ///
    /// # Errors
    ///
    /// Returns `Serial` error if the write or flush fails. The lines stay
    /// queued and are written again by the next drain.
    pub async fn drain<P: SerialPortIO + ?Sized>(&mut self, port: &mut P) -> Result<usize> {
        if self.queue.is_empty() {
            return Ok(0);
        }

        let pending = self.take_pending();

        if let Err(e) = port.write_all(&pending).await {
            self.requeue(pending);
            return Err(BridgeError::Serial(format!("Failed to write to gateway: {}", e)));
        }

        if let Err(e) = port.flush().await {
            self.requeue(pending);
            return Err(BridgeError::Serial(format!("Failed to flush gateway port: {}", e)));
        }

        debug!("Wrote {} bytes to gateway", pending.len());
        Ok(pending.len())
    }
}

impl Transport for GatewayTransport {
    fn publish(&mut self, event: &PublishEvent) -> bool {
        let line = encode_set(self.node_id, event);
        self.enqueue(&line)
    }
}
