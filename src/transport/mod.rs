//! Transport collaborators: the pair of callbacks the core treats a wire
//! endpoint as (spec §6). File descriptor / socket transports (TCP, UDP,
//! SCTP, TLS, DTLS), connection multiplexing, and listener accept loops
//! are all out of scope (spec §1); this module supplies the capability
//! traits plus the two backings the core itself ships: an in-memory
//! transport and a generic `Read`/`Write` transport.

use crate::error::{Error, Result};
use std::io::{Read, Write};

/// Maximum size of one IPFIX message (spec §4.4).
pub const MAX_MESSAGE_LEN: usize = 65535;

/// Delivers one complete IPFIX message to a peer.
pub trait ExportTransport {
    fn write_message(&mut self, message: &[u8]) -> Result<()>;
}

/// Produces the next complete IPFIX message from a peer.
pub trait CollectTransport {
    /// Reads the next message, returning its length. `Err(EndOfStream)`
    /// when the peer has no more messages; `Err(NoDataReady)` for a
    /// non-blocking read that found nothing.
    fn read_message(&mut self, dest: &mut [u8; MAX_MESSAGE_LEN]) -> Result<usize>;

    /// Feeds raw octets into this transport's pending buffer, for
    /// transports that accumulate a byte stream rather than receive
    /// whole messages (spec §6 "disconnected" mode). A no-op for
    /// transports that have no such buffer.
    fn feed(&mut self, bytes: &[u8]) {
        let _ = bytes;
    }
}

/// An in-memory exporter: messages are appended to an internal buffer of
/// buffers. Used for tests and for callers who want the emitted bytes
/// rather than a live peer (spec §6 "a caller-supplied memory buffer").
#[derive(Debug, Default)]
pub struct MemoryExporter {
    pub messages: Vec<Vec<u8>>,
}

impl MemoryExporter {
    pub fn new() -> Self {
        MemoryExporter::default()
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.messages.into_iter().flatten().collect()
    }
}

impl ExportTransport for MemoryExporter {
    fn write_message(&mut self, message: &[u8]) -> Result<()> {
        self.messages.push(message.to_vec());
        Ok(())
    }
}

/// An in-memory collector fed either whole messages or a raw octet
/// stream (spec §6 "disconnected" mode).
#[derive(Debug, Default)]
pub struct MemoryCollector {
    queued: std::collections::VecDeque<Vec<u8>>,
    /// Raw octets fed via [`MemoryCollector::feed`] that do not yet form
    /// a complete message.
    pending: Vec<u8>,
}

impl MemoryCollector {
    pub fn new() -> Self {
        MemoryCollector::default()
    }

    /// Queues a complete, already-framed message.
    pub fn push_message(&mut self, message: Vec<u8>) {
        self.queued.push_back(message);
    }

    /// Feeds raw octets (e.g. freshly read off a socket) into the
    /// collector's pending buffer. [`CollectTransport::read_message`]
    /// parses whole messages out of this buffer as they become
    /// available, returning `BufferTooSmall` while the next message is
    /// still incomplete.
    pub fn feed(&mut self, bytes: &[u8]) {
        self.pending.extend_from_slice(bytes);
    }

    fn try_drain_pending(&mut self) -> Result<Option<Vec<u8>>> {
        if self.pending.len() < 16 {
            return Ok(None);
        }
        let total_len = u16::from_be_bytes([self.pending[2], self.pending[3]]) as usize;
        if total_len < 16 || total_len > MAX_MESSAGE_LEN {
            return Err(Error::MalformedMessage {
                context: "disconnected-mode message length".into(),
                sample: self.pending[..16.min(self.pending.len())].to_vec(),
            });
        }
        if self.pending.len() < total_len {
            return Ok(None);
        }
        let message: Vec<u8> = self.pending.drain(..total_len).collect();
        Ok(Some(message))
    }
}

impl CollectTransport for MemoryCollector {
    fn read_message(&mut self, dest: &mut [u8; MAX_MESSAGE_LEN]) -> Result<usize> {
        if let Some(message) = self.queued.pop_front() {
            dest[..message.len()].copy_from_slice(&message);
            return Ok(message.len());
        }
        match self.try_drain_pending()? {
            Some(message) => {
                dest[..message.len()].copy_from_slice(&message);
                Ok(message.len())
            }
            None => {
                if self.pending.is_empty() {
                    Err(Error::EndOfStream)
                } else {
                    let have = self.pending.len();
                    let needed = if have < 4 {
                        16 - have
                    } else {
                        let total_len =
                            u16::from_be_bytes([self.pending[2], self.pending[3]]) as usize;
                        total_len.saturating_sub(have)
                    };
                    Err(Error::BufferTooSmall { needed })
                }
            }
        }
    }

    fn feed(&mut self, bytes: &[u8]) {
        MemoryCollector::feed(self, bytes);
    }
}

/// Wraps a blocking [`Write`] as an [`ExportTransport`], length-prefixing
/// nothing extra (each IPFIX message is already self-delimiting via its
/// header length field).
pub struct IoExporter<W: Write> {
    writer: W,
}

impl<W: Write> IoExporter<W> {
    pub fn new(writer: W) -> Self {
        IoExporter { writer }
    }

    pub fn into_inner(self) -> W {
        self.writer
    }
}

impl<W: Write> ExportTransport for IoExporter<W> {
    fn write_message(&mut self, message: &[u8]) -> Result<()> {
        self.writer.write_all(message).map_err(Error::from)?;
        self.writer.flush().map_err(Error::from)?;
        Ok(())
    }
}

/// Wraps a blocking [`Read`] as a [`CollectTransport`]: reads the
/// 16-octet header, then the remainder of the message per its length
/// field.
pub struct IoCollector<R: Read> {
    reader: R,
}

impl<R: Read> IoCollector<R> {
    pub fn new(reader: R) -> Self {
        IoCollector { reader }
    }

    pub fn into_inner(self) -> R {
        self.reader
    }
}

impl<R: Read> CollectTransport for IoCollector<R> {
    fn read_message(&mut self, dest: &mut [u8; MAX_MESSAGE_LEN]) -> Result<usize> {
        self.reader.read_exact(&mut dest[..16]).map_err(Error::from)?;
        let total_len = u16::from_be_bytes([dest[2], dest[3]]) as usize;
        if !(16..=MAX_MESSAGE_LEN).contains(&total_len) {
            return Err(Error::MalformedMessage {
                context: "message length out of range".into(),
                sample: dest[..16].to_vec(),
            });
        }
        self.reader
            .read_exact(&mut dest[16..total_len])
            .map_err(Error::from)?;
        Ok(total_len)
    }
}

/// Either side of a [`crate::buffer::Buffer`]'s transport binding; a
/// Buffer owns exactly one, mutually exclusive with the other (spec §3
/// "Buffer").
pub enum Transport {
    Export(Box<dyn ExportTransport>),
    Collect(Box<dyn CollectTransport>),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn memory_exporter_round_trip_bytes() {
        let mut exporter = MemoryExporter::new();
        exporter.write_message(&[1, 2, 3]).unwrap();
        exporter.write_message(&[4, 5]).unwrap();
        assert_eq!(exporter.into_bytes(), vec![1, 2, 3, 4, 5]);
    }

    #[test]
    fn memory_collector_feed_reports_buffer_too_small() {
        let mut collector = MemoryCollector::new();
        collector.feed(&[0, 10, 0, 20]);
        let mut dest = [0u8; MAX_MESSAGE_LEN];
        let err = collector.read_message(&mut dest).unwrap_err();
        assert_eq!(err, Error::BufferTooSmall { needed: 16 });
    }

    #[test]
    fn memory_collector_drains_complete_message() {
        let mut collector = MemoryCollector::new();
        let mut msg = vec![0u8, 10, 0, 16];
        msg.extend_from_slice(&[0u8; 12]);
        collector.feed(&msg);
        let mut dest = [0u8; MAX_MESSAGE_LEN];
        let n = collector.read_message(&mut dest).unwrap();
        assert_eq!(n, 16);
    }
}
