//! Per-connection byte buffers.
//!
//! [`LineBuffer`] accumulates inbound bytes and hands out complete lines
//! without copying; [`OutboundQueue`] holds the bytes still owed to a peer.

use std::collections::VecDeque;
use std::io::{self, Write};

use bytes::{Buf, Bytes, BytesMut};

/// Strips every trailing `\r` and `\n`.
pub fn trim_newlines(line: &[u8]) -> &[u8] {
    let end = line
        .iter()
        .rposition(|&b| b != b'\r' && b != b'\n')
        .map_or(0, |pos| pos + 1);
    &line[..end]
}

/// Inbound accumulation buffer with newline framing.
#[derive(Debug, Default)]
pub struct LineBuffer {
    buf: BytesMut,
    // bytes already known not to contain a newline
    scanned: usize,
}

impl LineBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn extend(&mut self, data: &[u8]) {
        self.buf.extend_from_slice(data);
    }

    /// Takes the next newline-terminated line, trailing `\r`/`\n` removed,
    /// and keeps the unterminated remainder buffered.
    pub fn next_line(&mut self) -> Option<Bytes> {
        match self.buf[self.scanned..].iter().position(|&b| b == b'\n') {
            Some(offset) => {
                let line = self.buf.split_to(self.scanned + offset + 1).freeze();
                self.scanned = 0;
                let keep = trim_newlines(&line).len();
                Some(line.slice(..keep))
            }
            None => {
                self.scanned = self.buf.len();
                None
            }
        }
    }

    /// Bytes buffered without a terminating newline yet.
    pub fn pending(&self) -> &[u8] {
        &self.buf
    }

    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }
}

/// Result of draining an [`OutboundQueue`] into a writer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flush {
    /// Every queued byte was written.
    Drained,
    /// The writer stopped accepting bytes; the rest stays queued.
    Pending,
}

/// FIFO of byte chunks awaiting transmission.
///
/// The concatenation of all chunks is exactly what is still owed to the
/// peer, in order.
#[derive(Debug, Default)]
pub struct OutboundQueue {
    chunks: VecDeque<Bytes>,
    len: usize,
}

impl OutboundQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, chunk: Bytes) {
        if chunk.is_empty() {
            return;
        }
        self.len += chunk.len();
        self.chunks.push_back(chunk);
    }

    pub fn is_empty(&self) -> bool {
        self.chunks.is_empty()
    }

    /// Total queued bytes.
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn chunk_count(&self) -> usize {
        self.chunks.len()
    }

    /// Writes queued chunks front to back until the queue is empty, the
    /// writer would block, or a chunk is only partially accepted.
    pub fn write_to<W: Write + ?Sized>(&mut self, writer: &mut W) -> io::Result<Flush> {
        while let Some(front) = self.chunks.front_mut() {
            match writer.write(front) {
                Ok(0) => return Err(io::ErrorKind::WriteZero.into()),
                Ok(n) if n == front.len() => {
                    self.len -= n;
                    self.chunks.pop_front();
                }
                Ok(n) => {
                    self.len -= n;
                    front.advance(n);
                    return Ok(Flush::Pending);
                }
                Err(e) if e.kind() == io::ErrorKind::WouldBlock => return Ok(Flush::Pending),
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(e),
            }
        }
        Ok(Flush::Drained)
    }

    /// Concatenation of every queued chunk.
    pub fn to_vec(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(self.len);
        for chunk in &self.chunks {
            out.extend_from_slice(chunk);
        }
        out
    }
}
