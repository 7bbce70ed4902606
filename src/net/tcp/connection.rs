use std::io::{self, Read, Write};
use std::net::SocketAddr;

use bytes::Bytes;
use mio::Interest;

use super::buffer::{Flush, LineBuffer, OutboundQueue};
use super::traits::{ConnectionId, Transport};
use crate::net::errors::Disconnect;
use crate::protocol::Session;

/// Outcome of handing a message to a connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Delivery {
    /// Written to the socket in full.
    Sent,
    /// Some or all bytes wait in the outbound queue.
    Queued,
}

/// One accepted TCP session.
pub struct Connection<S> {
    id: ConnectionId,
    stream: S,
    peer_addr: SocketAddr,
    session: Session,
    inbound: LineBuffer,
    outbound: OutboundQueue,
    interest: Interest,
}

impl<S: Transport> Connection<S> {
    pub fn new(id: ConnectionId, stream: S, peer_addr: SocketAddr, interest: Interest) -> Self {
        Self {
            id,
            stream,
            peer_addr,
            session: Session::new(),
            inbound: LineBuffer::new(),
            outbound: OutboundQueue::new(),
            interest,
        }
    }

    pub fn id(&self) -> ConnectionId {
        self.id
    }

    pub fn peer_addr(&self) -> SocketAddr {
        self.peer_addr
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn session_mut(&mut self) -> &mut Session {
        &mut self.session
    }

    pub fn stream_mut(&mut self) -> &mut S {
        &mut self.stream
    }

    pub fn outbound(&self) -> &OutboundQueue {
        &self.outbound
    }

    /// Interest currently registered with the poller.
    pub fn interest(&self) -> Interest {
        self.interest
    }

    pub fn set_interest(&mut self, interest: Interest) {
        self.interest = interest;
    }

    /// Read interest always, write interest while bytes are queued.
    pub fn desired_interest(&self) -> Interest {
        if self.outbound.is_empty() {
            Interest::READABLE
        } else {
            Interest::READABLE | Interest::WRITABLE
        }
    }

    /// Reads until the socket would block, appending to the inbound buffer.
    ///
    /// Returns the number of bytes read. A zero-length read means the peer
    /// shut down its side.
    pub fn fill_inbound(&mut self, scratch: &mut [u8]) -> Result<usize, Disconnect> {
        let mut total = 0;
        loop {
            match self.stream.read(scratch) {
                Ok(0) => return Err(Disconnect::PeerClosed),
                Ok(n) => {
                    self.inbound.extend(&scratch[..n]);
                    total += n;
                }
                Err(e) if e.kind() == io::ErrorKind::WouldBlock => return Ok(total),
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(Disconnect::from_io(e)),
            }
        }
    }

    pub fn next_line(&mut self) -> Option<Bytes> {
        self.inbound.next_line()
    }

    /// Queues bytes behind anything already owed to the peer.
    pub fn enqueue(&mut self, message: Bytes) {
        self.outbound.push(message);
    }

    /// Delivers a message, writing directly when nothing is queued ahead
    /// of it and queueing whatever the socket does not take.
    pub fn deliver(&mut self, message: Bytes) -> Result<Delivery, Disconnect> {
        if !self.outbound.is_empty() {
            self.outbound.push(message);
            return Ok(Delivery::Queued);
        }

        loop {
            match self.stream.write(&message) {
                Ok(n) if n == message.len() => return Ok(Delivery::Sent),
                Ok(n) => {
                    self.outbound.push(message.slice(n..));
                    return Ok(Delivery::Queued);
                }
                Err(e) if e.kind() == io::ErrorKind::WouldBlock => {
                    self.outbound.push(message);
                    return Ok(Delivery::Queued);
                }
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(Disconnect::from_io(e)),
            }
        }
    }

    /// Writes queued bytes until drained or the socket pushes back.
    pub fn flush(&mut self) -> Result<Flush, Disconnect> {
        self.outbound
            .write_to(&mut self.stream)
            .map_err(Disconnect::from_io)
    }
}
