use std::io::{self, Read, Write};
use std::net::SocketAddr;

use mio::{event::Source, Token};

/// First token handed to a connection; lower tokens belong to the waker
/// and the listener.
pub const FIRST_CONNECTION_TOKEN: usize = 2;

/// Unique identifier for connections.
///
/// Assigned from a monotonically increasing counter when a connection is
/// accepted and never reused, so a stale event can never reach a newer
/// connection that happens to get the same OS handle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ConnectionId(pub u64);

impl ConnectionId {
    pub fn new(id: u64) -> Self {
        ConnectionId(id)
    }

    pub fn as_u64(&self) -> u64 {
        self.0
    }

    pub fn token(&self) -> Token {
        Token(self.0 as usize)
    }

    /// Maps a poller token back to a connection id.
    pub fn from_token(token: Token) -> Option<Self> {
        (token.0 >= FIRST_CONNECTION_TOKEN).then(|| ConnectionId(token.0 as u64))
    }
}

/// A non-blocking byte stream the server can register with a poller.
pub trait Transport: Read + Write + Source {
    /// Per-connection socket setup run right after accept.
    fn prepare(&mut self, no_delay: bool) -> io::Result<()>;
}

/// A non-blocking source of new connections.
pub trait Listener: Source {
    type Stream: Transport;

    fn accept(&mut self) -> io::Result<(Self::Stream, SocketAddr)>;

    fn local_addr(&self) -> io::Result<SocketAddr>;
}

impl Transport for mio::net::TcpStream {
    fn prepare(&mut self, no_delay: bool) -> io::Result<()> {
        // mio hands out accepted streams already in non-blocking mode
        self.set_nodelay(no_delay)
    }
}

impl Listener for mio::net::TcpListener {
    type Stream = mio::net::TcpStream;

    fn accept(&mut self) -> io::Result<(Self::Stream, SocketAddr)> {
        mio::net::TcpListener::accept(self)
    }

    fn local_addr(&self) -> io::Result<SocketAddr> {
        mio::net::TcpListener::local_addr(self)
    }
}
