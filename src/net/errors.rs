use std::io;
use std::net::SocketAddr;

use thiserror::Error;

/// Fatal errors: the server cannot start or the reactor itself failed.
#[derive(Debug, Error)]
pub enum NetworkError {
    #[error("failed to bind {addr}: {source}")]
    Bind {
        addr: SocketAddr,
        #[source]
        source: io::Error,
    },
    #[error("failed to read listener address: {0}")]
    LocalAddr(#[source] io::Error),
    #[error("failed to create poller: {0}")]
    Poller(#[source] io::Error),
    #[error("failed to register listener: {0}")]
    RegisterListener(#[source] io::Error),
    #[error("poll failed: {0}")]
    Poll(#[source] io::Error),
}

/// Why a single connection was torn down.
///
/// Never escapes the event loop: the offending connection is closed and
/// every other connection keeps running.
#[derive(Debug, Error)]
pub enum Disconnect {
    #[error("peer closed")]
    PeerClosed,
    #[error("connection reset: {0}")]
    Reset(#[source] io::Error),
    #[error("i/o error: {0}")]
    Io(#[source] io::Error),
    #[error("failed to update interest: {0}")]
    Interest(#[source] io::Error),
    #[error("socket error reported by poller")]
    SocketError,
}

impl Disconnect {
    /// Classifies a failed read or write.
    pub fn from_io(err: io::Error) -> Self {
        match err.kind() {
            io::ErrorKind::ConnectionReset
            | io::ErrorKind::BrokenPipe
            | io::ErrorKind::ConnectionAborted => Disconnect::Reset(err),
            _ => Disconnect::Io(err),
        }
    }

    /// Peer-initiated closes are routine and only logged at debug level.
    pub fn is_expected(&self) -> bool {
        matches!(self, Disconnect::PeerClosed | Disconnect::Reset(_))
    }
}
