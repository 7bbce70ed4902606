use mio::{event::Event, Token};
use std::fmt;

/// Readiness event reported by a [`Poller`](crate::poll::Poller).
///
/// Decoupled from `mio::event::Event` so the event loop can be driven by
/// any backend, including a scripted one in tests.
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct ReadyEvent {
    token: Token,
    is_readable: bool,
    is_writable: bool,
    is_error: bool,
}

impl fmt::Debug for ReadyEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ReadyEvent")
            .field("token", &self.token)
            .field("is_readable", &self.is_readable)
            .field("is_writable", &self.is_writable)
            .field("is_error", &self.is_error)
            .finish()
    }
}

impl ReadyEvent {
    pub fn new(token: Token, is_readable: bool, is_writable: bool) -> Self {
        Self {
            token,
            is_readable,
            is_writable,
            is_error: false,
        }
    }

    pub fn readable(token: Token) -> Self {
        Self::new(token, true, false)
    }

    pub fn writable(token: Token) -> Self {
        Self::new(token, false, true)
    }

    /// An error or hang-up condition on `token`.
    pub fn error(token: Token) -> Self {
        Self {
            token,
            is_readable: false,
            is_writable: false,
            is_error: true,
        }
    }

    pub fn token(&self) -> Token {
        self.token
    }

    pub fn is_readable(&self) -> bool {
        self.is_readable
    }

    pub fn is_writable(&self) -> bool {
        self.is_writable
    }

    pub fn is_error(&self) -> bool {
        self.is_error
    }
}

impl From<&Event> for ReadyEvent {
    fn from(event: &Event) -> Self {
        Self {
            token: event.token(),
            is_readable: event.is_readable(),
            is_writable: event.is_writable(),
            // a full hang-up is fatal, a half-close still drains through read()
            is_error: event.is_error() || (event.is_read_closed() && event.is_write_closed()),
        }
    }
}
