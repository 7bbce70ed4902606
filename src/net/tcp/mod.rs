//! TCP chat server driven by a single-threaded readiness loop.
//!
//! Each accepted connection gets a [`ConnectionId`] from a monotonically
//! increasing counter. Its state lives in the [`ConnectionTable`], the only
//! structure shared by the acceptor, the read and write paths and the
//! broadcaster.
//!
//! ```text
//! Connection Storage:
//!   ConnectionTable (BTreeMap<ConnectionId, Connection>)
//!        │
//!        ├──> ConnId(2) ──> Connection { stream, session, inbound, outbound }
//!        ├──> ConnId(3) ──> Connection { stream, session, inbound, outbound }
//!        └──> ConnId(N) ──> Connection { stream, session, inbound, outbound }
//! ```
//!
//! ## Event Handling Pipeline
//!
//! ```text
//! 1. Listener readable:
//!    accept_new()
//!        - accept until WouldBlock
//!        - prepare socket, register READABLE
//!        - insert into table, queue name prompt, add WRITABLE
//!
//! 2. Connection readable:
//!    handle_read()
//!        - read until WouldBlock into the line buffer
//!        - frame lines, feed each to the Session
//!        - replies queued locally or broadcast to everyone else
//!
//! 3. Connection writable:
//!    handle_write()
//!        - drain outbound queue until empty, WouldBlock or partial write
//!        - drop WRITABLE once the queue is empty
//!
//! 4. Teardown:
//!    close_connection()
//!        - remove from table, deregister, close the socket
//!        - named connections announce their departure
//! ```
//!
//! ## Configuration
//!
//! ```rust
//! use mill_chat::net::tcp::config::ServerConfig;
//!
//! let config = ServerConfig::builder()
//!     .port(9000)
//!     .buffer_size(8192)
//!     .max_connections(1000)
//!     .no_delay(true)
//!     .build();
//! ```

pub mod buffer;
pub mod config;
pub mod connection;
#[cfg(test)]
pub(crate) mod mock;
pub mod table;
pub mod traits;

use std::borrow::Cow;
use std::collections::VecDeque;
use std::net::SocketAddr;

use bytes::Bytes;
use mio::net::TcpListener;
use mio::{Interest, Token};
use tracing::{debug, info, warn};

use crate::error::Result;
use crate::event::ReadyEvent;
use crate::net::errors::{Disconnect, NetworkError};
use crate::poll::{PollHandle, Poller, WAKE_TOKEN};
use crate::protocol::{Reply, NAME_PROMPT};
use crate::reactor::{Reactor, ShutdownHandle};
use config::ServerConfig;
use connection::{Connection, Delivery};
use table::ConnectionTable;
use traits::{ConnectionId, Listener, Transport};

/// Token the listening socket is registered under.
pub const LISTENER: Token = Token(1);

/// Broadcast chat room over line-oriented TCP connections.
pub struct ChatServer<P: Poller, L: Listener> {
    reactor: Reactor<P>,
    listener: L,
    connections: ConnectionTable<L::Stream>,
    scratch: Vec<u8>,
    config: ServerConfig,
}

impl ChatServer<PollHandle, TcpListener> {
    /// Binds `config.address` and prepares an OS-backed reactor.
    pub fn bind(config: ServerConfig) -> Result<Self> {
        let listener = TcpListener::bind(config.address).map_err(|source| NetworkError::Bind {
            addr: config.address,
            source,
        })?;
        let poller = PollHandle::new(config.events_capacity).map_err(NetworkError::Poller)?;
        Self::new(poller, listener, config)
    }
}

impl<P: Poller, L: Listener> ChatServer<P, L> {
    /// Registers `listener` for readability. Failing to do so is fatal.
    pub fn new(poller: P, mut listener: L, config: ServerConfig) -> Result<Self> {
        let mut reactor = Reactor::new(poller, config.events_capacity);
        reactor
            .register(&mut listener, LISTENER, Interest::READABLE)
            .map_err(NetworkError::RegisterListener)?;

        Ok(Self {
            reactor,
            listener,
            connections: ConnectionTable::new(),
            scratch: vec![0; config.buffer_size],
            config,
        })
    }

    pub fn local_addr(&self) -> Result<SocketAddr> {
        self.listener.local_addr().map_err(NetworkError::LocalAddr)
    }

    pub fn shutdown_handle(&self) -> ShutdownHandle {
        self.reactor.shutdown_handle()
    }

    pub fn connection_count(&self) -> usize {
        self.connections.len()
    }

    /// Serves until a [`ShutdownHandle`] stops the loop or the reactor
    /// fails.
    pub fn run(&mut self) -> Result<()> {
        let addr = self.local_addr()?;
        info!(%addr, "chat server listening");

        while !self.reactor.is_shutdown() {
            self.turn()?;
        }

        if !self.connections.is_empty() {
            debug!(connections = self.connections.len(), "dropping open connections");
        }
        info!("chat server stopped");
        Ok(())
    }

    /// Waits once and dispatches every reported event.
    pub fn turn(&mut self) -> Result<()> {
        let ready = self.reactor.wait().map_err(NetworkError::Poll)?;
        for event in &ready {
            self.dispatch(event);
        }
        self.reactor.recycle(ready);
        Ok(())
    }

    fn dispatch(&mut self, event: &ReadyEvent) {
        match event.token() {
            WAKE_TOKEN => {}
            LISTENER => self.accept_new(),
            token => {
                // events may still arrive for connections closed earlier in
                // this batch; the handlers look the id up again
                let Some(id) = ConnectionId::from_token(token) else {
                    return;
                };
                if event.is_error() {
                    self.close_connection(id, Disconnect::SocketError);
                    return;
                }
                if event.is_readable() {
                    self.handle_read(id);
                }
                if event.is_writable() {
                    self.handle_write(id);
                }
            }
        }
    }

    fn accept_new(&mut self) {
        loop {
            let (mut stream, peer) = match self.listener.accept() {
                Ok(accepted) => accepted,
                Err(e) if e.kind() == std::io::ErrorKind::WouldBlock => break,
                Err(e) if e.kind() == std::io::ErrorKind::Interrupted => continue,
                Err(e) => {
                    warn!(error = %e, "failed to accept connection");
                    break;
                }
            };

            if let Some(max) = self.config.max_connections {
                if self.connections.len() >= max {
                    warn!(%peer, max, "max connections reached, rejecting");
                    continue;
                }
            }

            if let Err(e) = stream.prepare(self.config.no_delay) {
                warn!(%peer, error = %e, "failed to set up connection");
                continue;
            }

            let id = self.connections.allocate_id();
            if let Err(e) = self
                .reactor
                .register(&mut stream, id.token(), Interest::READABLE)
            {
                warn!(conn = id.as_u64(), %peer, error = %e, "failed to register connection");
                continue;
            }

            let mut conn = Connection::new(id, stream, peer, Interest::READABLE);
            conn.enqueue(Bytes::from_static(NAME_PROMPT));
            let upgraded = update_interest(&mut self.reactor, &mut conn);
            self.connections.insert(id, conn);
            info!(conn = id.as_u64(), %peer, "connection accepted");

            if let Err(reason) = upgraded {
                self.close_connection(id, reason);
            }
        }
    }

    fn handle_read(&mut self, id: ConnectionId) {
        let Some(conn) = self.connections.get_mut(id) else {
            return;
        };
        if let Err(reason) = conn.fill_inbound(&mut self.scratch) {
            self.close_connection(id, reason);
            return;
        }

        // a broadcast below may tear this connection down, so look it up
        // again for every line
        while let Some(conn) = self.connections.get_mut(id) {
            let Some(line) = conn.next_line() else {
                break;
            };

            let was_named = conn.session().is_named();
            match conn.session_mut().on_line(&line) {
                Reply::Direct(reply) => {
                    conn.enqueue(reply);
                    if let Err(reason) = update_interest(&mut self.reactor, conn) {
                        self.close_connection(id, reason);
                        return;
                    }
                }
                Reply::Broadcast(message) => {
                    if !was_named {
                        if let Some(name) = conn.session().display_name_lossy() {
                            info!(conn = id.as_u64(), name = %name, "client joined");
                        }
                    } else {
                        debug!(conn = id.as_u64(), len = line.len(), "chat line");
                    }
                    self.broadcast(message, Some(id));
                }
            }
        }
    }

    fn handle_write(&mut self, id: ConnectionId) {
        let Some(conn) = self.connections.get_mut(id) else {
            return;
        };
        let result = conn
            .flush()
            .and_then(|_| update_interest(&mut self.reactor, conn));
        if let Err(reason) = result {
            self.close_connection(id, reason);
        }
    }

    /// Delivers `message` to every connection except `except`, then tears
    /// down the recipients that failed.
    pub fn broadcast(&mut self, message: Bytes, except: Option<ConnectionId>) {
        let failed = fan_out(&mut self.reactor, &mut self.connections, &message, except);
        for (id, reason) in failed {
            self.close_connection(id, reason);
        }
    }

    /// Removes a connection and announces a named participant's departure.
    ///
    /// Closing an id that is already gone does nothing. Recipients that
    /// fail while receiving a leave notice are closed in the same pass.
    pub fn close_connection(&mut self, id: ConnectionId, reason: Disconnect) {
        let mut pending = VecDeque::from([(id, reason)]);

        while let Some((id, reason)) = pending.pop_front() {
            let Some(mut conn) = self.connections.remove(id) else {
                continue;
            };
            let peer = conn.peer_addr();

            if let Err(e) = self.reactor.deregister(conn.stream_mut(), id.token()) {
                debug!(conn = id.as_u64(), error = %e, "failed to deregister connection");
            }

            if reason.is_expected() {
                debug!(conn = id.as_u64(), %peer, %reason, "peer disconnected");
            } else {
                warn!(conn = id.as_u64(), %peer, error = %reason, "dropping connection");
            }

            let notice = conn.session().leave_notice();
            let name = conn.session().display_name_lossy().map(Cow::into_owned);
            // releases the socket
            drop(conn);
            info!(conn = id.as_u64(), %peer, name = ?name, "connection closed");

            if let Some(notice) = notice {
                pending.extend(fan_out(
                    &mut self.reactor,
                    &mut self.connections,
                    &notice,
                    None,
                ));
            }
        }
    }
}

/// Brings a connection's registered interest in line with its queue:
/// write interest if and only if bytes are waiting.
fn update_interest<P, S>(
    reactor: &mut Reactor<P>,
    conn: &mut Connection<S>,
) -> std::result::Result<(), Disconnect>
where
    P: Poller,
    S: Transport,
{
    let desired = conn.desired_interest();
    if desired != conn.interest() {
        let token = conn.id().token();
        reactor
            .reregister(conn.stream_mut(), token, desired)
            .map_err(Disconnect::Interest)?;
        conn.set_interest(desired);
    }
    Ok(())
}

/// One delivery pass over the table. Failed recipients are returned rather
/// than removed so the iteration is never invalidated.
fn fan_out<P, S>(
    reactor: &mut Reactor<P>,
    connections: &mut ConnectionTable<S>,
    message: &Bytes,
    except: Option<ConnectionId>,
) -> Vec<(ConnectionId, Disconnect)>
where
    P: Poller,
    S: Transport,
{
    let mut failed = Vec::new();
    for (id, conn) in connections.iter_mut() {
        if Some(id) == except {
            continue;
        }
        let result = conn.deliver(message.clone()).and_then(|delivery| {
            if delivery == Delivery::Queued {
                debug!(conn = id.as_u64(), backlog = conn.outbound().len(), "recipient backlogged");
            }
            update_interest(reactor, conn)
        });
        if let Err(reason) = result {
            failed.push((id, reason));
        }
    }
    failed
}
