//! # Mill-Chat
//! A multi-client TCP chat room served by a single-threaded, readiness-driven
//! event loop built on [`mio`].
//!
//! Clients connect, are prompted for a display name, and from then on every
//! line they send is relayed to all other participants as `<name>: <text>`.
//! Joins and departures are announced to the room.
//!
//! ## Core Philosophy
//! - **One thread**: every socket is non-blocking and the poll call is the
//!   only place the loop waits
//! - **No slow-client stalls**: each connection owns an outbound queue, so a
//!   peer that stops reading only delays itself
//! - **Ordered delivery**: every recipient sees broadcasts in the order the
//!   server produced them
//!
//! ## Architecture Overview
//! ```text
//! ┌─────────────┐    ┌──────────────┐    ┌─────────────┐
//! │ ChatServer  │───▶│   Reactor    │───▶│ PollHandle  │
//! └─────────────┘    └──────────────┘    └─────────────┘
//!        │
//!        ▼
//! ┌─────────────────┐    ┌─────────────┐
//! │ ConnectionTable │───▶│ Connection  │──▶ Session, LineBuffer, OutboundQueue
//! └─────────────────┘    └─────────────┘
//! ```
//! ## Quick Start
//!
//! ```rust,no_run
//! use mill_chat::prelude::*;
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = ServerConfig::builder().port(8080).build();
//!     let mut server = ChatServer::bind(config)?;
//!
//!     let handle = server.shutdown_handle();
//!     std::thread::spawn(move || {
//!         std::thread::sleep(std::time::Duration::from_secs(60));
//!         let _ = handle.shutdown();
//!     });
//!
//!     // blocks until the handle fires
//!     server.run()?;
//!     Ok(())
//! }
//! ```

pub mod error;
pub mod event;
pub mod net;
pub mod poll;
pub mod protocol;
pub mod reactor;

pub use crate::error::Result;
pub use crate::net::tcp::{config::ServerConfig, ChatServer};
pub use crate::reactor::ShutdownHandle;

pub mod prelude {
    pub use crate::error::{Disconnect, NetworkError};
    pub use crate::event::ReadyEvent;
    pub use crate::net::tcp::config::ServerConfig;
    pub use crate::net::tcp::traits::ConnectionId;
    pub use crate::net::tcp::ChatServer;
    pub use crate::protocol::{NamingState, Reply, Session};
    pub use crate::reactor::ShutdownHandle;
}

/// Binds `config.address` and serves the chat room on the calling thread
/// until the event loop fails.
pub fn start(config: ServerConfig) -> Result<()> {
    ChatServer::bind(config)?.run()
}
