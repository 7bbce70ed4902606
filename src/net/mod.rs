//! Networking layer of the chat server.
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                        ChatServer                           │
//! │  ┌──────────────┐   ┌────────────────┐   ┌───────────────┐  │
//! │  │  Listener    │──▶│ConnectionTable │──▶│   Session     │  │
//! │  │  (accept)    │   │ (read/write)   │   │ (line rules)  │  │
//! │  └──────────────┘   └────────────────┘   └───────────────┘  │
//! └────────────┬────────────────────────────────────────────────┘
//!              │ register / reregister / deregister
//!              ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │              Operating System (epoll/kqueue/IOCP)           │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! [`tcp`] holds the server and its per-connection machinery; [`errors`]
//! the fatal and per-connection failure types.

pub mod errors;
pub mod tcp;
