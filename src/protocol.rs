//! Line protocol of the chat room.
//!
//! A connection starts [`NamingState::Unnamed`]; its first non-empty line
//! becomes its display name and every later line is chat text relayed to
//! the other participants as `<name>: <text>`.

use std::borrow::Cow;

use bytes::{BufMut, Bytes, BytesMut};

use crate::net::tcp::buffer::trim_newlines;

/// Sent to every new connection.
pub const NAME_PROMPT: &[u8] = b"Enter your name: ";

/// Sent when the proposed name is empty.
pub const EMPTY_NAME_PROMPT: &[u8] = b"Name cannot be empty. Enter your name: ";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NamingState {
    Unnamed,
    /// Raw name bytes exactly as the client sent them, minus line endings.
    Named(Bytes),
}

/// What the server must do in response to one line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reply {
    /// Queue bytes for the connection that sent the line.
    Direct(Bytes),
    /// Fan bytes out to every other connection.
    Broadcast(Bytes),
}

/// Per-connection protocol state.
#[derive(Debug)]
pub struct Session {
    state: NamingState,
}

impl Default for Session {
    fn default() -> Self {
        Self::new()
    }
}

impl Session {
    pub fn new() -> Self {
        Self {
            state: NamingState::Unnamed,
        }
    }

    pub fn state(&self) -> &NamingState {
        &self.state
    }

    pub fn display_name(&self) -> Option<&[u8]> {
        match &self.state {
            NamingState::Named(name) => Some(&name[..]),
            NamingState::Unnamed => None,
        }
    }

    /// Display name for logs; invalid UTF-8 is replaced.
    pub fn display_name_lossy(&self) -> Option<Cow<'_, str>> {
        self.display_name().map(String::from_utf8_lossy)
    }

    pub fn is_named(&self) -> bool {
        matches!(self.state, NamingState::Named(_))
    }

    /// Interprets one framed line.
    pub fn on_line(&mut self, line: &[u8]) -> Reply {
        if let NamingState::Named(name) = &self.state {
            return Reply::Broadcast(chat_message(name, line));
        }

        let name = trim_newlines(line);
        if name.is_empty() {
            return Reply::Direct(Bytes::from_static(EMPTY_NAME_PROMPT));
        }
        let joined = joined_message(name);
        self.state = NamingState::Named(Bytes::copy_from_slice(name));
        Reply::Broadcast(joined)
    }

    /// Notice for the remaining participants when this connection goes
    /// away; unnamed connections leave silently.
    pub fn leave_notice(&self) -> Option<Bytes> {
        self.display_name().map(left_message)
    }
}

fn notice(name: &[u8], suffix: &[u8]) -> Bytes {
    let mut message = BytesMut::with_capacity(name.len() + suffix.len());
    message.put_slice(name);
    message.put_slice(suffix);
    message.freeze()
}

pub fn joined_message(name: &[u8]) -> Bytes {
    notice(name, b" has joined the chat.\n")
}

pub fn left_message(name: &[u8]) -> Bytes {
    notice(name, b" has left the chat.\n")
}

pub fn chat_message(name: &[u8], text: &[u8]) -> Bytes {
    let mut message = BytesMut::with_capacity(name.len() + text.len() + 3);
    message.put_slice(name);
    message.put_slice(b": ");
    message.put_slice(text);
    message.put_u8(b'\n');
    message.freeze()
}
