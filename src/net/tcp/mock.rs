//! Scripted, in-memory stand-ins for the poller, listener and sockets.
//!
//! Every mock is a cheap clone around shared state, so a test keeps a
//! handle to inspect or script a mock after the server took ownership.

use std::cell::RefCell;
use std::collections::{HashMap, HashSet, VecDeque};
use std::io::{self, Read, Write};
use std::net::SocketAddr;
use std::rc::Rc;
use std::time::Duration;

use mio::{event::Source, Interest, Registry, Token};

use super::traits::{Listener, Transport};
use crate::event::ReadyEvent;
use crate::poll::Poller;

#[derive(Default)]
struct StreamState {
    reads: VecDeque<Vec<u8>>,
    read_closed: bool,
    read_error: Option<io::ErrorKind>,
    written: Vec<u8>,
    write_budget: Option<usize>,
    write_error: Option<io::ErrorKind>,
    prepare_error: Option<io::ErrorKind>,
}

/// In-memory socket with scripted reads and a throttled write side.
#[derive(Clone, Default)]
pub struct MockStream {
    state: Rc<RefCell<StreamState>>,
}

impl MockStream {
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes `data` available to the next read.
    pub fn push_read(&self, data: &[u8]) {
        self.state.borrow_mut().reads.push_back(data.to_vec());
    }

    /// Reads return 0 once pending data is consumed.
    pub fn close_read(&self) {
        self.state.borrow_mut().read_closed = true;
    }

    pub fn fail_reads(&self, kind: io::ErrorKind) {
        self.state.borrow_mut().read_error = Some(kind);
    }

    /// Caps the bytes accepted from now on; `None` lifts the cap.
    pub fn set_write_budget(&self, budget: Option<usize>) {
        self.state.borrow_mut().write_budget = budget;
    }

    pub fn fail_writes(&self, kind: io::ErrorKind) {
        self.state.borrow_mut().write_error = Some(kind);
    }

    pub fn fail_prepare(&self, kind: io::ErrorKind) {
        self.state.borrow_mut().prepare_error = Some(kind);
    }

    pub fn written(&self) -> Vec<u8> {
        self.state.borrow().written.clone()
    }

    /// Returns and forgets everything written so far.
    pub fn take_written(&self) -> Vec<u8> {
        std::mem::take(&mut self.state.borrow_mut().written)
    }
}

impl Read for MockStream {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let mut state = self.state.borrow_mut();
        if let Some(front) = state.reads.front_mut() {
            let n = buf.len().min(front.len());
            buf[..n].copy_from_slice(&front[..n]);
            front.drain(..n);
            if front.is_empty() {
                state.reads.pop_front();
            }
            return Ok(n);
        }
        if let Some(kind) = state.read_error {
            return Err(kind.into());
        }
        if state.read_closed {
            return Ok(0);
        }
        Err(io::ErrorKind::WouldBlock.into())
    }
}

impl Write for MockStream {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let mut state = self.state.borrow_mut();
        if let Some(kind) = state.write_error {
            return Err(kind.into());
        }
        let n = match state.write_budget {
            Some(0) => return Err(io::ErrorKind::WouldBlock.into()),
            Some(budget) => {
                let n = budget.min(buf.len());
                state.write_budget = Some(budget - n);
                n
            }
            None => buf.len(),
        };
        state.written.extend_from_slice(&buf[..n]);
        Ok(n)
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl Source for MockStream {
    fn register(&mut self, _: &Registry, _: Token, _: Interest) -> io::Result<()> {
        Ok(())
    }

    fn reregister(&mut self, _: &Registry, _: Token, _: Interest) -> io::Result<()> {
        Ok(())
    }

    fn deregister(&mut self, _: &Registry) -> io::Result<()> {
        Ok(())
    }
}

impl Transport for MockStream {
    fn prepare(&mut self, _no_delay: bool) -> io::Result<()> {
        match self.state.borrow().prepare_error {
            Some(kind) => Err(kind.into()),
            None => Ok(()),
        }
    }
}

/// Listener yielding queued mock streams, then would-block.
#[derive(Clone, Default)]
pub struct MockListener {
    pending: Rc<RefCell<VecDeque<io::Result<(MockStream, SocketAddr)>>>>,
    accepted: Rc<RefCell<u16>>,
}

impl MockListener {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queues a new incoming connection and returns a handle to it.
    pub fn push_stream(&self) -> MockStream {
        let stream = MockStream::new();
        self.push(stream.clone());
        stream
    }

    pub fn push(&self, stream: MockStream) {
        let port = {
            let mut accepted = self.accepted.borrow_mut();
            *accepted += 1;
            40000 + *accepted
        };
        let addr = SocketAddr::from(([127, 0, 0, 1], port));
        self.pending.borrow_mut().push_back(Ok((stream, addr)));
    }

    pub fn push_error(&self, kind: io::ErrorKind) {
        self.pending.borrow_mut().push_back(Err(kind.into()));
    }
}

impl Source for MockListener {
    fn register(&mut self, _: &Registry, _: Token, _: Interest) -> io::Result<()> {
        Ok(())
    }

    fn reregister(&mut self, _: &Registry, _: Token, _: Interest) -> io::Result<()> {
        Ok(())
    }

    fn deregister(&mut self, _: &Registry) -> io::Result<()> {
        Ok(())
    }
}

impl Listener for MockListener {
    type Stream = MockStream;

    fn accept(&mut self) -> io::Result<(MockStream, SocketAddr)> {
        self.pending
            .borrow_mut()
            .pop_front()
            .unwrap_or_else(|| Err(io::ErrorKind::WouldBlock.into()))
    }

    fn local_addr(&self) -> io::Result<SocketAddr> {
        Ok(SocketAddr::from(([127, 0, 0, 1], 8080)))
    }
}

#[derive(Default)]
struct PollerState {
    batches: VecDeque<io::Result<Vec<ReadyEvent>>>,
    interests: HashMap<Token, Interest>,
    fail_register: HashSet<Token>,
    fail_reregister: HashSet<Token>,
}

/// Poller replaying canned event batches and recording interest.
#[derive(Clone, Default)]
pub struct MockPoller {
    state: Rc<RefCell<PollerState>>,
}

impl MockPoller {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_batch(&self, events: Vec<ReadyEvent>) {
        self.state.borrow_mut().batches.push_back(Ok(events));
    }

    pub fn push_error(&self, kind: io::ErrorKind) {
        self.state.borrow_mut().batches.push_back(Err(kind.into()));
    }

    /// Interest currently registered for `token`.
    pub fn interest(&self, token: Token) -> Option<Interest> {
        self.state.borrow().interests.get(&token).copied()
    }

    pub fn registered_count(&self) -> usize {
        self.state.borrow().interests.len()
    }

    pub fn fail_register(&self, token: Token) {
        self.state.borrow_mut().fail_register.insert(token);
    }

    pub fn fail_reregister(&self, token: Token) {
        self.state.borrow_mut().fail_reregister.insert(token);
    }
}

impl Poller for MockPoller {
    fn register<S>(&mut self, _: &mut S, token: Token, interest: Interest) -> io::Result<()>
    where
        S: Source + ?Sized,
    {
        let mut state = self.state.borrow_mut();
        if state.fail_register.contains(&token) {
            return Err(io::ErrorKind::Other.into());
        }
        if state.interests.insert(token, interest).is_some() {
            return Err(io::ErrorKind::AlreadyExists.into());
        }
        Ok(())
    }

    fn reregister<S>(&mut self, _: &mut S, token: Token, interest: Interest) -> io::Result<()>
    where
        S: Source + ?Sized,
    {
        let mut state = self.state.borrow_mut();
        if state.fail_reregister.contains(&token) {
            return Err(io::ErrorKind::Other.into());
        }
        match state.interests.get_mut(&token) {
            Some(current) => {
                *current = interest;
                Ok(())
            }
            None => Err(io::ErrorKind::NotFound.into()),
        }
    }

    fn deregister<S>(&mut self, _: &mut S, token: Token) -> io::Result<()>
    where
        S: Source + ?Sized,
    {
        match self.state.borrow_mut().interests.remove(&token) {
            Some(_) => Ok(()),
            None => Err(io::ErrorKind::NotFound.into()),
        }
    }

    fn wait(&mut self, ready: &mut Vec<ReadyEvent>, _: Option<Duration>) -> io::Result<()> {
        ready.clear();
        match self.state.borrow_mut().batches.pop_front() {
            Some(Ok(events)) => {
                ready.extend(events);
                Ok(())
            }
            Some(Err(e)) => Err(e),
            None => Ok(()),
        }
    }
}
