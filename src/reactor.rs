use std::{
    io,
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
};

use mio::{event::Source, Interest, Token};

use crate::{event::ReadyEvent, poll::Poller};

/// Default number of readiness events fetched per wait.
pub const DEFAULT_EVENTS_CAPACITY: usize = 1024;

/// Single-threaded readiness reactor.
///
/// Owns the [`Poller`] and the buffer events are collected into. The wait
/// call is the only place the event loop ever blocks.
pub struct Reactor<P: Poller> {
    poller: P,
    ready: Vec<ReadyEvent>,
    shutdown: Arc<AtomicBool>,
}

impl<P: Poller> Reactor<P> {
    pub fn new(poller: P, events_capacity: usize) -> Self {
        Self {
            poller,
            ready: Vec::with_capacity(events_capacity),
            shutdown: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn register<S>(
        &mut self,
        source: &mut S,
        token: Token,
        interest: Interest,
    ) -> io::Result<()>
    where
        S: Source + ?Sized,
    {
        self.poller.register(source, token, interest)
    }

    pub fn reregister<S>(
        &mut self,
        source: &mut S,
        token: Token,
        interest: Interest,
    ) -> io::Result<()>
    where
        S: Source + ?Sized,
    {
        self.poller.reregister(source, token, interest)
    }

    pub fn deregister<S>(&mut self, source: &mut S, token: Token) -> io::Result<()>
    where
        S: Source + ?Sized,
    {
        self.poller.deregister(source, token)
    }

    /// Blocks until events are ready and hands them out.
    ///
    /// Interrupted waits are retried. The returned buffer should be given
    /// back through [`recycle`](Self::recycle) to reuse its allocation.
    pub fn wait(&mut self) -> io::Result<Vec<ReadyEvent>> {
        let mut ready = std::mem::take(&mut self.ready);
        loop {
            match self.poller.wait(&mut ready, None) {
                Ok(()) => return Ok(ready),
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => {
                    self.ready = ready;
                    return Err(e);
                }
            }
        }
    }

    pub fn recycle(&mut self, mut ready: Vec<ReadyEvent>) {
        ready.clear();
        self.ready = ready;
    }

    pub fn is_shutdown(&self) -> bool {
        self.shutdown.load(Ordering::SeqCst)
    }

    pub fn shutdown_handle(&self) -> ShutdownHandle {
        ShutdownHandle {
            flag: Arc::clone(&self.shutdown),
            waker: self.poller.waker(),
        }
    }
}

/// Stops a running event loop from any thread.
#[derive(Clone)]
pub struct ShutdownHandle {
    flag: Arc<AtomicBool>,
    waker: Option<Arc<mio::Waker>>,
}

impl ShutdownHandle {
    /// Requests the loop to exit after the current wake-up.
    pub fn shutdown(&self) -> io::Result<()> {
        self.flag.store(true, Ordering::SeqCst);
        match &self.waker {
            Some(waker) => waker.wake(),
            None => Ok(()),
        }
    }

    pub fn is_shutdown(&self) -> bool {
        self.flag.load(Ordering::SeqCst)
    }
}
