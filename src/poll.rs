use std::{io, sync::Arc, time::Duration};

use mio::{event::Source, Events, Interest, Poll, Token};

use crate::event::ReadyEvent;

/// Token reserved for the waker that interrupts a blocking wait.
pub const WAKE_TOKEN: Token = Token(0);

/// Readiness notification backend.
///
/// Interest is edge-triggered: a condition is reported once per transition,
/// so callers must drain reads and writes until they would block.
pub trait Poller {
    fn register<S>(&mut self, source: &mut S, token: Token, interest: Interest) -> io::Result<()>
    where
        S: Source + ?Sized;

    fn reregister<S>(&mut self, source: &mut S, token: Token, interest: Interest) -> io::Result<()>
    where
        S: Source + ?Sized;

    /// Removes all interest for `source`, registered under `token`.
    fn deregister<S>(&mut self, source: &mut S, token: Token) -> io::Result<()>
    where
        S: Source + ?Sized;

    /// Blocks until at least one event is ready (or `timeout` elapses) and
    /// replaces the contents of `ready` with what was reported.
    fn wait(&mut self, ready: &mut Vec<ReadyEvent>, timeout: Option<Duration>) -> io::Result<()>;

    /// Waker able to interrupt [`wait`](Self::wait) from another thread.
    fn waker(&self) -> Option<Arc<mio::Waker>> {
        None
    }
}

/// [`Poller`] backed by `mio::Poll` (epoll, kqueue or IOCP).
pub struct PollHandle {
    poller: Poll,
    events: Events,
    waker: Arc<mio::Waker>,
}

impl PollHandle {
    pub fn new(events_capacity: usize) -> io::Result<Self> {
        let poller = Poll::new()?;
        let waker = mio::Waker::new(poller.registry(), WAKE_TOKEN)?;
        Ok(PollHandle {
            poller,
            events: Events::with_capacity(events_capacity),
            waker: Arc::new(waker),
        })
    }
}

impl Poller for PollHandle {
    fn register<S>(&mut self, source: &mut S, token: Token, interest: Interest) -> io::Result<()>
    where
        S: Source + ?Sized,
    {
        self.poller.registry().register(source, token, interest)
    }

    fn reregister<S>(&mut self, source: &mut S, token: Token, interest: Interest) -> io::Result<()>
    where
        S: Source + ?Sized,
    {
        self.poller.registry().reregister(source, token, interest)
    }

    fn deregister<S>(&mut self, source: &mut S, _token: Token) -> io::Result<()>
    where
        S: Source + ?Sized,
    {
        self.poller.registry().deregister(source)
    }

    fn wait(&mut self, ready: &mut Vec<ReadyEvent>, timeout: Option<Duration>) -> io::Result<()> {
        ready.clear();
        self.poller.poll(&mut self.events, timeout)?;
        ready.extend(self.events.iter().map(ReadyEvent::from));
        Ok(())
    }

    fn waker(&self) -> Option<Arc<mio::Waker>> {
        Some(Arc::clone(&self.waker))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_poll_times_out_without_events() {
        let mut poller = PollHandle::new(16).unwrap();
        let mut ready = vec![ReadyEvent::readable(Token(42))];
        poller
            .wait(&mut ready, Some(Duration::from_millis(10)))
            .unwrap();
        assert!(ready.is_empty());
    }

    #[test]
    fn test_waker_interrupts_wait() {
        let mut poller = PollHandle::new(16).unwrap();
        poller.waker().unwrap().wake().unwrap();

        let mut ready = Vec::new();
        poller.wait(&mut ready, Some(Duration::from_secs(5))).unwrap();
        assert!(ready.iter().any(|event| event.token() == WAKE_TOKEN));
    }
}
