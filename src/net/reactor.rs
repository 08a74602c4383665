//! Component B: the reactor (spec.md §4.1).
//!
//! `Add`/`Remove`/`OptIn`/`OptOut`/`Choose(timeout)` over a single `mio::Poll`,
//! generalizing the slab-of-channels pattern of a per-channel endpoint (see
//! DESIGN.md) to the whole hub: one `Poll`, one `Token` slab, safe add/remove
//! mid-iteration because removal only deregisters and drops the slot, never
//! shifts indices.

use mio::event::Source;
use mio::{Events, Interest, Poll, Token};
use std::io;
use std::time::Duration;

/// INPUT/OUTPUT/ERROR/CLOSE per spec.md §4.1, as a plain bitset. ERROR and
/// CLOSE are software sentinels derived from mio readiness, not requested
/// via `Interest` (mio has no "error" or "close" interest to register).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReadyMask(u8);

impl ReadyMask {
    pub const INPUT: ReadyMask = ReadyMask(0b0001);
    pub const OUTPUT: ReadyMask = ReadyMask(0b0010);
    pub const ERROR: ReadyMask = ReadyMask(0b0100);
    pub const CLOSE: ReadyMask = ReadyMask(0b1000);

    pub fn empty() -> Self {
        ReadyMask(0)
    }

    pub fn contains(self, other: ReadyMask) -> bool {
        self.0 & other.0 == other.0
    }
}

impl std::ops::BitOr for ReadyMask {
    type Output = ReadyMask;
    fn bitor(self, rhs: ReadyMask) -> ReadyMask {
        ReadyMask(self.0 | rhs.0)
    }
}

impl std::ops::BitOrAssign for ReadyMask {
    fn bitor_assign(&mut self, rhs: ReadyMask) {
        self.0 |= rhs.0;
    }
}

/// Default server step: small and bounded, per spec.md §4.1 ("no long
/// sleeps").
pub const DEFAULT_TIMEOUT: Duration = Duration::from_millis(10);

pub struct Reactor {
    poll: Poll,
    events: Events,
}

impl Reactor {
    pub fn new(capacity: usize) -> io::Result<Self> {
        Ok(Self {
            poll: Poll::new()?,
            events: Events::with_capacity(capacity),
        })
    }

    pub fn add<S: Source + ?Sized>(&mut self, source: &mut S, token: Token, mask: ReadyMask) -> io::Result<()> {
        self.poll.registry().register(source, token, interest_for(mask))
    }

    pub fn remove<S: Source + ?Sized>(&mut self, source: &mut S) -> io::Result<()> {
        self.poll.registry().deregister(source)
    }

    pub fn reregister<S: Source + ?Sized>(&mut self, source: &mut S, token: Token, mask: ReadyMask) -> io::Result<()> {
        self.poll.registry().reregister(source, token, interest_for(mask))
    }

    /// `Choose(timeout)`: blocks up to `timeout` (capped to
    /// [`DEFAULT_TIMEOUT`] by the caller's loop, not here) and returns the
    /// ready set as `(Token, ReadyMask)` pairs.
    pub fn choose(&mut self, timeout: Option<Duration>) -> io::Result<Vec<(Token, ReadyMask)>> {
        self.poll.poll(&mut self.events, timeout)?;
        let mut ready = Vec::with_capacity(self.events.iter().count());
        for event in self.events.iter() {
            let mut mask = ReadyMask::empty();
            if event.is_readable() {
                mask |= ReadyMask::INPUT;
            }
            if event.is_writable() {
                mask |= ReadyMask::OUTPUT;
            }
            if event.is_error() || event.is_read_closed() || event.is_write_closed() {
                mask |= ReadyMask::ERROR;
            }
            ready.push((event.token(), mask));
        }
        Ok(ready)
    }
}

fn interest_for(mask: ReadyMask) -> Interest {
    let input = mask.contains(ReadyMask::INPUT);
    let output = mask.contains(ReadyMask::OUTPUT);
    match (input, output) {
        (true, true) => Interest::READABLE | Interest::WRITABLE,
        (true, false) => Interest::READABLE,
        (false, true) => Interest::WRITABLE,
        (false, false) => Interest::READABLE,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn readymask_combines_via_bitor() {
        let mask = ReadyMask::INPUT | ReadyMask::OUTPUT;
        assert!(mask.contains(ReadyMask::INPUT));
        assert!(mask.contains(ReadyMask::OUTPUT));
        assert!(!mask.contains(ReadyMask::ERROR));
    }

    #[test]
    fn interest_for_input_only_is_readable() {
        assert_eq!(interest_for(ReadyMask::INPUT), Interest::READABLE);
    }
}
