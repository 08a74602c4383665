//! Component C: the per-connection object (spec.md §4.2).

use crate::error::CloseReason;
use crate::net::reactor::ReadyMask;
use crate::net::zlib::ZlibWriter;
use mio::net::TcpStream;
use std::collections::VecDeque;
use std::io::{self, ErrorKind, Read, Write as _};
use std::time::{Duration, Instant};

/// The six per-phase timers named in spec.md §4.2 ("key/valnick/login/
/// myinfo/setpass/flush"); `OnTimerBase` checks each against the login
/// flags and closes on expiry before the corresponding flag is set.
#[derive(Debug, Clone, Copy, Default)]
pub struct ConnectionTimers {
    pub key_deadline: Option<Instant>,
    pub valnick_deadline: Option<Instant>,
    pub login_deadline: Option<Instant>,
    pub myinfo_deadline: Option<Instant>,
    pub setpass_deadline: Option<Instant>,
    pub flush_deadline: Option<Instant>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CloseState {
    Open,
    /// `CloseNice(deadline)`: non-writable, destroyed at `deadline` unless
    /// the send buffer drains first.
    ClosingNice(Instant),
    /// The CLOSE sentinel: destroyed on the next tick.
    CloseNow,
}

pub struct Connection {
    pub id: u64,
    stream: TcpStream,
    pub peer_ip: std::net::Ipv4Addr,

    /// Scratch buffer `ReadAll` drains the socket into (spec.md §4.2:
    /// "fixed capacity, default 512 KiB + 1").
    scratch: Vec<u8>,
    /// Bytes read but not yet split into a complete line.
    line_buf: Vec<u8>,
    delimiter: u8,
    max_line_size: usize,

    /// Bytes queued by `Write` but not yet handed to the zlib writer /
    /// socket (spec.md §4.2's "per-connection flush buffer").
    flush_buf: Vec<u8>,
    /// Bytes already handed to `send()`; the unsent tail on partial send.
    send_buf: VecDeque<u8>,

    pub timers: ConnectionTimers,
    pub close_state: CloseState,
    pub input_armed: bool,
    /// The interest mask last handed to the reactor, so `sync_interest`
    /// only reregisters when `input_armed`/pending output actually changed.
    registered_mask: ReadyMask,

    max_outbuf_size: usize,
    max_outfill_size: usize,
    max_unblock_size: usize,
}

impl Connection {
    pub fn new(id: u64, stream: TcpStream, peer_ip: std::net::Ipv4Addr, read_buf_size: usize, max_line_size: usize) -> Self {
        Self {
            id,
            stream,
            peer_ip,
            scratch: vec![0u8; read_buf_size],
            line_buf: Vec::with_capacity(1024),
            delimiter: b'|',
            max_line_size,
            flush_buf: Vec::new(),
            send_buf: VecDeque::new(),
            timers: ConnectionTimers::default(),
            close_state: CloseState::Open,
            input_armed: true,
            registered_mask: ReadyMask::INPUT,
            max_outbuf_size: 1024 * 1024,
            max_outfill_size: 768 * 1024,
            max_unblock_size: 512 * 1024,
        }
    }

    pub fn with_backpressure_limits(mut self, max_outbuf: usize, max_outfill: usize, max_unblock: usize) -> Self {
        self.max_outbuf_size = max_outbuf;
        self.max_outfill_size = max_outfill;
        self.max_unblock_size = max_unblock;
        self
    }

    /// Drains the socket into the scratch buffer. Detects a TLS client
    /// hello on a plaintext port and closes (spec.md §4.2).
    pub fn read_all(&mut self) -> Result<usize, CloseReason> {
        let mut total = 0;
        loop {
            match self.stream.read(&mut self.scratch) {
                Ok(0) => return Err(CloseReason::Quit),
                Ok(n) => {
                    if total == 0 && crate::proto::scanner::looks_like_tls_hello(&self.scratch[..n]) {
                        return Err(CloseReason::ProtocolError("TLS hello on plaintext port".into()));
                    }
                    self.line_buf.extend_from_slice(&self.scratch[..n]);
                    total += n;
                    if self.line_buf.len() > self.max_line_size * 4 {
                        // Pathological: no delimiter anywhere near budget.
                        return Err(CloseReason::BufferOverflow);
                    }
                    if n < self.scratch.len() {
                        return Ok(total);
                    }
                }
                Err(e) if e.kind() == ErrorKind::WouldBlock || e.kind() == ErrorKind::Interrupted => {
                    return Ok(total);
                }
                Err(e) => return Err(CloseReason::ProtocolError(e.to_string())),
            }
        }
    }

    /// Locates the delimiter in the line buffer and returns one complete
    /// line at a time (without the delimiter), per spec.md §4.2.
    pub fn read_line_local(&mut self) -> Result<Option<Vec<u8>>, CloseReason> {
        if self.line_buf.len() > self.max_line_size {
            return Err(CloseReason::BufferOverflow);
        }
        if let Some(pos) = self.line_buf.iter().position(|&b| b == self.delimiter) {
            if pos > self.max_line_size {
                return Err(CloseReason::BufferOverflow);
            }
            let line = self.line_buf.drain(..=pos).collect::<Vec<u8>>();
            return Ok(Some(line[..line.len() - 1].to_vec()));
        }
        Ok(None)
    }

    /// Appends to the flush buffer; flushes (optionally through zlib) when
    /// `flush` is requested or the backpressure threshold is crossed.
    pub fn write(&mut self, data: &[u8], flush: bool, zlib: &mut ZlibWriter) -> io::Result<usize> {
        self.flush_buf.extend_from_slice(data);
        let half_budget = self.max_outbuf_size / 2;
        let should_flush = flush || self.flush_buf.len() + self.send_buf.len() >= half_budget;
        if should_flush && !self.flush_buf.is_empty() {
            let pending = std::mem::take(&mut self.flush_buf);
            let out = zlib.maybe_compress(&pending);
            self.send_buf.extend(out);
        }
        self.pump_send_buffer()?;
        self.apply_backpressure();
        Ok(data.len())
    }

    fn pump_send_buffer(&mut self) -> io::Result<()> {
        while !self.send_buf.is_empty() {
            let (first, _) = self.send_buf.as_slices();
            match self.stream.write(first) {
                Ok(0) => break,
                Ok(n) => {
                    self.send_buf.drain(..n);
                }
                Err(e) if e.kind() == ErrorKind::WouldBlock => break,
                Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(e) => return Err(e),
            }
        }
        Ok(())
    }

    /// Backpressure per spec.md §4.2: remove INPUT at `max_outfill_size`,
    /// re-arm below `max_unblock_size`, close above `max_outbuf_size`.
    fn apply_backpressure(&mut self) {
        let size = self.send_buf.len() + self.flush_buf.len();
        if size >= self.max_outbuf_size {
            self.close_state = CloseState::CloseNow;
            return;
        }
        if size >= self.max_outfill_size {
            self.input_armed = false;
        } else if size < self.max_unblock_size {
            self.input_armed = true;
        }
    }

    pub fn pending_send_bytes(&self) -> usize {
        self.send_buf.len() + self.flush_buf.len()
    }

    /// Interest the reactor should currently watch: INPUT while armed,
    /// OUTPUT while bytes remain queued for send (spec.md §4.2).
    fn desired_mask(&self) -> ReadyMask {
        let mut mask = ReadyMask::empty();
        if self.input_armed {
            mask |= ReadyMask::INPUT;
        }
        if self.pending_send_bytes() > 0 {
            mask |= ReadyMask::OUTPUT;
        }
        mask
    }

    /// Returns the mask to hand the reactor if the registration is stale
    /// (spec.md §4.2/S6: INPUT dropped at `max_outfill_size`, re-armed
    /// below `max_unblock_size`; OUTPUT armed on a partial send and
    /// dropped once the send buffer drains).
    pub fn sync_interest(&mut self) -> Option<ReadyMask> {
        let desired = self.desired_mask();
        if desired == self.registered_mask {
            return None;
        }
        self.registered_mask = desired;
        Some(desired)
    }

    /// Retries the queued send after an OUTPUT-ready event.
    pub fn on_writable(&mut self) -> io::Result<()> {
        self.pump_send_buffer()?;
        self.apply_backpressure();
        Ok(())
    }

    pub fn close_nice(&mut self, now: Instant, linger: Duration) {
        self.input_armed = false;
        self.close_state = CloseState::ClosingNice(now + linger);
    }

    pub fn close_now(&mut self) {
        self.close_state = CloseState::CloseNow;
    }

    /// Called every `timer_conn_period`; returns a close reason if a
    /// deadline has passed before its corresponding login flag was set.
    pub fn on_timer_base(&mut self, now: Instant, flags: LoginFlagsSnapshot) -> Option<CloseReason> {
        if let CloseState::ClosingNice(deadline) = self.close_state {
            if now >= deadline || self.pending_send_bytes() == 0 {
                self.close_state = CloseState::CloseNow;
            }
        }
        if !flags.keyok && self.timers.key_deadline.is_some_and(|d| now >= d) {
            return Some(CloseReason::Timeout("key"));
        }
        if !flags.valnick && self.timers.valnick_deadline.is_some_and(|d| now >= d) {
            return Some(CloseReason::Timeout("valnick"));
        }
        if !flags.passwd && self.timers.setpass_deadline.is_some_and(|d| now >= d) {
            return Some(CloseReason::Timeout("setpass"));
        }
        if !flags.myinfo && self.timers.myinfo_deadline.is_some_and(|d| now >= d) {
            return Some(CloseReason::Timeout("myinfo"));
        }
        if !flags.login_done() && self.timers.login_deadline.is_some_and(|d| now >= d) {
            return Some(CloseReason::Timeout("login"));
        }
        None
    }

    pub fn stream_mut(&mut self) -> &mut TcpStream {
        &mut self.stream
    }
}

/// A read-only snapshot of the bits `on_timer_base` needs, so this module
/// doesn't depend on the login state machine's internal representation.
#[derive(Debug, Clone, Copy, Default)]
pub struct LoginFlagsSnapshot {
    pub keyok: bool,
    pub valnick: bool,
    pub passwd: bool,
    pub myinfo: bool,
    pub version: bool,
    pub allowed: bool,
    pub supports: bool,
}

impl LoginFlagsSnapshot {
    pub fn login_done(self) -> bool {
        self.keyok && self.valnick && self.passwd && self.version && self.myinfo && self.allowed && self.supports
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn login_done_requires_all_flags_except_nicklst() {
        let mut flags = LoginFlagsSnapshot::default();
        assert!(!flags.login_done());
        flags.keyok = true;
        flags.valnick = true;
        flags.passwd = true;
        flags.version = true;
        flags.myinfo = true;
        flags.allowed = true;
        flags.supports = true;
        assert!(flags.login_done());
    }
}
