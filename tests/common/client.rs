//! A plain NMDC test client: no DC++ client behavior beyond what's needed
//! to drive a login and send/receive pipe-delimited commands.

use std::io::{BufRead, BufReader, Write};
use std::net::TcpStream;
use std::time::Duration;
use verlicore::proto::lock;

pub struct TestClient {
    reader: BufReader<TcpStream>,
    writer: TcpStream,
    pub nick: String,
}

impl TestClient {
    pub fn connect(address: &str, nick: &str) -> anyhow::Result<Self> {
        let stream = TcpStream::connect(address)?;
        stream.set_read_timeout(Some(Duration::from_secs(5)))?;
        let writer = stream.try_clone()?;
        Ok(Self {
            reader: BufReader::new(stream),
            writer,
            nick: nick.to_string(),
        })
    }

    /// Send a single NMDC command; appends the `|` terminator if missing.
    pub fn send_raw(&mut self, command: &str) -> anyhow::Result<()> {
        self.writer.write_all(command.as_bytes())?;
        if !command.ends_with('|') {
            self.writer.write_all(b"|")?;
        }
        self.writer.flush()?;
        Ok(())
    }

    /// Read one pipe-delimited command, blocking up to the stream's read
    /// timeout (set at connect time).
    pub fn recv_raw(&mut self) -> anyhow::Result<String> {
        let mut buf = Vec::new();
        self.reader.read_until(b'|', &mut buf)?;
        if buf.is_empty() {
            anyhow::bail!("connection closed");
        }
        if buf.last() == Some(&b'|') {
            buf.pop();
        }
        Ok(String::from_utf8_lossy(&buf).into_owned())
    }

    /// Like [`recv_raw`] but with a per-call timeout override.
    pub fn recv_timeout(&mut self, dur: Duration) -> anyhow::Result<String> {
        self.reader.get_ref().set_read_timeout(Some(dur))?;
        let result = self.recv_raw();
        let _ = self.reader.get_ref().set_read_timeout(Some(Duration::from_secs(5)));
        result
    }

    /// Read commands until `predicate` matches one, or `dur` elapses
    /// without a match.
    pub fn recv_until<F>(&mut self, dur: Duration, mut predicate: F) -> anyhow::Result<Vec<String>>
    where
        F: FnMut(&str) -> bool,
    {
        let deadline = std::time::Instant::now() + dur;
        let mut seen = Vec::new();
        loop {
            let remaining = deadline.saturating_duration_since(std::time::Instant::now());
            if remaining.is_zero() {
                anyhow::bail!("timed out waiting for matching command; saw {seen:?}");
            }
            let line = self.recv_timeout(remaining)?;
            let matched = predicate(&line);
            seen.push(line);
            if matched {
                return Ok(seen);
            }
        }
    }

    /// Drain whatever's already buffered without blocking for long.
    pub fn drain(&mut self) {
        while self.recv_timeout(Duration::from_millis(50)).is_ok() {}
    }

    /// Full NMDC login handshake for an unregistered guest: `$Lock` /
    /// `$Key` / `$ValidateNick` / `$Version` / `$Supports` / `$MyINFO`.
    pub fn login(&mut self) -> anyhow::Result<()> {
        let greeting = self.recv_raw()?;
        let lock_token = greeting
            .strip_prefix("$Lock ")
            .and_then(|rest| rest.split(' ').next())
            .ok_or_else(|| anyhow::anyhow!("expected $Lock greeting, got {greeting:?}"))?;
        let key = lock::lock_to_key(lock_token);

        self.send_raw(&format!("$Key {key}"))?;
        self.send_raw(&format!("$ValidateNick {}", self.nick))?;
        self.send_raw("$Version 1,0091")?;
        self.send_raw("$Supports NoGetINFO NoHello")?;
        self.send_raw(&format!(
            "$MyINFO $ALL {} <++ V:1.0.0,M:A,H:1/0/0,S:5>$ $100.0KiB\u{1}$0$",
            self.nick
        ))?;
        self.send_raw("$GetNickList")?;
        Ok(())
    }

    pub fn chat(&mut self, body: &str) -> anyhow::Result<()> {
        self.send_raw(&format!("<{}> {body}", self.nick))
    }

    pub fn pm(&mut self, to: &str, body: &str) -> anyhow::Result<()> {
        self.send_raw(&format!("$To: {to} From: {} $<{}> {body}", self.nick, self.nick))
    }
}
