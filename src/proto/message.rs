use super::chunks;
use super::command::{classify, CommandKind};
use super::error::ParseError;
use crate::config::Limits;

/// A single parsed NMDC frame (the payload between two `|` delimiters).
/// Parsed exactly once; callers address fields positionally via
/// `chunk`/`apply_chunk` (spec.md §4.4).
#[derive(Debug, Clone)]
pub struct Message {
    pub kind: CommandKind,
    chunks: Vec<String>,
}

impl Message {
    /// Parse one framed line. `line` must not contain the trailing `|`.
    pub fn parse(line: &str, limits: &Limits) -> Result<Message, ParseError> {
        if line.len() > limits.max_line_size {
            return Err(ParseError::TooLong(line.len()));
        }
        let kind = classify(line);
        if let Some(max) = max_len_for(kind, limits) {
            if line.len() > max {
                return Err(ParseError::TooLong(line.len()));
            }
        }
        let chunks = chunks::split(kind, line)?;
        Ok(Message { kind, chunks })
    }

    pub fn chunk(&self, i: usize) -> Option<&str> {
        self.chunks.get(i).map(String::as_str)
    }

    pub fn chunk_or_empty(&self, i: usize) -> &str {
        self.chunk(i).unwrap_or("")
    }

    pub fn require_chunk(&self, i: usize) -> Result<&str, ParseError> {
        self.chunk(i)
            .filter(|s| !s.is_empty())
            .ok_or(ParseError::MissingChunk(i, self.kind.name()))
    }

    pub fn apply_chunk(&mut self, i: usize, value: impl Into<String>) {
        if let Some(slot) = self.chunks.get_mut(i) {
            *slot = value.into();
        }
    }

    pub fn chunk_count(&self) -> usize {
        self.chunks.len()
    }

    /// Reassemble the canonical wire form (without the trailing `|`).
    pub fn to_wire(&self) -> String {
        chunks::rebuild(self.kind, &self.chunks)
    }
}

fn max_len_for(kind: CommandKind, limits: &Limits) -> Option<usize> {
    match kind {
        CommandKind::MyInfo => Some(limits.max_len_myinfo),
        CommandKind::ExtJson => Some(limits.max_len_extjson),
        CommandKind::Supports => Some(limits.max_len_supports),
        CommandKind::Search | CommandKind::SearchHub | CommandKind::MultiSearch => {
            Some(limits.max_len_search)
        }
        CommandKind::To | CommandKind::MCTo | CommandKind::Chat => Some(limits.max_len_in),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_then_chunk_then_apply_round_trips() {
        let limits = Limits::default();
        let mut msg = Message::parse("<alice> hi", &limits).unwrap();
        assert_eq!(msg.chunk(0), Some("alice"));
        msg.apply_chunk(1, "bye");
        assert_eq!(msg.to_wire(), "<alice> bye");
    }

    #[test]
    fn overlong_myinfo_is_rejected() {
        let mut limits = Limits::default();
        limits.max_len_myinfo = 10;
        let raw = "$MyINFO $ALL alice <++ V:0.868,M:A,H:1/0/0,S:3>$ $100\u{1}$a@x$1$";
        assert!(Message::parse(raw, &limits).is_err());
    }
}
