//! Error taxonomy for the hub core.
//!
//! Kinds, not exhaustive causes: every local error maps to one of the
//! actions described in spec.md §7 (close with reason, report, drop,
//! ban). Errors never propagate past the connection that caused them.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum HubError {
    #[error("protocol parse error: {0}")]
    ProtocolParse(String),

    #[error("login timeout in phase {phase}")]
    LoginTimeout { phase: &'static str },

    #[error("admission denied: {0}")]
    AdmissionDenied(String),

    #[error("flood limit exceeded for {kind}")]
    Flood { kind: &'static str },

    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),

    #[error("output buffer overflow ({size} bytes)")]
    BufferOverflow { size: usize },

    #[error("database error: {0}")]
    Db(#[from] rusqlite::Error),

    #[error("config error: {0}")]
    Config(String),
}

pub type HubResult<T> = Result<T, HubError>;

/// Reason a connection was closed, attached to the disconnect log line and
/// (where relevant) surfaced to the client before the socket goes away.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CloseReason {
    Quit,
    ProtocolError(String),
    Timeout(&'static str),
    BufferOverflow,
    Banned(String),
    Kicked(String),
    Flood(&'static str),
    ForceMove(String),
    ServerShutdown,
}

impl std::fmt::Display for CloseReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CloseReason::Quit => write!(f, "quit"),
            CloseReason::ProtocolError(s) => write!(f, "protocol error: {s}"),
            CloseReason::Timeout(phase) => write!(f, "timeout in {phase}"),
            CloseReason::BufferOverflow => write!(f, "output buffer overflow"),
            CloseReason::Banned(reason) => write!(f, "banned: {reason}"),
            CloseReason::Kicked(reason) => write!(f, "kicked: {reason}"),
            CloseReason::Flood(kind) => write!(f, "flood: {kind}"),
            CloseReason::ForceMove(url) => write!(f, "redirected to {url}"),
            CloseReason::ServerShutdown => write!(f, "server shutdown"),
        }
    }
}
