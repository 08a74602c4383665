use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ParseError {
    #[error("line exceeds max length ({0} bytes)")]
    TooLong(usize),
    #[error("empty line")]
    Empty,
    #[error("missing required chunk {0} for command {1}")]
    MissingChunk(usize, &'static str),
    #[error("malformed chunk: {0}")]
    Malformed(String),
}
