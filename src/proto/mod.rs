//! Component D: the NMDC protocol machine. Message framing by the pipe
//! delimiter, classification by command token, and table-driven
//! chunk-splitting, per spec.md §4.4.

pub mod chunks;
pub mod command;
pub mod error;
pub mod lock;
pub mod message;
pub mod scanner;

pub use command::CommandKind;
pub use error::ParseError;
pub use message::Message;
