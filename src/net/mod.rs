pub mod connection;
pub mod gateway;
pub mod myip;
pub mod reactor;
pub mod ticker;
pub mod zlib;

pub use connection::{CloseState, Connection, LoginFlagsSnapshot};
pub use gateway::Gateway;
pub use reactor::{ReadyMask, Reactor};
pub use ticker::Ticker;
pub use zlib::ZlibWriter;
