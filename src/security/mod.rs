pub mod bans;
pub mod flood;

pub use bans::{Ban, BanKind, BanStore, CloneTracker};
pub use flood::{ConnectionFloodState, FloodVerdict};
