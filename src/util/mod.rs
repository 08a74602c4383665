//! Component A: time & hash utilities.

pub mod clock;
pub mod hash;
pub mod template;
pub mod window;

pub use clock::Clock;
pub use hash::{casefold_nick, nick_hash};
pub use window::WindowCounter;
