//! verlicore: a single-threaded, event-driven Direct Connect (NMDC) hub
//! server core.
//!
//! The crate is organized by the components in SPEC_FULL.md: protocol
//! parsing (`proto`), connection/session state (`state`), network plumbing
//! (`net`), ban/flood policy (`security`), persistence (`db`), and the
//! event loop that owns all of it (`server`). `main.rs` is a thin shell
//! around [`Server`] that only handles process-level concerns (CLI args,
//! config loading, logging setup).

pub mod config;
pub mod db;
pub mod error;
pub mod geo;
pub mod handlers;
pub mod metrics;
pub mod net;
pub mod plugins;
pub mod proto;
pub mod security;
pub mod server;
pub mod state;
pub mod util;

pub use config::Config;
pub use error::{CloseReason, HubError, HubResult};
pub use server::Server;
