//! Named default constants pulled out of the `Default` impls in
//! `types.rs`/`limits.rs` for places that need a bare constant rather than
//! a whole config struct (e.g. a `match` arm's fallback).
#![allow(dead_code)]

pub const DEFAULT_LISTEN_PORT: u16 = 4111;
pub const DEFAULT_TIMER_CONN_PERIOD_SECS: u64 = 4;
pub const DEFAULT_ADV_CONN_CHOOSE_TIMEOUT_MS: u64 = 10;
