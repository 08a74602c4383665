//! Integration test harness: spawns a real `verlicored` process and drives
//! it with plain NMDC clients over TCP.

#![allow(dead_code)]

pub mod client;
pub mod server;

pub use client::TestClient;
pub use server::TestServer;
