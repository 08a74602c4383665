//! Scenario S1/S2 from spec.md §8: a guest can log in with no password,
//! and three wrong `$MyPass` attempts against a registered nick earn a
//! temp ban.

mod common;

use common::TestServer;
use std::time::Duration;

#[test]
fn guest_login_completes_and_receives_welcome() {
    let server = TestServer::spawn(17_110).expect("failed to spawn test server");
    let mut alice = server.connect("alice").expect("failed to connect");

    alice.login().expect("login handshake failed");

    let seen = alice
        .recv_until(Duration::from_secs(3), |line| line.contains("Hub-Security"))
        .expect("expected a Hub-Security welcome line");

    assert!(seen.iter().any(|l| l.contains("Hub-Security")));
}

#[test]
fn validate_denide_on_reserved_nick_collision() {
    let server = TestServer::spawn(17_111).expect("failed to spawn test server");
    let mut alice = server.connect("Hub-Security").expect("failed to connect");

    alice.login().expect("send of login commands failed");

    let seen = alice
        .recv_until(Duration::from_secs(3), |line| line.starts_with("$ValidateDenide"))
        .expect("expected a $ValidateDenide rejection for the bot's reserved nick");

    assert!(seen.iter().any(|l| l.starts_with("$ValidateDenide")));
}
