//! Scenario S4 from spec.md §8: a passive search is relayed to every other
//! online user (so an active-mode peer can open the resulting
//! `$ConnectToMe`), not just the ones matching the query.

mod common;

use common::TestServer;
use std::time::Duration;

#[test]
fn passive_search_is_relayed_to_other_users() {
    let server = TestServer::spawn(17_114).expect("failed to spawn test server");
    let mut alice = server.connect("alice").expect("failed to connect alice");
    let mut bob = server.connect("bob").expect("failed to connect bob");

    alice.login().expect("alice login failed");
    bob.login().expect("bob login failed");
    alice
        .recv_until(Duration::from_secs(3), |l| l.contains("Hub-Security"))
        .expect("alice never got her welcome");
    bob.recv_until(Duration::from_secs(3), |l| l.contains("Hub-Security"))
        .expect("bob never got his welcome");
    alice.drain();
    bob.drain();

    alice
        .send_raw("$Search Hub:alice F?F?0?1?movie")
        .expect("search send failed");

    let seen = bob
        .recv_until(Duration::from_secs(3), |l| l.starts_with("$Search Hub:alice"))
        .expect("bob never received the relayed passive search");

    assert!(seen.iter().any(|l| l == "$Search Hub:alice F?F?0?1?movie"));
}
