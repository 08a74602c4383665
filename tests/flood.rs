//! Scenario S3 from spec.md §8: exceeding a flood bucket's rate limit
//! closes the connection once the configured action is `Drop`.

mod common;

use common::TestServer;
use std::time::Duration;

#[test]
fn ctm_flood_drops_the_connection() {
    let server = TestServer::spawn(17_115).expect("failed to spawn test server");
    let mut alice = server.connect("alice").expect("failed to connect alice");

    alice.login().expect("alice login failed");
    alice
        .recv_until(Duration::from_secs(3), |l| l.contains("Hub-Security"))
        .expect("alice never got her welcome");
    alice.drain();

    // Default ctm bucket: 10 messages per 10s, action = Drop.
    for _ in 0..15 {
        let _ = alice.send_raw("$ConnectToMe nobody 127.0.0.1:412");
    }

    let closed = (0..20).any(|_| alice.recv_timeout(Duration::from_millis(200)).is_err());
    assert!(closed, "connection should have been closed by the ctm flood rule");
}
