//! Main-chat fan-out: a message from one logged-in user reaches another.

mod common;

use common::TestServer;
use std::time::Duration;

#[test]
fn main_chat_reaches_other_users() {
    let server = TestServer::spawn(17_112).expect("failed to spawn test server");
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

    alice.chat("hello from alice").expect("chat send failed");

    let seen = bob
        .recv_until(Duration::from_secs(3), |l| l.contains("hello from alice"))
        .expect("bob never saw alice's chat line");

    assert!(seen.iter().any(|l| l == "<alice> hello from alice"));
}

#[test]
fn private_message_reaches_only_the_addressee() {
    let server = TestServer::spawn(17_113).expect("failed to spawn test server");
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

    alice.pm("bob", "secret message").expect("pm send failed");

    let seen = bob
        .recv_until(Duration::from_secs(3), |l| l.contains("secret message"))
        .expect("bob never received the pm");
    assert!(seen.iter().any(|l| l.contains("$To: bob From: alice")));
}
