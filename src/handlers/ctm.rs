//! Component I (CTM half): `$ConnectToMe`/`$RevConnectToMe` (spec.md §4.8).

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CtmOutcome {
    Relay,
    /// The declared address matches the hub's own listen address: the
    /// client doesn't actually want a peer connection.
    CtmToHub,
    DestinationOffline,
    DestinationIsBot,
    DestinationIsSelf,
    WrongMode,
}

/// Detects CTM-to-hub (spec.md §4.8: "the declared IP:port equals the
/// hub's listen address").
pub fn is_ctm_to_hub(declared_addr: &str, hub_addr: &str, hub_port: u16) -> bool {
    declared_addr == format!("{hub_addr}:{hub_port}")
}

pub fn classify_ctm(
    declared_addr: &str,
    hub_addr: &str,
    hub_port: u16,
    sender_nick: &str,
    dest_nick: &str,
    dest_online: bool,
    dest_is_bot: bool,
) -> CtmOutcome {
    if is_ctm_to_hub(declared_addr, hub_addr, hub_port) {
        return CtmOutcome::CtmToHub;
    }
    if sender_nick == dest_nick {
        return CtmOutcome::DestinationIsSelf;
    }
    if !dest_online {
        return CtmOutcome::DestinationOffline;
    }
    if dest_is_bot {
        return CtmOutcome::DestinationIsBot;
    }
    CtmOutcome::Relay
}

/// Passive-to-passive RCTM is an error the hub may hide (spec.md §4.8).
pub fn passive_to_passive_is_error(
    sender_mode: Option<crate::state::user::NetMode>,
    dest_mode: Option<crate::state::user::NetMode>,
) -> bool {
    use crate::state::user::NetMode::Passive;
    matches!(sender_mode, Some(Passive)) && matches!(dest_mode, Some(Passive))
}

/// The user-visible error text, or `None` when `hide_msg_badctm` should
/// suppress it entirely (spec.md §4.8).
pub fn error_message(outcome: CtmOutcome, hide_msg_badctm: bool) -> Option<&'static str> {
    if hide_msg_badctm {
        return None;
    }
    match outcome {
        CtmOutcome::Relay => None,
        CtmOutcome::CtmToHub => Some("You don't need to connect to the hub itself."),
        CtmOutcome::DestinationOffline => Some("The user you are trying to connect to is not online."),
        CtmOutcome::DestinationIsBot => Some("You cannot connect to a bot."),
        CtmOutcome::DestinationIsSelf => Some("You cannot connect to yourself."),
        CtmOutcome::WrongMode => Some("Connection mode mismatch."),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::user::NetMode;

    #[test]
    fn ctm_to_hub_is_detected() {
        assert!(is_ctm_to_hub("203.0.113.1:4111", "203.0.113.1", 4111));
        assert!(!is_ctm_to_hub("203.0.113.1:4112", "203.0.113.1", 4111));
    }

    #[test]
    fn classify_prefers_ctm_to_hub_over_other_checks() {
        let outcome = classify_ctm("203.0.113.1:4111", "203.0.113.1", 4111, "alice", "alice", true, false);
        assert_eq!(outcome, CtmOutcome::CtmToHub);
    }

    #[test]
    fn offline_destination_is_detected() {
        let outcome = classify_ctm("1.2.3.4:412", "203.0.113.1", 4111, "alice", "bob", false, false);
        assert_eq!(outcome, CtmOutcome::DestinationOffline);
    }

    #[test]
    fn passive_to_passive_is_flagged() {
        assert!(passive_to_passive_is_error(Some(NetMode::Passive), Some(NetMode::Passive)));
        assert!(!passive_to_passive_is_error(Some(NetMode::Active), Some(NetMode::Passive)));
    }

    #[test]
    fn hidden_errors_suppress_message() {
        assert_eq!(error_message(CtmOutcome::DestinationOffline, true), None);
        assert!(error_message(CtmOutcome::DestinationOffline, false).is_some());
    }
}
