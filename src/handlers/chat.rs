//! Component I (chat half): main chat, `$To:` private chat, `$MCTo:`
//! (spec.md §4.6).

use crate::state::class::Class;
use crate::state::user::User;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChatError {
    Gagged,
    DestinationOffline,
    ClassDifferenceTooLarge,
}

/// Formats a main-chat line for fan-out, per the canonical wire form
/// `<<nick>> <body>`.
pub fn format_main_chat(nick: &str, body: &str) -> String {
    format!("<{nick}> {body}|")
}

/// Formats a `$To:` private chat line.
pub fn format_to(to: &str, from: &str, body: &str) -> String {
    format!("$To: {to} From: {from} $<{from}> {body}|")
}

/// Formats an `$MCTo:` private-main-chat line.
pub fn format_mcto(to: &str, from: &str, body: &str) -> String {
    format!("$MCTo: {to} $<{from}> {body}|")
}

/// `classdif_pm`: sender class must not be below destination class by more
/// than `max_class_diff` (spec.md §4.6).
pub fn check_class_diff(sender: Class, destination: Class, max_class_diff: u8) -> Result<(), ChatError> {
    let sender_u8 = sender.as_u8();
    let dest_u8 = destination.as_u8();
    if dest_u8 > sender_u8 && dest_u8 - sender_u8 > max_class_diff {
        return Err(ChatError::ClassDifferenceTooLarge);
    }
    Ok(())
}

/// Shared entry check for both main chat and PM sends.
pub fn check_can_send(sender: &User, now: std::time::Instant) -> Result<(), ChatError> {
    if sender.restrictions.is_gagged(now) {
        return Err(ChatError::Gagged);
    }
    Ok(())
}
