//! Operator command surface over PM (SPEC_FULL.md §7 supplement):
//! `+kick`, `+ban`, `+tempban`, `+unban`, `+topic`. Privileged PM commands
//! stand in for the console/config-editor that's an explicit Non-goal —
//! some control surface has to exist for bans/topic to be reachable.

use crate::state::class::Class;
use std::time::Duration;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OpCommand {
    Kick { nick: String, reason: String },
    Ban { nick: String, reason: String },
    TempBan { nick: String, duration: Duration, reason: String },
    UnBan { nick: String },
    Topic { text: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OpCommandError {
    NotAnOperator,
    NotACommand,
    MissingArgument,
    BadDuration,
}

const MIN_CLASS: Class = Class::Operator;

/// Parses a `+command arg...` PM body into an [`OpCommand`], rejecting
/// non-operators before even trying to parse (spec.md's general rule that
/// privileged commands are class-gated).
pub fn parse(body: &str, sender_class: Class) -> Result<OpCommand, OpCommandError> {
    if sender_class < MIN_CLASS {
        return Err(OpCommandError::NotAnOperator);
    }
    let body = body.trim();
    let Some(rest) = body.strip_prefix('+') else {
        return Err(OpCommandError::NotACommand);
    };
    let mut parts = rest.splitn(2, ' ');
    let cmd = parts.next().unwrap_or("");
    let args = parts.next().unwrap_or("").trim();

    match cmd {
        "kick" => {
            let (nick, reason) = split_nick_reason(args).ok_or(OpCommandError::MissingArgument)?;
            Ok(OpCommand::Kick { nick, reason })
        }
        "ban" => {
            let (nick, reason) = split_nick_reason(args).ok_or(OpCommandError::MissingArgument)?;
            Ok(OpCommand::Ban { nick, reason })
        }
        "tempban" => {
            let mut tb_parts = args.splitn(3, ' ');
            let nick = tb_parts.next().filter(|s| !s.is_empty()).ok_or(OpCommandError::MissingArgument)?;
            let secs_str = tb_parts.next().ok_or(OpCommandError::MissingArgument)?;
            let secs: u64 = secs_str.parse().map_err(|_| OpCommandError::BadDuration)?;
            let reason = tb_parts.next().unwrap_or("").to_string();
            Ok(OpCommand::TempBan {
                nick: nick.to_string(),
                duration: Duration::from_secs(secs),
                reason,
            })
        }
        "unban" => {
            let nick = args.split_whitespace().next().filter(|s| !s.is_empty()).ok_or(OpCommandError::MissingArgument)?;
            Ok(OpCommand::UnBan { nick: nick.to_string() })
        }
        "topic" => {
            if args.is_empty() {
                return Err(OpCommandError::MissingArgument);
            }
            Ok(OpCommand::Topic { text: args.to_string() })
        }
        _ => Err(OpCommandError::NotACommand),
    }
}

fn split_nick_reason(args: &str) -> Option<(String, String)> {
    if args.is_empty() {
        return None;
    }
    match args.split_once(' ') {
        Some((nick, reason)) => Some((nick.to_string(), reason.trim().to_string())),
        None => Some((args.to_string(), String::new())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn non_operator_is_rejected_before_parsing() {
        assert_eq!(parse("+kick spammer flooding", Class::NormUser), Err(OpCommandError::NotAnOperator));
    }

    #[test]
    fn kick_parses_nick_and_reason() {
        let cmd = parse("+kick spammer flooding the hub", Class::Operator).unwrap();
        assert_eq!(
            cmd,
            OpCommand::Kick { nick: "spammer".into(), reason: "flooding the hub".into() }
        );
    }

    #[test]
    fn tempban_parses_duration() {
        let cmd = parse("+tempban spammer 3600 repeat offender", Class::Operator).unwrap();
        assert_eq!(
            cmd,
            OpCommand::TempBan { nick: "spammer".into(), duration: Duration::from_secs(3600), reason: "repeat offender".into() }
        );
    }

    #[test]
    fn unknown_command_is_rejected() {
        assert_eq!(parse("+nonsense", Class::Master), Err(OpCommandError::NotACommand));
    }

    #[test]
    fn plain_chat_is_not_a_command() {
        assert_eq!(parse("hello there", Class::Master), Err(OpCommandError::NotACommand));
    }
}
