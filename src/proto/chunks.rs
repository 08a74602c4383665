//! Named chunk positions per command (spec.md §4.4). Splitting is
//! table-driven: each command defines where its fields sit in the raw
//! line so `Message::chunk`/`apply_chunk` can address them by position.

use super::command::CommandKind;
use super::error::ParseError;

pub const SR_FIELD_SEP: char = '\u{5}';

/// Split `line` (command-specific payload, i.e. everything after the
/// leading token has already been classified) into its named chunks.
pub fn split(kind: CommandKind, line: &str) -> Result<Vec<String>, ParseError> {
    match kind {
        CommandKind::Chat => split_chat(line),
        CommandKind::To => split_to(line, "$To:"),
        CommandKind::MCTo => split_to(line, "$MCTo:"),
        CommandKind::Search | CommandKind::MultiSearch => split_search(line, false),
        CommandKind::SearchHub => split_search(line, true),
        CommandKind::SA => split_space_prefixed(line, "$SA ", 2),
        CommandKind::SP => split_space_prefixed(line, "$SP ", 2),
        CommandKind::SR => split_sr(line),
        CommandKind::MyInfo => split_myinfo(line),
        CommandKind::ConnectToMe => split_ctm(line),
        CommandKind::MultiConnectToMe => split_ctm_prefixed(line, "$MultiConnectToMe "),
        CommandKind::RevConnectToMe => split_space_prefixed(line, "$RevConnectToMe ", 2),
        CommandKind::Key => split_rest(line, "$Key "),
        CommandKind::ValidateNick => split_rest(line, "$ValidateNick "),
        CommandKind::Version => split_rest(line, "$Version "),
        CommandKind::Supports => Ok(vec![line.strip_prefix("$Supports").unwrap_or(line).trim_start().to_string()]),
        CommandKind::GetNickList => Ok(vec![]),
        CommandKind::MyPass => split_rest(line, "$MyPass "),
        CommandKind::Quit => Ok(vec![line.strip_prefix("$Quit").unwrap_or(line).trim_start().to_string()]),
        CommandKind::BotInfo => split_rest(line, "$BotINFO "),
        CommandKind::GetInfo => split_space_prefixed(line, "$GetINFO ", 2),
        CommandKind::UserIp => Ok(vec![]),
        CommandKind::Kick => split_space_limited(line, "$Kick ", 2),
        CommandKind::OpForceMove => split_space_limited(line, "$OpForceMove ", 3),
        CommandKind::Ban => split_space_limited(line, "$Ban ", 2),
        CommandKind::TempBan => split_space_limited(line, "$TempBan ", 3),
        CommandKind::UnBan => split_rest(line, "$UnBan "),
        CommandKind::GetBanList => Ok(vec![]),
        CommandKind::WhoIp => Ok(vec![line.strip_prefix("$WhoIP").unwrap_or(line).trim_start().to_string()]),
        CommandKind::GetTopic => Ok(vec![]),
        CommandKind::SetTopic => split_rest(line, "$SetTopic "),
        CommandKind::MyIp => split_space_prefixed(line, "$MyIP ", 2),
        CommandKind::MyNick => split_rest(line, "$MyNick "),
        CommandKind::Lock => split_rest(line, "$Lock "),
        CommandKind::In => Ok(vec![]),
        CommandKind::MyHubUrl => Ok(vec![line.strip_prefix("$MyHubURL").unwrap_or(line).trim_start().to_string()]),
        CommandKind::ExtJson => split_rest(line, "$ExtJSON "),
        CommandKind::Unknown => Ok(vec![line.to_string()]),
    }
}

/// Rebuild the canonical wire form (without the trailing `|`) from a
/// command kind and its chunks. `Message::to_wire` is the only consumer.
pub fn rebuild(kind: CommandKind, chunks: &[String]) -> String {
    let get = |i: usize| chunks.get(i).map(String::as_str).unwrap_or("");
    match kind {
        CommandKind::Chat => format!("<{}> {}", get(0), get(1)),
        CommandKind::To => format!("$To: {} From: {} $<{}> {}", get(0), get(1), get(1), get(2)),
        CommandKind::MCTo => format!("$MCTo: {} $<{}> {}", get(0), get(1), get(2)),
        CommandKind::Search => format!("$Search {} {}", get(0), chunks[1..].join("?")),
        CommandKind::MultiSearch => format!("$MultiSearch {} {}", get(0), chunks[1..].join("?")),
        CommandKind::SearchHub => format!("$Search Hub:{} {}", get(0), chunks[1..].join("?")),
        CommandKind::SA => format!("$SA {} {}", get(0), get(1)),
        CommandKind::SP => format!("$SP {} {}", get(0), get(1)),
        CommandKind::SR => format!(
            "$SR {} {}{}{} {}/{}{}{} ({}){}{}",
            get(0),
            get(1),
            SR_FIELD_SEP,
            get(2),
            get(3),
            get(4),
            SR_FIELD_SEP,
            get(5),
            get(6),
            SR_FIELD_SEP,
            get(7)
        ),
        CommandKind::MyInfo => format!(
            "$MyINFO $ALL {} {}$ ${}\u{1}${}${}$",
            get(0),
            get(1),
            get(2),
            get(3),
            get(4)
        ),
        CommandKind::ConnectToMe => format!("$ConnectToMe {} {}:{}{}", get(0), get(1), get(2), get(3)),
        CommandKind::MultiConnectToMe => {
            format!("$MultiConnectToMe {} {}:{}{}", get(0), get(1), get(2), get(3))
        }
        CommandKind::RevConnectToMe => format!("$RevConnectToMe {} {}", get(0), get(1)),
        CommandKind::Key => format!("$Key {}", get(0)),
        CommandKind::ValidateNick => format!("$ValidateNick {}", get(0)),
        CommandKind::Version => format!("$Version {}", get(0)),
        CommandKind::Supports => format!("$Supports {}", get(0)),
        CommandKind::GetNickList => "$GetNickList".to_string(),
        CommandKind::MyPass => format!("$MyPass {}", get(0)),
        CommandKind::Quit => format!("$Quit {}", get(0)),
        CommandKind::BotInfo => format!("$BotINFO {}", get(0)),
        CommandKind::GetInfo => format!("$GetINFO {} {}", get(0), get(1)),
        CommandKind::UserIp => "$UserIP".to_string(),
        CommandKind::Kick => format!("$Kick {} {}", get(0), get(1)),
        CommandKind::OpForceMove => format!("$OpForceMove {} {} {}", get(0), get(1), get(2)),
        CommandKind::Ban => format!("$Ban {} {}", get(0), get(1)),
        CommandKind::TempBan => format!("$TempBan {} {} {}", get(0), get(1), get(2)),
        CommandKind::UnBan => format!("$UnBan {}", get(0)),
        CommandKind::GetBanList => "$GetBanList".to_string(),
        CommandKind::WhoIp => format!("$WhoIP {}", get(0)),
        CommandKind::GetTopic => "$GetTopic".to_string(),
        CommandKind::SetTopic => format!("$SetTopic {}", get(0)),
        CommandKind::MyIp => format!("$MyIP {} {}", get(0), get(1)),
        CommandKind::MyNick => format!("$MyNick {}", get(0)),
        CommandKind::Lock => format!("$Lock {}", get(0)),
        CommandKind::In => String::new(),
        CommandKind::MyHubUrl => format!("$MyHubURL {}", get(0)),
        CommandKind::ExtJson => format!("$ExtJSON {}", get(0)),
        CommandKind::Unknown => get(0).to_string(),
    }
}

fn split_chat(line: &str) -> Result<Vec<String>, ParseError> {
    let rest = line.strip_prefix('<').ok_or_else(|| ParseError::Malformed("chat missing '<'".into()))?;
    let close = rest.find('>').ok_or_else(|| ParseError::Malformed("chat missing '>'".into()))?;
    let nick = &rest[..close];
    let body = rest[close + 1..].trim_start();
    Ok(vec![nick.to_string(), body.to_string()])
}

fn split_to(line: &str, prefix: &str) -> Result<Vec<String>, ParseError> {
    let rest = line.strip_prefix(prefix).unwrap_or(line).trim_start();
    let (to, rest) = rest
        .split_once(" From: ")
        .ok_or_else(|| ParseError::Malformed("missing 'From:'".into()))?;
    let (from, rest) = rest
        .split_once(' ')
        .ok_or_else(|| ParseError::Malformed("missing from-nick".into()))?;
    let body = rest.strip_prefix(&format!("$<{from}> ")).unwrap_or(rest);
    Ok(vec![to.to_string(), from.to_string(), body.to_string()])
}

fn split_search(line: &str, hub: bool) -> Result<Vec<String>, ParseError> {
    let (dest, tail) = if hub {
        let after_hub = line
            .splitn(2, "Hub:")
            .nth(1)
            .ok_or_else(|| ParseError::Malformed("passive search missing 'Hub:'".into()))?;
        after_hub
            .split_once(' ')
            .ok_or_else(|| ParseError::Malformed("passive search missing tail".into()))?
    } else {
        let without_cmd = line
            .split_once(' ')
            .ok_or_else(|| ParseError::Malformed("search missing destination".into()))?
            .1;
        without_cmd
            .split_once(' ')
            .ok_or_else(|| ParseError::Malformed("search missing tail".into()))?
    };
    let mut chunks = vec![dest.to_string()];
    chunks.extend(tail.split('?').map(str::to_string));
    Ok(chunks)
}

fn split_sr(line: &str) -> Result<Vec<String>, ParseError> {
    let rest = line.strip_prefix("$SR ").unwrap_or(line);
    let parts: Vec<&str> = rest.split(SR_FIELD_SEP).collect();
    if parts.len() != 3 {
        return Err(ParseError::Malformed("SR needs 3 field-separator groups".into()));
    }
    let (from, file) = parts[0]
        .split_once(' ')
        .ok_or_else(|| ParseError::Malformed("SR missing from/file".into()))?;
    let (size, rest2) = parts[1]
        .split_once(' ')
        .ok_or_else(|| ParseError::Malformed("SR missing size".into()))?;
    let (free_total, hub) = (rest2, parts[2]);
    let (free, total) = free_total
        .split_once('/')
        .ok_or_else(|| ParseError::Malformed("SR missing free/total".into()))?;
    let host_port_start = hub.find('(').ok_or_else(|| ParseError::Malformed("SR missing host".into()))?;
    let host_port_end = hub.find(')').ok_or_else(|| ParseError::Malformed("SR missing host".into()))?;
    let hub_name = hub[..host_port_start].trim_end();
    let host_port = &hub[host_port_start + 1..host_port_end];
    let to = hub[host_port_end + 1..].trim_start_matches(SR_FIELD_SEP);
    Ok(vec![
        from.to_string(),
        file.to_string(),
        size.to_string(),
        free.to_string(),
        total.to_string(),
        hub_name.to_string(),
        host_port.to_string(),
        to.to_string(),
    ])
}

fn split_myinfo(line: &str) -> Result<Vec<String>, ParseError> {
    let rest = line
        .strip_prefix("$MyINFO $ALL ")
        .or_else(|| line.strip_prefix("$MyINFO "))
        .ok_or_else(|| ParseError::Malformed("MyINFO missing header".into()))?;
    let (nick, rest) = rest
        .split_once(' ')
        .ok_or_else(|| ParseError::Malformed("MyINFO missing nick".into()))?;
    let (description, rest) = rest
        .split_once("$ $")
        .ok_or_else(|| ParseError::Malformed("MyINFO missing speed separator".into()))?;
    let (speed, rest) = rest
        .split_once('\u{1}')
        .ok_or_else(|| ParseError::Malformed("MyINFO missing speed byte".into()))?;
    let mut fields = rest.splitn(3, '$');
    let email = fields.next().unwrap_or("").to_string();
    let share = fields.next().unwrap_or("").to_string();
    Ok(vec![nick.to_string(), description.to_string(), speed.to_string(), email, share])
}

fn split_ctm(line: &str) -> Result<Vec<String>, ParseError> {
    split_ctm_prefixed(line, "$ConnectToMe ")
}

fn split_ctm_prefixed(line: &str, prefix: &str) -> Result<Vec<String>, ParseError> {
    let rest = line.strip_prefix(prefix).unwrap_or(line);
    let (to, addr) = rest
        .split_once(' ')
        .ok_or_else(|| ParseError::Malformed("CTM missing address".into()))?;
    let (ip, port_mode) = addr
        .split_once(':')
        .ok_or_else(|| ParseError::Malformed("CTM missing ':'".into()))?;
    let split_at = port_mode.find(|c: char| !c.is_ascii_digit()).unwrap_or(port_mode.len());
    let (port, mode) = port_mode.split_at(split_at);
    Ok(vec![to.to_string(), ip.to_string(), port.to_string(), mode.to_string()])
}

fn split_rest(line: &str, prefix: &str) -> Result<Vec<String>, ParseError> {
    Ok(vec![line.strip_prefix(prefix).unwrap_or(line).to_string()])
}

fn split_space_prefixed(line: &str, prefix: &str, n: usize) -> Result<Vec<String>, ParseError> {
    let rest = line.strip_prefix(prefix).unwrap_or(line);
    let parts: Vec<String> = rest.splitn(n, ' ').map(str::to_string).collect();
    if parts.len() < n {
        return Err(ParseError::Malformed(format!("expected {n} fields")));
    }
    Ok(parts)
}

fn split_space_limited(line: &str, prefix: &str, n: usize) -> Result<Vec<String>, ParseError> {
    let rest = line.strip_prefix(prefix).unwrap_or(line);
    let mut parts: Vec<String> = rest.splitn(n, ' ').map(str::to_string).collect();
    while parts.len() < n {
        parts.push(String::new());
    }
    Ok(parts)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn myinfo_round_trips_through_chunks() {
        let raw = "$MyINFO $ALL alice <++ V:0.868,M:A,H:1/0/0,S:3>$ $100\u{1}$alice@x$17179869184$";
        let chunks = split(CommandKind::MyInfo, raw).unwrap();
        assert_eq!(chunks[0], "alice");
        assert_eq!(chunks[2], "100");
        assert_eq!(chunks[3], "alice@x");
        assert_eq!(chunks[4], "17179869184");
        assert_eq!(rebuild(CommandKind::MyInfo, &chunks), raw);
    }

    #[test]
    fn search_active_splits_tail_by_question_mark() {
        let chunks = split(CommandKind::Search, "$Search 1.2.3.4:412 F?F?0?1?movie").unwrap();
        assert_eq!(chunks, vec!["1.2.3.4:412", "F", "F", "0", "1", "movie"]);
    }

    #[test]
    fn search_passive_splits_destination() {
        let chunks = split(CommandKind::SearchHub, "$Search Hub:alice F?F?0?1?movie").unwrap();
        assert_eq!(chunks[0], "alice");
        assert_eq!(chunks[1..], vec!["F", "F", "0", "1", "movie"]);
    }

    #[test]
    fn sr_splits_all_fields() {
        let raw = "$SR bob file.zip\u{5}123 1/2\u{5}TestHub (1.2.3.4:411)\u{5}alice";
        let chunks = split(CommandKind::SR, raw).unwrap();
        assert_eq!(chunks[0], "bob");
        assert_eq!(chunks[1], "file.zip");
        assert_eq!(chunks[2], "123");
        assert_eq!(chunks[3], "1");
        assert_eq!(chunks[4], "2");
        assert_eq!(chunks[5], "TestHub");
        assert_eq!(chunks[6], "1.2.3.4:411");
        assert_eq!(chunks[7], "alice");
    }

    #[test]
    fn chat_splits_nick_and_body() {
        let chunks = split(CommandKind::Chat, "<alice> hello there").unwrap();
        assert_eq!(chunks, vec!["alice", "hello there"]);
    }

    #[test]
    fn apply_chunk_then_reparse_round_trips() {
        let raw = "<alice> hello";
        let mut chunks = split(CommandKind::Chat, raw).unwrap();
        chunks[1] = "edited body".to_string();
        let wire = rebuild(CommandKind::Chat, &chunks);
        let reparsed = split(CommandKind::Chat, &wire).unwrap();
        assert_eq!(reparsed[1], "edited body");
    }
}
