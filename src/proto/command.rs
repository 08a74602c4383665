//! Command classification (spec.md §4.4). Order is chosen to match
//! frequency on a typical hub: chat and relay traffic dominate the wire,
//! handshake commands are rare after login, and administrative commands
//! rarer still.

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CommandKind {
    Chat,
    To,
    MCTo,
    Search,
    SearchHub,
    MultiSearch,
    SA,
    SP,
    SR,
    MyInfo,
    ConnectToMe,
    MultiConnectToMe,
    RevConnectToMe,
    Key,
    ValidateNick,
    Version,
    Supports,
    GetNickList,
    MyPass,
    Quit,
    BotInfo,
    GetInfo,
    UserIp,
    Kick,
    OpForceMove,
    Ban,
    TempBan,
    UnBan,
    GetBanList,
    WhoIp,
    GetTopic,
    SetTopic,
    MyIp,
    MyNick,
    Lock,
    In,
    MyHubUrl,
    ExtJson,
    Unknown,
}

impl CommandKind {
    /// Name used in flood-bucket bookkeeping and log lines.
    pub fn name(self) -> &'static str {
        match self {
            CommandKind::Chat => "chat",
            CommandKind::To => "to",
            CommandKind::MCTo => "mcto",
            CommandKind::Search => "search",
            CommandKind::SearchHub => "search",
            CommandKind::MultiSearch => "search",
            CommandKind::SA => "sa",
            CommandKind::SP => "sp",
            CommandKind::SR => "sr",
            CommandKind::MyInfo => "myinfo",
            CommandKind::ConnectToMe => "ctm",
            CommandKind::MultiConnectToMe => "ctm",
            CommandKind::RevConnectToMe => "ctm",
            CommandKind::Key => "key",
            CommandKind::ValidateNick => "validatenick",
            CommandKind::Version => "version",
            CommandKind::Supports => "supports",
            CommandKind::GetNickList => "getnicklist",
            CommandKind::MyPass => "mypass",
            CommandKind::Quit => "quit",
            CommandKind::BotInfo => "botinfo",
            CommandKind::GetInfo => "getinfo",
            CommandKind::UserIp => "userip",
            CommandKind::Kick => "kick",
            CommandKind::OpForceMove => "opforcemove",
            CommandKind::Ban => "ban",
            CommandKind::TempBan => "tempban",
            CommandKind::UnBan => "unban",
            CommandKind::GetBanList => "getbanlist",
            CommandKind::WhoIp => "whoip",
            CommandKind::GetTopic => "gettopic",
            CommandKind::SetTopic => "settopic",
            CommandKind::MyIp => "myip",
            CommandKind::MyNick => "mynick",
            CommandKind::Lock => "lock",
            CommandKind::In => "in",
            CommandKind::MyHubUrl => "myhuburl",
            CommandKind::ExtJson => "extjson",
            CommandKind::Unknown => "unknown",
        }
    }
}

/// Classify a single framed line (the bytes between two `|` delimiters,
/// delimiter already stripped) by its leading token.
pub fn classify(line: &str) -> CommandKind {
    if line.is_empty() {
        return CommandKind::In;
    }
    if line.starts_with('<') {
        return CommandKind::Chat;
    }
    if !line.starts_with('$') {
        return CommandKind::Unknown;
    }

    // Longest/most-specific prefixes first so e.g. "$Search Hub:" doesn't
    // get misclassified as plain "$Search ".
    const TABLE: &[(&str, CommandKind)] = &[
        ("$To:", CommandKind::To),
        ("$MCTo:", CommandKind::MCTo),
        ("$Search Hub:", CommandKind::SearchHub),
        ("$MultiSearch Hub:", CommandKind::SearchHub),
        ("$MultiSearch ", CommandKind::MultiSearch),
        ("$Search ", CommandKind::Search),
        ("$SA ", CommandKind::SA),
        ("$SP ", CommandKind::SP),
        ("$SR ", CommandKind::SR),
        ("$MyINFO", CommandKind::MyInfo),
        ("$MultiConnectToMe ", CommandKind::MultiConnectToMe),
        ("$ConnectToMe ", CommandKind::ConnectToMe),
        ("$RevConnectToMe ", CommandKind::RevConnectToMe),
        ("$Key ", CommandKind::Key),
        ("$ValidateNick ", CommandKind::ValidateNick),
        ("$Version ", CommandKind::Version),
        ("$Supports", CommandKind::Supports),
        ("$GetNickList", CommandKind::GetNickList),
        ("$MyPass ", CommandKind::MyPass),
        ("$Quit", CommandKind::Quit),
        ("$BotINFO ", CommandKind::BotInfo),
        ("$GetINFO ", CommandKind::GetInfo),
        ("$UserIP", CommandKind::UserIp),
        ("$Kick ", CommandKind::Kick),
        ("$OpForceMove ", CommandKind::OpForceMove),
        ("$TempBan ", CommandKind::TempBan),
        ("$Ban ", CommandKind::Ban),
        ("$UnBan ", CommandKind::UnBan),
        ("$GetBanList", CommandKind::GetBanList),
        ("$WhoIP", CommandKind::WhoIp),
        ("$GetTopic", CommandKind::GetTopic),
        ("$SetTopic ", CommandKind::SetTopic),
        ("$MyIP ", CommandKind::MyIp),
        ("$MyNick ", CommandKind::MyNick),
        ("$Lock ", CommandKind::Lock),
        ("$MyHubURL", CommandKind::MyHubUrl),
        ("$ExtJSON ", CommandKind::ExtJson),
    ];

    for (prefix, kind) in TABLE {
        if line.starts_with(prefix) {
            return *kind;
        }
    }
    CommandKind::Unknown
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classifies_chat() {
        assert_eq!(classify("<alice> hello"), CommandKind::Chat);
    }

    #[test]
    fn classifies_passive_search_before_active() {
        assert_eq!(
            classify("$Search Hub:alice F?F?0?1?movie"),
            CommandKind::SearchHub
        );
        assert_eq!(
            classify("$Search 1.2.3.4:412 F?F?0?1?movie"),
            CommandKind::Search
        );
    }

    #[test]
    fn empty_line_is_keepalive() {
        assert_eq!(classify(""), CommandKind::In);
    }

    #[test]
    fn unknown_for_garbage() {
        assert_eq!(classify("garbage line"), CommandKind::Unknown);
    }
}
