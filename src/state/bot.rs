//! Server-synthesized users with no underlying connection (spec.md §3
//! "Bot/robot"): the hub security nick, opchat nick, plugin presences.

use crate::state::class::Class;
use crate::state::user::{MyInfo, Restrictions, User};
use crate::util::hash::nick_hash;

pub fn make_bot(nick: &str, class: Class, description: &str, case_insensitive: bool) -> User {
    User {
        nick: nick.to_string(),
        nick_hash: nick_hash(nick, case_insensitive, None),
        class,
        myinfo: MyInfo {
            description: description.to_string(),
            ..Default::default()
        },
        ext_json: None,
        registered: true,
        restrictions: Restrictions::default(),
        in_list: true,
        chat_enabled: true,
        connection_id: None,
        ip: None,
        features: 0,
        my_flags: 0,
    }
}

/// The nick every hub-originated message (kick reasons, ban notices,
/// welcome text) is sent from, per spec.md's "hub security" bot (§7).
pub const HUB_SECURITY_NICK: &str = "Hub-Security";

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bot_has_no_connection() {
        let bot = make_bot(HUB_SECURITY_NICK, Class::Master, "hub security", true);
        assert!(bot.is_bot());
    }
}
