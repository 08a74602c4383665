//! Component L: the plugin callback surface (OUT OF SCOPE per spec.md §3:
//! "Plugin ABI/scripting (the hub calls out to a plugin interface, but
//! plugin internals are excluded)"). `HubPlugin` is the interface the
//! core calls through; loading/unloading real plugins is out of scope.
//!
//! Callbacks must be synchronous (spec.md §5: "Plugin callbacks must be
//! synchronous"); a plugin needing to block does so on its own thread and
//! reports back via a command channel, which is likewise out of scope
//! here — only the synchronous call surface is implemented.

use crate::proto::Message;
use crate::state::user::User;

/// `false` from a veto-capable hook discards the event (spec.md §7
/// "Plugin veto"): the message is dropped as if it never arrived.
pub trait HubPlugin: Send {
    fn on_connect(&mut self, _ip: std::net::Ipv4Addr) {}

    fn on_first_myinfo(&mut self, _user: &User) {}

    /// Return `false` to veto delivery.
    fn on_chat(&mut self, _user: &User, _message: &Message) -> bool {
        true
    }

    /// Return `false` to veto delivery.
    fn on_pm(&mut self, _from: &User, _to: &str, _message: &Message) -> bool {
        true
    }

    /// Return `false` to veto delivery.
    fn on_search(&mut self, _user: &User, _message: &Message) -> bool {
        true
    }

    /// Return `false` to veto delivery.
    fn on_sr(&mut self, _message: &Message) -> bool {
        true
    }

    /// Return `false` to veto delivery.
    fn on_ctm(&mut self, _from: &User, _message: &Message) -> bool {
        true
    }

    fn on_ban(&mut self, _nick: &str, _reason: &str) {}

    fn on_flood_trigger(&mut self, _nick: &str, _bucket: &str) {}

    fn on_unload(&mut self) {}

    /// Reserved hook for unclassified/raw lines; documented but unwired
    /// per spec.md §9's open question on plugin ABI surface.
    fn on_unparsed_msg(&mut self, _raw: &str) {}
}

#[derive(Default)]
pub struct PluginRegistry {
    plugins: Vec<Box<dyn HubPlugin>>,
}

impl PluginRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, plugin: Box<dyn HubPlugin>) {
        self.plugins.push(plugin);
    }

    pub fn on_connect(&mut self, ip: std::net::Ipv4Addr) {
        for plugin in &mut self.plugins {
            plugin.on_connect(ip);
        }
    }

    pub fn on_first_myinfo(&mut self, user: &User) {
        for plugin in &mut self.plugins {
            plugin.on_first_myinfo(user);
        }
    }

    /// Runs every plugin's chat veto in order, short-circuiting as soon
    /// as one vetoes.
    pub fn on_chat(&mut self, user: &User, message: &Message) -> bool {
        self.plugins.iter_mut().all(|p| p.on_chat(user, message))
    }

    pub fn on_search(&mut self, user: &User, message: &Message) -> bool {
        self.plugins.iter_mut().all(|p| p.on_search(user, message))
    }

    pub fn on_ctm(&mut self, from: &User, message: &Message) -> bool {
        self.plugins.iter_mut().all(|p| p.on_ctm(from, message))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::class::Class;
    use crate::state::user::{MyInfo, Restrictions};

    struct Vetoer;
    impl HubPlugin for Vetoer {
        fn on_chat(&mut self, _user: &User, _message: &Message) -> bool {
            false
        }
    }

    fn test_user() -> User {
        User {
            nick: "alice".into(),
            nick_hash: 1,
            class: Class::NormUser,
            myinfo: MyInfo::default(),
            ext_json: None,
            registered: false,
            restrictions: Restrictions::default(),
            in_list: true,
            chat_enabled: true,
            connection_id: Some(1),
            ip: None,
            features: 0,
            my_flags: 0,
        }
    }

    #[test]
    fn a_single_veto_discards_the_event() {
        let mut registry = PluginRegistry::new();
        registry.register(Box::new(Vetoer));
        let msg = Message::parse("<alice> hi", &crate::config::limits::Limits::default()).unwrap();
        assert!(!registry.on_chat(&test_user(), &msg));
    }

    #[test]
    fn empty_registry_always_allows() {
        let mut registry = PluginRegistry::new();
        let msg = Message::parse("<alice> hi", &crate::config::limits::Limits::default()).unwrap();
        assert!(registry.on_chat(&test_user(), &msg));
    }
}
