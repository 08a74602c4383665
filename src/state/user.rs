//! The post-login identity for a connection (spec.md §3 "User").

use crate::state::class::Class;
use std::time::Instant;

/// Client network mode extracted from the MyINFO tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NetMode {
    Active,
    Passive,
    Sock5,
}

/// Values parsed out of the bracketed tag inside a MyINFO description,
/// e.g. `<++ V:0.868,M:A,H:1/0/0,S:3>`.
#[derive(Debug, Clone, Default)]
pub struct Tag {
    pub client_name: String,
    pub client_version: String,
    pub mode: Option<NetMode>,
    pub hubs_reg: u32,
    pub hubs_op: u32,
    pub hubs_unreg: u32,
    pub slots: u32,
}

/// A MyINFO payload, kept in both the full and "basic" (redacted) forms
/// because different recipients see different levels of detail
/// (spec.md §3, §4.5).
#[derive(Debug, Clone, Default)]
pub struct MyInfo {
    pub description: String,
    pub tag: Tag,
    pub speed: String,
    pub email: String,
    pub share: u64,
}

impl MyInfo {
    /// The wire-form chunk set (nick is supplied by the caller since it's
    /// stored on `User`, not duplicated here).
    pub fn as_chunks(&self, nick: &str) -> Vec<String> {
        vec![
            nick.to_string(),
            self.description.clone(),
            self.speed.clone(),
            self.email.clone(),
            self.share.to_string(),
        ]
    }

    /// A redacted variant with description/email/speed blanked, used for
    /// recipients that shouldn't see full profile detail per config.
    pub fn basic(&self) -> MyInfo {
        MyInfo {
            description: String::new(),
            tag: self.tag.clone(),
            speed: String::new(),
            email: String::new(),
            share: self.share,
        }
    }
}

/// Per-user timed restrictions (spec.md §3: "gag/no-PM/no-search/no-CTM
/// expiry timestamps").
#[derive(Debug, Clone, Default)]
pub struct Restrictions {
    pub gag_until: Option<Instant>,
    pub no_pm_until: Option<Instant>,
    pub no_search_until: Option<Instant>,
    pub no_ctm_until: Option<Instant>,
}

impl Restrictions {
    pub fn is_gagged(&self, now: Instant) -> bool {
        self.gag_until.is_some_and(|t| now < t)
    }
    pub fn cannot_pm(&self, now: Instant) -> bool {
        self.no_pm_until.is_some_and(|t| now < t)
    }
    pub fn cannot_search(&self, now: Instant) -> bool {
        self.no_search_until.is_some_and(|t| now < t)
    }
    pub fn cannot_ctm(&self, now: Instant) -> bool {
        self.no_ctm_until.is_some_and(|t| now < t)
    }
}

#[derive(Debug, Clone)]
pub struct User {
    pub nick: String,
    pub nick_hash: u32,
    pub class: Class,
    pub myinfo: MyInfo,
    pub ext_json: Option<String>,
    pub registered: bool,
    pub restrictions: Restrictions,
    pub in_list: bool,
    pub chat_enabled: bool,
    /// `None` for bots/robots (spec.md §3: no underlying connection).
    pub connection_id: Option<u64>,
    pub ip: Option<std::net::Ipv4Addr>,
    /// Negotiated protocol feature bitset, mirrored from the connection at
    /// login so fan-out filtering (§4.12) doesn't need to cross-reference
    /// the connection table.
    pub features: u32,
    /// MyINFO status-byte flags (away, server, fireball, TLS, ...), used
    /// by `SendToAllWithMyFlag`/`WithoutMyFlag` (§4.12).
    pub my_flags: u32,
}

impl User {
    pub fn is_bot(&self) -> bool {
        self.connection_id.is_none()
    }

    pub fn share(&self) -> u64 {
        self.myinfo.share
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn basic_myinfo_redacts_description_and_email() {
        let full = MyInfo {
            description: "hello".into(),
            tag: Tag::default(),
            speed: "100".into(),
            email: "a@b.c".into(),
            share: 42,
        };
        let basic = full.basic();
        assert!(basic.description.is_empty());
        assert!(basic.email.is_empty());
        assert_eq!(basic.share, 42);
    }

    #[test]
    fn restrictions_expire() {
        let now = Instant::now();
        let r = Restrictions {
            gag_until: Some(now + std::time::Duration::from_secs(10)),
            ..Default::default()
        };
        assert!(r.is_gagged(now));
        assert!(!r.is_gagged(now + std::time::Duration::from_secs(20)));
    }
}
