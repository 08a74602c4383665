//! Component F: the user registry and fan-out engine.
//!
//! `UserCollection` is a nick-hash-keyed set with three cached
//! materialized broadcast strings (nick list, MyINFO batch, UserIP batch)
//! and a single send-all cache flushed once per tick (spec.md §3, §4.12).
//! This is the one genuinely sound pattern the design notes (§9) call out
//! to keep as-is: one buffer, appended to many times, flushed with one
//! syscall per recipient instead of N.

use crate::state::class::Class;
use crate::state::user::User;
use std::collections::HashMap;

#[derive(Debug, Default)]
pub struct CollectionCaches {
    pub keep_nick_list: bool,
    pub keep_myinfo_list: bool,
    pub keep_userip_list: bool,
    nick_list: Option<String>,
    op_list: Option<String>,
    myinfo_list: Option<String>,
    userip_list: Option<String>,
}

#[derive(Default)]
pub struct UserCollection {
    users: HashMap<u32, User>,
    by_connection: HashMap<u64, u32>,
    pub caches: CollectionCaches,
    /// Bytes appended by fan-out calls this tick; flushed to every member
    /// once at the end of the tick via `drain_send_all_cache`.
    send_all_cache: Vec<u8>,
    count_by_class: [u32; 8],
}

impl UserCollection {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, user: User) {
        if let Some(conn) = user.connection_id {
            self.by_connection.insert(conn, user.nick_hash);
        }
        self.count_by_class[user.class.as_u8() as usize] += 1;
        self.users.insert(user.nick_hash, user);
        self.invalidate_caches();
    }

    pub fn remove_by_hash(&mut self, hash: u32) -> Option<User> {
        let removed = self.users.remove(&hash);
        if let Some(ref u) = removed {
            if let Some(conn) = u.connection_id {
                self.by_connection.remove(&conn);
            }
            self.count_by_class[u.class.as_u8() as usize] -= 1;
            self.invalidate_caches();
        }
        removed
    }

    pub fn contains_hash(&self, hash: u32) -> bool {
        self.users.contains_key(&hash)
    }

    pub fn get(&self, hash: u32) -> Option<&User> {
        self.users.get(&hash)
    }

    pub fn get_mut(&mut self, hash: u32) -> Option<&mut User> {
        self.users.get_mut(&hash)
    }

    pub fn get_by_connection(&self, conn: u64) -> Option<&User> {
        self.by_connection.get(&conn).and_then(|h| self.users.get(h))
    }

    pub fn get_by_nick(&self, nick: &str, case_insensitive: bool, strip_prefix: Option<&str>) -> Option<&User> {
        let hash = crate::util::hash::nick_hash(nick, case_insensitive, strip_prefix);
        self.get(hash)
    }

    pub fn len(&self) -> usize {
        self.users.len()
    }

    pub fn is_empty(&self) -> bool {
        self.users.is_empty()
    }

    pub fn count_for_class(&self, class: Class) -> u32 {
        self.count_by_class[class.as_u8() as usize]
    }

    pub fn total_count(&self) -> u32 {
        self.count_by_class.iter().sum()
    }

    pub fn iter(&self) -> impl Iterator<Item = &User> {
        self.users.values()
    }

    fn invalidate_caches(&mut self) {
        self.caches.nick_list = None;
        self.caches.op_list = None;
        self.caches.myinfo_list = None;
        self.caches.userip_list = None;
    }

    /// `$NickList nick$$nick$$...$$|` materialized once and reused for
    /// every login until the membership changes.
    pub fn nick_list(&mut self, separator: &str) -> &str {
        if self.caches.nick_list.is_none() {
            let mut s = String::from("$NickList ");
            for u in self.users.values().filter(|u| u.in_list) {
                s.push_str(&u.nick);
                s.push_str(separator);
            }
            s.push('|');
            self.caches.nick_list = Some(s);
        }
        self.caches.nick_list.as_deref().unwrap_or_default()
    }

    /// `$OpList nick$$nick$$...$|` of every member at operator class or above.
    pub fn op_list(&mut self, separator: &str) -> &str {
        if self.caches.op_list.is_none() {
            let mut s = String::from("$OpList ");
            for u in self.users.values().filter(|u| u.class.is_operator_or_above()) {
                s.push_str(&u.nick);
                s.push_str(separator);
            }
            s.push('|');
            self.caches.op_list = Some(s);
        }
        self.caches.op_list.as_deref().unwrap_or_default()
    }

    /// A pipe-separated batch of every member's MyINFO line.
    pub fn myinfo_batch(&mut self) -> &str {
        if self.caches.myinfo_list.is_none() {
            let mut s = String::new();
            for u in self.users.values() {
                s.push_str(&crate::proto::chunks::rebuild(
                    crate::proto::CommandKind::MyInfo,
                    &u.myinfo.as_chunks(&u.nick),
                ));
                s.push('|');
            }
            self.caches.myinfo_list = Some(s);
        }
        self.caches.myinfo_list.as_deref().unwrap_or_default()
    }

    /// `$UserIP nick ip$$nick ip$$...$` batch.
    pub fn userip_batch(&mut self) -> &str {
        if self.caches.userip_list.is_none() {
            let mut s = String::from("$UserIP ");
            for u in self.users.values() {
                if let Some(ip) = u.ip {
                    s.push_str(&format!("{} {}$$", u.nick, ip));
                }
            }
            self.caches.userip_list = Some(s);
        }
        self.caches.userip_list.as_deref().unwrap_or_default()
    }

    // ---- Fan-out primitives (spec.md §4.12) ----
    //
    // These only decide WHO receives a payload, returning the matching
    // connection ids (or accumulating into the send-all cache); the
    // actual write into each connection's flush buffer happens in the
    // server loop, which is the only place that owns both this
    // collection and the connection table.

    pub fn append_to_cache(&mut self, data: &[u8]) {
        self.send_all_cache.extend_from_slice(data);
    }

    /// Take and clear the accumulated send-all cache along with every
    /// current member's connection id — called exactly once per tick.
    pub fn drain_send_all_cache(&mut self) -> (Vec<u8>, Vec<u64>) {
        let payload = std::mem::take(&mut self.send_all_cache);
        let targets = self.users.values().filter_map(|u| u.connection_id).collect();
        (payload, targets)
    }

    pub fn connections_with_class_range(&self, min: Class, max: Class) -> Vec<u64> {
        self.users
            .values()
            .filter(|u| u.class >= min && u.class <= max)
            .filter_map(|u| u.connection_id)
            .collect()
    }

    pub fn connections_with_feature(&self, bit: u32) -> Vec<u64> {
        self.users
            .values()
            .filter(|u| u.features & bit != 0)
            .filter_map(|u| u.connection_id)
            .collect()
    }

    pub fn connections_with_my_flag(&self, bit: u32, present: bool) -> Vec<u64> {
        self.users
            .values()
            .filter(|u| (u.my_flags & bit != 0) == present)
            .filter_map(|u| u.connection_id)
            .collect()
    }

    pub fn connections_with_class_and_feature(&self, min: Class, max: Class, bit: u32) -> Vec<u64> {
        self.users
            .values()
            .filter(|u| u.class >= min && u.class <= max && u.features & bit != 0)
            .filter_map(|u| u.connection_id)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::user::{MyInfo, Restrictions};

    fn user(nick: &str, class: Class, conn: u64) -> User {
        User {
            nick: nick.to_string(),
            nick_hash: crate::util::hash::nick_hash(nick, true, None),
            class,
            myinfo: MyInfo::default(),
            ext_json: None,
            registered: false,
            restrictions: Restrictions::default(),
            in_list: true,
            chat_enabled: true,
            connection_id: Some(conn),
            ip: None,
            features: 0,
            my_flags: 0,
        }
    }

    #[test]
    fn counts_track_class_totals() {
        let mut coll = UserCollection::new();
        coll.insert(user("alice", Class::NormUser, 1));
        coll.insert(user("bob", Class::Operator, 2));
        assert_eq!(coll.count_for_class(Class::NormUser), 1);
        assert_eq!(coll.count_for_class(Class::Operator), 1);
        assert_eq!(coll.total_count(), 2);
        coll.remove_by_hash(crate::util::hash::nick_hash("alice", true, None));
        assert_eq!(coll.count_for_class(Class::NormUser), 0);
        assert_eq!(coll.total_count(), 1);
    }

    #[test]
    fn nick_list_cache_invalidated_on_membership_change() {
        let mut coll = UserCollection::new();
        coll.insert(user("alice", Class::NormUser, 1));
        let l1 = coll.nick_list("$$").to_string();
        assert!(l1.contains("alice"));
        coll.insert(user("bob", Class::NormUser, 2));
        let l2 = coll.nick_list("$$").to_string();
        assert!(l2.contains("bob"));
        assert_ne!(l1, l2);
    }

    #[test]
    fn send_all_cache_drains_exactly_once() {
        let mut coll = UserCollection::new();
        coll.insert(user("alice", Class::NormUser, 1));
        coll.insert(user("bob", Class::NormUser, 2));
        coll.append_to_cache(b"<alice> hi|");
        let (payload, targets) = coll.drain_send_all_cache();
        assert_eq!(payload, b"<alice> hi|");
        assert_eq!(targets.len(), 2);
        let (payload2, _) = coll.drain_send_all_cache();
        assert!(payload2.is_empty());
    }

    #[test]
    fn class_range_filter_excludes_out_of_range() {
        let mut coll = UserCollection::new();
        coll.insert(user("alice", Class::NormUser, 1));
        coll.insert(user("op", Class::Operator, 2));
        let targets = coll.connections_with_class_range(Class::Operator, Class::Master);
        assert_eq!(targets, vec![2]);
    }
}
