//! Component G: the ban/temp-ban store (spec.md §4.9).
//!
//! Ban matching consults four indices in order: exact-nick-temp,
//! exact-nick-perm, exact-IP-temp, IP-range-perm. Permanent bans may carry
//! host/share constraints, ANDed across every field that's set.

use ipnet::Ipv4Net;
use std::collections::HashMap;
use std::net::Ipv4Addr;
use std::time::Instant;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BanKind {
    Permanent,
    TempByNick,
    TempByIp,
    PasswordFail,
    CloneDetect,
    Flood,
}

#[derive(Debug, Clone)]
pub struct Ban {
    pub nick: Option<String>,
    pub ip: Option<Ipv4Addr>,
    pub ip_range: Option<Ipv4Net>,
    pub host: Option<String>,
    pub min_share: Option<u64>,
    pub reason: String,
    pub operator: String,
    pub kind: BanKind,
    pub start: Instant,
    /// `None` means "never expires" (spec.md §4.9: end=0).
    pub end: Option<Instant>,
}

impl Ban {
    pub fn is_expired(&self, now: Instant) -> bool {
        self.end.is_some_and(|end| now >= end)
    }

    fn matches_host_and_share(&self, host: Option<&str>, share: u64) -> bool {
        if let Some(ref h) = self.host {
            if host != Some(h.as_str()) {
                return false;
            }
        }
        if let Some(min) = self.min_share {
            if share < min {
                return false;
            }
        }
        true
    }
}

#[derive(Default)]
pub struct BanStore {
    nick_temp: HashMap<String, Ban>,
    nick_perm: HashMap<String, Ban>,
    ip_temp: HashMap<Ipv4Addr, Ban>,
    ip_range_perm: Vec<Ban>,
}

pub struct BanMatch<'a> {
    pub ban: &'a Ban,
}

impl BanStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, ban: Ban) {
        match (ban.kind, ban.nick.clone(), ban.ip, ban.ip_range) {
            (BanKind::Permanent, _, _, Some(range)) => {
                self.ip_range_perm.push(Ban { ip_range: Some(range), ..ban })
            }
            (_, Some(nick), _, _) if ban.end.is_some() => {
                self.nick_temp.insert(nick, ban);
            }
            (BanKind::Permanent, Some(nick), _, _) => {
                self.nick_perm.insert(nick, ban);
            }
            (_, _, Some(ip), _) if ban.end.is_some() => {
                self.ip_temp.insert(ip, ban);
            }
            (BanKind::Permanent, _, _, None) => {
                self.ip_range_perm.push(ban);
            }
            _ => {
                // No indexable key: drop rather than silently corrupt an index.
            }
        }
    }

    /// Operators with class >= ban_bypass_class are exempt; that check is
    /// the caller's responsibility (it needs the Class, not owned here).
    pub fn check(
        &self,
        now: Instant,
        nick: &str,
        ip: Ipv4Addr,
        host: Option<&str>,
        share: u64,
    ) -> Option<BanMatch<'_>> {
        if let Some(ban) = self.nick_temp.get(nick) {
            if !ban.is_expired(now) {
                return Some(BanMatch { ban });
            }
        }
        if let Some(ban) = self.nick_perm.get(nick) {
            if ban.matches_host_and_share(host, share) {
                return Some(BanMatch { ban });
            }
        }
        if let Some(ban) = self.ip_temp.get(&ip) {
            if !ban.is_expired(now) {
                return Some(BanMatch { ban });
            }
        }
        for ban in &self.ip_range_perm {
            if let Some(range) = ban.ip_range {
                if range.contains(&ip) && ban.matches_host_and_share(host, share) {
                    return Some(BanMatch { ban });
                }
            }
        }
        None
    }

    /// Periodic sweep (spec.md §4.9: "a periodic sweep removes expired
    /// entries"), called once per tick by the ticker (component K).
    pub fn sweep(&mut self, now: Instant) -> usize {
        let before = self.nick_temp.len() + self.ip_temp.len();
        self.nick_temp.retain(|_, b| !b.is_expired(now));
        self.ip_temp.retain(|_, b| !b.is_expired(now));
        before - (self.nick_temp.len() + self.ip_temp.len())
    }

    pub fn temp_ban_nick(&mut self, nick: &str, reason: &str, operator: &str, kind: BanKind, now: Instant, ttl: std::time::Duration) {
        self.nick_temp.insert(
            nick.to_string(),
            Ban {
                nick: Some(nick.to_string()),
                ip: None,
                ip_range: None,
                host: None,
                min_share: None,
                reason: reason.to_string(),
                operator: operator.to_string(),
                kind,
                start: now,
                end: Some(now + ttl),
            },
        );
    }

    pub fn temp_ban_ip(&mut self, ip: Ipv4Addr, reason: &str, operator: &str, kind: BanKind, now: Instant, ttl: std::time::Duration) {
        self.ip_temp.insert(
            ip,
            Ban {
                nick: None,
                ip: Some(ip),
                ip_range: None,
                host: None,
                min_share: None,
                reason: reason.to_string(),
                operator: operator.to_string(),
                kind,
                start: now,
                end: Some(now + ttl),
            },
        );
    }

    pub fn unban_nick(&mut self, nick: &str) -> bool {
        self.nick_temp.remove(nick).is_some() | self.nick_perm.remove(nick).is_some()
    }

    pub fn unban_ip(&mut self, ip: &Ipv4Addr) -> bool {
        self.ip_temp.remove(ip).is_some()
    }

    pub fn len(&self) -> usize {
        self.nick_temp.len() + self.nick_perm.len() + self.ip_temp.len() + self.ip_range_perm.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Clone detection (spec.md §4.9): tracks concurrent connection counts per
/// IP so the server can reject the newcomer (and optionally the existing
/// clones) once a threshold is crossed.
#[derive(Default)]
pub struct CloneTracker {
    counts: HashMap<Ipv4Addr, u32>,
}

impl CloneTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn connect(&mut self, ip: Ipv4Addr) -> u32 {
        let count = self.counts.entry(ip).or_insert(0);
        *count += 1;
        *count
    }

    pub fn disconnect(&mut self, ip: Ipv4Addr) {
        if let Some(count) = self.counts.get_mut(&ip) {
            *count = count.saturating_sub(1);
            if *count == 0 {
                self.counts.remove(&ip);
            }
        }
    }

    pub fn is_clone_flood(&self, ip: Ipv4Addr, threshold: u32) -> bool {
        self.counts.get(&ip).copied().unwrap_or(0) >= threshold
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn temp_nick_ban_expires() {
        let mut store = BanStore::new();
        let now = Instant::now();
        store.temp_ban_nick("spammer", "flood", "Hub-Security", BanKind::Flood, now, Duration::from_secs(60));
        assert!(store.check(now, "spammer", Ipv4Addr::new(1, 2, 3, 4), None, 0).is_some());
        assert!(store
            .check(now + Duration::from_secs(61), "spammer", Ipv4Addr::new(1, 2, 3, 4), None, 0)
            .is_none());
    }

    #[test]
    fn sweep_removes_expired_entries() {
        let mut store = BanStore::new();
        let now = Instant::now();
        store.temp_ban_ip(Ipv4Addr::new(9, 9, 9, 9), "x", "op", BanKind::PasswordFail, now, Duration::from_secs(1));
        assert_eq!(store.sweep(now + Duration::from_secs(2)), 1);
        assert!(store.is_empty());
    }

    #[test]
    fn ip_range_perm_ban_matches_cidr() {
        let mut store = BanStore::new();
        let now = Instant::now();
        store.add(Ban {
            nick: None,
            ip: None,
            ip_range: Some("10.0.0.0/8".parse().unwrap()),
            host: None,
            min_share: None,
            reason: "range".into(),
            operator: "root".into(),
            kind: BanKind::Permanent,
            start: now,
            end: None,
        });
        assert!(store.check(now, "anyone", Ipv4Addr::new(10, 1, 2, 3), None, 0).is_some());
        assert!(store.check(now, "anyone", Ipv4Addr::new(11, 1, 2, 3), None, 0).is_none());
    }

    #[test]
    fn clone_tracker_flags_at_threshold() {
        let mut tracker = CloneTracker::new();
        let ip = Ipv4Addr::new(5, 5, 5, 5);
        tracker.connect(ip);
        tracker.connect(ip);
        assert!(!tracker.is_clone_flood(ip, 3));
        tracker.connect(ip);
        assert!(tracker.is_clone_flood(ip, 3));
        tracker.disconnect(ip);
        assert!(!tracker.is_clone_flood(ip, 3));
    }
}
