//! Component I (search half): active/passive search and SR relay
//! (spec.md §4.7).

use std::net::Ipv4Addr;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SearchError {
    InvalidAddress,
    LanFiltered,
    TooFewChars,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SearchDestination {
    /// `$Search <ip:port> ...`: delivered to everyone.
    Active,
    /// `$Search Hub:<nick> ...`: delivered only to active users.
    Passive,
}

/// Private IPv4 ranges to drop when `filter_lan_requests` is set (spec.md
/// §4.7): 10.0.0.0/8, 172.16.0.0/12, 192.168.0.0/16.
pub fn is_lan_address(ip: Ipv4Addr) -> bool {
    let o = ip.octets();
    o[0] == 10 || (o[0] == 172 && (16..=31).contains(&o[1])) || (o[0] == 192 && o[1] == 168)
}

/// Validates an active search's declared `ip:port` against the LAN filter
/// and minimum pattern length.
pub fn validate_active_search(addr: &str, pattern: &str, filter_lan: bool, min_chars: usize) -> Result<(), SearchError> {
    let (ip_str, _port) = addr.split_once(':').ok_or(SearchError::InvalidAddress)?;
    let ip: Ipv4Addr = ip_str.parse().map_err(|_| SearchError::InvalidAddress)?;
    if filter_lan && is_lan_address(ip) {
        return Err(SearchError::LanFiltered);
    }
    if pattern.chars().filter(|c| *c != '$').count() < min_chars {
        return Err(SearchError::TooFewChars);
    }
    Ok(())
}

/// `SR` episode cap tracker: caps relayed results per search episode to
/// prevent amplification (spec.md §4.7: `max_passive_sr`).
#[derive(Default)]
pub struct SrEpisodeCounter {
    counts: std::collections::HashMap<String, u32>,
}

impl SrEpisodeCounter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns true if this SR should be relayed (under the cap), and
    /// records it either way.
    pub fn admit(&mut self, episode_key: &str, cap: u32) -> bool {
        let count = self.counts.entry(episode_key.to_string()).or_insert(0);
        *count += 1;
        *count <= cap
    }

    pub fn reset_episode(&mut self, episode_key: &str) {
        self.counts.remove(episode_key);
    }
}

/// `$MultiSearch` expands to its base `$Search` form for delivery
/// (spec.md §4.7); `$MultiSearch Hub:` already classifies directly as
/// `SearchHub` (see `proto::command::classify`).
pub fn normalize_multi_search(kind: crate::proto::CommandKind) -> crate::proto::CommandKind {
    match kind {
        crate::proto::CommandKind::MultiSearch => crate::proto::CommandKind::Search,
        other => other,
    }
}
