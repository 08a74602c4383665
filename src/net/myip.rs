//! `$MyIP` proxy-injected address override (spec.md §6/§9, "the external
//! TLS-terminating proxy ... injects a synthetic MyIP command declaring
//! the real client address and TLS version").

use std::net::Ipv4Addr;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProxyMyIp {
    pub addr: Ipv4Addr,
    /// `None` means "0.0" was sent: plain, not TLS-terminated.
    pub tls_version: Option<String>,
}

/// Parses a `$MyIP <addr> <tlsver>` line's chunks (command token already
/// stripped). "0.0" means plain, per spec.md §9.
pub fn parse(addr_chunk: &str, tlsver_chunk: &str) -> Option<ProxyMyIp> {
    let addr: Ipv4Addr = addr_chunk.parse().ok()?;
    let tls_version = if tlsver_chunk == "0.0" || tlsver_chunk.is_empty() {
        None
    } else {
        Some(tlsver_chunk.to_string())
    };
    Some(ProxyMyIp { addr, tls_version })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_zero_means_plain() {
        let p = parse("203.0.113.5", "0.0").unwrap();
        assert_eq!(p.tls_version, None);
    }

    #[test]
    fn real_version_is_kept() {
        let p = parse("203.0.113.5", "1.3").unwrap();
        assert_eq!(p.tls_version.as_deref(), Some("1.3"));
    }

    #[test]
    fn invalid_address_is_rejected() {
        assert!(parse("not-an-ip", "0.0").is_none());
    }
}
