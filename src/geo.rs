//! Geolocation interface (OUT OF SCOPE per spec.md §3: "Geolocation
//! internals (the lookup itself is an external collaborator)"). The core
//! only needs country code/name and city for template substitution
//! (`%[CC]`, `%[CN]`, `%[CITY]`) and zone bucketing.

use std::net::Ipv4Addr;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GeoInfo {
    pub country_code: String,
    pub country_name: String,
    pub city: String,
}

pub trait GeoLookup: Send {
    fn lookup(&self, ip: Ipv4Addr) -> GeoInfo;
}

/// The default when no real geolocation backend is wired in: every lookup
/// returns empty fields, and `%[CC]`/`%[CN]`/`%[CITY]` substitute to "".
pub struct NullGeo;

impl GeoLookup for NullGeo {
    fn lookup(&self, _ip: Ipv4Addr) -> GeoInfo {
        GeoInfo::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn null_geo_returns_empty_fields() {
        let geo = NullGeo;
        let info = geo.lookup(Ipv4Addr::new(8, 8, 8, 8));
        assert!(info.country_code.is_empty());
    }
}
