//! # Client Keys
//!
//! The rate limiter buckets requests by the peer's IP address. Two
//! connections from the same host on different source ports share one key.

use std::fmt;
use std::net::{IpAddr, SocketAddr};

/// Rate-limiting key: the host portion of the peer address.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ClientKey(IpAddr);

impl ClientKey {
    /// Key for a bare IP address.
    pub fn new(ip: IpAddr) -> Self {
        // Fold IPv4-mapped IPv6 peers onto their IPv4 key so dual-stack
        // listeners don't give one host two buckets.
        match ip {
            IpAddr::V6(v6) => match v6.to_ipv4_mapped() {
                Some(v4) => Self(IpAddr::V4(v4)),
                None => Self(ip),
            },
            IpAddr::V4(_) => Self(ip),
        }
    }
}

impl From<SocketAddr> for ClientKey {
    fn from(addr: SocketAddr) -> Self {
        Self::new(addr.ip())
    }
}

impl fmt::Display for ClientKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn port_is_stripped() {
        let a: SocketAddr = "203.0.113.9:50000".parse().unwrap();
        let b: SocketAddr = "203.0.113.9:50001".parse().unwrap();
        assert_eq!(ClientKey::from(a), ClientKey::from(b));
        assert_eq!(ClientKey::from(a).to_string(), "203.0.113.9");
    }

    #[test]
    fn ipv4_mapped_ipv6_folds_to_ipv4() {
        let mapped: SocketAddr = "[::ffff:203.0.113.9]:443".parse().unwrap();
        let plain: SocketAddr = "203.0.113.9:443".parse().unwrap();
        assert_eq!(ClientKey::from(mapped), ClientKey::from(plain));
    }

    #[test]
    fn distinct_hosts_distinct_keys() {
        let a: SocketAddr = "198.51.100.1:80".parse().unwrap();
        let b: SocketAddr = "198.51.100.2:80".parse().unwrap();
        assert_ne!(ClientKey::from(a), ClientKey::from(b));
    }
}
