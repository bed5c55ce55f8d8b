//! Client address resolution behind trusted proxies.
//!
//! `X-Forwarded-For` is only believed when the TCP peer is inside the
//! trusted CIDR allow-list; otherwise rate limiting keys on the peer
//! address itself. The default list covers loopback and RFC1918 so a
//! local tunnel works out of the box.

use actix_web::HttpRequest;
use actix_web::dev::ServiceRequest;
use std::net::IpAddr;
use std::sync::OnceLock;

/// One CIDR block, v4 or v6.
#[derive(Debug, Clone, Copy)]
pub struct Cidr {
    net: IpAddr,
    bits: u8,
}

impl Cidr {
    pub fn parse(s: &str) -> Option<Self> {
        let (net, bits) = match s.trim().split_once('/') {
            Some((net, bits)) => (net.parse().ok()?, bits.parse().ok()?),
            None => {
                let net: IpAddr = s.trim().parse().ok()?;
                let bits = match net {
                    IpAddr::V4(_) => 32,
                    IpAddr::V6(_) => 128,
                };
                (net, bits)
            }
        };
        let max = match net {
            IpAddr::V4(_) => 32,
            IpAddr::V6(_) => 128,
        };
        (bits <= max).then_some(Self { net, bits })
    }

    pub fn contains(&self, ip: IpAddr) -> bool {
        fn widen(ip: IpAddr) -> (u128, u32) {
            match ip {
                IpAddr::V4(v4) => (u32::from_be_bytes(v4.octets()) as u128, 32),
                IpAddr::V6(v6) => (u128::from_be_bytes(v6.octets()), 128),
            }
        }
        let (net, width) = widen(self.net);
        let (addr, addr_width) = widen(ip);
        if width != addr_width {
            return false;
        }
        if self.bits == 0 {
            return true;
        }
        let shift = width - self.bits as u32;
        (net >> shift) == (addr >> shift)
    }
}

const DEFAULT_TRUSTED: &str = "127.0.0.0/8, ::1/128, 10.0.0.0/8, 172.16.0.0/12, 192.168.0.0/16";

static TRUSTED: OnceLock<Vec<Cidr>> = OnceLock::new();

/// Trusted proxy blocks from `TRUSTED_PROXIES`, parsed once.
pub fn trusted() -> &'static [Cidr] {
    TRUSTED.get_or_init(|| {
        let raw = std::env::var("TRUSTED_PROXIES").unwrap_or_else(|_| DEFAULT_TRUSTED.into());
        raw.split(',').filter_map(Cidr::parse).collect()
    })
}

/// Resolves the effective client address from a peer and an optional
/// `X-Forwarded-For` header. Pure; the wrappers below feed it.
pub fn resolve(peer: Option<IpAddr>, forwarded: Option<&str>, proxies: &[Cidr]) -> IpAddr {
    let peer = peer.unwrap_or(IpAddr::from([127, 0, 0, 1]));
    if !proxies.iter().any(|cidr| cidr.contains(peer)) {
        return peer;
    }
    forwarded
        .and_then(|header| header.split(',').next())
        .and_then(|first| first.trim().parse().ok())
        .unwrap_or(peer)
}

pub fn client_ip(req: &ServiceRequest) -> IpAddr {
    let peer = req.peer_addr().map(|addr| addr.ip());
    let forwarded = req
        .headers()
        .get("x-forwarded-for")
        .and_then(|v| v.to_str().ok());
    resolve(peer, forwarded, trusted())
}

pub fn request_ip(req: &HttpRequest) -> IpAddr {
    let peer = req.peer_addr().map(|addr| addr.ip());
    let forwarded = req
        .headers()
        .get("x-forwarded-for")
        .and_then(|v| v.to_str().ok());
    resolve(peer, forwarded, trusted())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ip(s: &str) -> IpAddr {
        s.parse().unwrap()
    }

    #[test]
    fn cidr_membership() {
        let block = Cidr::parse("10.0.0.0/8").unwrap();
        assert!(block.contains(ip("10.1.2.3")));
        assert!(!block.contains(ip("11.0.0.1")));
        let host = Cidr::parse("192.168.1.5").unwrap();
        assert!(host.contains(ip("192.168.1.5")));
        assert!(!host.contains(ip("192.168.1.6")));
    }

    #[test]
    fn v6_blocks_do_not_match_v4() {
        let block = Cidr::parse("::1/128").unwrap();
        assert!(block.contains(ip("::1")));
        assert!(!block.contains(ip("127.0.0.1")));
    }

    #[test]
    fn forwarded_header_trusted_only_behind_proxy() {
        let proxies = vec![Cidr::parse("127.0.0.0/8").unwrap()];
        // direct connection: header ignored
        assert_eq!(
            resolve(Some(ip("203.0.113.9")), Some("198.51.100.1"), &proxies),
            ip("203.0.113.9")
        );
        // via trusted proxy: first hop wins
        assert_eq!(
            resolve(
                Some(ip("127.0.0.1")),
                Some("198.51.100.1, 10.0.0.1"),
                &proxies
            ),
            ip("198.51.100.1")
        );
        // garbage header: falls back to peer
        assert_eq!(
            resolve(Some(ip("127.0.0.1")), Some("not-an-ip"), &proxies),
            ip("127.0.0.1")
        );
    }

    #[test]
    fn bad_cidrs_fail_to_parse() {
        assert!(Cidr::parse("10.0.0.0/33").is_none());
        assert!(Cidr::parse("banana").is_none());
    }
}
