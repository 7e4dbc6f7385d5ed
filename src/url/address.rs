//! Address policy for resolved hosts
//!
//! Classifies an IP address as public or as a member of a range that must
//! never be fetched (loopback, private, link-local and friends). IPv6 forms
//! that carry an IPv4 address (mapped `::ffff:0:0/96`, NAT64 `64:ff9b::/96`
//! and the deprecated compatible `::/96`) are classified by that address.

use std::fmt;
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};

/// Address ranges that are never fetched
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BlockedRange {
    /// 127.0.0.0/8, ::1
    Loopback,
    /// 10.0.0.0/8, 172.16.0.0/12, 192.168.0.0/16
    Private,
    /// fc00::/7
    UniqueLocal,
    /// 169.254.0.0/16, fe80::/10
    LinkLocal,
    /// 0.0.0.0/8, ::
    Unspecified,
    /// 100.64.0.0/10
    SharedAddressSpace,
    /// 255.255.255.255
    Broadcast,
    /// 224.0.0.0/4, ff00::/8
    Multicast,
}

impl fmt::Display for BlockedRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Loopback => "loopback",
            Self::Private => "private",
            Self::UniqueLocal => "unique-local",
            Self::LinkLocal => "link-local",
            Self::Unspecified => "unspecified",
            Self::SharedAddressSpace => "shared address space",
            Self::Broadcast => "broadcast",
            Self::Multicast => "multicast",
        };
        f.write_str(label)
    }
}

/// Returns the blocked range `ip` belongs to, or `None` for public addresses
///
/// # Examples
///
/// ```
/// use scrape_guard::url::{blocked_range, BlockedRange};
///
/// assert_eq!(blocked_range("127.0.0.1".parse().unwrap()), Some(BlockedRange::Loopback));
/// assert_eq!(blocked_range("93.184.216.34".parse().unwrap()), None);
/// ```
pub fn blocked_range(ip: IpAddr) -> Option<BlockedRange> {
    match ip {
        IpAddr::V4(v4) => blocked_v4(v4),
        IpAddr::V6(v6) => match embedded_v4(v6) {
            Some(v4) => blocked_v4(v4),
            None => blocked_v6(v6),
        },
    }
}

/// The IPv4 address a translating or embedding IPv6 form points at
fn embedded_v4(ip: Ipv6Addr) -> Option<Ipv4Addr> {
    if let Some(v4) = ip.to_ipv4_mapped() {
        return Some(v4);
    }

    let [a, b, c, d, e, f, _, _] = ip.segments();
    let [.., w, x, y, z] = ip.octets();
    match (a, b, c, d, e, f) {
        (0x64, 0xff9b, 0, 0, 0, 0) => Some(Ipv4Addr::new(w, x, y, z)),
        // `::` and `::1` keep their IPv6 meaning
        (0, 0, 0, 0, 0, 0) if !ip.is_loopback() && !ip.is_unspecified() => {
            Some(Ipv4Addr::new(w, x, y, z))
        }
        _ => None,
    }
}

/// Returns true if `ip` may be fetched
pub fn is_public(ip: IpAddr) -> bool {
    blocked_range(ip).is_none()
}

fn blocked_v4(ip: Ipv4Addr) -> Option<BlockedRange> {
    let octets = ip.octets();

    if ip.is_loopback() {
        Some(BlockedRange::Loopback)
    } else if ip.is_private() {
        Some(BlockedRange::Private)
    } else if ip.is_link_local() {
        Some(BlockedRange::LinkLocal)
    } else if octets[0] == 0 {
        Some(BlockedRange::Unspecified)
    } else if octets[0] == 100 && (octets[1] & 0xc0) == 64 {
        Some(BlockedRange::SharedAddressSpace)
    } else if ip.is_broadcast() {
        Some(BlockedRange::Broadcast)
    } else if ip.is_multicast() {
        Some(BlockedRange::Multicast)
    } else {
        None
    }
}

fn blocked_v6(ip: Ipv6Addr) -> Option<BlockedRange> {
    let first = ip.segments()[0];

    if ip.is_loopback() {
        Some(BlockedRange::Loopback)
    } else if ip.is_unspecified() {
        Some(BlockedRange::Unspecified)
    } else if (first & 0xfe00) == 0xfc00 {
        Some(BlockedRange::UniqueLocal)
    } else if (first & 0xffc0) == 0xfe80 {
        Some(BlockedRange::LinkLocal)
    } else if ip.is_multicast() {
        Some(BlockedRange::Multicast)
    } else {
        None
    }
}
