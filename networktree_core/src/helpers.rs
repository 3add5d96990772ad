//! Prefix arithmetic: ordering, containment and range decomposition

use crate::errors::{Error, Result};
use ipnet::{IpNet, Ipv4Subnets, Ipv6Subnets};
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};

/// Address family of a network or address.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Family {
    V4,
    V6,
}

impl Family {
    #[inline]
    pub fn of(net: &IpNet) -> Self {
        match net {
            IpNet::V4(_) => Family::V4,
            IpNet::V6(_) => Family::V6,
        }
    }

    #[inline]
    pub fn of_addr(addr: &IpAddr) -> Self {
        match addr {
            IpAddr::V4(_) => Family::V4,
            IpAddr::V6(_) => Family::V6,
        }
    }

    #[inline]
    pub fn max_prefix_len(self) -> u8 {
        match self {
            Family::V4 => 32,
            Family::V6 => 128,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Family::V4 => "ipv4",
            Family::V6 => "ipv6",
        }
    }
}

/// Integer view of an address; IPv4 occupies the low 32 bits.
#[inline]
pub fn addr_to_u128(addr: IpAddr) -> u128 {
    match addr {
        IpAddr::V4(v4) => u32::from(v4) as u128,
        IpAddr::V6(v6) => u128::from(v6),
    }
}

#[inline]
pub fn u128_to_addr(family: Family, value: u128) -> Option<IpAddr> {
    match family {
        Family::V4 => u32::try_from(value)
            .ok()
            .map(|v| IpAddr::V4(Ipv4Addr::from(v))),
        Family::V6 => Some(IpAddr::V6(Ipv6Addr::from(value))),
    }
}

/// Parse a CIDR literal, or a bare address as a host prefix. Host bits are cleared.
pub fn parse_network(s: &str) -> Result<IpNet> {
    let s = s.trim();
    if let Ok(net) = s.parse::<IpNet>() {
        return Ok(net.trunc());
    }
    let addr = parse_address(s)?;
    let len = Family::of_addr(&addr).max_prefix_len();
    IpNet::new(addr, len).map_err(|_| Error::InvalidPrefix(s.to_string()))
}

pub fn parse_address(s: &str) -> Result<IpAddr> {
    s.trim()
        .parse::<IpAddr>()
        .map_err(|_| Error::InvalidPrefix(s.to_string()))
}

/// Sort key of the sibling order: family, then base address, then prefix length.
///
/// A supernet sorts immediately before the subnets that share its base
/// address, so the order is also a pre-order walk of any nesting.
#[inline]
pub fn sort_key(net: &IpNet) -> (Family, u128, u8) {
    (Family::of(net), addr_to_u128(net.network()), net.prefix_len())
}

#[inline]
pub fn comes_before(a: &IpNet, b: &IpNet) -> bool {
    sort_key(a) < sort_key(b)
}

/// True when `inner` lies inside `outer` (identical networks included).
#[inline]
pub fn contains(outer: &IpNet, inner: &IpNet) -> bool {
    outer.contains(inner)
}

/// Neither contains the other.
#[inline]
pub fn disjoint(a: &IpNet, b: &IpNet) -> bool {
    !a.contains(b) && !b.contains(a)
}

/// The adjacent network of the same length, if the address space continues.
pub fn next_network(net: &IpNet) -> Option<IpNet> {
    let family = Family::of(net);
    let after = addr_to_u128(net.broadcast()).checked_add(1)?;
    let addr = u128_to_addr(family, after)?;
    IpNet::new(addr, net.prefix_len()).ok()
}

/// Shorten the prefix by one bit.
#[inline]
pub fn widen(net: &IpNet) -> Option<IpNet> {
    net.supernet().map(|n| n.trunc())
}

/// Narrowest network containing both `a` and `b`.
pub fn common_supernet(a: &IpNet, b: &IpNet) -> Option<IpNet> {
    if Family::of(a) != Family::of(b) {
        return None;
    }
    let mut net = a.trunc();
    while !net.contains(b) {
        net = widen(&net)?;
    }
    Some(net)
}

/// The two halves of `net`, or `None` for a host prefix.
pub fn halves(net: &IpNet) -> Option<(IpNet, IpNet)> {
    let len = net.prefix_len().checked_add(1)?;
    let lower = IpNet::new(net.network(), len).ok()?;
    let upper = next_network(&lower)?;
    Some((lower, upper))
}

/// Minimal ascending set of CIDR-aligned networks covering `[start, end]` exactly.
///
/// Empty when the families differ or the range is inverted.
pub fn covering_networks(start: IpAddr, end: IpAddr) -> Vec<IpNet> {
    if addr_to_u128(start) > addr_to_u128(end) {
        return Vec::new();
    }
    match (start, end) {
        (IpAddr::V4(s), IpAddr::V4(e)) => Ipv4Subnets::new(s, e, 0).map(IpNet::V4).collect(),
        (IpAddr::V6(s), IpAddr::V6(e)) => Ipv6Subnets::new(s, e, 0).map(IpNet::V6).collect(),
        _ => Vec::new(),
    }
}

/// Last address of a `count`-address range starting at `start`.
///
/// `None` for an empty range or one running past the end of the family.
pub fn range_end(start: IpAddr, count: u128) -> Option<IpAddr> {
    let last = addr_to_u128(start).checked_add(count.checked_sub(1)?)?;
    u128_to_addr(Family::of_addr(&start), last)
}

/// Number of addresses in a prefix of `prefix_len` bits; `None` if it does not fit a u128.
pub fn prefix_size(family: Family, prefix_len: u8) -> Option<u128> {
    let host_bits = family.max_prefix_len().checked_sub(prefix_len)?;
    1u128.checked_shl(host_bits as u32)
}
