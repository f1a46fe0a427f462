//! IPv4 destination address with lenient textual parsing.

use crate::ParseError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::net::{IpAddr, Ipv4Addr};
use std::str::FromStr;

/// An IPv4 address.
///
/// Parsing accepts dotted-quad text and IPv6 literals that carry an
/// IPv4-mapped address (`::ffff:a.b.c.d`). Any other IPv6 literal is
/// rejected since it cannot be reduced to four bytes.
///
/// ```
/// use fwd_types::Ipv4Address;
///
/// let ip: Ipv4Address = "::ffff:10.0.0.1".parse().unwrap();
/// assert_eq!(ip.to_string(), "10.0.0.1");
/// assert!("2001:db8::1".parse::<Ipv4Address>().is_err());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Ipv4Address(Ipv4Addr);

impl Ipv4Address {
    pub const LOCALHOST: Self = Ipv4Address(Ipv4Addr::LOCALHOST);

    pub const fn new(a: u8, b: u8, c: u8, d: u8) -> Self {
        Ipv4Address(Ipv4Addr::new(a, b, c, d))
    }

    /// Octets in network order (`a.b.c.d` -> `[a, b, c, d]`).
    pub const fn octets(&self) -> [u8; 4] {
        self.0.octets()
    }
}

impl fmt::Display for Ipv4Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}

impl FromStr for Ipv4Address {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.parse::<IpAddr>() {
            Ok(IpAddr::V4(addr)) => Ok(Ipv4Address(addr)),
            Ok(IpAddr::V6(addr)) => addr
                .to_ipv4_mapped()
                .map(Ipv4Address)
                .ok_or_else(|| ParseError::InvalidIpAddress(s.to_string())),
            Err(_) => Err(ParseError::InvalidIpAddress(s.to_string())),
        }
    }
}

impl TryFrom<String> for Ipv4Address {
    type Error = ParseError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

impl From<Ipv4Address> for String {
    fn from(addr: Ipv4Address) -> String {
        addr.to_string()
    }
}

impl From<Ipv4Addr> for Ipv4Address {
    fn from(addr: Ipv4Addr) -> Self {
        Ipv4Address(addr)
    }
}

impl From<Ipv4Address> for Ipv4Addr {
    fn from(addr: Ipv4Address) -> Self {
        addr.0
    }
}

impl From<[u8; 4]> for Ipv4Address {
    fn from(octets: [u8; 4]) -> Self {
        Ipv4Address(Ipv4Addr::from(octets))
    }
}
