//! Address types shared by the forwarding table crates.
//!
//! - [`MacAddress`]: 48-bit Ethernet MAC addresses
//! - [`Ipv4Address`]: IPv4 destination addresses, accepting IPv4-mapped IPv6 input

mod ip;
mod mac;

pub use ip::Ipv4Address;
pub use mac::MacAddress;

/// Malformed address input.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ParseError {
    #[error("invalid MAC address format: {0}")]
    InvalidMacAddress(String),

    #[error("invalid IP address format: {0}")]
    InvalidIpAddress(String),
}
