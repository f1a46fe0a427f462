//! Forwarding record layout.
//!
//! ```text
//! key   (4 bytes)   IPv4 octets, last octet first
//! value (16 bytes)  [0..4)   egress interface index, little-endian
//!                   [4..10)  source MAC, address order
//!                   [10..16) destination MAC, address order
//! ```

use std::ops::Range;
use std::str::FromStr;

use byteorder::{ByteOrder, LittleEndian};
use fwd_bpfmap::{Kv, MapError};
use fwd_types::{Ipv4Address, MacAddress};
use serde::{Deserialize, Serialize};

use crate::error::Result;

/// One forwarding rule as callers see it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ForwardEntry {
    pub ip: Ipv4Address,
    pub iface: u32,
    pub src_mac: MacAddress,
    pub dst_mac: MacAddress,
}

impl ForwardEntry {
    /// Parses the textual form; fails before anything touches the table.
    pub fn parse(ip: &str, iface: u32, src_mac: &str, dst_mac: &str) -> Result<Self> {
        Ok(Self {
            ip: Ipv4Address::from_str(ip)?,
            iface,
            src_mac: MacAddress::from_str(src_mac)?,
            dst_mac: MacAddress::from_str(dst_mac)?,
        })
    }
}

/// Fixed layout of the forwarding table.
pub struct ForwardRecord;

impl ForwardRecord {
    pub const KEY_SIZE: usize = 4;
    pub const VALUE_SIZE: usize = 16;

    pub const IFACE: Range<usize> = 0..4;
    pub const SRC_MAC: Range<usize> = 4..10;
    pub const DST_MAC: Range<usize> = 10..16;

    pub fn encode_key(ip: Ipv4Address) -> [u8; Self::KEY_SIZE] {
        let mut key = ip.octets();
        key.reverse();
        key
    }

    pub fn decode_key(key: &[u8; Self::KEY_SIZE]) -> Ipv4Address {
        Ipv4Address::new(key[3], key[2], key[1], key[0])
    }

    pub fn encode_value(entry: &ForwardEntry) -> [u8; Self::VALUE_SIZE] {
        let mut value = [0u8; Self::VALUE_SIZE];
        LittleEndian::write_u32(&mut value[Self::IFACE], entry.iface);
        value[Self::SRC_MAC].copy_from_slice(entry.src_mac.as_bytes());
        value[Self::DST_MAC].copy_from_slice(entry.dst_mac.as_bytes());
        value
    }

    pub fn encode(entry: &ForwardEntry) -> Kv {
        Kv::new(Self::encode_key(entry.ip), Self::encode_value(entry))
    }

    /// Rebuilds an entry from a table entry, checking both widths.
    pub fn decode(kv: &Kv) -> Result<ForwardEntry> {
        let key: &[u8; Self::KEY_SIZE] = kv.key.as_slice().try_into().map_err(|_| {
            MapError::SizeMismatch {
                what: "key",
                expected: Self::KEY_SIZE,
                actual: kv.key.len(),
            }
        })?;
        MapError::check_size("value", Self::VALUE_SIZE, kv.value.len())?;

        Ok(ForwardEntry {
            ip: Self::decode_key(key),
            iface: LittleEndian::read_u32(&kv.value[Self::IFACE]),
            src_mac: MacAddress::new(mac_at(&kv.value, Self::SRC_MAC)),
            dst_mac: MacAddress::new(mac_at(&kv.value, Self::DST_MAC)),
        })
    }
}

fn mac_at(value: &[u8], range: Range<usize>) -> [u8; 6] {
    let mut mac = [0u8; 6];
    mac.copy_from_slice(&value[range]);
    mac
}
