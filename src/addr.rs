//! Hardware (link-layer) and protocol (IPv4) address values
//!
//! Protocol addresses are plain [`std::net::Ipv4Addr`] values; this module
//! adds the 6-byte [`HwAddr`] and the helpers the codec uses to move both
//! kinds of address in and out of packet buffers.

use crate::error::{Error, Result};
use rand::RngCore;
use std::fmt;
use std::net::Ipv4Addr;
use std::str::FromStr;

/// Ethernet hardware address length in bytes
pub const HWADDR_LEN: usize = 6;

/// IPv4 address length in bytes
pub const IPV4_ADDR_LEN: usize = 4;

/// Length of the textual form `XX:XX:XX:XX:XX:XX`
pub const HWADDR_STR_LEN: usize = 17;

/// Length of the vendor or serial half `XX:XX:XX`
pub const HWADDR_HALF_STR_LEN: usize = 8;

const HEX_DIGITS: &[u8; 16] = b"0123456789ABCDEF";

/// Link-layer hardware address
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct HwAddr(pub [u8; HWADDR_LEN]);

impl HwAddr {
    /// Broadcast address (FF:FF:FF:FF:FF:FF)
    pub const BROADCAST: HwAddr = HwAddr([0xFF; HWADDR_LEN]);

    /// Empty address (00:00:00:00:00:00)
    pub const EMPTY: HwAddr = HwAddr([0x00; HWADDR_LEN]);

    pub fn new(bytes: [u8; HWADDR_LEN]) -> Self {
        HwAddr(bytes)
    }

    /// Create an address from the first 6 bytes of `slice`
    pub fn from_slice(slice: &[u8]) -> Option<Self> {
        let bytes: [u8; HWADDR_LEN] = slice.get(..HWADDR_LEN)?.try_into().ok()?;
        Some(HwAddr(bytes))
    }

    pub fn octets(&self) -> [u8; HWADDR_LEN] {
        self.0
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    /// All bytes set to 0xFF
    pub fn is_broadcast(&self) -> bool {
        self.0.iter().all(|&b| b == 0xFF)
    }

    /// All bytes zero
    pub fn is_empty(&self) -> bool {
        self.0.iter().all(|&b| b == 0x00)
    }

    /// Group bit (bit 0 of the first octet) set. Broadcast is multicast too.
    pub fn is_multicast(&self) -> bool {
        self.0[0] & 0x01 != 0
    }

    /// Ethernet multicast address for an IPv4 group (RFC 1112): 01:00:5E
    /// followed by the low 23 bits of the IP address.
    pub fn multicast_for(ip: Ipv4Addr) -> Self {
        let o = ip.octets();
        HwAddr([0x01, 0x00, 0x5E, o[1] & 0x7F, o[2], o[3]])
    }

    /// Random unicast address from the thread-local generator
    pub fn random() -> Self {
        Self::random_with(&mut rand::thread_rng())
    }

    /// Random unicast address: never broadcast, multicast or empty.
    pub fn random_with<R: RngCore + ?Sized>(rng: &mut R) -> Self {
        let mut bytes = [0u8; HWADDR_LEN];
        loop {
            rng.fill_bytes(&mut bytes);
            bytes[0] &= !0x01;
            let addr = HwAddr(bytes);
            if !addr.is_broadcast() && !addr.is_empty() {
                return addr;
            }
        }
    }

    /// Parse `XX:XX:XX:XX:XX:XX` (one or two hex digits per octet).
    ///
    /// A broadcast address is rejected unless `allow_broadcast` is set.
    pub fn parse(text: &str, allow_broadcast: bool) -> Result<Self> {
        let mut bytes = [0u8; HWADDR_LEN];
        let mut parts = text.split(':');

        for byte in bytes.iter_mut() {
            let part = parts
                .next()
                .ok_or_else(|| Error::invalid_format(format!("'{}': expected 6 octets", text)))?;
            if part.is_empty() || part.len() > 2 || !part.bytes().all(|b| b.is_ascii_hexdigit()) {
                return Err(Error::invalid_format(format!(
                    "'{}': bad octet '{}'",
                    text, part
                )));
            }
            *byte = u8::from_str_radix(part, 16)
                .map_err(|_| Error::invalid_format(format!("'{}': bad octet '{}'", text, part)))?;
        }

        if parts.next().is_some() {
            return Err(Error::invalid_format(format!("'{}': expected 6 octets", text)));
        }

        let addr = HwAddr(bytes);
        if addr.is_broadcast() && !allow_broadcast {
            return Err(Error::invalid_format(format!(
                "'{}': broadcast address not allowed",
                text
            )));
        }
        Ok(addr)
    }

    /// Format into a caller-supplied buffer and return the written text.
    pub fn format_into<'a>(&self, buf: &'a mut [u8; HWADDR_STR_LEN]) -> &'a str {
        hex_octets(&self.0, buf)
    }

    /// Vendor part (upper three octets) into a caller-supplied buffer
    pub fn vendor_into<'a>(&self, buf: &'a mut [u8; HWADDR_HALF_STR_LEN]) -> &'a str {
        hex_octets(&self.0[..3], buf)
    }

    /// Serial part (lower three octets) into a caller-supplied buffer
    pub fn serial_into<'a>(&self, buf: &'a mut [u8; HWADDR_HALF_STR_LEN]) -> &'a str {
        hex_octets(&self.0[3..], buf)
    }

    pub fn vendor(&self) -> String {
        let mut buf = [0u8; HWADDR_HALF_STR_LEN];
        self.vendor_into(&mut buf).to_string()
    }

    pub fn serial(&self) -> String {
        let mut buf = [0u8; HWADDR_HALF_STR_LEN];
        self.serial_into(&mut buf).to_string()
    }
}

/// Write `octets` as colon separated upper-case hex into `buf`.
fn hex_octets<'a>(octets: &[u8], buf: &'a mut [u8]) -> &'a str {
    for (i, byte) in octets.iter().enumerate() {
        if i > 0 {
            buf[i * 3 - 1] = b':';
        }
        buf[i * 3] = HEX_DIGITS[(byte >> 4) as usize];
        buf[i * 3 + 1] = HEX_DIGITS[(byte & 0x0F) as usize];
    }
    let len = (octets.len() * 3).saturating_sub(1);
    std::str::from_utf8(&buf[..len]).unwrap_or_default()
}

impl fmt::Display for HwAddr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut buf = [0u8; HWADDR_STR_LEN];
        f.write_str(self.format_into(&mut buf))
    }
}

impl FromStr for HwAddr {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        HwAddr::parse(s, true)
    }
}

impl From<[u8; HWADDR_LEN]> for HwAddr {
    fn from(bytes: [u8; HWADDR_LEN]) -> Self {
        HwAddr(bytes)
    }
}

/// Read an IPv4 address from the first 4 bytes of `data`
pub(crate) fn read_ipv4(data: &[u8]) -> Ipv4Addr {
    Ipv4Addr::new(data[0], data[1], data[2], data[3])
}

/// Read a hardware address from the first 6 bytes of `data`
pub(crate) fn read_hwaddr(data: &[u8]) -> HwAddr {
    let mut bytes = [0u8; HWADDR_LEN];
    bytes.copy_from_slice(&data[..HWADDR_LEN]);
    HwAddr(bytes)
}
