//! Packet construction toolkit and link-layer device control
//!
//! This library provides:
//! - Hardware and IPv4 address values
//! - Ethernet and ARP frame construction and parsing
//! - IPv4, ICMP, TCP and UDP header construction and parsing
//! - Internet checksum with IPv4 pseudo-header support
//! - Raw link-layer sockets and interface control (flags, MAC address)
//!
//! Every codec offers two shapes: `inject` writes a header into a buffer the
//! caller owns and returns a typed view over it, `build` allocates a buffer
//! for header and payload and hands it back inside the same view type.

pub mod addr;
pub mod error;
#[cfg(unix)]
pub mod iface;
pub mod link;
pub mod network;
pub mod transport;

// Re-export commonly used types
pub use addr::HwAddr;
pub use error::{Error, Result};
#[cfg(unix)]
pub use iface::{InterfaceList, InterfaceRecord, LinkOptions, NetworkDevice};
pub use link::{ArpMessage, EthernetFrame};
pub use network::{IcmpMessage, Ipv4Header, Ipv4Packet};
pub use transport::{TcpHeader, TcpSegment, UdpDatagram, UdpHeader};

/// Allocate a zeroed packet buffer, reporting failure instead of aborting.
pub(crate) fn alloc_packet(len: usize) -> Result<Vec<u8>> {
    let mut buf = Vec::new();
    buf.try_reserve_exact(len)
        .map_err(|_| Error::AllocationFailure(len))?;
    buf.resize(len, 0);
    Ok(buf)
}

/// Copy the leading `dst.len()` bytes of `payload`, if any, into `dst`.
pub(crate) fn copy_payload(dst: &mut [u8], payload: Option<&[u8]>) {
    if let Some(payload) = payload {
        dst.copy_from_slice(&payload[..dst.len()]);
    }
}
