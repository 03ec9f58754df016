//! Network layer protocols
//!
//! This module contains the network layer codecs and the checksum engine
//! they share with the transport layer:
//! - IPv4: Internet Protocol version 4
//! - ICMP: Internet Control Message Protocol
//! - checksum: Internet checksum with optional pseudo-header

pub mod checksum;
pub mod icmp;
pub mod ipv4;

// Re-export commonly used items
pub use checksum::{internet_checksum, PseudoHeader};
pub use icmp::{IcmpHeader, IcmpMessage, ICMP_TYPE_ECHO_REPLY, ICMP_TYPE_ECHO_REQUEST};
pub use ipv4::{flags, protocol, Ipv4Header, Ipv4Packet};
