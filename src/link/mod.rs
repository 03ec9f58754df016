//! Link layer protocols implementation
//!
//! This module contains:
//! - Ethernet II framing
//! - ARP: Address Resolution Protocol

pub mod arp;
pub mod ethernet;

pub use arp::{ArpHeader, ArpMessage, ARP_ETH_IPV4_SIZE, ARP_HDR_SIZE};
pub use ethernet::{ethertype, EthHeader, EthernetFrame, ETH_HDR_SIZE};
