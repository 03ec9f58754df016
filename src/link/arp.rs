//! ARP (Address Resolution Protocol) messages, RFC 826
//!
//! The generic form works with any hardware/protocol address lengths. The
//! request and reply helpers are fixed to Ethernet over IPv4.

use crate::addr::{read_hwaddr, read_ipv4, HwAddr, HWADDR_LEN, IPV4_ADDR_LEN};
use crate::error::Result;
use crate::link::ethernet::ethertype;
use byteorder::{BigEndian, ByteOrder};
use std::net::Ipv4Addr;

/// Fixed part of every ARP message
pub const ARP_HDR_SIZE: usize = 8;
/// Full Ethernet/IPv4 ARP message
pub const ARP_ETH_IPV4_SIZE: usize = ARP_HDR_SIZE + 2 * (HWADDR_LEN + IPV4_ADDR_LEN);

/// Hardware types
pub mod hwtype {
    pub const ETHERNET: u16 = 1;
    pub const EXP_ETHERNET: u16 = 2;
    pub const AX25: u16 = 3;
    pub const PRONET: u16 = 4;
    pub const CHAOS: u16 = 5;
    pub const ARCNET: u16 = 7;
    pub const FRAME_RELAY: u16 = 15;
    pub const ATM: u16 = 16;
    pub const HDLC: u16 = 17;
    pub const FIBRE_CHANNEL: u16 = 18;
    pub const ARPSEC: u16 = 30;
    pub const IPSEC_TUNNEL: u16 = 31;
    pub const INFINIBAND: u16 = 32;
}

/// Operation codes
pub mod opcode {
    pub const REQUEST: u16 = 1;
    pub const REPLY: u16 = 2;
    pub const REV_REQUEST: u16 = 3;
    pub const REV_REPLY: u16 = 4;
}

/// Fixed 8-byte ARP header
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ArpHeader {
    pub hw_type: u16,
    pub proto_type: u16,
    pub hw_len: u8,
    pub proto_len: u8,
    pub opcode: u16,
}

impl ArpHeader {
    pub fn from_bytes(data: &[u8]) -> Option<Self> {
        if data.len() < ARP_HDR_SIZE {
            return None;
        }
        Some(Self::read(data))
    }

    fn read(data: &[u8]) -> Self {
        ArpHeader {
            hw_type: BigEndian::read_u16(&data[0..2]),
            proto_type: BigEndian::read_u16(&data[2..4]),
            hw_len: data[4],
            proto_len: data[5],
            opcode: BigEndian::read_u16(&data[6..8]),
        }
    }

    pub fn to_bytes(&self) -> [u8; ARP_HDR_SIZE] {
        let mut bytes = [0u8; ARP_HDR_SIZE];
        BigEndian::write_u16(&mut bytes[0..2], self.hw_type);
        BigEndian::write_u16(&mut bytes[2..4], self.proto_type);
        bytes[4] = self.hw_len;
        bytes[5] = self.proto_len;
        BigEndian::write_u16(&mut bytes[6..8], self.opcode);
        bytes
    }

    /// Fixed part plus both address pairs
    pub fn message_len(&self) -> usize {
        ARP_HDR_SIZE + 2 * (self.hw_len as usize + self.proto_len as usize)
    }
}

/// Typed view over an ARP message held in `T`
#[derive(Debug, Clone)]
pub struct ArpMessage<T> {
    buffer: T,
}

impl<T: AsRef<[u8]>> ArpMessage<T> {
    pub fn new_unchecked(buffer: T) -> Self {
        ArpMessage { buffer }
    }

    /// Rejects buffers too short for the address lengths they announce
    pub fn new_checked(buffer: T) -> Option<Self> {
        let header = ArpHeader::from_bytes(buffer.as_ref())?;
        if buffer.as_ref().len() < header.message_len() {
            return None;
        }
        Some(ArpMessage { buffer })
    }

    pub fn into_inner(self) -> T {
        self.buffer
    }

    pub fn as_bytes(&self) -> &[u8] {
        self.buffer.as_ref()
    }

    pub fn header(&self) -> ArpHeader {
        ArpHeader::read(self.buffer.as_ref())
    }

    pub fn hw_type(&self) -> u16 {
        BigEndian::read_u16(&self.buffer.as_ref()[0..2])
    }

    pub fn proto_type(&self) -> u16 {
        BigEndian::read_u16(&self.buffer.as_ref()[2..4])
    }

    pub fn opcode(&self) -> u16 {
        BigEndian::read_u16(&self.buffer.as_ref()[6..8])
    }

    fn hw_len(&self) -> usize {
        self.buffer.as_ref()[4] as usize
    }

    fn proto_len(&self) -> usize {
        self.buffer.as_ref()[5] as usize
    }

    pub fn total_len(&self) -> usize {
        self.header().message_len()
    }

    pub fn sender_hw_bytes(&self) -> &[u8] {
        let start = ARP_HDR_SIZE;
        &self.buffer.as_ref()[start..start + self.hw_len()]
    }

    pub fn sender_proto_bytes(&self) -> &[u8] {
        let start = ARP_HDR_SIZE + self.hw_len();
        &self.buffer.as_ref()[start..start + self.proto_len()]
    }

    pub fn target_hw_bytes(&self) -> &[u8] {
        let start = ARP_HDR_SIZE + self.hw_len() + self.proto_len();
        &self.buffer.as_ref()[start..start + self.hw_len()]
    }

    pub fn target_proto_bytes(&self) -> &[u8] {
        let start = ARP_HDR_SIZE + 2 * self.hw_len() + self.proto_len();
        &self.buffer.as_ref()[start..start + self.proto_len()]
    }

    /// True when the announced lengths are those of Ethernet over IPv4
    pub fn is_eth_ipv4(&self) -> bool {
        self.hw_len() == HWADDR_LEN && self.proto_len() == IPV4_ADDR_LEN
    }

    // The decoders below give `None` unless the message is Ethernet/IPv4.

    pub fn sender_hw_addr(&self) -> Option<HwAddr> {
        self.is_eth_ipv4().then(|| read_hwaddr(self.sender_hw_bytes()))
    }

    pub fn sender_ip(&self) -> Option<Ipv4Addr> {
        self.is_eth_ipv4().then(|| read_ipv4(self.sender_proto_bytes()))
    }

    pub fn target_hw_addr(&self) -> Option<HwAddr> {
        self.is_eth_ipv4().then(|| read_hwaddr(self.target_hw_bytes()))
    }

    pub fn target_ip(&self) -> Option<Ipv4Addr> {
        self.is_eth_ipv4().then(|| read_ipv4(self.target_proto_bytes()))
    }
}

/// Inject a generic ARP message.
///
/// Address lengths are taken from the sender slices; the target slices
/// must have the same lengths.
///
/// # Panics
///
/// If an address is longer than 255 bytes, the target lengths differ
/// from the sender's, or `buf` cannot hold the message.
#[allow(clippy::too_many_arguments)]
pub fn inject<'a>(
    buf: &'a mut [u8],
    hw_type: u16,
    proto_type: u16,
    opcode: u16,
    sender_hw: &[u8],
    sender_proto: &[u8],
    target_hw: &[u8],
    target_proto: &[u8],
) -> ArpMessage<&'a mut [u8]> {
    assert_eq!(sender_hw.len(), target_hw.len(), "hardware address length");
    assert_eq!(sender_proto.len(), target_proto.len(), "protocol address length");

    let header = ArpHeader {
        hw_type,
        proto_type,
        hw_len: u8::try_from(sender_hw.len()).unwrap_or(u8::MAX),
        proto_len: u8::try_from(sender_proto.len()).unwrap_or(u8::MAX),
        opcode,
    };
    assert_eq!(header.hw_len as usize, sender_hw.len(), "hardware address too long");
    assert_eq!(header.proto_len as usize, sender_proto.len(), "protocol address too long");

    buf[..ARP_HDR_SIZE].copy_from_slice(&header.to_bytes());
    let mut offset = ARP_HDR_SIZE;
    for part in [sender_hw, sender_proto, target_hw, target_proto] {
        buf[offset..offset + part.len()].copy_from_slice(part);
        offset += part.len();
    }
    ArpMessage::new_unchecked(buf)
}

/// Allocate and inject a generic ARP message.
pub fn build(
    hw_type: u16,
    proto_type: u16,
    opcode: u16,
    sender_hw: &[u8],
    sender_proto: &[u8],
    target_hw: &[u8],
    target_proto: &[u8],
) -> Result<ArpMessage<Vec<u8>>> {
    let len = ARP_HDR_SIZE + 2 * (sender_hw.len() + sender_proto.len());
    let mut buf = crate::alloc_packet(len)?;
    inject(
        &mut buf,
        hw_type,
        proto_type,
        opcode,
        sender_hw,
        sender_proto,
        target_hw,
        target_proto,
    );
    Ok(ArpMessage::new_unchecked(buf))
}

fn inject_eth_ipv4(
    buf: &mut [u8],
    opcode: u16,
    sender_hw: HwAddr,
    sender_ip: Ipv4Addr,
    target_hw: HwAddr,
    target_ip: Ipv4Addr,
) -> ArpMessage<&mut [u8]> {
    inject(
        buf,
        hwtype::ETHERNET,
        ethertype::IPV4,
        opcode,
        sender_hw.as_bytes(),
        &sender_ip.octets(),
        target_hw.as_bytes(),
        &target_ip.octets(),
    )
}

/// Inject an Ethernet/IPv4 ARP request (28 bytes)
pub fn inject_request(
    buf: &mut [u8],
    sender_hw: HwAddr,
    sender_ip: Ipv4Addr,
    target_hw: HwAddr,
    target_ip: Ipv4Addr,
) -> ArpMessage<&mut [u8]> {
    inject_eth_ipv4(buf, opcode::REQUEST, sender_hw, sender_ip, target_hw, target_ip)
}

/// Inject an Ethernet/IPv4 ARP reply (28 bytes)
pub fn inject_reply(
    buf: &mut [u8],
    sender_hw: HwAddr,
    sender_ip: Ipv4Addr,
    target_hw: HwAddr,
    target_ip: Ipv4Addr,
) -> ArpMessage<&mut [u8]> {
    inject_eth_ipv4(buf, opcode::REPLY, sender_hw, sender_ip, target_hw, target_ip)
}

pub fn build_request(
    sender_hw: HwAddr,
    sender_ip: Ipv4Addr,
    target_hw: HwAddr,
    target_ip: Ipv4Addr,
) -> Result<ArpMessage<Vec<u8>>> {
    let mut buf = crate::alloc_packet(ARP_ETH_IPV4_SIZE)?;
    inject_request(&mut buf, sender_hw, sender_ip, target_hw, target_ip);
    Ok(ArpMessage::new_unchecked(buf))
}

pub fn build_reply(
    sender_hw: HwAddr,
    sender_ip: Ipv4Addr,
    target_hw: HwAddr,
    target_ip: Ipv4Addr,
) -> Result<ArpMessage<Vec<u8>>> {
    let mut buf = crate::alloc_packet(ARP_ETH_IPV4_SIZE)?;
    inject_reply(&mut buf, sender_hw, sender_ip, target_hw, target_ip);
    Ok(ArpMessage::new_unchecked(buf))
}
