//! IPv4 header construction and parsing
//!
//! This module provides IPv4 header parsing and serialization, header
//! checksum calculation, and header injection into packet buffers.
//!
//! Features:
//! - IPv4 header parsing and serialization
//! - Header checksum calculation and validation (options included)
//! - Header injection with automatic total length and checksum
//! - Source/destination address decoding

use crate::addr::read_ipv4;
use crate::error::Result;
use crate::network::checksum::{internet_checksum, verify};
use byteorder::{BigEndian, ByteOrder};
use std::net::Ipv4Addr;

/// IPv4 header size without options
pub const IPV4_HEADER_LEN: usize = 20;
/// Largest header the 4-bit IHL field can describe
pub const IPV4_MAX_HEADER_LEN: usize = 60;
const IPV4_VERSION: u8 = 4;
const DEFAULT_IHL: u8 = 5; // 5 * 4 = 20 bytes
const DEFAULT_TTL: u8 = 64;

/// IPv4 packet header structure
///
/// Represents the IPv4 header as defined in RFC 791. Options, when present,
/// live in the packet buffer right after the fixed 20 bytes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Ipv4Header {
    pub version: u8,
    pub ihl: u8, // Internet Header Length, 32-bit words
    pub tos: u8, // Type of Service
    pub total_len: u16,
    pub id: u16,
    pub flags_frag_offset: u16, // Flags and Fragment Offset
    pub ttl: u8,                // Time to Live
    pub protocol: u8,           // Next Protocol
    pub checksum: u16,
    pub src_addr: Ipv4Addr,
    pub dst_addr: Ipv4Addr,
}

impl Ipv4Header {
    /// Create a new IPv4 header with specified parameters
    ///
    /// The header length (IHL) is set to 5 (20 bytes); the checksum is left
    /// at zero until [`Ipv4Header::update_checksum`] or [`inject`] fills it.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        tos: u8,
        total_len: u16,
        id: u16,
        flags_frag_offset: u16,
        ttl: u8,
        protocol: u8,
        src_addr: Ipv4Addr,
        dst_addr: Ipv4Addr,
    ) -> Self {
        Ipv4Header {
            version: IPV4_VERSION,
            ihl: DEFAULT_IHL,
            tos,
            total_len,
            id,
            flags_frag_offset,
            ttl,
            protocol,
            checksum: 0,
            src_addr,
            dst_addr,
        }
    }

    /// Create a new IPv4 header with default values
    ///
    /// Only requires the essential parameters.
    pub fn new_simple(
        protocol: u8,
        src_addr: Ipv4Addr,
        dst_addr: Ipv4Addr,
        payload_len: u16,
    ) -> Self {
        Self::new(
            0,                                    // TOS: Normal service
            IPV4_HEADER_LEN as u16 + payload_len, // Total length
            0,                                    // ID
            flags::DONT_FRAGMENT,
            DEFAULT_TTL,
            protocol,
            src_addr,
            dst_addr,
        )
    }

    /// Parse IPv4 header from byte slice
    ///
    /// Returns None if the data is too short or if the version field is not 4
    pub fn from_bytes(data: &[u8]) -> Option<Self> {
        if data.len() < IPV4_HEADER_LEN {
            return None;
        }

        if (data[0] & 0xF0) >> 4 != IPV4_VERSION {
            return None;
        }

        Some(Self::read(data))
    }

    fn read(data: &[u8]) -> Self {
        Ipv4Header {
            version: (data[0] & 0xF0) >> 4,
            ihl: data[0] & 0x0F,
            tos: data[1],
            total_len: BigEndian::read_u16(&data[2..4]),
            id: BigEndian::read_u16(&data[4..6]),
            flags_frag_offset: BigEndian::read_u16(&data[6..8]),
            ttl: data[8],
            protocol: data[9],
            checksum: BigEndian::read_u16(&data[10..12]),
            src_addr: read_ipv4(&data[12..16]),
            dst_addr: read_ipv4(&data[16..20]),
        }
    }

    /// Convert the fixed part of the header to bytes
    pub fn to_bytes(&self) -> [u8; IPV4_HEADER_LEN] {
        let mut bytes = [0u8; IPV4_HEADER_LEN];
        bytes[0] = (self.version << 4) | (self.ihl & 0x0F);
        bytes[1] = self.tos;
        BigEndian::write_u16(&mut bytes[2..4], self.total_len);
        BigEndian::write_u16(&mut bytes[4..6], self.id);
        BigEndian::write_u16(&mut bytes[6..8], self.flags_frag_offset);
        bytes[8] = self.ttl;
        bytes[9] = self.protocol;
        BigEndian::write_u16(&mut bytes[10..12], self.checksum);
        bytes[12..16].copy_from_slice(&self.src_addr.octets());
        bytes[16..20].copy_from_slice(&self.dst_addr.octets());

        bytes
    }

    /// Recalculate the checksum of an option-less header
    pub fn update_checksum(&mut self) {
        self.checksum = 0;
        self.checksum = internet_checksum(&self.to_bytes());
    }

    /// Get the header length in bytes
    pub fn header_len(&self) -> usize {
        (self.ihl as usize) * 4
    }

    /// Get payload length
    ///
    /// Returns the length of the payload (total length - header length)
    pub fn payload_len(&self) -> usize {
        (self.total_len as usize).saturating_sub(self.header_len())
    }

    pub fn dont_fragment(&self) -> bool {
        self.flags_frag_offset & flags::DONT_FRAGMENT != 0
    }

    pub fn more_fragments(&self) -> bool {
        self.flags_frag_offset & flags::MORE_FRAGMENTS != 0
    }

    /// Fragment offset in bytes
    pub fn fragment_offset(&self) -> usize {
        ((self.flags_frag_offset & flags::FRAGMENT_OFFSET_MASK) as usize) * 8
    }
}

/// IPv4 protocol constants
pub mod protocol {
    pub const ICMP: u8 = 1;
    pub const TCP: u8 = 6;
    pub const UDP: u8 = 17;
}

/// IPv4 flags constants
pub mod flags {
    pub const DONT_FRAGMENT: u16 = 0x4000;
    pub const MORE_FRAGMENTS: u16 = 0x2000;
    pub const FRAGMENT_OFFSET_MASK: u16 = 0x1FFF;
}

/// Typed view over an IPv4 packet held in `T`
#[derive(Debug, Clone)]
pub struct Ipv4Packet<T> {
    buffer: T,
}

impl<T: AsRef<[u8]>> Ipv4Packet<T> {
    /// Wrap a buffer without checking its length
    pub fn new_unchecked(buffer: T) -> Self {
        Ipv4Packet { buffer }
    }

    /// Wrap a buffer holding at least a version 4 header of the declared
    /// length, with a total length that covers that header
    pub fn new_checked(buffer: T) -> Option<Self> {
        let header = Ipv4Header::from_bytes(buffer.as_ref())?;
        let hlen = header.header_len();
        if hlen < IPV4_HEADER_LEN
            || buffer.as_ref().len() < hlen
            || (header.total_len as usize) < hlen
        {
            return None;
        }
        Some(Ipv4Packet { buffer })
    }

    pub fn into_inner(self) -> T {
        self.buffer
    }

    pub fn as_bytes(&self) -> &[u8] {
        self.buffer.as_ref()
    }

    pub fn header(&self) -> Ipv4Header {
        Ipv4Header::read(self.buffer.as_ref())
    }

    pub fn header_len(&self) -> usize {
        ((self.buffer.as_ref()[0] & 0x0F) as usize) * 4
    }

    pub fn total_len(&self) -> u16 {
        BigEndian::read_u16(&self.buffer.as_ref()[2..4])
    }

    pub fn protocol(&self) -> u8 {
        self.buffer.as_ref()[9]
    }

    pub fn ttl(&self) -> u8 {
        self.buffer.as_ref()[8]
    }

    /// Source address
    pub fn src_addr(&self) -> Ipv4Addr {
        read_ipv4(&self.buffer.as_ref()[12..16])
    }

    /// Destination address
    pub fn dst_addr(&self) -> Ipv4Addr {
        read_ipv4(&self.buffer.as_ref()[16..20])
    }

    /// Option bytes between the fixed header and the payload
    pub fn options(&self) -> &[u8] {
        &self.buffer.as_ref()[IPV4_HEADER_LEN..self.header_len()]
    }

    /// Header checksum over the full header, options included
    pub fn verify_checksum(&self) -> bool {
        verify(&self.buffer.as_ref()[..self.header_len()], None)
    }

    /// Payload bytes as bounded by the total length field
    pub fn payload(&self) -> &[u8] {
        let data = self.buffer.as_ref();
        let hlen = self.header_len();
        let end = (self.total_len() as usize).clamp(hlen, data.len().max(hlen));
        &data[hlen..end]
    }
}

impl<T: AsRef<[u8]> + AsMut<[u8]>> Ipv4Packet<T> {
    pub fn payload_mut(&mut self) -> &mut [u8] {
        let hlen = self.header_len();
        let len = self.buffer.as_ref().len();
        let end = (self.total_len() as usize).clamp(hlen, len.max(hlen));
        &mut self.buffer.as_mut()[hlen..end]
    }

    /// Recompute and store the header checksum
    pub fn fill_checksum(&mut self) {
        let hlen = self.header_len();
        let data = self.buffer.as_mut();
        data[10..12].fill(0);
        let csum = internet_checksum(&data[..hlen]);
        BigEndian::write_u16(&mut data[10..12], csum);
    }
}

/// Inject an IPv4 header into `buf`.
///
/// `options` (a multiple of 4 bytes, at most 40) are copied after the fixed
/// header; IHL, total length (`header + payload_len`) and checksum are
/// computed here, overriding those fields of `header`. The payload region is
/// left untouched.
///
/// # Panics
///
/// If `buf` is shorter than the header plus options, if `options` is not a
/// multiple of 4 bytes or longer than 40, or if the total length does not
/// fit in 16 bits.
pub fn inject<'a>(
    buf: &'a mut [u8],
    header: &Ipv4Header,
    options: &[u8],
    payload_len: usize,
) -> Ipv4Packet<&'a mut [u8]> {
    assert!(
        options.len() % 4 == 0 && options.len() <= IPV4_MAX_HEADER_LEN - IPV4_HEADER_LEN,
        "IPv4 options must be a multiple of 4 bytes, at most 40"
    );
    let hlen = IPV4_HEADER_LEN + options.len();
    assert!(
        hlen + payload_len <= u16::MAX as usize,
        "IPv4 total length exceeds 65535"
    );

    let mut fixed = header.clone();
    fixed.ihl = (hlen / 4) as u8;
    fixed.total_len = (hlen + payload_len) as u16;
    fixed.checksum = 0;

    buf[..IPV4_HEADER_LEN].copy_from_slice(&fixed.to_bytes());
    buf[IPV4_HEADER_LEN..hlen].copy_from_slice(options);

    let mut packet = Ipv4Packet::new_unchecked(buf);
    packet.fill_checksum();
    packet
}

/// Build a new IPv4 packet of header + options + `payload_len` bytes.
///
/// If `payload` is supplied its first `payload_len` bytes are copied in.
pub fn build(
    header: &Ipv4Header,
    options: &[u8],
    payload_len: usize,
    payload: Option<&[u8]>,
) -> Result<Ipv4Packet<Vec<u8>>> {
    let hlen = IPV4_HEADER_LEN + options.len();
    let mut buf = crate::alloc_packet(hlen + payload_len)?;
    inject(&mut buf, header, options, payload_len);
    crate::copy_payload(&mut buf[hlen..], payload);
    Ok(Ipv4Packet::new_unchecked(buf))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_header() -> Ipv4Header {
        Ipv4Header::new(
            0,
            0,
            0x1C46,
            flags::DONT_FRAGMENT,
            64,
            protocol::TCP,
            Ipv4Addr::new(172, 16, 10, 99),
            Ipv4Addr::new(172, 16, 10, 12),
        )
    }

    #[test]
    fn test_header_bytes_roundtrip() {
        let mut header = sample_header();
        header.total_len = 60;
        header.update_checksum();

        let parsed = Ipv4Header::from_bytes(&header.to_bytes()).unwrap();
        assert_eq!(parsed, header);
        assert_eq!(parsed.header_len(), 20);
        assert_eq!(parsed.payload_len(), 40);
        assert!(parsed.dont_fragment());
        assert!(!parsed.more_fragments());
    }

    #[test]
    fn test_from_bytes_rejects_bad_version() {
        let mut bytes = sample_header().to_bytes();
        bytes[0] = 0x65;
        assert!(Ipv4Header::from_bytes(&bytes).is_none());
        assert!(Ipv4Header::from_bytes(&bytes[..19]).is_none());
    }

    #[test]
    fn test_inject_sets_length_and_checksum() {
        let mut buf = [0u8; 64];
        let packet = inject(&mut buf, &sample_header(), &[], 40);

        assert_eq!(packet.total_len(), 60);
        assert_eq!(packet.header_len(), 20);
        assert_eq!(packet.protocol(), protocol::TCP);
        assert_eq!(packet.src_addr(), Ipv4Addr::new(172, 16, 10, 99));
        assert_eq!(packet.dst_addr(), Ipv4Addr::new(172, 16, 10, 12));
        assert!(packet.verify_checksum());
        assert_eq!(packet.payload().len(), 40);
    }

    #[test]
    fn test_known_checksum() {
        // 45 00 00 3c 1c 46 40 00 40 06 [b1 e6] ac 10 0a 63 ac 10 0a 0c
        let mut buf = [0u8; 60];
        let packet = inject(&mut buf, &sample_header(), &[], 40);
        assert_eq!(packet.header().checksum, 0xB1E6);
    }

    #[test]
    fn test_inject_with_options() {
        let options = [0x94, 0x04, 0x00, 0x00]; // router alert
        let mut buf = [0u8; 32];
        let packet = inject(&mut buf, &sample_header(), &options, 8);

        assert_eq!(packet.header_len(), 24);
        assert_eq!(packet.total_len(), 32);
        assert_eq!(packet.options(), &options);
        assert!(packet.verify_checksum());
        assert!(Ipv4Packet::new_checked(&buf[..]).is_some());
    }

    #[test]
    fn test_build_copies_payload() {
        let payload = [0xDE, 0xAD, 0xBE, 0xEF];
        let packet = build(&sample_header(), &[], payload.len(), Some(&payload)).unwrap();
        assert_eq!(packet.as_bytes().len(), 24);
        assert_eq!(packet.payload(), &payload);
        assert!(packet.verify_checksum());
    }

    #[test]
    fn test_new_checked_short_buffer() {
        let mut buf = [0u8; 24];
        inject(&mut buf, &sample_header(), &[0x01, 0x01, 0x01, 0x01], 0);
        assert!(Ipv4Packet::new_checked(&buf[..22]).is_none());
    }

    #[test]
    fn test_new_checked_total_len_below_header() {
        let mut buf = [0u8; 20];
        buf[0] = 0x45;
        assert!(Ipv4Packet::new_checked(&buf[..]).is_none());

        // IHL 6 with total length 20 also stops short of the header
        let mut buf = [0u8; 24];
        inject(&mut buf, &sample_header(), &[0x01, 0x01, 0x01, 0x01], 0);
        buf[2..4].copy_from_slice(&20u16.to_be_bytes());
        assert!(Ipv4Packet::new_checked(&buf[..]).is_none());

        let packet = Ipv4Packet::new_unchecked(&buf[..]);
        assert!(packet.payload().is_empty());
    }

    #[test]
    fn test_payload_bounded_by_buffer() {
        let mut buf = [0u8; 28];
        inject(&mut buf, &sample_header(), &[], 100);
        let packet = Ipv4Packet::new_checked(&buf[..]).unwrap();
        assert_eq!(packet.payload().len(), 8);
    }

    #[test]
    #[should_panic(expected = "multiple of 4")]
    fn test_inject_rejects_unaligned_options() {
        let mut buf = [0u8; 32];
        inject(&mut buf, &sample_header(), &[0x01, 0x01], 0);
    }

    #[test]
    #[should_panic(expected = "exceeds 65535")]
    fn test_inject_rejects_oversized_total_len() {
        let mut buf = [0u8; 20];
        inject(&mut buf, &sample_header(), &[], u16::MAX as usize);
    }
}
