//! ICMP (Internet Control Message Protocol) for IPv4
//!
//! This module provides ICMP message construction and parsing. Messages are
//! the 8-byte header defined in RFC 792 followed by a payload; the checksum
//! covers header and payload, with the length taken from the enclosing
//! IPv4 header.

use crate::error::Result;
use crate::network::checksum::{internet_checksum, verify};
use crate::network::ipv4::Ipv4Header;
use byteorder::{BigEndian, ByteOrder};
use rand::RngCore;

/// ICMP header length in bytes
pub const ICMP_HEADER_LEN: usize = 8;

/// ICMP message types
pub const ICMP_TYPE_ECHO_REPLY: u8 = 0;
pub const ICMP_TYPE_DEST_UNREACHABLE: u8 = 3;
pub const ICMP_TYPE_SOURCE_QUENCH: u8 = 4;
pub const ICMP_TYPE_REDIRECT: u8 = 5;
pub const ICMP_TYPE_ECHO_REQUEST: u8 = 8;
pub const ICMP_TYPE_TIME_EXCEEDED: u8 = 11;
pub const ICMP_TYPE_PARAMETER_PROBLEM: u8 = 12;
pub const ICMP_TYPE_TIMESTAMP: u8 = 13;
pub const ICMP_TYPE_TIMESTAMP_REPLY: u8 = 14;
pub const ICMP_TYPE_INFO_REQUEST: u8 = 15;
pub const ICMP_TYPE_INFO_REPLY: u8 = 16;

/// ICMP packet header structure
///
/// Represents the standard 8-byte ICMP header as defined in RFC 792
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IcmpHeader {
    pub msg_type: u8,  // ICMP message type
    pub msg_code: u8,  // ICMP message code
    pub checksum: u16, // ICMP checksum
    pub rest: [u8; 4], // Type-specific data (e.g., identifier and sequence for echo)
}

impl IcmpHeader {
    /// Parse ICMP header from byte slice
    ///
    /// Returns None if the data is too short to contain a valid ICMP header
    pub fn from_bytes(data: &[u8]) -> Option<Self> {
        if data.len() < ICMP_HEADER_LEN {
            return None;
        }

        Some(Self::read(data))
    }

    fn read(data: &[u8]) -> Self {
        let mut rest = [0u8; 4];
        rest.copy_from_slice(&data[4..8]);
        IcmpHeader {
            msg_type: data[0],
            msg_code: data[1],
            checksum: BigEndian::read_u16(&data[2..4]),
            rest,
        }
    }

    /// Convert ICMP header to bytes
    pub fn to_bytes(&self) -> [u8; ICMP_HEADER_LEN] {
        let mut bytes = [0u8; ICMP_HEADER_LEN];
        bytes[0] = self.msg_type;
        bytes[1] = self.msg_code;
        BigEndian::write_u16(&mut bytes[2..4], self.checksum);
        bytes[4..8].copy_from_slice(&self.rest);
        bytes
    }

    /// Check if this is an Echo Request message
    pub fn is_echo_request(&self) -> bool {
        self.msg_type == ICMP_TYPE_ECHO_REQUEST
    }

    /// Check if this is an Echo Reply message
    pub fn is_echo_reply(&self) -> bool {
        self.msg_type == ICMP_TYPE_ECHO_REPLY
    }

    /// Get the identifier field for Echo Request/Reply messages
    pub fn identifier(&self) -> u16 {
        BigEndian::read_u16(&self.rest[0..2])
    }

    /// Get the sequence number field for Echo Request/Reply messages
    pub fn sequence(&self) -> u16 {
        BigEndian::read_u16(&self.rest[2..4])
    }

    /// Set the identifier field for Echo Request/Reply messages
    pub fn set_identifier(&mut self, id: u16) {
        BigEndian::write_u16(&mut self.rest[0..2], id);
    }

    /// Set the sequence number field for Echo Request/Reply messages
    pub fn set_sequence(&mut self, seq: u16) {
        BigEndian::write_u16(&mut self.rest[2..4], seq);
    }
}

/// Typed view over an ICMP message held in `T`
#[derive(Debug, Clone)]
pub struct IcmpMessage<T> {
    buffer: T,
}

impl<T: AsRef<[u8]>> IcmpMessage<T> {
    pub fn new_unchecked(buffer: T) -> Self {
        IcmpMessage { buffer }
    }

    pub fn new_checked(buffer: T) -> Option<Self> {
        if buffer.as_ref().len() < ICMP_HEADER_LEN {
            return None;
        }
        Some(IcmpMessage { buffer })
    }

    pub fn into_inner(self) -> T {
        self.buffer
    }

    pub fn as_bytes(&self) -> &[u8] {
        self.buffer.as_ref()
    }

    pub fn header(&self) -> IcmpHeader {
        IcmpHeader::read(self.buffer.as_ref())
    }

    pub fn msg_type(&self) -> u8 {
        self.buffer.as_ref()[0]
    }

    pub fn msg_code(&self) -> u8 {
        self.buffer.as_ref()[1]
    }

    pub fn checksum(&self) -> u16 {
        BigEndian::read_u16(&self.buffer.as_ref()[2..4])
    }

    pub fn identifier(&self) -> u16 {
        BigEndian::read_u16(&self.buffer.as_ref()[4..6])
    }

    pub fn sequence(&self) -> u16 {
        BigEndian::read_u16(&self.buffer.as_ref()[6..8])
    }

    pub fn payload(&self) -> &[u8] {
        &self.buffer.as_ref()[ICMP_HEADER_LEN..]
    }

    /// Verify the checksum over the whole buffer
    pub fn verify_checksum(&self) -> bool {
        verify(self.buffer.as_ref(), None)
    }
}

impl<T: AsRef<[u8]> + AsMut<[u8]>> IcmpMessage<T> {
    pub fn payload_mut(&mut self) -> &mut [u8] {
        &mut self.buffer.as_mut()[ICMP_HEADER_LEN..]
    }

    /// Compute the checksum against `ip` and store it
    pub fn fill_checksum(&mut self, ip: &Ipv4Header) {
        let csum = icmp4_checksum(self.buffer.as_mut(), ip);
        BigEndian::write_u16(&mut self.buffer.as_mut()[2..4], csum);
    }
}

/// ICMP checksum of the message at the start of `icmp`.
///
/// The message length is the IPv4 total length minus the IPv4 header
/// length. The checksum field is zeroed first; storing the returned value is
/// left to the caller.
///
/// # Panics
///
/// If `icmp` is shorter than the length announced by `ip`.
pub fn icmp4_checksum(icmp: &mut [u8], ip: &Ipv4Header) -> u16 {
    icmp[2..4].fill(0);
    internet_checksum(&icmp[..ip.payload_len()])
}

/// Inject a bare ICMP header: 8 zero bytes with type and code set.
pub fn inject_header(buf: &mut [u8], msg_type: u8, msg_code: u8) -> IcmpMessage<&mut [u8]> {
    buf[..ICMP_HEADER_LEN].fill(0);
    buf[0] = msg_type;
    buf[1] = msg_code;
    IcmpMessage::new_unchecked(buf)
}

/// Build a new ICMP message of header + `payload_len` bytes.
///
/// The checksum is computed when the enclosing IPv4 header is supplied.
pub fn build(
    msg_type: u8,
    msg_code: u8,
    ip: Option<&Ipv4Header>,
    payload_len: usize,
    payload: Option<&[u8]>,
) -> Result<IcmpMessage<Vec<u8>>> {
    let mut buf = crate::alloc_packet(ICMP_HEADER_LEN + payload_len)?;
    inject_header(&mut buf, msg_type, msg_code);
    crate::copy_payload(&mut buf[ICMP_HEADER_LEN..], payload);

    let mut message = IcmpMessage::new_unchecked(buf);
    if let Some(ip) = ip {
        message.fill_checksum(ip);
    }
    Ok(message)
}

/// Inject an echo request into `buf` and fill its checksum.
///
/// Without a `payload`, the `payload_len` bytes after the header are filled
/// with random data.
pub fn inject_echo_request<'a>(
    buf: &'a mut [u8],
    id: u16,
    seq: u16,
    ip: &Ipv4Header,
    payload_len: usize,
    payload: Option<&[u8]>,
) -> IcmpMessage<&'a mut [u8]> {
    buf[0] = ICMP_TYPE_ECHO_REQUEST;
    buf[1] = 0;
    BigEndian::write_u16(&mut buf[4..6], id);
    BigEndian::write_u16(&mut buf[6..8], seq);

    let data = &mut buf[ICMP_HEADER_LEN..ICMP_HEADER_LEN + payload_len];
    match payload {
        Some(payload) => data.copy_from_slice(&payload[..payload_len]),
        None => rand::thread_rng().fill_bytes(data),
    }

    let mut message = IcmpMessage::new_unchecked(buf);
    message.fill_checksum(ip);
    message
}

/// Build a new echo request, see [`inject_echo_request`].
pub fn build_echo_request(
    id: u16,
    seq: u16,
    ip: &Ipv4Header,
    payload_len: usize,
    payload: Option<&[u8]>,
) -> Result<IcmpMessage<Vec<u8>>> {
    let mut buf = crate::alloc_packet(ICMP_HEADER_LEN + payload_len)?;
    inject_echo_request(&mut buf, id, seq, ip, payload_len, payload);
    Ok(IcmpMessage::new_unchecked(buf))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::network::ipv4::protocol;
    use std::net::Ipv4Addr;

    fn ip_for(icmp_len: usize) -> Ipv4Header {
        Ipv4Header::new_simple(
            protocol::ICMP,
            Ipv4Addr::new(192, 168, 0, 10),
            Ipv4Addr::new(192, 168, 0, 1),
            icmp_len as u16,
        )
    }

    #[test]
    fn test_header_identifier_sequence() {
        let mut header = IcmpHeader::from_bytes(&[8, 0, 0, 0, 0, 0, 0, 0]).unwrap();
        header.set_identifier(0x1234);
        header.set_sequence(7);
        assert!(header.is_echo_request());
        assert!(!header.is_echo_reply());

        let parsed = IcmpHeader::from_bytes(&header.to_bytes()).unwrap();
        assert_eq!(parsed.identifier(), 0x1234);
        assert_eq!(parsed.sequence(), 7);
    }

    #[test]
    fn test_echo_request_fields_and_checksum() {
        let payload = b"abcdefghijklmnop";
        let ip = ip_for(ICMP_HEADER_LEN + payload.len());
        let message = build_echo_request(0xBEEF, 3, &ip, payload.len(), Some(payload)).unwrap();

        assert_eq!(message.msg_type(), ICMP_TYPE_ECHO_REQUEST);
        assert_eq!(message.msg_code(), 0);
        assert_eq!(message.identifier(), 0xBEEF);
        assert_eq!(message.sequence(), 3);
        assert_eq!(message.payload(), payload);
        assert!(message.verify_checksum());
    }

    #[test]
    fn test_echo_request_known_checksum() {
        // type 8, id 1, seq 1, no payload: 0x0800 + 0x0001 + 0x0001 = 0x0802
        let ip = ip_for(ICMP_HEADER_LEN);
        let mut buf = [0u8; ICMP_HEADER_LEN];
        let message = inject_echo_request(&mut buf, 1, 1, &ip, 0, None);
        assert_eq!(message.checksum(), !0x0802u16);
    }

    #[test]
    fn test_echo_request_random_payload() {
        let ip = ip_for(ICMP_HEADER_LEN + 56);
        let first = build_echo_request(1, 1, &ip, 56, None).unwrap();
        let second = build_echo_request(1, 1, &ip, 56, None).unwrap();

        assert_eq!(first.payload().len(), 56);
        assert!(first.verify_checksum());
        assert!(second.verify_checksum());
        assert_ne!(first.payload(), second.payload());
    }

    #[test]
    fn test_odd_length_message() {
        let ip = ip_for(ICMP_HEADER_LEN + 3);
        let message = build_echo_request(9, 9, &ip, 3, Some(&[1, 2, 3])).unwrap();
        assert!(message.verify_checksum());
    }

    #[test]
    fn test_generic_build_with_and_without_ip() {
        let ip = ip_for(ICMP_HEADER_LEN + 4);
        let message = build(ICMP_TYPE_TIMESTAMP, 0, Some(&ip), 4, Some(&[9, 8, 7, 6])).unwrap();
        assert_eq!(message.msg_type(), ICMP_TYPE_TIMESTAMP);
        assert!(message.verify_checksum());

        let bare = build(ICMP_TYPE_DEST_UNREACHABLE, 3, None, 4, None).unwrap();
        assert_eq!(bare.checksum(), 0);
        assert_eq!(bare.payload(), &[0, 0, 0, 0]);
    }

    #[test]
    fn test_inject_header_clears_previous_content() {
        let mut buf = [0xAAu8; 12];
        let message = inject_header(&mut buf, ICMP_TYPE_ECHO_REPLY, 0);
        assert_eq!(&message.as_bytes()[..8], &[0u8; 8]);
        assert_eq!(message.payload(), &[0xAA; 4]);
    }
}
