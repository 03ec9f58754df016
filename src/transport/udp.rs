//! UDP (User Datagram Protocol) datagram construction
//!
//! This module provides UDP header parsing and serialization, header
//! injection and the pseudo-header checksum.

use crate::error::Result;
use crate::network::checksum::{checksum, verify, PseudoHeader};
use crate::network::ipv4::{protocol, Ipv4Header};
use byteorder::{BigEndian, ByteOrder};
use std::net::Ipv4Addr;

/// UDP header length in bytes
pub const UDP_HEADER_LEN: usize = 8;

/// UDP packet header structure
///
/// Represents the standard 8-byte UDP header as defined in RFC 768
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UdpHeader {
    pub src_port: u16,
    pub dst_port: u16,
    pub length: u16, // Length of UDP header and data
    pub checksum: u16,
}

impl UdpHeader {
    /// Parse UDP header from byte slice
    ///
    /// Returns None if the data is too short to contain a valid UDP header
    pub fn from_bytes(data: &[u8]) -> Option<Self> {
        if data.len() < UDP_HEADER_LEN {
            return None;
        }

        Some(UdpHeader {
            src_port: BigEndian::read_u16(&data[0..2]),
            dst_port: BigEndian::read_u16(&data[2..4]),
            length: BigEndian::read_u16(&data[4..6]),
            checksum: BigEndian::read_u16(&data[6..8]),
        })
    }

    /// Convert UDP header to bytes
    pub fn to_bytes(&self) -> [u8; UDP_HEADER_LEN] {
        let mut bytes = [0u8; UDP_HEADER_LEN];
        BigEndian::write_u16(&mut bytes[0..2], self.src_port);
        BigEndian::write_u16(&mut bytes[2..4], self.dst_port);
        BigEndian::write_u16(&mut bytes[4..6], self.length);
        BigEndian::write_u16(&mut bytes[6..8], self.checksum);
        bytes
    }
}

/// Typed view over a UDP datagram held in `T`
#[derive(Debug, Clone)]
pub struct UdpDatagram<T> {
    buffer: T,
}

impl<T: AsRef<[u8]>> UdpDatagram<T> {
    pub fn new_unchecked(buffer: T) -> Self {
        UdpDatagram { buffer }
    }

    pub fn new_checked(buffer: T) -> Option<Self> {
        if buffer.as_ref().len() < UDP_HEADER_LEN {
            return None;
        }
        Some(UdpDatagram { buffer })
    }

    pub fn into_inner(self) -> T {
        self.buffer
    }

    pub fn as_bytes(&self) -> &[u8] {
        self.buffer.as_ref()
    }

    pub fn header(&self) -> UdpHeader {
        let data = self.buffer.as_ref();
        UdpHeader {
            src_port: BigEndian::read_u16(&data[0..2]),
            dst_port: BigEndian::read_u16(&data[2..4]),
            length: BigEndian::read_u16(&data[4..6]),
            checksum: BigEndian::read_u16(&data[6..8]),
        }
    }

    pub fn src_port(&self) -> u16 {
        BigEndian::read_u16(&self.buffer.as_ref()[0..2])
    }

    pub fn dst_port(&self) -> u16 {
        BigEndian::read_u16(&self.buffer.as_ref()[2..4])
    }

    /// Header + payload length as carried in the datagram
    pub fn length(&self) -> u16 {
        BigEndian::read_u16(&self.buffer.as_ref()[4..6])
    }

    pub fn checksum(&self) -> u16 {
        BigEndian::read_u16(&self.buffer.as_ref()[6..8])
    }

    /// Payload bounded by the length field when it fits the buffer
    pub fn payload(&self) -> &[u8] {
        let data = self.buffer.as_ref();
        let end = (self.length() as usize).clamp(UDP_HEADER_LEN, data.len());
        &data[UDP_HEADER_LEN..end]
    }

    /// Verify the checksum against a pseudo-header. A zero checksum means
    /// the sender did not compute one and is accepted.
    pub fn verify_checksum(&self, src: Ipv4Addr, dst: Ipv4Addr) -> bool {
        if self.checksum() == 0 {
            return true;
        }
        let len = self.length();
        let data = self.buffer.as_ref();
        let Some(datagram) = data.get(..len as usize) else {
            return false;
        };
        let pseudo = PseudoHeader::new(src, dst, protocol::UDP, len);
        verify(datagram, Some(&pseudo))
    }
}

impl<T: AsRef<[u8]> + AsMut<[u8]>> UdpDatagram<T> {
    pub fn payload_mut(&mut self) -> &mut [u8] {
        &mut self.buffer.as_mut()[UDP_HEADER_LEN..]
    }

    /// Compute the checksum against `ip` and store it
    pub fn fill_checksum(&mut self, ip: &Ipv4Header) {
        let csum = udp_checksum4(self.buffer.as_mut(), ip);
        BigEndian::write_u16(&mut self.buffer.as_mut()[6..8], csum);
    }
}

/// UDP checksum of the datagram at the start of `datagram`.
///
/// The summed length is the datagram's own length field; addresses and
/// protocol come from `ip`. A computed zero is returned as 0xFFFF since a
/// zero on the wire means "no checksum". The checksum field is zeroed first.
///
/// # Panics
///
/// If `datagram` is shorter than its length field.
pub fn udp_checksum4(datagram: &mut [u8], ip: &Ipv4Header) -> u16 {
    let len = BigEndian::read_u16(&datagram[4..6]);
    datagram[6..8].fill(0);
    let pseudo = PseudoHeader::new(ip.src_addr, ip.dst_addr, ip.protocol, len);
    match checksum(&datagram[..len as usize], Some(&pseudo)) {
        0 => 0xFFFF,
        csum => csum,
    }
}

/// Inject a UDP header into `buf`; length is header + `payload_len`,
/// checksum zero.
pub fn inject(
    buf: &mut [u8],
    src_port: u16,
    dst_port: u16,
    payload_len: usize,
) -> UdpDatagram<&mut [u8]> {
    let header = UdpHeader {
        src_port,
        dst_port,
        length: (UDP_HEADER_LEN + payload_len) as u16,
        checksum: 0,
    };
    buf[..UDP_HEADER_LEN].copy_from_slice(&header.to_bytes());
    UdpDatagram::new_unchecked(buf)
}

/// Build a new UDP datagram of header + `payload_len` bytes.
pub fn build(
    src_port: u16,
    dst_port: u16,
    payload_len: usize,
    payload: Option<&[u8]>,
) -> Result<UdpDatagram<Vec<u8>>> {
    let mut buf = crate::alloc_packet(UDP_HEADER_LEN + payload_len)?;
    inject(&mut buf, src_port, dst_port, payload_len);
    crate::copy_payload(&mut buf[UDP_HEADER_LEN..], payload);
    Ok(UdpDatagram::new_unchecked(buf))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ip_for(src: Ipv4Addr, dst: Ipv4Addr, udp_len: usize) -> Ipv4Header {
        Ipv4Header::new_simple(protocol::UDP, src, dst, udp_len as u16)
    }

    #[test]
    fn test_inject_sets_length() {
        let mut buf = [0xAAu8; 20];
        let datagram = inject(&mut buf, 5353, 53, 12);
        assert_eq!(datagram.src_port(), 5353);
        assert_eq!(datagram.dst_port(), 53);
        assert_eq!(datagram.length(), 20);
        assert_eq!(datagram.checksum(), 0);
        assert_eq!(datagram.payload(), &[0xAA; 12]);
    }

    #[test]
    fn test_build_copies_payload() {
        let datagram = build(1000, 2000, 5, Some(b"hello")).unwrap();
        assert_eq!(datagram.as_bytes().len(), 13);
        assert_eq!(datagram.payload(), b"hello");
        assert_eq!(
            UdpHeader::from_bytes(datagram.as_bytes()).unwrap().length,
            13
        );
    }

    #[test]
    fn test_build_without_payload_is_zeroed() {
        let datagram = build(1, 2, 4, None).unwrap();
        assert_eq!(datagram.payload(), &[0, 0, 0, 0]);
    }

    #[test]
    fn test_fill_checksum_verifies() {
        let src = Ipv4Addr::new(192, 168, 0, 2);
        let dst = Ipv4Addr::new(8, 8, 8, 8);
        let mut datagram = build(33000, 53, 3, Some(b"abc")).unwrap();
        datagram.fill_checksum(&ip_for(src, dst, 11));

        assert_ne!(datagram.checksum(), 0);
        assert!(datagram.verify_checksum(src, dst));

        datagram.payload_mut()[0] = b'x';
        assert!(!datagram.verify_checksum(src, dst));
    }

    #[test]
    fn test_zero_checksum_is_not_verified() {
        let datagram = build(1, 2, 0, None).unwrap();
        assert!(datagram.verify_checksum(Ipv4Addr::LOCALHOST, Ipv4Addr::LOCALHOST));
    }

    #[test]
    fn test_payload_bounded_by_length_field() {
        let mut buf = [0u8; 16];
        inject(&mut buf, 1, 2, 2);
        let datagram = UdpDatagram::new_checked(&buf[..]).unwrap();
        assert_eq!(datagram.payload().len(), 2);
        assert!(UdpDatagram::new_checked(&buf[..7]).is_none());
    }
}
