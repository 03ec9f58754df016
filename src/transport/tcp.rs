//! TCP (Transmission Control Protocol) segment construction
//!
//! This module provides TCP header parsing and serialization, header
//! injection and the pseudo-header checksum. Segments are built with the
//! fixed 20-byte header; there is no connection state here.

use crate::error::Result;
use crate::network::checksum::{checksum, verify, PseudoHeader};
use crate::network::ipv4::Ipv4Header;
use byteorder::{BigEndian, ByteOrder};

/// TCP header length without options
pub const TCP_HEADER_LEN: usize = 20;
/// Data offset of an option-less header, in 32-bit words
const TCP_DATA_OFFSET: u8 = 5;

/// TCP flag bits
pub mod flags {
    pub const FIN: u8 = 0x01;
    pub const SYN: u8 = 0x02;
    pub const RST: u8 = 0x04;
    pub const PSH: u8 = 0x08;
    pub const ACK: u8 = 0x10;
    pub const URG: u8 = 0x20;
    pub const ECE: u8 = 0x40;
    pub const CWR: u8 = 0x80;
}

/// TCP packet header structure
///
/// Represents the standard 20-byte TCP header as defined in RFC 793
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TcpHeader {
    pub src_port: u16,
    pub dst_port: u16,
    pub seq_number: u32,
    pub ack_number: u32,
    pub data_offset: u8, // Header length in 32-bit words (high nibble on the wire)
    pub flags: u8,
    pub window_size: u16,
    pub checksum: u16,
    pub urgent_ptr: u16,
}

impl TcpHeader {
    /// Create a header with a 20-byte data offset and zero checksum
    pub fn new(
        src_port: u16,
        dst_port: u16,
        seq_number: u32,
        ack_number: u32,
        flags: u8,
        window_size: u16,
        urgent_ptr: u16,
    ) -> Self {
        TcpHeader {
            src_port,
            dst_port,
            seq_number,
            ack_number,
            data_offset: TCP_DATA_OFFSET,
            flags,
            window_size,
            checksum: 0,
            urgent_ptr,
        }
    }

    /// Parse TCP header from byte slice
    ///
    /// Returns None if the data is too short to contain a valid TCP header
    pub fn from_bytes(data: &[u8]) -> Option<Self> {
        if data.len() < TCP_HEADER_LEN {
            return None;
        }

        Some(TcpHeader {
            src_port: BigEndian::read_u16(&data[0..2]),
            dst_port: BigEndian::read_u16(&data[2..4]),
            seq_number: BigEndian::read_u32(&data[4..8]),
            ack_number: BigEndian::read_u32(&data[8..12]),
            data_offset: data[12] >> 4,
            flags: data[13],
            window_size: BigEndian::read_u16(&data[14..16]),
            checksum: BigEndian::read_u16(&data[16..18]),
            urgent_ptr: BigEndian::read_u16(&data[18..20]),
        })
    }

    /// Convert TCP header to bytes
    pub fn to_bytes(&self) -> [u8; TCP_HEADER_LEN] {
        let mut bytes = [0u8; TCP_HEADER_LEN];
        BigEndian::write_u16(&mut bytes[0..2], self.src_port);
        BigEndian::write_u16(&mut bytes[2..4], self.dst_port);
        BigEndian::write_u32(&mut bytes[4..8], self.seq_number);
        BigEndian::write_u32(&mut bytes[8..12], self.ack_number);
        bytes[12] = self.data_offset << 4;
        bytes[13] = self.flags;
        BigEndian::write_u16(&mut bytes[14..16], self.window_size);
        BigEndian::write_u16(&mut bytes[16..18], self.checksum);
        BigEndian::write_u16(&mut bytes[18..20], self.urgent_ptr);
        bytes
    }

    /// Check if SYN flag is set
    pub fn is_syn(&self) -> bool {
        (self.flags & flags::SYN) != 0
    }

    /// Check if ACK flag is set
    pub fn is_ack(&self) -> bool {
        (self.flags & flags::ACK) != 0
    }

    /// Check if FIN flag is set
    pub fn is_fin(&self) -> bool {
        (self.flags & flags::FIN) != 0
    }

    /// Check if RST flag is set
    pub fn is_rst(&self) -> bool {
        (self.flags & flags::RST) != 0
    }

    /// Check if PSH flag is set
    pub fn is_psh(&self) -> bool {
        (self.flags & flags::PSH) != 0
    }

    /// Check if URG flag is set
    pub fn is_urg(&self) -> bool {
        (self.flags & flags::URG) != 0
    }

    /// Get the data offset (header length) in bytes
    pub fn header_len(&self) -> usize {
        (self.data_offset as usize) * 4
    }
}

/// Typed view over a TCP segment held in `T`
#[derive(Debug, Clone)]
pub struct TcpSegment<T> {
    buffer: T,
}

impl<T: AsRef<[u8]>> TcpSegment<T> {
    pub fn new_unchecked(buffer: T) -> Self {
        TcpSegment { buffer }
    }

    /// Wrap a buffer holding a header whose data offset is at least 5 words
    /// and fits in the buffer
    pub fn new_checked(buffer: T) -> Option<Self> {
        let data = buffer.as_ref();
        if data.len() < TCP_HEADER_LEN {
            return None;
        }
        let offset = data[12] >> 4;
        if offset < TCP_DATA_OFFSET || (offset as usize) * 4 > data.len() {
            return None;
        }
        Some(TcpSegment { buffer })
    }

    pub fn into_inner(self) -> T {
        self.buffer
    }

    pub fn as_bytes(&self) -> &[u8] {
        self.buffer.as_ref()
    }

    pub fn header(&self) -> TcpHeader {
        let data = self.buffer.as_ref();
        TcpHeader {
            src_port: BigEndian::read_u16(&data[0..2]),
            dst_port: BigEndian::read_u16(&data[2..4]),
            seq_number: BigEndian::read_u32(&data[4..8]),
            ack_number: BigEndian::read_u32(&data[8..12]),
            data_offset: data[12] >> 4,
            flags: data[13],
            window_size: BigEndian::read_u16(&data[14..16]),
            checksum: BigEndian::read_u16(&data[16..18]),
            urgent_ptr: BigEndian::read_u16(&data[18..20]),
        }
    }

    pub fn src_port(&self) -> u16 {
        BigEndian::read_u16(&self.buffer.as_ref()[0..2])
    }

    pub fn dst_port(&self) -> u16 {
        BigEndian::read_u16(&self.buffer.as_ref()[2..4])
    }

    pub fn checksum(&self) -> u16 {
        BigEndian::read_u16(&self.buffer.as_ref()[16..18])
    }

    pub fn header_len(&self) -> usize {
        ((self.buffer.as_ref()[12] >> 4) as usize) * 4
    }

    pub fn payload(&self) -> &[u8] {
        &self.buffer.as_ref()[self.header_len()..]
    }

    /// Verify the checksum against the pseudo-header taken from `ip`, over
    /// the segment length `ip` announces
    pub fn verify_checksum(&self, ip: &Ipv4Header) -> bool {
        let len = ip.payload_len();
        let Some(segment) = self.buffer.as_ref().get(..len) else {
            return false;
        };
        let pseudo = PseudoHeader::new(ip.src_addr, ip.dst_addr, ip.protocol, len as u16);
        verify(segment, Some(&pseudo))
    }
}

impl<T: AsRef<[u8]> + AsMut<[u8]>> TcpSegment<T> {
    pub fn payload_mut(&mut self) -> &mut [u8] {
        let hlen = self.header_len();
        &mut self.buffer.as_mut()[hlen..]
    }

    /// Compute the checksum against `ip` and store it
    pub fn fill_checksum(&mut self, ip: &Ipv4Header) {
        let csum = tcp_checksum4(self.buffer.as_mut(), ip);
        BigEndian::write_u16(&mut self.buffer.as_mut()[16..18], csum);
    }
}

/// TCP checksum of the segment at the start of `segment`.
///
/// The segment length is the IPv4 total length minus the IPv4 header
/// length; the pseudo-header takes addresses and protocol from `ip`. The
/// checksum field is zeroed first and the result is returned, not stored.
///
/// # Panics
///
/// If `segment` is shorter than the length announced by `ip`.
pub fn tcp_checksum4(segment: &mut [u8], ip: &Ipv4Header) -> u16 {
    let len = ip.payload_len();
    segment[16..18].fill(0);
    let pseudo = PseudoHeader::new(ip.src_addr, ip.dst_addr, ip.protocol, len as u16);
    checksum(&segment[..len], Some(&pseudo))
}

/// Inject a TCP header into `buf`, payload untouched.
///
/// The data offset is always 5 (20 bytes) and the checksum zero.
pub fn inject<'a>(buf: &'a mut [u8], header: &TcpHeader) -> TcpSegment<&'a mut [u8]> {
    let mut fixed = *header;
    fixed.data_offset = TCP_DATA_OFFSET;
    fixed.checksum = 0;
    buf[..TCP_HEADER_LEN].copy_from_slice(&fixed.to_bytes());
    TcpSegment::new_unchecked(buf)
}

/// Build a new TCP segment of header + `payload_len` bytes.
pub fn build(
    header: &TcpHeader,
    payload_len: usize,
    payload: Option<&[u8]>,
) -> Result<TcpSegment<Vec<u8>>> {
    let mut buf = crate::alloc_packet(TCP_HEADER_LEN + payload_len)?;
    inject(&mut buf, header);
    crate::copy_payload(&mut buf[TCP_HEADER_LEN..], payload);
    Ok(TcpSegment::new_unchecked(buf))
}
