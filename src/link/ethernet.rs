//! Ethernet II framing
//!
//! Only the 14-byte header is handled here: destination, source and
//! EtherType. The frame check sequence is left to the hardware.

use crate::addr::{read_hwaddr, HwAddr, HWADDR_LEN};
use crate::error::Result;
use byteorder::{BigEndian, ByteOrder};

/// Ethernet header length (two addresses + EtherType)
pub const ETH_HDR_SIZE: usize = 14;
/// Minimum payload, shorter frames are padded by the sender
pub const ETH_MIN_PAYLOAD: usize = 46;
/// Maximum payload (MTU)
pub const ETH_MAX_PAYLOAD: usize = 1500;
/// Maximum frame length including the 4-byte FCS
pub const ETH_FRAME_MAX: usize = 1518;

/// EtherType values
pub mod ethertype {
    pub const PUP: u16 = 0x0200;
    pub const IPV4: u16 = 0x0800;
    pub const ARP: u16 = 0x0806;
    pub const RARP: u16 = 0x8035;
}

/// Ethernet header structure
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EthHeader {
    pub dst: HwAddr,
    pub src: HwAddr,
    pub ethertype: u16,
}

impl EthHeader {
    pub fn new(src: HwAddr, dst: HwAddr, ethertype: u16) -> Self {
        EthHeader {
            dst,
            src,
            ethertype,
        }
    }

    /// Parse an Ethernet header, None if `data` is shorter than 14 bytes
    pub fn from_bytes(data: &[u8]) -> Option<Self> {
        if data.len() < ETH_HDR_SIZE {
            return None;
        }
        Some(Self::read(data))
    }

    fn read(data: &[u8]) -> Self {
        EthHeader {
            dst: read_hwaddr(&data[0..HWADDR_LEN]),
            src: read_hwaddr(&data[HWADDR_LEN..2 * HWADDR_LEN]),
            ethertype: BigEndian::read_u16(&data[12..14]),
        }
    }

    pub fn to_bytes(&self) -> [u8; ETH_HDR_SIZE] {
        let mut bytes = [0u8; ETH_HDR_SIZE];
        bytes[0..6].copy_from_slice(&self.dst.0);
        bytes[6..12].copy_from_slice(&self.src.0);
        BigEndian::write_u16(&mut bytes[12..14], self.ethertype);
        bytes
    }
}

/// Typed view over an Ethernet frame held in `T`
#[derive(Debug, Clone)]
pub struct EthernetFrame<T> {
    buffer: T,
}

impl<T: AsRef<[u8]>> EthernetFrame<T> {
    pub fn new_unchecked(buffer: T) -> Self {
        EthernetFrame { buffer }
    }

    pub fn new_checked(buffer: T) -> Option<Self> {
        if buffer.as_ref().len() < ETH_HDR_SIZE {
            return None;
        }
        Some(EthernetFrame { buffer })
    }

    pub fn into_inner(self) -> T {
        self.buffer
    }

    pub fn as_bytes(&self) -> &[u8] {
        self.buffer.as_ref()
    }

    pub fn header(&self) -> EthHeader {
        EthHeader::read(self.buffer.as_ref())
    }

    pub fn dst_addr(&self) -> HwAddr {
        read_hwaddr(&self.buffer.as_ref()[0..6])
    }

    pub fn src_addr(&self) -> HwAddr {
        read_hwaddr(&self.buffer.as_ref()[6..12])
    }

    pub fn ethertype(&self) -> u16 {
        BigEndian::read_u16(&self.buffer.as_ref()[12..14])
    }

    pub fn payload(&self) -> &[u8] {
        &self.buffer.as_ref()[ETH_HDR_SIZE..]
    }
}

impl<T: AsRef<[u8]> + AsMut<[u8]>> EthernetFrame<T> {
    pub fn payload_mut(&mut self) -> &mut [u8] {
        &mut self.buffer.as_mut()[ETH_HDR_SIZE..]
    }
}

/// Inject an Ethernet header into `buf`, payload untouched.
pub fn inject(
    buf: &mut [u8],
    src: HwAddr,
    dst: HwAddr,
    ethertype: u16,
) -> EthernetFrame<&mut [u8]> {
    buf[..ETH_HDR_SIZE].copy_from_slice(&EthHeader::new(src, dst, ethertype).to_bytes());
    EthernetFrame::new_unchecked(buf)
}

/// Build a new frame of 14 + `payload_len` bytes.
///
/// No minimum-size padding is applied; `payload_len` is taken as given.
pub fn build(
    src: HwAddr,
    dst: HwAddr,
    ethertype: u16,
    payload_len: usize,
    payload: Option<&[u8]>,
) -> Result<EthernetFrame<Vec<u8>>> {
    let mut buf = crate::alloc_packet(ETH_HDR_SIZE + payload_len)?;
    inject(&mut buf, src, dst, ethertype);
    crate::copy_payload(&mut buf[ETH_HDR_SIZE..], payload);
    Ok(EthernetFrame::new_unchecked(buf))
}

#[cfg(test)]
mod tests {
    use super::*;

    const SRC: HwAddr = HwAddr([0x02, 0x00, 0x00, 0x00, 0x00, 0x01]);

    #[test]
    fn test_inject_layout() {
        let mut buf = [0x55u8; 20];
        let frame = inject(&mut buf, SRC, HwAddr::BROADCAST, ethertype::ARP);

        assert_eq!(&frame.as_bytes()[0..6], &[0xFF; 6]);
        assert_eq!(&frame.as_bytes()[6..12], &SRC.0);
        assert_eq!(&frame.as_bytes()[12..14], &[0x08, 0x06]);
        assert_eq!(frame.payload(), &[0x55; 6]);
        assert_eq!(frame.dst_addr(), HwAddr::BROADCAST);
        assert_eq!(frame.src_addr(), SRC);
    }

    #[test]
    fn test_build_with_payload() {
        let frame = build(SRC, SRC, ethertype::IPV4, 4, Some(&[1, 2, 3, 4, 5])).unwrap();
        assert_eq!(frame.as_bytes().len(), ETH_HDR_SIZE + 4);
        assert_eq!(frame.payload(), &[1, 2, 3, 4]);
        assert_eq!(frame.ethertype(), ethertype::IPV4);
    }

    #[test]
    fn test_build_zero_payload() {
        let frame = build(SRC, HwAddr::BROADCAST, ethertype::RARP, 0, None).unwrap();
        assert_eq!(frame.as_bytes().len(), ETH_HDR_SIZE);
        assert!(frame.payload().is_empty());
        assert_eq!(frame.header().ethertype, 0x8035);
    }

    #[test]
    fn test_header_parse() {
        let header = EthHeader::new(SRC, HwAddr::BROADCAST, ethertype::PUP);
        assert_eq!(EthHeader::from_bytes(&header.to_bytes()), Some(header));
        assert_eq!(EthHeader::from_bytes(&[0u8; 13]), None);
        assert!(EthernetFrame::new_checked(&[0u8; 13][..]).is_none());
    }

    #[test]
    fn test_payload_mut() {
        let mut frame = build(SRC, SRC, ethertype::IPV4, 2, None).unwrap();
        frame.payload_mut().copy_from_slice(&[0xAB, 0xCD]);
        assert_eq!(&frame.into_inner()[14..], &[0xAB, 0xCD]);
    }
}
