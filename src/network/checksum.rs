//! Internet checksum (RFC 1071)
//!
//! One algorithm serves every protocol in the crate: sum the region as
//! big-endian 16-bit words into a 32-bit accumulator, fold the carries back
//! into the low 16 bits and take the one's complement. Transport protocols
//! additionally fold in an IPv4 pseudo-header.

use std::net::Ipv4Addr;

/// IPv4 pseudo-header prepended to the TCP and UDP checksum (RFC 793, RFC 768).
///
/// It is only summed, never transmitted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PseudoHeader {
    pub src: Ipv4Addr,
    pub dst: Ipv4Addr,
    pub protocol: u8,
    /// Transport header + payload length
    pub length: u16,
}

impl PseudoHeader {
    pub fn new(src: Ipv4Addr, dst: Ipv4Addr, protocol: u8, length: u16) -> Self {
        PseudoHeader {
            src,
            dst,
            protocol,
            length,
        }
    }

    /// Unfolded sum of the 12 pseudo-header bytes
    pub fn sum(&self) -> u32 {
        let mut bytes = [0u8; 12];
        bytes[0..4].copy_from_slice(&self.src.octets());
        bytes[4..8].copy_from_slice(&self.dst.octets());
        // bytes[8] stays zero
        bytes[9] = self.protocol;
        bytes[10..12].copy_from_slice(&self.length.to_be_bytes());
        sum_words(&bytes, 0)
    }
}

/// Add `data` as big-endian 16-bit words to `initial`.
///
/// An odd trailing byte is the high-order byte of a zero-padded word.
/// The 32-bit accumulator holds any region up to 64 KiB without overflow.
pub fn sum_words(data: &[u8], initial: u32) -> u32 {
    let mut sum = initial;

    let mut chunks = data.chunks_exact(2);
    for chunk in &mut chunks {
        sum += u16::from_be_bytes([chunk[0], chunk[1]]) as u32;
    }

    if let Some(&byte) = chunks.remainder().first() {
        sum += (byte as u32) << 8;
    }

    sum
}

/// Fold the carries above bit 16 back into the low word.
///
/// Two rounds absorb a carry produced by the first round.
pub fn fold(sum: u32) -> u16 {
    let sum = (sum >> 16) + (sum & 0xFFFF);
    let sum = sum + (sum >> 16);
    sum as u16
}

/// Checksum of `data`, optionally preceded by a pseudo-header.
///
/// The checksum field inside `data` must be zero when this is called.
pub fn checksum(data: &[u8], pseudo: Option<&PseudoHeader>) -> u16 {
    let initial = pseudo.map_or(0, PseudoHeader::sum);
    !fold(sum_words(data, initial))
}

/// Plain Internet checksum with no pseudo-header (IPv4 header, ICMP)
pub fn internet_checksum(data: &[u8]) -> u16 {
    checksum(data, None)
}

/// Check a region whose checksum field is already filled in.
///
/// Re-summing a correct region, checksum included, yields zero.
pub fn verify(data: &[u8], pseudo: Option<&PseudoHeader>) -> bool {
    checksum(data, pseudo) == 0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty() {
        assert_eq!(internet_checksum(&[]), 0xFFFF);
    }

    #[test]
    fn test_rfc1071_example() {
        // RFC 1071 section 3: the words sum to 0xDDF2 after folding
        let data = [0x00, 0x01, 0xF2, 0x03, 0xF4, 0xF5, 0xF6, 0xF7];
        assert_eq!(fold(sum_words(&data, 0)), 0xDDF2);
        assert_eq!(internet_checksum(&data), !0xDDF2u16);
    }

    #[test]
    fn test_odd_length_pads_low_byte() {
        assert_eq!(sum_words(&[0x12, 0x34, 0x56], 0), 0x1234 + 0x5600);
        assert_eq!(internet_checksum(&[0x12, 0x34, 0x56]), !(0x1234u16 + 0x5600));
    }

    #[test]
    fn test_fold_double_carry() {
        // 0x1FFFF folds to 0x10000 on the first round, needing a second
        assert_eq!(fold(0x0001_FFFF), 0x0001);
        assert_eq!(fold(0xFFFF_FFFF), 0xFFFF);
    }

    #[test]
    fn test_known_ipv4_header() {
        // Classic example header with checksum zeroed, expected 0xB861
        let header = [
            0x45, 0x00, 0x00, 0x73, 0x00, 0x00, 0x40, 0x00, 0x40, 0x11, 0x00, 0x00, 0xC0, 0xA8,
            0x00, 0x01, 0xC0, 0xA8, 0x00, 0xC7,
        ];
        assert_eq!(internet_checksum(&header), 0xB861);
    }

    #[test]
    fn test_verify_after_filling_checksum() {
        let mut data = vec![0x45, 0x00, 0x00, 0x3C, 0x00, 0x00, 0x12, 0x34, 0xAB];
        let csum = internet_checksum(&data);
        data[4..6].copy_from_slice(&csum.to_be_bytes());
        assert!(verify(&data, None));

        data[8] ^= 0x01;
        assert!(!verify(&data, None));
    }

    #[test]
    fn test_pseudo_header_sum() {
        let pseudo = PseudoHeader::new(
            Ipv4Addr::new(10, 0, 0, 1),
            Ipv4Addr::new(10, 0, 0, 2),
            6,
            24,
        );
        // 0x0A00 + 0x0001 + 0x0A00 + 0x0002 + 0x0006 + 0x0018
        assert_eq!(pseudo.sum(), 0x1421);
    }

    #[test]
    fn test_verify_with_pseudo_header() {
        let pseudo = PseudoHeader::new(
            Ipv4Addr::new(192, 168, 1, 1),
            Ipv4Addr::new(192, 168, 1, 2),
            17,
            10,
        );
        let mut data = vec![0x30, 0x39, 0x00, 0x35, 0x00, 0x0A, 0x00, 0x00, 0x61, 0x62];
        let csum = checksum(&data, Some(&pseudo));
        data[6..8].copy_from_slice(&csum.to_be_bytes());
        assert!(verify(&data, Some(&pseudo)));
        assert!(!verify(&data, None));
    }
}
