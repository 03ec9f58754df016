//! Whole-packet construction across layers

use spark_net::link::{arp, ethernet, ethertype, ArpMessage, EthernetFrame};
use spark_net::network::ipv4::{self, protocol, IPV4_HEADER_LEN};
use spark_net::network::{icmp, IcmpMessage, Ipv4Header, Ipv4Packet};
use spark_net::transport::{tcp, udp, TcpHeader, UdpDatagram};
use spark_net::HwAddr;
use std::net::Ipv4Addr;

const MAC_A: HwAddr = HwAddr([0xAA, 0xBB, 0xCC, 0xDD, 0xEE, 0xFF]);
const MAC_B: HwAddr = HwAddr([0x11, 0x22, 0x33, 0x44, 0x55, 0x66]);

#[test]
fn test_arp_reply_in_ethernet_frame() {
    let mut frame = ethernet::build(
        MAC_A,
        MAC_B,
        ethertype::ARP,
        arp::ARP_ETH_IPV4_SIZE,
        None,
    )
    .unwrap();
    arp::inject_reply(
        frame.payload_mut(),
        MAC_A,
        Ipv4Addr::new(10, 0, 0, 1),
        MAC_B,
        Ipv4Addr::new(10, 0, 0, 2),
    );

    let bytes = frame.into_inner();
    assert_eq!(bytes.len(), 42);

    let frame = EthernetFrame::new_checked(&bytes[..]).unwrap();
    assert_eq!(frame.ethertype(), ethertype::ARP);

    let msg = ArpMessage::new_checked(frame.payload()).unwrap();
    assert_eq!(msg.opcode(), arp::opcode::REPLY);
    assert_eq!(msg.sender_hw_addr(), Some(MAC_A));
    assert_eq!(msg.sender_ip(), Some(Ipv4Addr::new(10, 0, 0, 1)));
    assert_eq!(msg.target_hw_addr(), Some(MAC_B));
    assert_eq!(msg.target_ip(), Some(Ipv4Addr::new(10, 0, 0, 2)));
}

#[test]
fn test_tcp_reference_checksum() {
    let src = Ipv4Addr::new(10, 0, 0, 1);
    let dst = Ipv4Addr::new(10, 0, 0, 2);
    let header = TcpHeader::new(1234, 80, 1, 0, tcp::flags::SYN, 8192, 0);
    let ip = Ipv4Header::new_simple(protocol::TCP, src, dst, 24);

    let mut segment = tcp::build(&header, 4, Some(b"abcd")).unwrap();
    assert_eq!(tcp::tcp_checksum4(&mut segment.as_bytes().to_vec(), &ip), 0xB1F2);

    segment.fill_checksum(&ip);
    assert_eq!(segment.checksum(), 0xB1F2);
    assert!(segment.verify_checksum(&ip));
}

#[test]
fn test_udp_zero_checksum_sent_as_ffff() {
    let src = Ipv4Addr::new(192, 168, 1, 1);
    let dst = Ipv4Addr::new(192, 168, 1, 2);
    let ip = Ipv4Header::new_simple(protocol::UDP, src, dst, 10);

    // This payload makes the one's complement sum come out at 0xFFFF
    let mut datagram = udp::build(1000, 2000, 2, Some(&[0x70, 0xCE])).unwrap();
    datagram.fill_checksum(&ip);

    assert_eq!(datagram.checksum(), 0xFFFF);
    assert!(datagram.verify_checksum(src, dst));
}

#[test]
fn test_echo_request_stack() {
    let src = Ipv4Addr::new(192, 168, 0, 10);
    let dst = Ipv4Addr::new(192, 168, 0, 1);
    let payload = b"0123456789abcdef";
    let icmp_len = icmp::ICMP_HEADER_LEN + payload.len();
    let ip_header = Ipv4Header::new_simple(protocol::ICMP, src, dst, icmp_len as u16);

    let mut frame = ethernet::build(
        MAC_A,
        MAC_B,
        ethertype::IPV4,
        IPV4_HEADER_LEN + icmp_len,
        None,
    )
    .unwrap();
    {
        let mut packet = ipv4::inject(frame.payload_mut(), &ip_header, &[], icmp_len);
        icmp::inject_echo_request(
            packet.payload_mut(),
            0x1C46,
            1,
            &ip_header,
            payload.len(),
            Some(payload),
        );
    }

    let bytes = frame.into_inner();
    let frame = EthernetFrame::new_checked(&bytes[..]).unwrap();
    let packet = Ipv4Packet::new_checked(frame.payload()).unwrap();
    assert!(packet.verify_checksum());
    assert_eq!(packet.protocol(), protocol::ICMP);
    assert_eq!(packet.src_addr(), src);
    assert_eq!(packet.dst_addr(), dst);
    assert_eq!(packet.total_len() as usize, IPV4_HEADER_LEN + icmp_len);

    let message = IcmpMessage::new_checked(packet.payload()).unwrap();
    assert_eq!(message.msg_type(), icmp::ICMP_TYPE_ECHO_REQUEST);
    assert_eq!(message.identifier(), 0x1C46);
    assert_eq!(message.sequence(), 1);
    assert_eq!(message.payload(), payload);
    assert!(message.verify_checksum());
}

#[test]
fn test_udp_over_ipv4_decode() {
    let src = Ipv4Addr::new(10, 1, 2, 3);
    let dst = Ipv4Addr::new(10, 3, 2, 1);
    let data = b"ping";
    let udp_len = udp::UDP_HEADER_LEN + data.len();
    let header = Ipv4Header::new_simple(protocol::UDP, src, dst, udp_len as u16);

    let mut packet = ipv4::build(&header, &[], udp_len, None).unwrap();
    {
        let mut datagram = udp::inject(packet.payload_mut(), 5000, 6000, data.len());
        datagram.payload_mut().copy_from_slice(data);
        datagram.fill_checksum(&header);
    }

    let datagram = UdpDatagram::new_checked(packet.payload()).unwrap();
    assert_eq!(datagram.dst_port(), 6000);
    assert_eq!(datagram.payload(), data);
    assert!(datagram.verify_checksum(src, dst));
}
