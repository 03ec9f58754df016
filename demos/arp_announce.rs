//! Gratuitous ARP announcement
//!
//! Broadcasts one ARP reply claiming `IP` for the hardware address of
//! `IFACE`, the way a host announces itself after an address change.
//!
//! Usage:
//!   cargo run --example arp_announce -- IFACE IP
//!
//! Needs CAP_NET_RAW (Linux) or read/write access to /dev/bpf* (BSD).

#[cfg(unix)]
fn main() -> Result<(), Box<dyn std::error::Error>> {
    use spark_net::iface::{self, LinkOptions, NetworkDevice};
    use spark_net::link::{arp, ethernet, ethertype, ARP_ETH_IPV4_SIZE, ETH_HDR_SIZE};
    use spark_net::HwAddr;
    use std::net::Ipv4Addr;
    use tracing::info;

    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::DEBUG)
        .init();

    let mut args = std::env::args().skip(1);
    let (Some(name), Some(ip)) = (args.next(), args.next()) else {
        eprintln!("usage: arp_announce IFACE IP");
        std::process::exit(2);
    };
    let ip: Ipv4Addr = ip.parse()?;

    let opts = LinkOptions::new(&name)?;
    let device = NetworkDevice::open(&opts)?;
    let mac = iface::hw_addr(device.name())?;

    let mut frame = ethernet::build(
        mac,
        HwAddr::BROADCAST,
        ethertype::ARP,
        ARP_ETH_IPV4_SIZE,
        None,
    )?;
    arp::inject_reply(frame.payload_mut(), mac, ip, HwAddr::BROADCAST, ip);

    let sent = device.send(frame.as_bytes())?;
    info!(iface = %name, %mac, %ip, sent, "gratuitous ARP sent");
    assert_eq!(sent, ETH_HDR_SIZE + ARP_ETH_IPV4_SIZE);
    Ok(())
}

#[cfg(not(unix))]
fn main() {
    eprintln!("arp_announce needs a Unix link-layer device");
}
