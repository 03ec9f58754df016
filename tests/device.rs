//! Interface control against the loopback device; no privileges needed

#![cfg(target_os = "linux")]

use spark_net::iface::{self, flags, LinkOptions, IFNAMSIZ};
use spark_net::{Error, HwAddr};

const MISSING: &str = "nosuchif0";

#[test]
fn test_loopback_flags() {
    let lo = iface::flags("lo").unwrap();
    assert_ne!(lo & flags::LOOPBACK, 0);
    assert_eq!(lo & flags::BROADCAST, 0);
}

#[test]
fn test_loopback_hw_addr_is_empty() {
    assert_eq!(iface::hw_addr("lo").unwrap(), HwAddr::EMPTY);
}

#[test]
fn test_unknown_interface() {
    assert!(matches!(
        iface::flags(MISSING),
        Err(Error::DeviceUnavailable { .. })
    ));
    assert!(iface::hw_addr(MISSING).is_err());
    assert!(iface::burned_in_addr(MISSING).is_err());
}

#[test]
fn test_name_too_long() {
    let name = "x".repeat(IFNAMSIZ);
    assert!(matches!(iface::flags(&name), Err(Error::InvalidFormat(_))));
    assert!(matches!(LinkOptions::new(&name), Err(Error::InvalidFormat(_))));
}

#[test]
fn test_enumerate_all_contains_loopback() {
    let list = iface::interfaces(0).unwrap();
    let lo = list.find("lo").expect("loopback listed");
    assert!(lo.is_loopback());
    assert_eq!(lo.hw_addr, HwAddr::EMPTY);
    list.release();
}

#[test]
fn test_enumerate_filter() {
    let list = iface::interfaces(flags::UP).unwrap();
    assert!(list.iter().all(|rec| rec.flags & flags::UP != 0));

    let names: Vec<&str> = list.iter().map(|rec| rec.name.as_str()).collect();
    let mut unique = names.clone();
    unique.sort_unstable();
    unique.dedup();
    assert_eq!(unique.len(), names.len());
}

#[test]
fn test_set_hw_addr_needs_privilege() {
    // Unprivileged callers are refused; root may get EINVAL/EOPNOTSUPP on lo.
    let err = iface::set_hw_addr("lo", HwAddr([0x02, 0, 0, 0, 0, 1])).unwrap_err();
    if unsafe { libc::geteuid() } != 0 {
        assert!(err.is_permission_denied());
    }
}
