//! Link-layer device access and interface control
//!
//! This module provides:
//! - Raw link-layer devices for sending and receiving whole frames
//! - Interface flag and hardware address control by name
//! - The burned-in (permanent) hardware address, where the OS exposes it
//! - Interface enumeration
//!
//! Each platform backend implements [`LinkLayer`]; the free functions in this
//! module dispatch to the backend selected at compile time.

mod control;

#[cfg(any(target_os = "macos", target_os = "freebsd"))]
mod bsd;
#[cfg(target_os = "linux")]
mod linux;
#[cfg(not(any(target_os = "linux", target_os = "macos", target_os = "freebsd")))]
mod unsupported;

#[cfg(any(target_os = "macos", target_os = "freebsd"))]
pub use bsd::BpfDevice;
#[cfg(target_os = "linux")]
pub use linux::PacketSocket;
#[cfg(not(any(target_os = "linux", target_os = "macos", target_os = "freebsd")))]
pub use unsupported::NoLinkLayer;

#[cfg(any(target_os = "macos", target_os = "freebsd"))]
type Platform = BpfDevice;
#[cfg(target_os = "linux")]
type Platform = PacketSocket;
#[cfg(not(any(target_os = "linux", target_os = "macos", target_os = "freebsd")))]
type Platform = NoLinkLayer;

use crate::addr::HwAddr;
use crate::error::{Error, Result};
use std::ffi::CStr;
use std::io;
use std::ops::Deref;
use std::os::fd::{AsFd, AsRawFd, BorrowedFd, OwnedFd, RawFd};
use tracing::{debug, warn};

/// Maximum interface name length including the terminating NUL
pub const IFNAMSIZ: usize = libc::IFNAMSIZ as usize;

/// Interface flag bits as reported by the OS
pub mod flags {
    pub const UP: u32 = libc::IFF_UP as u32;
    pub const BROADCAST: u32 = libc::IFF_BROADCAST as u32;
    pub const LOOPBACK: u32 = libc::IFF_LOOPBACK as u32;
    pub const RUNNING: u32 = libc::IFF_RUNNING as u32;
    pub const PROMISC: u32 = libc::IFF_PROMISC as u32;
    pub const MULTICAST: u32 = libc::IFF_MULTICAST as u32;
}

/// Per-platform link-layer backend
pub trait LinkLayer {
    /// Open a raw link-layer descriptor bound to `opts.name()`.
    ///
    /// Returns the descriptor and the buffer length actually in effect.
    fn open(opts: &LinkOptions) -> Result<(OwnedFd, usize)>;

    fn flags(name: &str) -> Result<u32>;

    fn set_flags(name: &str, flags: u32) -> Result<()>;

    fn hw_addr(name: &str) -> Result<HwAddr>;

    fn set_hw_addr(name: &str, addr: HwAddr) -> Result<()>;

    /// Factory-assigned address, independent of any address set later
    fn burned_in_addr(name: &str) -> Result<HwAddr>;

    /// Hardware address carried by a link-level `getifaddrs` entry, None for
    /// entries of any other family.
    fn link_addr(addr: &libc::sockaddr) -> Option<HwAddr>;
}

/// Reject names that cannot fit a kernel `ifr_name` field.
fn validate_name(name: &str) -> Result<()> {
    if name.is_empty() {
        return Err(Error::invalid_format("empty interface name"));
    }
    if name.len() >= IFNAMSIZ {
        return Err(Error::invalid_format(format!(
            "interface name '{}' longer than {} bytes",
            name,
            IFNAMSIZ - 1
        )));
    }
    if name.bytes().any(|b| b == 0) {
        return Err(Error::invalid_format(format!(
            "interface name {:?} contains NUL",
            name
        )));
    }
    Ok(())
}

/// Options for opening a [`NetworkDevice`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinkOptions {
    name: String,
    buffer_len: usize,
    immediate: bool,
}

impl LinkOptions {
    /// Options for interface `name`, platform default buffer, no immediate mode
    pub fn new(name: &str) -> Result<Self> {
        validate_name(name)?;
        Ok(LinkOptions {
            name: name.to_string(),
            buffer_len: 0,
            immediate: false,
        })
    }

    /// Requested buffer length, 0 keeps the platform default
    pub fn with_buffer_len(mut self, buffer_len: usize) -> Self {
        self.buffer_len = buffer_len;
        self
    }

    /// Deliver packets as they arrive instead of when the buffer fills (BPF)
    pub fn with_immediate(mut self, immediate: bool) -> Self {
        self.immediate = immediate;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn buffer_len(&self) -> usize {
        self.buffer_len
    }

    pub fn immediate(&self) -> bool {
        self.immediate
    }
}

/// Raw link-layer device bound to one interface
///
/// Frames written with [`send`](Self::send) go out as-is, Ethernet header
/// included. The descriptor is closed when the device is dropped.
#[derive(Debug)]
pub struct NetworkDevice {
    name: String,
    fd: OwnedFd,
    buffer_len: usize,
    immediate: bool,
}

impl NetworkDevice {
    pub fn open(opts: &LinkOptions) -> Result<Self> {
        let (fd, buffer_len) = Platform::open(opts)?;
        debug!(
            iface = opts.name(),
            fd = fd.as_raw_fd(),
            buffer_len,
            "link-layer device opened"
        );
        Ok(NetworkDevice {
            name: opts.name().to_string(),
            fd,
            buffer_len,
            immediate: opts.immediate(),
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Buffer length negotiated at open time; reads should use at least this
    pub fn buffer_len(&self) -> usize {
        self.buffer_len
    }

    pub fn is_immediate(&self) -> bool {
        self.immediate
    }

    /// Write one complete frame
    pub fn send(&self, frame: &[u8]) -> Result<usize> {
        // SAFETY: the pointer and length come from a live slice.
        let n = unsafe {
            libc::write(
                self.fd.as_raw_fd(),
                frame.as_ptr() as *const libc::c_void,
                frame.len(),
            )
        };
        if n < 0 {
            return Err(Error::os(&self.name, io::Error::last_os_error()));
        }
        Ok(n as usize)
    }

    /// Read whatever the device delivers next into `buf`
    ///
    /// On BPF a single read may return several frames, each behind a
    /// `bpf_hdr`; on Linux it returns exactly one frame.
    pub fn recv(&self, buf: &mut [u8]) -> Result<usize> {
        // SAFETY: the pointer and length come from a live mutable slice.
        let n = unsafe {
            libc::read(
                self.fd.as_raw_fd(),
                buf.as_mut_ptr() as *mut libc::c_void,
                buf.len(),
            )
        };
        if n < 0 {
            return Err(Error::os(&self.name, io::Error::last_os_error()));
        }
        Ok(n as usize)
    }
}

impl AsFd for NetworkDevice {
    fn as_fd(&self) -> BorrowedFd<'_> {
        self.fd.as_fd()
    }
}

impl AsRawFd for NetworkDevice {
    fn as_raw_fd(&self) -> RawFd {
        self.fd.as_raw_fd()
    }
}

/// Active flag word of interface `name`
pub fn flags(name: &str) -> Result<u32> {
    validate_name(name)?;
    Platform::flags(name)
}

/// Replace the flag word of interface `name`
pub fn set_flags(name: &str, flags: u32) -> Result<()> {
    validate_name(name)?;
    debug!(iface = name, flags = format_args!("{:#06x}", flags), "setting flags");
    Platform::set_flags(name, flags)
}

/// Current hardware address of interface `name`
pub fn hw_addr(name: &str) -> Result<HwAddr> {
    validate_name(name)?;
    Platform::hw_addr(name)
}

/// Change the hardware address of interface `name`
pub fn set_hw_addr(name: &str, addr: HwAddr) -> Result<()> {
    validate_name(name)?;
    debug!(iface = name, %addr, "setting hardware address");
    Platform::set_hw_addr(name, addr).map_err(|err| {
        warn!(iface = name, error = %err, "hardware address change refused");
        err
    })
}

/// Factory-assigned hardware address of interface `name`
pub fn burned_in_addr(name: &str) -> Result<HwAddr> {
    validate_name(name)?;
    Platform::burned_in_addr(name)
}

/// One link-level interface as reported by `getifaddrs`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InterfaceRecord {
    pub name: String,
    pub flags: u32,
    pub hw_addr: HwAddr,
}

impl InterfaceRecord {
    pub fn is_up(&self) -> bool {
        self.flags & flags::UP != 0
    }

    pub fn is_running(&self) -> bool {
        self.flags & flags::RUNNING != 0
    }

    pub fn is_loopback(&self) -> bool {
        self.flags & flags::LOOPBACK != 0
    }
}

/// Snapshot of the link-level interfaces
#[derive(Debug, Clone, Default)]
pub struct InterfaceList {
    records: Vec<InterfaceRecord>,
}

impl InterfaceList {
    pub fn iter(&self) -> std::slice::Iter<'_, InterfaceRecord> {
        self.records.iter()
    }

    pub fn find(&self, name: &str) -> Option<&InterfaceRecord> {
        self.records.iter().find(|rec| rec.name == name)
    }

    /// Give the list back; every record is released together
    pub fn release(self) {}
}

impl Deref for InterfaceList {
    type Target = [InterfaceRecord];

    fn deref(&self) -> &[InterfaceRecord] {
        &self.records
    }
}

impl IntoIterator for InterfaceList {
    type Item = InterfaceRecord;
    type IntoIter = std::vec::IntoIter<InterfaceRecord>;

    fn into_iter(self) -> Self::IntoIter {
        self.records.into_iter()
    }
}

impl<'a> IntoIterator for &'a InterfaceList {
    type Item = &'a InterfaceRecord;
    type IntoIter = std::slice::Iter<'a, InterfaceRecord>;

    fn into_iter(self) -> Self::IntoIter {
        self.records.iter()
    }
}

/// `getifaddrs` result, freed on drop
pub(crate) struct IfAddrs {
    head: *mut libc::ifaddrs,
}

impl IfAddrs {
    pub(crate) fn new() -> io::Result<Self> {
        let mut head = std::ptr::null_mut();
        // SAFETY: getifaddrs only writes the list head on success.
        if unsafe { libc::getifaddrs(&mut head) } < 0 {
            return Err(io::Error::last_os_error());
        }
        Ok(IfAddrs { head })
    }

    pub(crate) fn iter(&self) -> impl Iterator<Item = &libc::ifaddrs> + '_ {
        // SAFETY: nodes stay alive until `self` is dropped.
        std::iter::successors(unsafe { self.head.as_ref() }, |node| unsafe {
            node.ifa_next.as_ref()
        })
    }
}

impl Drop for IfAddrs {
    fn drop(&mut self) {
        if !self.head.is_null() {
            // SAFETY: `head` came from a successful getifaddrs and is freed once.
            unsafe { libc::freeifaddrs(self.head) };
        }
    }
}

/// Name of a `getifaddrs` node
pub(crate) fn node_name(node: &libc::ifaddrs) -> String {
    if node.ifa_name.is_null() {
        return String::new();
    }
    // SAFETY: ifa_name is a NUL-terminated string owned by the list.
    unsafe { CStr::from_ptr(node.ifa_name) }
        .to_string_lossy()
        .into_owned()
}

/// Enumerate link-level interfaces whose flags share a bit with `filter`.
///
/// A `filter` of 0 selects every interface. Entries without an address are
/// skipped.
pub fn interfaces(filter: u32) -> Result<InterfaceList> {
    let filter = if filter == 0 { !0 } else { filter };
    let addrs = IfAddrs::new().map_err(|err| Error::os("*", err))?;

    let mut records = Vec::new();
    for node in addrs.iter() {
        // SAFETY: a non-null ifa_addr points at a sockaddr owned by the list.
        let Some(sa) = (unsafe { node.ifa_addr.as_ref() }) else {
            continue;
        };
        let Some(hw_addr) = Platform::link_addr(sa) else {
            continue;
        };
        let node_flags = node.ifa_flags as u32;
        if node_flags & filter == 0 {
            continue;
        }
        records.push(InterfaceRecord {
            name: node_name(node),
            flags: node_flags,
            hw_addr,
        });
    }

    debug!(count = records.len(), filter = format_args!("{:#x}", filter), "interfaces enumerated");
    Ok(InterfaceList { records })
}
