//! Linux backend: `AF_PACKET` sockets and `SIOC*` interface ioctls

use super::control::{c_name, fill_name, ControlSocket};
use super::{LinkLayer, LinkOptions};
use crate::addr::{HwAddr, HWADDR_LEN};
use crate::error::{Error, Result};
use crate::link::ethernet::{ETH_HDR_SIZE, ETH_MAX_PAYLOAD};
use std::io;
use std::mem;
use std::os::fd::{AsRawFd, FromRawFd, OwnedFd};
use tracing::debug;

// linux/sockios.h and linux/ethtool.h
const SIOCETHTOOL: libc::c_ulong = 0x8946;
const ETHTOOL_GPERMADDR: u32 = 0x20;

/// `struct ethtool_perm_addr` with room for an Ethernet address
#[repr(C)]
struct EthtoolPermAddr {
    cmd: u32,
    size: u32,
    data: [u8; HWADDR_LEN],
}

/// `AF_PACKET` raw socket backend
#[derive(Debug, Clone, Copy, Default)]
pub struct PacketSocket;

fn ifreq(name: &str) -> libc::ifreq {
    // SAFETY: ifreq is plain old data, all-zero is a valid value.
    let mut req: libc::ifreq = unsafe { mem::zeroed() };
    fill_name(&mut req.ifr_name, name);
    req
}

/// Run one interface ioctl on a fresh control socket.
///
/// # Safety
///
/// Same contract as [`ControlSocket::ioctl`].
unsafe fn control<T>(name: &str, request: libc::c_ulong, arg: &mut T) -> Result<()> {
    let ctl = ControlSocket::open(name)?;
    ctl.ioctl(request, arg).map_err(|err| Error::os(name, err))
}

impl LinkLayer for PacketSocket {
    fn open(opts: &LinkOptions) -> Result<(OwnedFd, usize)> {
        let name = opts.name();
        let protocol = (libc::ETH_P_ALL as u16).to_be();

        // SAFETY: plain socket(2) call, the result is checked before use.
        let raw = unsafe { libc::socket(libc::AF_PACKET, libc::SOCK_RAW, protocol as libc::c_int) };
        if raw < 0 {
            return Err(Error::unavailable(name, io::Error::last_os_error()));
        }
        // SAFETY: `raw` is a fresh descriptor; from here on it closes on every path.
        let fd = unsafe { OwnedFd::from_raw_fd(raw) };

        let cname = c_name(name)?;
        // SAFETY: `cname` is a valid NUL-terminated string.
        let index = unsafe { libc::if_nametoindex(cname.as_ptr()) };
        if index == 0 {
            return Err(Error::unavailable(name, io::Error::last_os_error()));
        }

        // SAFETY: sockaddr_ll is plain old data.
        let mut sll: libc::sockaddr_ll = unsafe { mem::zeroed() };
        sll.sll_family = libc::AF_PACKET as u16;
        sll.sll_protocol = protocol;
        sll.sll_ifindex = index as libc::c_int;
        sll.sll_halen = HWADDR_LEN as u8;

        // SAFETY: the address points at a sockaddr_ll of the size passed.
        let rc = unsafe {
            libc::bind(
                fd.as_raw_fd(),
                &sll as *const libc::sockaddr_ll as *const libc::sockaddr,
                mem::size_of::<libc::sockaddr_ll>() as libc::socklen_t,
            )
        };
        if rc < 0 {
            return Err(Error::unavailable(name, io::Error::last_os_error()));
        }

        let buffer_len = match opts.buffer_len() {
            0 => ETH_HDR_SIZE + ETH_MAX_PAYLOAD,
            len => len,
        };
        debug!(iface = name, index, "packet socket bound");
        Ok((fd, buffer_len))
    }

    fn flags(name: &str) -> Result<u32> {
        let mut req = ifreq(name);
        // SAFETY: SIOCGIFFLAGS takes a struct ifreq.
        unsafe { control(name, libc::SIOCGIFFLAGS as _, &mut req)? };
        // SAFETY: the kernel filled the flags member of the union.
        Ok(unsafe { req.ifr_ifru.ifru_flags } as u16 as u32)
    }

    fn set_flags(name: &str, flags: u32) -> Result<()> {
        let mut req = ifreq(name);
        req.ifr_ifru.ifru_flags = flags as u16 as libc::c_short;
        // SAFETY: SIOCSIFFLAGS takes a struct ifreq.
        unsafe { control(name, libc::SIOCSIFFLAGS as _, &mut req) }
    }

    fn hw_addr(name: &str) -> Result<HwAddr> {
        let mut req = ifreq(name);
        // SAFETY: SIOCGIFHWADDR takes a struct ifreq.
        unsafe { control(name, libc::SIOCGIFHWADDR as _, &mut req)? };
        // SAFETY: the kernel filled the hwaddr member of the union.
        let data = unsafe { req.ifr_ifru.ifru_hwaddr.sa_data };
        let mut bytes = [0u8; HWADDR_LEN];
        for (dst, src) in bytes.iter_mut().zip(data.iter()) {
            *dst = *src as u8;
        }
        Ok(HwAddr(bytes))
    }

    fn set_hw_addr(name: &str, addr: HwAddr) -> Result<()> {
        let mut req = ifreq(name);
        // SAFETY: writing one union member of a zeroed ifreq.
        unsafe {
            req.ifr_ifru.ifru_hwaddr.sa_family = libc::ARPHRD_ETHER;
            for (dst, src) in req.ifr_ifru.ifru_hwaddr.sa_data.iter_mut().zip(addr.0) {
                *dst = src as libc::c_char;
            }
        }
        // SAFETY: SIOCSIFHWADDR takes a struct ifreq.
        unsafe { control(name, libc::SIOCSIFHWADDR as _, &mut req) }
    }

    fn burned_in_addr(name: &str) -> Result<HwAddr> {
        let mut epa = EthtoolPermAddr {
            cmd: ETHTOOL_GPERMADDR,
            size: HWADDR_LEN as u32,
            data: [0; HWADDR_LEN],
        };
        let mut req = ifreq(name);
        req.ifr_ifru.ifru_data = &mut epa as *mut EthtoolPermAddr as *mut libc::c_char;
        // SAFETY: SIOCETHTOOL takes an ifreq whose data member points at an
        // ethtool command; `epa` outlives the call.
        unsafe { control(name, SIOCETHTOOL, &mut req)? };
        Ok(HwAddr(epa.data))
    }

    fn link_addr(addr: &libc::sockaddr) -> Option<HwAddr> {
        if addr.sa_family as libc::c_int != libc::AF_PACKET {
            return None;
        }
        // SAFETY: AF_PACKET entries from getifaddrs are sockaddr_ll.
        let sll = unsafe { &*(addr as *const libc::sockaddr as *const libc::sockaddr_ll) };
        HwAddr::from_slice(&sll.sll_addr)
    }
}
