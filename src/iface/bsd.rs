//! BSD and macOS backend: Berkeley Packet Filter devices
//!
//! Frames are read and written through `/dev/bpfN`. The hardware address is
//! read from the `AF_LINK` entry of `getifaddrs` and written with
//! `SIOCSIFLLADDR`.

use super::control::{fill_name, ControlSocket};
use super::{node_name, IfAddrs, LinkLayer, LinkOptions, IFNAMSIZ};
use crate::addr::{HwAddr, HWADDR_LEN};
use crate::error::{Error, Result};
use std::fs::OpenOptions;
use std::io;
use std::mem;
use std::os::fd::{AsRawFd, OwnedFd};
use tracing::debug;

/// Highest device unit probed
const BPF_MAX_UNITS: u32 = 99;

// <sys/ioccom.h> encoding
const IOC_OUT: libc::c_ulong = 0x4000_0000;
const IOC_IN: libc::c_ulong = 0x8000_0000;
const IOC_INOUT: libc::c_ulong = IOC_IN | IOC_OUT;

const fn ioc(dir: libc::c_ulong, group: u8, num: u8, len: usize) -> libc::c_ulong {
    dir | (((len as libc::c_ulong) & 0x1FFF) << 16) | ((group as libc::c_ulong) << 8) | num as libc::c_ulong
}

const IFREQ_LEN: usize = mem::size_of::<IfReq>();
const UINT_LEN: usize = mem::size_of::<libc::c_uint>();

const SIOCSIFFLAGS: libc::c_ulong = ioc(IOC_IN, b'i', 16, IFREQ_LEN);
const SIOCGIFFLAGS: libc::c_ulong = ioc(IOC_INOUT, b'i', 17, IFREQ_LEN);
const SIOCSIFLLADDR: libc::c_ulong = ioc(IOC_IN, b'i', 60, IFREQ_LEN);
const BIOCGBLEN: libc::c_ulong = ioc(IOC_OUT, b'B', 102, UINT_LEN);
const BIOCSBLEN: libc::c_ulong = ioc(IOC_INOUT, b'B', 102, UINT_LEN);
const BIOCSETIF: libc::c_ulong = ioc(IOC_IN, b'B', 108, IFREQ_LEN);
const BIOCIMMEDIATE: libc::c_ulong = ioc(IOC_IN, b'B', 112, UINT_LEN);

/// `struct ifreq`: name followed by a 16-byte union
#[repr(C)]
struct IfReq {
    ifr_name: [libc::c_char; IFNAMSIZ],
    ifr_ifru: [u8; 16],
}

impl IfReq {
    fn new(name: &str) -> Self {
        let mut req = IfReq {
            ifr_name: [0; IFNAMSIZ],
            ifr_ifru: [0; 16],
        };
        fill_name(&mut req.ifr_name, name);
        req
    }

    fn flags(&self) -> u16 {
        u16::from_ne_bytes([self.ifr_ifru[0], self.ifr_ifru[1]])
    }

    fn set_flags(&mut self, flags: u16) {
        self.ifr_ifru[..2].copy_from_slice(&flags.to_ne_bytes());
    }

    /// Store a link-level `sockaddr` (`sa_len`, `sa_family`, address)
    fn set_link_addr(&mut self, addr: HwAddr) {
        self.ifr_ifru[0] = HWADDR_LEN as u8;
        self.ifr_ifru[1] = libc::AF_LINK as u8;
        self.ifr_ifru[2..2 + HWADDR_LEN].copy_from_slice(&addr.0);
    }
}

/// Berkeley Packet Filter backend
#[derive(Debug, Clone, Copy, Default)]
pub struct BpfDevice;

/// Open the first free `/dev/bpfN`.
fn open_bpf(name: &str) -> Result<OwnedFd> {
    let mut last_err = io::Error::from_raw_os_error(libc::ENODEV);
    for unit in 0..BPF_MAX_UNITS {
        let path = format!("/dev/bpf{}", unit);
        match OpenOptions::new().read(true).write(true).open(&path) {
            Ok(file) => {
                debug!(iface = name, path = %path, "bpf device opened");
                return Ok(OwnedFd::from(file));
            }
            Err(err) => {
                if err.raw_os_error() == Some(libc::EACCES) {
                    return Err(Error::os(&path, err));
                }
                last_err = err;
            }
        }
    }
    debug!(iface = name, error = %last_err, "no free bpf device");
    Err(Error::unavailable(name, io::Error::from_raw_os_error(libc::ENODEV)))
}

unsafe fn bpf_ioctl<T>(fd: &OwnedFd, name: &str, request: libc::c_ulong, arg: &mut T) -> Result<()> {
    if libc::ioctl(fd.as_raw_fd(), request as _, arg as *mut T) < 0 {
        return Err(Error::unavailable(name, io::Error::last_os_error()));
    }
    Ok(())
}

unsafe fn control<T>(name: &str, request: libc::c_ulong, arg: &mut T) -> Result<()> {
    let ctl = ControlSocket::open(name)?;
    ctl.ioctl(request, arg).map_err(|err| Error::os(name, err))
}

impl LinkLayer for BpfDevice {
    fn open(opts: &LinkOptions) -> Result<(OwnedFd, usize)> {
        let name = opts.name();
        let fd = open_bpf(name)?;

        let mut buffer_len = libc::c_uint::try_from(opts.buffer_len()).map_err(|_| {
            Error::invalid_format(format!("buffer length {} too large", opts.buffer_len()))
        })?;
        // BIOCSBLEN is refused once the descriptor is attached; the kernel
        // writes back the length it settled on.
        // SAFETY: each BPF ioctl gets the argument type it is defined with.
        if buffer_len != 0 {
            unsafe { bpf_ioctl(&fd, name, BIOCSBLEN, &mut buffer_len)? };
        }

        let mut req = IfReq::new(name);
        unsafe { bpf_ioctl(&fd, name, BIOCSETIF, &mut req)? };

        if buffer_len == 0 {
            unsafe { bpf_ioctl(&fd, name, BIOCGBLEN, &mut buffer_len)? };
        }
        debug!(iface = name, buffer_len, "bpf attached");

        if opts.immediate() {
            let mut on: libc::c_uint = 1;
            unsafe { bpf_ioctl(&fd, name, BIOCIMMEDIATE, &mut on)? };
        }

        Ok((fd, buffer_len as usize))
    }

    fn flags(name: &str) -> Result<u32> {
        let mut req = IfReq::new(name);
        // SAFETY: SIOCGIFFLAGS takes a struct ifreq.
        unsafe { control(name, SIOCGIFFLAGS, &mut req)? };
        Ok(req.flags() as u32)
    }

    fn set_flags(name: &str, flags: u32) -> Result<()> {
        let mut req = IfReq::new(name);
        req.set_flags(flags as u16);
        // SAFETY: SIOCSIFFLAGS takes a struct ifreq.
        unsafe { control(name, SIOCSIFFLAGS, &mut req) }
    }

    fn hw_addr(name: &str) -> Result<HwAddr> {
        let addrs = IfAddrs::new().map_err(|err| Error::os(name, err))?;
        addrs
            .iter()
            .filter(|node| node_name(node) == name)
            // SAFETY: a non-null ifa_addr points at a sockaddr owned by the list.
            .filter_map(|node| unsafe { node.ifa_addr.as_ref() })
            .find_map(Self::link_addr)
            .ok_or_else(|| Error::unavailable(name, io::Error::from_raw_os_error(libc::ENXIO)))
    }

    fn set_hw_addr(name: &str, addr: HwAddr) -> Result<()> {
        let mut req = IfReq::new(name);
        req.set_link_addr(addr);
        // SAFETY: SIOCSIFLLADDR takes a struct ifreq.
        unsafe { control(name, SIOCSIFLLADDR, &mut req) }
    }

    fn burned_in_addr(_name: &str) -> Result<HwAddr> {
        Err(Error::Unsupported("burned-in hardware address"))
    }

    fn link_addr(addr: &libc::sockaddr) -> Option<HwAddr> {
        if addr.sa_family as libc::c_int != libc::AF_LINK {
            return None;
        }
        // SAFETY: AF_LINK entries are sockaddr_dl, sized by sdl_len.
        let sdl = unsafe { &*(addr as *const libc::sockaddr as *const libc::sockaddr_dl) };
        if sdl.sdl_alen as usize != HWADDR_LEN {
            return None;
        }
        // The address follows the interface name inside sdl_data.
        let bytes = unsafe {
            let base = sdl.sdl_data.as_ptr().add(sdl.sdl_nlen as usize) as *const u8;
            std::slice::from_raw_parts(base, HWADDR_LEN)
        };
        HwAddr::from_slice(bytes)
    }
}
