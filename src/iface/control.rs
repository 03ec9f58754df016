//! Datagram socket used as the target of interface control ioctls

use crate::error::{Error, Result};
use std::ffi::CString;
use std::io;
use std::os::fd::{AsRawFd, FromRawFd, OwnedFd};

pub(crate) struct ControlSocket(OwnedFd);

impl ControlSocket {
    /// Open an `AF_INET`/`SOCK_DGRAM` socket; `name` is only used for the error.
    pub(crate) fn open(name: &str) -> Result<Self> {
        // SAFETY: plain socket(2) call, the result is checked before use.
        let fd = unsafe { libc::socket(libc::AF_INET, libc::SOCK_DGRAM, 0) };
        if fd < 0 {
            return Err(Error::os(name, io::Error::last_os_error()));
        }
        // SAFETY: `fd` is a freshly created descriptor owned by nobody else.
        Ok(ControlSocket(unsafe { OwnedFd::from_raw_fd(fd) }))
    }

    /// Issue `request` with `arg` as its argument.
    ///
    /// # Safety
    ///
    /// `T` must be the structure the kernel expects for `request`, and any
    /// pointers it carries must stay valid for the duration of the call.
    pub(crate) unsafe fn ioctl<T>(&self, request: libc::c_ulong, arg: &mut T) -> io::Result<()> {
        if libc::ioctl(self.0.as_raw_fd(), request as _, arg as *mut T) < 0 {
            return Err(io::Error::last_os_error());
        }
        Ok(())
    }
}

/// Copy `name` into a fixed, NUL-terminated `ifr_name` field.
///
/// The name has already been checked against `IFNAMSIZ`.
pub(crate) fn fill_name(dst: &mut [libc::c_char], name: &str) {
    for (slot, byte) in dst.iter_mut().zip(name.bytes()) {
        *slot = byte as libc::c_char;
    }
    if let Some(last) = dst.get_mut(name.len()) {
        *last = 0;
    }
}

/// Interface name as a C string.
pub(crate) fn c_name(name: &str) -> Result<CString> {
    CString::new(name)
        .map_err(|_| Error::invalid_format(format!("interface name {:?} contains NUL", name)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fill_name_terminates() {
        let mut buf = [0x7F as libc::c_char; 16];
        fill_name(&mut buf, "eth0");
        assert_eq!(&buf[..5], &[b'e' as libc::c_char, b't' as _, b'h' as _, b'0' as _, 0]);
    }

    #[test]
    fn test_c_name_rejects_nul() {
        assert!(c_name("eth0").is_ok());
        assert!(matches!(c_name("et\0h"), Err(Error::InvalidFormat(_))));
    }
}
