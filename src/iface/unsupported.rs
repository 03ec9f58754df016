//! Fallback for Unix systems without a link-layer backend

use super::{LinkLayer, LinkOptions};
use crate::addr::HwAddr;
use crate::error::{Error, Result};
use std::os::fd::OwnedFd;

/// Backend whose every operation reports [`Error::Unsupported`]
#[derive(Debug, Clone, Copy, Default)]
pub struct NoLinkLayer;

impl LinkLayer for NoLinkLayer {
    fn open(_opts: &LinkOptions) -> Result<(OwnedFd, usize)> {
        Err(Error::Unsupported("link-layer device"))
    }

    fn flags(_name: &str) -> Result<u32> {
        Err(Error::Unsupported("interface flags"))
    }

    fn set_flags(_name: &str, _flags: u32) -> Result<()> {
        Err(Error::Unsupported("interface flags"))
    }

    fn hw_addr(_name: &str) -> Result<HwAddr> {
        Err(Error::Unsupported("hardware address"))
    }

    fn set_hw_addr(_name: &str, _addr: HwAddr) -> Result<()> {
        Err(Error::Unsupported("hardware address"))
    }

    fn burned_in_addr(_name: &str) -> Result<HwAddr> {
        Err(Error::Unsupported("burned-in hardware address"))
    }

    fn link_addr(_addr: &libc::sockaddr) -> Option<HwAddr> {
        None
    }
}
