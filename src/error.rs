//! Error types for spark-net

use std::io;
use thiserror::Error;

/// Result type alias for spark-net operations
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for spark-net
#[derive(Error, Debug)]
pub enum Error {
    /// A packet buffer could not be allocated
    #[error("unable to allocate a {0} byte packet buffer")]
    AllocationFailure(usize),

    /// Malformed textual input
    #[error("invalid format: {0}")]
    InvalidFormat(String),

    /// Interface resolution, socket creation or binding failed
    #[error("device '{name}' unavailable: {source}")]
    DeviceUnavailable {
        name: String,
        #[source]
        source: io::Error,
    },

    /// Operation not implemented on this platform
    #[error("not supported on this platform: {0}")]
    Unsupported(&'static str),

    /// The OS refused a privileged operation
    #[error("permission denied on '{name}': {source}")]
    PermissionDenied {
        name: String,
        #[source]
        source: io::Error,
    },

    /// Any other OS-level failure on an interface
    #[error("I/O error on '{name}': {source}")]
    Io {
        name: String,
        #[source]
        source: io::Error,
    },
}

impl Error {
    /// Create an invalid format error with a custom message
    pub fn invalid_format<S: Into<String>>(msg: S) -> Self {
        Error::InvalidFormat(msg.into())
    }

    /// Classify an OS error raised while operating on interface `name`.
    pub(crate) fn os(name: &str, source: io::Error) -> Self {
        let name = name.to_string();
        match source.raw_os_error() {
            Some(libc::EPERM) | Some(libc::EACCES) => Error::PermissionDenied { name, source },
            Some(libc::ENODEV) | Some(libc::ENXIO) => Error::DeviceUnavailable { name, source },
            _ => Error::Io { name, source },
        }
    }

    /// Like [`Error::os`], but for failures while opening a device: anything
    /// that is not a privilege problem means the device is unavailable.
    pub(crate) fn unavailable(name: &str, source: io::Error) -> Self {
        match Self::os(name, source) {
            Error::Io { name, source } => Error::DeviceUnavailable { name, source },
            other => other,
        }
    }

    /// Whether this error came from a missing privilege
    pub fn is_permission_denied(&self) -> bool {
        matches!(self, Error::PermissionDenied { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify_os_errors() {
        let err = Error::os("eth0", io::Error::from_raw_os_error(libc::EPERM));
        assert!(err.is_permission_denied());

        let err = Error::os("eth0", io::Error::from_raw_os_error(libc::ENODEV));
        assert!(matches!(err, Error::DeviceUnavailable { .. }));

        let err = Error::os("eth0", io::Error::from_raw_os_error(libc::EINVAL));
        assert!(matches!(err, Error::Io { .. }));
    }

    #[test]
    fn test_unavailable_keeps_permission_errors() {
        let err = Error::unavailable("eth0", io::Error::from_raw_os_error(libc::EACCES));
        assert!(err.is_permission_denied());

        let err = Error::unavailable("eth0", io::Error::from_raw_os_error(libc::EBUSY));
        assert!(matches!(err, Error::DeviceUnavailable { .. }));
    }

    #[test]
    fn test_display_names_interface() {
        let err = Error::os("wlan0", io::Error::from_raw_os_error(libc::EINVAL));
        assert!(err.to_string().contains("wlan0"));
    }
}
