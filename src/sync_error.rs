//! Classification of flush failures that carry no information.
//!
//! Flushing a terminal, pipe or other character device (stdout, stderr)
//! fails on several platforms because the device has nothing to flush:
//!
//! - Linux: `sync /dev/stdout: invalid argument`
//! - macOS: `sync /dev/stdout: inappropriate ioctl for device`

use std::io;

/// OS error conditions a flush on a non-seekable device is known to raise.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncErrno {
    InvalidArgument,
    NotSupported,
    InappropriateIoctl,
    BadFileDescriptor,
}

impl SyncErrno {
    /// Map a raw OS error code onto one of the known conditions.
    #[cfg(unix)]
    pub fn from_raw(code: i32) -> Option<Self> {
        use nix::errno::Errno;

        match Errno::from_raw(code) {
            Errno::EINVAL => Some(SyncErrno::InvalidArgument),
            Errno::ENOTSUP => Some(SyncErrno::NotSupported),
            Errno::ENOTTY => Some(SyncErrno::InappropriateIoctl),
            Errno::EBADF => Some(SyncErrno::BadFileDescriptor),
            _ => None,
        }
    }

    /// Map a raw OS error code onto one of the known conditions.
    #[cfg(windows)]
    pub fn from_raw(code: i32) -> Option<Self> {
        // ERROR_INVALID_FUNCTION, ERROR_INVALID_HANDLE, ERROR_INVALID_PARAMETER, ERROR_NOT_SUPPORTED
        match code {
            1 => Some(SyncErrno::InappropriateIoctl),
            6 => Some(SyncErrno::BadFileDescriptor),
            87 => Some(SyncErrno::InvalidArgument),
            50 => Some(SyncErrno::NotSupported),
            _ => None,
        }
    }

    #[cfg(not(any(unix, windows)))]
    pub fn from_raw(_code: i32) -> Option<Self> {
        None
    }

    pub fn from_io_error(err: &io::Error) -> Option<Self> {
        err.raw_os_error().and_then(Self::from_raw)
    }
}

/// Reports whether a flush error is one of the known non-actionable ones.
pub fn is_known_sync_error(err: &io::Error) -> bool {
    SyncErrno::from_io_error(err).is_some()
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use nix::errno::Errno;

    #[test]
    fn known_codes() {
        for errno in [Errno::EINVAL, Errno::ENOTSUP, Errno::ENOTTY, Errno::EBADF] {
            let err = io::Error::from_raw_os_error(errno as i32);
            assert!(is_known_sync_error(&err), "{errno:?} should be benign");
        }
    }

    #[test]
    fn other_codes_surface() {
        for errno in [Errno::EIO, Errno::ENOSPC, Errno::EPIPE] {
            let err = io::Error::from_raw_os_error(errno as i32);
            assert!(!is_known_sync_error(&err), "{errno:?} should not be benign");
        }
    }

    #[test]
    fn non_os_errors_surface() {
        let err = io::Error::new(io::ErrorKind::InvalidInput, "synthetic");
        assert!(!is_known_sync_error(&err));
    }
}
