//! The syscall seam.
//!
//! Interface resolution and option handling only ever need two calls from the
//! kernel: an `ifreq`-style `ioctl` and `setsockopt`. Both go through
//! [`SocketControl`] so the encoding logic above it can be exercised against a
//! recording fake instead of a live socket.

use std::io;

use crate::ifreq::IfReq;

/// Protocol family for Controller Area Network sockets.
pub const PF_CAN: i32 = 29;
/// Address family for Controller Area Network sockets.
pub const AF_CAN: u16 = PF_CAN as u16;
/// Raw CAN protocol within `PF_CAN`.
pub const CAN_RAW: i32 = 1;

/// Base for the per-protocol CAN socket option levels.
pub const SOL_CAN_BASE: i32 = 100;
/// Socket option level of `CAN_RAW` sockets.
pub const SOL_CAN_RAW: i32 = SOL_CAN_BASE + CAN_RAW;

/// Name -> interface index `ioctl` request.
pub const SIOCGIFINDEX: u64 = 0x8933;

/// `errno` for "no such device".
pub const ENODEV: i32 = 19;

/// Narrow interface over the socket-control syscalls used by this crate.
///
/// Implemented for [`std::os::fd::BorrowedFd`] (and therefore for every open
/// socket) on Unix. Tests implement it with an in-memory recorder.
pub trait SocketControl {
    /// Issue an `ifreq`-carrying device-control request.
    ///
    /// The kernel reads and writes the whole request in place.
    fn ioctl(&self, request: u64, req: &mut IfReq) -> io::Result<()>;

    /// Set a socket option from its already-encoded value bytes.
    fn set_raw_option(&self, level: i32, name: i32, value: &[u8]) -> io::Result<()>;
}

impl<T: SocketControl + ?Sized> SocketControl for &T {
    fn ioctl(&self, request: u64, req: &mut IfReq) -> io::Result<()> {
        (**self).ioctl(request, req)
    }

    fn set_raw_option(&self, level: i32, name: i32, value: &[u8]) -> io::Result<()> {
        (**self).set_raw_option(level, name, value)
    }
}

#[cfg(unix)]
impl SocketControl for std::os::fd::BorrowedFd<'_> {
    fn ioctl(&self, request: u64, req: &mut IfReq) -> io::Result<()> {
        use std::os::fd::AsRawFd;

        // SAFETY: `req` is a full-size, exclusively borrowed `struct ifreq`
        // buffer, which is what every SIOC*IF* request reads and writes.
        let rc = unsafe {
            libc::ioctl(
                self.as_raw_fd(),
                request as _,
                req.as_mut_bytes().as_mut_ptr().cast::<libc::c_void>(),
            )
        };
        if rc == -1 {
            return Err(io::Error::last_os_error());
        }
        Ok(())
    }

    fn set_raw_option(&self, level: i32, name: i32, value: &[u8]) -> io::Result<()> {
        use std::os::fd::AsRawFd;

        // SAFETY: `value` is valid for reads of `value.len()` bytes for the
        // duration of the call; the kernel copies it before returning.
        let rc = unsafe {
            libc::setsockopt(
                self.as_raw_fd(),
                level,
                name,
                value.as_ptr().cast::<libc::c_void>(),
                value.len() as libc::socklen_t,
            )
        };
        if rc != 0 {
            return Err(io::Error::last_os_error());
        }
        Ok(())
    }
}
