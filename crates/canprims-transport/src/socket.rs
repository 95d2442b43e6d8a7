use std::io::{self, Read, Write};
use std::mem;
use std::os::fd::{AsFd, AsRawFd, BorrowedFd, FromRawFd, IntoRawFd, OwnedFd, RawFd};
use std::time::Duration;

use tracing::{debug, info, trace};

use crate::address::{InterfaceAddress, SOCKADDR_CAN_LEN};
use crate::error::{Result, TransportError};
use crate::ifreq::{resolve_interface_index, IfReq};
use crate::options::{set_option, CanSocketOptions, SocketOption};
use crate::sys::{SocketControl, CAN_RAW, PF_CAN};

/// A raw `CAN_RAW` socket bound to one interface (or to all, index 0).
///
/// Every `read` yields exactly one frame datagram and every `write` must carry
/// exactly one frame. `Read` and `Write` are also implemented for
/// `&CanSocket`, so one receiving and one sending thread can share a socket.
#[derive(Debug)]
pub struct CanSocket {
    fd: OwnedFd,
    if_index: i32,
}

impl CanSocket {
    /// Open a raw CAN socket on the named interface with kernel-default options.
    pub fn open(ifname: &str) -> Result<Self> {
        Self::open_with_options(ifname, &CanSocketOptions::default())
    }

    /// Open a raw CAN socket on the named interface.
    ///
    /// Options are applied before binding, so an FD-enabled socket never sees
    /// a frame while still in classic mode.
    pub fn open_with_options(ifname: &str, options: &CanSocketOptions) -> Result<Self> {
        let fd = raw_can_socket()?;
        let if_index = resolve_interface_index(&fd.as_fd(), ifname)?;
        let socket = Self::bind_fd(fd, if_index, options)?;
        info!(ifname, if_index, fd_frames = options.fd_frames, "bound raw CAN socket");
        Ok(socket)
    }

    /// Open a raw CAN socket bound by interface index; 0 means every CAN interface.
    pub fn open_index(if_index: i32, options: &CanSocketOptions) -> Result<Self> {
        let fd = raw_can_socket()?;
        let socket = Self::bind_fd(fd, if_index, options)?;
        info!(if_index, fd_frames = options.fd_frames, "bound raw CAN socket");
        Ok(socket)
    }

    /// Resolve an interface name to its index without binding anything.
    pub fn resolve(ifname: &str) -> Result<i32> {
        // Reject bad names before asking the kernel for a socket.
        IfReq::with_name(ifname)?;
        let fd = raw_can_socket()?;
        resolve_interface_index(&fd.as_fd(), ifname)
    }

    fn bind_fd(fd: OwnedFd, if_index: i32, options: &CanSocketOptions) -> Result<Self> {
        options.apply(&fd.as_fd())?;

        let addr = InterfaceAddress::new(if_index);
        // SAFETY: `addr` is a live, 4-byte aligned `sockaddr_can` image of
        // exactly `SOCKADDR_CAN_LEN` bytes; the kernel copies it during the call.
        let rc = unsafe {
            libc::bind(
                fd.as_raw_fd(),
                addr.as_sockaddr_ptr(),
                SOCKADDR_CAN_LEN as libc::socklen_t,
            )
        };
        if rc != 0 {
            return Err(TransportError::Bind {
                if_index,
                source: io::Error::last_os_error(),
            });
        }

        Ok(Self { fd, if_index })
    }

    /// Index of the interface this socket was bound to.
    pub fn if_index(&self) -> i32 {
        self.if_index
    }

    /// The bound address as reported by `getsockname`.
    pub fn local_address(&self) -> Result<InterfaceAddress> {
        let mut bytes = [0u8; SOCKADDR_CAN_LEN];
        let mut len = SOCKADDR_CAN_LEN as libc::socklen_t;

        // SAFETY: `bytes` is writable for `len` bytes and `len` is a valid
        // in/out length pointer.
        let rc = unsafe {
            libc::getsockname(
                self.fd.as_raw_fd(),
                bytes.as_mut_ptr().cast::<libc::sockaddr>(),
                &mut len,
            )
        };
        if rc != 0 {
            return Err(io::Error::last_os_error().into());
        }

        InterfaceAddress::from_sockname(bytes, len as usize)
    }

    /// Toggle one `SOL_CAN_RAW` option after the socket is open.
    pub fn set_option(&self, option: SocketOption, enabled: bool) -> Result<()> {
        set_option(&self.fd.as_fd(), option, enabled)
    }

    /// Send one frame datagram.
    pub fn send(&self, frame: &[u8]) -> io::Result<usize> {
        // SAFETY: `frame` is valid for reads of `frame.len()` bytes.
        let n = unsafe {
            libc::send(
                self.fd.as_raw_fd(),
                frame.as_ptr().cast::<libc::c_void>(),
                frame.len(),
                0,
            )
        };
        if n < 0 {
            return Err(io::Error::last_os_error());
        }
        trace!(len = n, "sent CAN datagram");
        Ok(n as usize)
    }

    /// Receive one frame datagram into `buf`.
    pub fn recv(&self, buf: &mut [u8]) -> io::Result<usize> {
        // SAFETY: `buf` is valid for writes of `buf.len()` bytes.
        let n = unsafe {
            libc::recv(
                self.fd.as_raw_fd(),
                buf.as_mut_ptr().cast::<libc::c_void>(),
                buf.len(),
                0,
            )
        };
        if n < 0 {
            return Err(io::Error::last_os_error());
        }
        trace!(len = n, "received CAN datagram");
        Ok(n as usize)
    }

    /// Set read timeout on the socket (`SO_RCVTIMEO`). `None` blocks forever.
    pub fn set_read_timeout(&self, timeout: Option<Duration>) -> Result<()> {
        self.set_timeout(libc::SO_RCVTIMEO, timeout)
    }

    /// Set write timeout on the socket (`SO_SNDTIMEO`). `None` blocks forever.
    pub fn set_write_timeout(&self, timeout: Option<Duration>) -> Result<()> {
        self.set_timeout(libc::SO_SNDTIMEO, timeout)
    }

    fn set_timeout(&self, name: libc::c_int, timeout: Option<Duration>) -> Result<()> {
        let tv = match timeout {
            Some(d) if d.is_zero() => {
                return Err(io::Error::new(
                    io::ErrorKind::InvalidInput,
                    "cannot set a zero duration timeout",
                )
                .into());
            }
            Some(d) => timeval_from_duration(d),
            None => libc::timeval {
                tv_sec: 0,
                tv_usec: 0,
            },
        };
        set_socket_option(self.fd.as_fd(), libc::SOL_SOCKET, name, &tv)?;
        debug!(?timeout, option = name, "set socket timeout");
        Ok(())
    }

    /// Switch `O_NONBLOCK` on or off.
    pub fn set_nonblocking(&self, nonblocking: bool) -> Result<()> {
        let fd = self.fd.as_raw_fd();
        // SAFETY: plain fcntl on a descriptor we own.
        let flags = unsafe { libc::fcntl(fd, libc::F_GETFL) };
        if flags == -1 {
            return Err(io::Error::last_os_error().into());
        }
        let flags = if nonblocking {
            flags | libc::O_NONBLOCK
        } else {
            flags & !libc::O_NONBLOCK
        };
        // SAFETY: as above.
        if unsafe { libc::fcntl(fd, libc::F_SETFL, flags) } == -1 {
            return Err(io::Error::last_os_error().into());
        }
        Ok(())
    }

    /// Duplicate the descriptor; both handles share the same socket.
    pub fn try_clone(&self) -> Result<Self> {
        Ok(Self {
            fd: self.fd.try_clone()?,
            if_index: self.if_index,
        })
    }
}

impl SocketControl for CanSocket {
    fn ioctl(&self, request: u64, req: &mut IfReq) -> io::Result<()> {
        self.fd.as_fd().ioctl(request, req)
    }

    fn set_raw_option(&self, level: i32, name: i32, value: &[u8]) -> io::Result<()> {
        self.fd.as_fd().set_raw_option(level, name, value)
    }
}

impl Read for CanSocket {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.recv(buf)
    }
}

impl Read for &CanSocket {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.recv(buf)
    }
}

impl Write for CanSocket {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.send(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl Write for &CanSocket {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.send(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl AsFd for CanSocket {
    fn as_fd(&self) -> BorrowedFd<'_> {
        self.fd.as_fd()
    }
}

impl AsRawFd for CanSocket {
    fn as_raw_fd(&self) -> RawFd {
        self.fd.as_raw_fd()
    }
}

impl IntoRawFd for CanSocket {
    fn into_raw_fd(self) -> RawFd {
        self.fd.into_raw_fd()
    }
}

fn raw_can_socket() -> Result<OwnedFd> {
    // SAFETY: socket(2) has no memory-safety preconditions.
    let fd = unsafe { libc::socket(PF_CAN, libc::SOCK_RAW | libc::SOCK_CLOEXEC, CAN_RAW) };
    if fd < 0 {
        return Err(TransportError::Open(io::Error::last_os_error()));
    }
    // SAFETY: `fd` was just returned by socket(2) and nothing else owns it.
    Ok(unsafe { OwnedFd::from_raw_fd(fd) })
}

/// Typed `setsockopt` for options whose value is a plain C struct.
fn set_socket_option<T>(
    fd: BorrowedFd<'_>,
    level: libc::c_int,
    name: libc::c_int,
    val: &T,
) -> io::Result<()> {
    // SAFETY: `val` is valid for reads of `size_of::<T>()` bytes.
    let rc = unsafe {
        libc::setsockopt(
            fd.as_raw_fd(),
            level,
            name,
            (val as *const T).cast::<libc::c_void>(),
            mem::size_of::<T>() as libc::socklen_t,
        )
    };
    if rc != 0 {
        return Err(io::Error::last_os_error());
    }
    Ok(())
}

fn timeval_from_duration(d: Duration) -> libc::timeval {
    let mut tv = libc::timeval {
        tv_sec: d.as_secs().min(libc::time_t::MAX as u64) as libc::time_t,
        tv_usec: d.subsec_micros() as libc::suseconds_t,
    };
    // A sub-microsecond timeout would otherwise round down to "block forever".
    if tv.tv_sec == 0 && tv.tv_usec == 0 {
        tv.tv_usec = 1;
    }
    tv
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn timeval_conversion() {
        let tv = timeval_from_duration(Duration::from_millis(1500));
        assert_eq!(tv.tv_sec, 1);
        assert_eq!(tv.tv_usec, 500_000);
    }

    #[test]
    fn sub_microsecond_timeout_rounds_up() {
        let tv = timeval_from_duration(Duration::from_nanos(10));
        assert_eq!(tv.tv_sec, 0);
        assert_eq!(tv.tv_usec, 1);
    }

    #[test]
    fn resolve_rejects_long_name_without_a_socket() {
        let err = CanSocket::resolve("this-name-is-too-long").unwrap_err();
        assert!(matches!(err, TransportError::NameTooLong { .. }));
    }

    #[cfg(feature = "vcan_tests")]
    mod vcan {
        use super::*;

        #[test]
        fn open_bind_and_report_local_address() {
            let socket = CanSocket::open("vcan0").unwrap();
            assert!(socket.if_index() > 0);

            let addr = socket.local_address().unwrap();
            assert_eq!(addr.if_index(), socket.if_index());
        }

        #[test]
        fn missing_interface_is_not_found() {
            let err = CanSocket::open("vcan-missing").unwrap_err();
            assert!(matches!(err, TransportError::InterfaceNotFound(_)));
        }

        #[test]
        fn classic_roundtrip_with_receive_own_messages() {
            let opts = CanSocketOptions {
                receive_own_messages: true,
                ..CanSocketOptions::default()
            };
            let socket = CanSocket::open_with_options("vcan0", &opts).unwrap();
            socket
                .set_read_timeout(Some(Duration::from_secs(1)))
                .unwrap();

            let mut frame = [0u8; 16];
            frame[0] = 0x23;
            frame[1] = 0x01;
            frame[4] = 2;
            frame[8] = 0xCA;
            frame[9] = 0xFE;
            assert_eq!(socket.send(&frame).unwrap(), 16);

            let mut buf = [0u8; 72];
            let n = socket.recv(&mut buf).unwrap();
            assert_eq!(&buf[..n], &frame);
        }

        #[test]
        fn shared_reader_and_writer() {
            let opts = CanSocketOptions {
                receive_own_messages: true,
                ..CanSocketOptions::fd()
            };
            let socket = std::sync::Arc::new(CanSocket::open_with_options("vcan0", &opts).unwrap());
            socket
                .set_read_timeout(Some(Duration::from_secs(1)))
                .unwrap();

            let reader = std::sync::Arc::clone(&socket);
            let handle = std::thread::spawn(move || {
                let mut buf = [0u8; 72];
                (&*reader).read(&mut buf).unwrap()
            });

            let frame = [0u8; 72];
            (&*socket).write_all(&frame).unwrap();
            assert_eq!(handle.join().unwrap(), 72);
        }
    }
}
