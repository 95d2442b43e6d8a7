use std::io;
use std::pin::Pin;
use std::task::{ready, Context, Poll};

use tokio::io::unix::AsyncFd;
use tokio::io::{AsyncRead, AsyncWrite, ReadBuf};

use crate::error::Result;
use crate::options::CanSocketOptions;
use crate::socket::CanSocket;

/// Tokio wrapper around a non-blocking [`CanSocket`].
///
/// Readiness comes from `tokio::io::unix::AsyncFd`; each `poll_read` yields
/// one datagram and each `poll_write` sends one.
#[derive(Debug)]
pub struct AsyncCanSocket {
    io: AsyncFd<CanSocket>,
}

impl AsyncCanSocket {
    /// Open the named interface and register it with the current runtime.
    pub fn open(ifname: &str) -> Result<Self> {
        Self::from_socket(CanSocket::open(ifname)?)
    }

    /// Open with explicit socket options.
    pub fn open_with_options(ifname: &str, options: &CanSocketOptions) -> Result<Self> {
        Self::from_socket(CanSocket::open_with_options(ifname, options)?)
    }

    /// Switch an open socket to non-blocking mode and register it.
    pub fn from_socket(socket: CanSocket) -> Result<Self> {
        socket.set_nonblocking(true)?;
        Ok(Self {
            io: AsyncFd::new(socket)?,
        })
    }

    /// Send one frame datagram, waiting for write readiness.
    pub async fn send(&self, frame: &[u8]) -> io::Result<usize> {
        loop {
            let mut guard = self.io.writable().await?;
            match guard.try_io(|inner| inner.get_ref().send(frame)) {
                Ok(result) => return result,
                Err(_would_block) => continue,
            }
        }
    }

    /// Receive one frame datagram, waiting for read readiness.
    pub async fn recv(&self, buf: &mut [u8]) -> io::Result<usize> {
        loop {
            let mut guard = self.io.readable().await?;
            match guard.try_io(|inner| inner.get_ref().recv(buf)) {
                Ok(result) => return result,
                Err(_would_block) => continue,
            }
        }
    }

    pub fn get_ref(&self) -> &CanSocket {
        self.io.get_ref()
    }

    pub fn get_mut(&mut self) -> &mut CanSocket {
        self.io.get_mut()
    }

    pub fn into_inner(self) -> CanSocket {
        self.io.into_inner()
    }
}

impl AsyncRead for AsyncCanSocket {
    fn poll_read(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        loop {
            let mut guard = ready!(self.io.poll_read_ready(cx))?;
            let unfilled = buf.initialize_unfilled();
            match guard.try_io(|inner| inner.get_ref().recv(unfilled)) {
                Ok(Ok(n)) => {
                    buf.advance(n);
                    return Poll::Ready(Ok(()));
                }
                Ok(Err(err)) => return Poll::Ready(Err(err)),
                Err(_would_block) => continue,
            }
        }
    }
}

impl AsyncWrite for AsyncCanSocket {
    fn poll_write(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &[u8],
    ) -> Poll<io::Result<usize>> {
        loop {
            let mut guard = ready!(self.io.poll_write_ready(cx))?;
            match guard.try_io(|inner| inner.get_ref().send(buf)) {
                Ok(result) => return Poll::Ready(result),
                Err(_would_block) => continue,
            }
        }
    }

    fn poll_flush(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Poll::Ready(Ok(()))
    }

    fn poll_shutdown(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Poll::Ready(Ok(()))
    }
}
