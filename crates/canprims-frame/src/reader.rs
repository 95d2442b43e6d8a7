use std::io::{ErrorKind, Read};
use std::sync::atomic::{AtomicBool, Ordering};

use bytes::BytesMut;
use tracing::{trace, warn};

use crate::codec::{CanFrame, FrameConfig};
use crate::error::{FrameError, Result};
use crate::layout::MAX_FRAME_SIZE;

/// Receive one frame datagram from `src` into a fresh buffer.
///
/// Each `read` is treated as exactly one datagram. Anything other than 16 or
/// 72 bytes (including a 0-byte read) fails with
/// [`FrameError::InvalidFrameLength`].
pub fn receive_frame<R: Read + ?Sized>(src: &mut R) -> Result<CanFrame> {
    let mut buf = [0u8; MAX_FRAME_SIZE];
    let read = loop {
        match src.read(&mut buf) {
            Ok(n) => break n,
            Err(err) if err.kind() == ErrorKind::Interrupted => continue,
            Err(err) => return Err(FrameError::Io(err)),
        }
    };
    CanFrame::from_buffer(BytesMut::from(&buf[..read]))
}

/// Reads whole CAN frames from a datagram source.
///
/// Received frames are carved out of a pooled `BytesMut`; once every frame
/// from an allocation has been dropped the pool reuses it.
pub struct FrameReader<T> {
    inner: T,
    pool: BytesMut,
    config: FrameConfig,
}

impl<T: Read> FrameReader<T> {
    /// Create a new frame reader with default configuration.
    pub fn new(inner: T) -> Self {
        Self::with_config(inner, FrameConfig::default())
    }

    /// Create a new frame reader with explicit configuration.
    pub fn with_config(inner: T, config: FrameConfig) -> Self {
        Self {
            inner,
            pool: BytesMut::with_capacity(config.pool_capacity.max(MAX_FRAME_SIZE)),
            config,
        }
    }

    /// Read the next frame (blocking).
    pub fn read_frame(&mut self) -> Result<CanFrame> {
        loop {
            match self.read_datagram() {
                Ok(n) => return carve_frame(&mut self.pool, n),
                Err(err) if err.kind() == ErrorKind::Interrupted => continue,
                Err(err) => return Err(FrameError::Io(err)),
            }
        }
    }

    /// Read the next frame, giving up once `cancel` is set.
    ///
    /// The flag is checked before every read and again whenever the source
    /// times out or would block, so a read timeout bounds how long
    /// cancellation takes to be noticed.
    pub fn read_frame_cancellable(&mut self, cancel: &AtomicBool) -> Result<CanFrame> {
        loop {
            if cancel.load(Ordering::Acquire) {
                return Err(FrameError::Cancelled);
            }
            match self.read_datagram() {
                Ok(n) => return carve_frame(&mut self.pool, n),
                Err(err)
                    if matches!(
                        err.kind(),
                        ErrorKind::Interrupted | ErrorKind::WouldBlock | ErrorKind::TimedOut
                    ) =>
                {
                    continue
                }
                Err(err) => return Err(FrameError::Io(err)),
            }
        }
    }

    fn read_datagram(&mut self) -> std::io::Result<usize> {
        prepare_slot(&mut self.pool, self.config.pool_capacity);
        let result = self.inner.read(&mut self.pool[..]);
        if result.is_err() {
            self.pool.clear();
        }
        result
    }

    /// Borrow the underlying source.
    pub fn get_ref(&self) -> &T {
        &self.inner
    }

    /// Mutably borrow the underlying source.
    pub fn get_mut(&mut self) -> &mut T {
        &mut self.inner
    }

    /// Consume the reader and return the inner source.
    pub fn into_inner(self) -> T {
        self.inner
    }

    /// Current frame reader configuration.
    pub fn config(&self) -> &FrameConfig {
        &self.config
    }
}

/// Make the front of `pool` a zeroed, max-size receive slot.
pub(crate) fn prepare_slot(pool: &mut BytesMut, pool_capacity: usize) {
    if pool.capacity() < MAX_FRAME_SIZE {
        pool.reserve(pool_capacity.max(MAX_FRAME_SIZE));
    }
    pool.resize(MAX_FRAME_SIZE, 0);
}

/// Split the first `read` bytes of the slot off as a frame.
pub(crate) fn carve_frame(pool: &mut BytesMut, read: usize) -> Result<CanFrame> {
    pool.truncate(read);
    let frame = CanFrame::from_buffer(pool.split()).inspect_err(|_| {
        warn!(len = read, "dropping datagram that is not a CAN frame");
    })?;
    trace!(
        id = frame.id(),
        len = frame.payload_len(),
        fd = frame.is_fd(),
        "read CAN frame"
    );
    Ok(frame)
}

#[cfg(target_os = "linux")]
impl FrameReader<canprims_transport::CanSocket> {
    /// Create a frame reader for a `CanSocket` and apply the read timeout from config.
    pub fn with_config_socket(
        inner: canprims_transport::CanSocket,
        config: FrameConfig,
    ) -> Result<Self> {
        inner
            .set_read_timeout(config.read_timeout)
            .map_err(crate::error::transport_to_frame_error)?;
        Ok(Self::with_config(inner, config))
    }
}
