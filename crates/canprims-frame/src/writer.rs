use std::io::{ErrorKind, Write};
use std::sync::atomic::{AtomicBool, Ordering};

use tracing::trace;

use crate::codec::{CanFrame, FrameConfig};
use crate::error::{FrameError, Result};

/// Send the full wire image of `frame` as one datagram.
///
/// A datagram cannot be resumed, so a short write fails with
/// [`FrameError::IncompleteWrite`] instead of writing the remainder.
/// `WouldBlock` and `TimedOut` (an expired `SO_SNDTIMEO`) surface as
/// [`FrameError::Io`].
pub fn send_frame<W, B>(dst: &mut W, frame: &CanFrame<B>) -> Result<()>
where
    W: Write + ?Sized,
    B: AsRef<[u8]>,
{
    loop {
        match write_datagram(dst, frame.as_bytes()) {
            Err(FrameError::Io(err)) if err.kind() == ErrorKind::Interrupted => continue,
            result => return result,
        }
    }
}

fn write_datagram<W: Write + ?Sized>(dst: &mut W, bytes: &[u8]) -> Result<()> {
    match dst.write(bytes) {
        Ok(n) if n == bytes.len() => Ok(()),
        Ok(n) => Err(FrameError::IncompleteWrite {
            written: n,
            expected: bytes.len(),
        }),
        Err(err) => Err(FrameError::Io(err)),
    }
}

/// Writes whole CAN frames to a datagram sink.
pub struct FrameWriter<T> {
    inner: T,
    config: FrameConfig,
}

impl<T: Write> FrameWriter<T> {
    /// Create a new frame writer with default configuration.
    pub fn new(inner: T) -> Self {
        Self::with_config(inner, FrameConfig::default())
    }

    /// Create a new frame writer with explicit configuration.
    pub fn with_config(inner: T, config: FrameConfig) -> Self {
        Self { inner, config }
    }

    /// Write one frame (blocking).
    pub fn write_frame<B: AsRef<[u8]>>(&mut self, frame: &CanFrame<B>) -> Result<()> {
        send_frame(&mut self.inner, frame)?;
        self.finish_write(frame)
    }

    /// Write one frame, giving up once `cancel` is set.
    ///
    /// The flag is checked before every attempt and again whenever the sink
    /// times out or would block, so a write timeout bounds how long
    /// cancellation takes to be noticed.
    pub fn write_frame_cancellable<B: AsRef<[u8]>>(
        &mut self,
        frame: &CanFrame<B>,
        cancel: &AtomicBool,
    ) -> Result<()> {
        loop {
            if cancel.load(Ordering::Acquire) {
                return Err(FrameError::Cancelled);
            }
            match write_datagram(&mut self.inner, frame.as_bytes()) {
                Ok(()) => return self.finish_write(frame),
                Err(FrameError::Io(err))
                    if matches!(
                        err.kind(),
                        ErrorKind::Interrupted | ErrorKind::WouldBlock | ErrorKind::TimedOut
                    ) =>
                {
                    continue
                }
                Err(err) => return Err(err),
            }
        }
    }

    fn finish_write<B: AsRef<[u8]>>(&mut self, frame: &CanFrame<B>) -> Result<()> {
        trace!(
            id = frame.id(),
            len = frame.payload_len(),
            fd = frame.is_fd(),
            "wrote CAN frame"
        );
        self.flush()
    }

    /// Build a data frame for `id` and send it.
    ///
    /// Payloads over 8 bytes go out as CAN FD; ids over 0x7FF get the EFF bit.
    pub fn send(&mut self, id: u32, payload: &[u8]) -> Result<()> {
        let frame = CanFrame::with_payload(id, payload)?;
        self.write_frame(&frame)
    }

    /// Flush the underlying sink.
    pub fn flush(&mut self) -> Result<()> {
        loop {
            match self.inner.flush() {
                Ok(()) => return Ok(()),
                Err(err) if err.kind() == ErrorKind::Interrupted => continue,
                Err(err) => return Err(FrameError::Io(err)),
            }
        }
    }

    /// Borrow the underlying sink.
    pub fn get_ref(&self) -> &T {
        &self.inner
    }

    /// Mutably borrow the underlying sink.
    pub fn get_mut(&mut self) -> &mut T {
        &mut self.inner
    }

    /// Consume the writer and return the inner sink.
    pub fn into_inner(self) -> T {
        self.inner
    }

    /// Current frame writer configuration.
    pub fn config(&self) -> &FrameConfig {
        &self.config
    }
}

#[cfg(target_os = "linux")]
impl FrameWriter<canprims_transport::CanSocket> {
    /// Create a frame writer for a `CanSocket` and apply the write timeout from config.
    pub fn with_config_socket(
        inner: canprims_transport::CanSocket,
        config: FrameConfig,
    ) -> Result<Self> {
        inner
            .set_write_timeout(config.write_timeout)
            .map_err(crate::error::transport_to_frame_error)?;
        Ok(Self::with_config(inner, config))
    }
}
