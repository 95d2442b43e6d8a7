//! Tokio frame I/O with cooperative cancellation.
//!
//! Every operation takes a [`CancellationToken`]; cancellation wins any race
//! with a ready transport and surfaces as [`FrameError::Cancelled`].

use bytes::BytesMut;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio_util::sync::CancellationToken;
use tracing::trace;

use crate::codec::{CanFrame, FrameConfig};
use crate::error::{FrameError, Result};
use crate::layout::MAX_FRAME_SIZE;
use crate::reader::{carve_frame, prepare_slot};

/// Receive one frame datagram from `src`.
pub async fn receive_frame_async<R>(src: &mut R, cancel: &CancellationToken) -> Result<CanFrame>
where
    R: AsyncRead + Unpin + ?Sized,
{
    let mut buf = [0u8; MAX_FRAME_SIZE];
    let read = tokio::select! {
        biased;
        _ = cancel.cancelled() => return Err(FrameError::Cancelled),
        read = src.read(&mut buf) => read?,
    };
    CanFrame::from_buffer(BytesMut::from(&buf[..read]))
}

/// Send the full wire image of `frame` as one datagram.
pub async fn send_frame_async<W, B>(
    dst: &mut W,
    frame: &CanFrame<B>,
    cancel: &CancellationToken,
) -> Result<()>
where
    W: AsyncWrite + Unpin + ?Sized,
    B: AsRef<[u8]>,
{
    let bytes = frame.as_bytes();
    let written = tokio::select! {
        biased;
        _ = cancel.cancelled() => return Err(FrameError::Cancelled),
        written = dst.write(bytes) => written?,
    };
    if written != bytes.len() {
        return Err(FrameError::IncompleteWrite {
            written,
            expected: bytes.len(),
        });
    }
    Ok(())
}

/// Async counterpart of [`FrameReader`](crate::FrameReader).
pub struct AsyncFrameReader<T> {
    inner: T,
    pool: BytesMut,
    config: FrameConfig,
}

impl<T: AsyncRead + Unpin> AsyncFrameReader<T> {
    pub fn new(inner: T) -> Self {
        Self::with_config(inner, FrameConfig::default())
    }

    pub fn with_config(inner: T, config: FrameConfig) -> Self {
        Self {
            inner,
            pool: BytesMut::with_capacity(config.pool_capacity.max(MAX_FRAME_SIZE)),
            config,
        }
    }

    /// Read the next frame. Never cancelled.
    pub async fn read_frame(&mut self) -> Result<CanFrame> {
        self.read_frame_cancellable(&CancellationToken::new()).await
    }

    /// Read the next frame, or fail with `Cancelled` once `cancel` fires.
    pub async fn read_frame_cancellable(&mut self, cancel: &CancellationToken) -> Result<CanFrame> {
        prepare_slot(&mut self.pool, self.config.pool_capacity);
        let result = tokio::select! {
            biased;
            _ = cancel.cancelled() => Err(FrameError::Cancelled),
            read = self.inner.read(&mut self.pool[..]) => read.map_err(FrameError::Io),
        };
        match result {
            Ok(read) => carve_frame(&mut self.pool, read),
            Err(err) => {
                self.pool.clear();
                Err(err)
            }
        }
    }

    pub fn get_ref(&self) -> &T {
        &self.inner
    }

    pub fn get_mut(&mut self) -> &mut T {
        &mut self.inner
    }

    pub fn into_inner(self) -> T {
        self.inner
    }

    pub fn config(&self) -> &FrameConfig {
        &self.config
    }
}

/// Async counterpart of [`FrameWriter`](crate::FrameWriter).
pub struct AsyncFrameWriter<T> {
    inner: T,
    config: FrameConfig,
}

impl<T: AsyncWrite + Unpin> AsyncFrameWriter<T> {
    pub fn new(inner: T) -> Self {
        Self::with_config(inner, FrameConfig::default())
    }

    pub fn with_config(inner: T, config: FrameConfig) -> Self {
        Self { inner, config }
    }

    /// Write one frame. Never cancelled.
    pub async fn write_frame<B: AsRef<[u8]>>(&mut self, frame: &CanFrame<B>) -> Result<()> {
        self.write_frame_cancellable(frame, &CancellationToken::new())
            .await
    }

    /// Write one frame, or fail with `Cancelled` once `cancel` fires.
    pub async fn write_frame_cancellable<B: AsRef<[u8]>>(
        &mut self,
        frame: &CanFrame<B>,
        cancel: &CancellationToken,
    ) -> Result<()> {
        send_frame_async(&mut self.inner, frame, cancel).await?;
        trace!(
            id = frame.id(),
            len = frame.payload_len(),
            fd = frame.is_fd(),
            "wrote CAN frame"
        );
        self.inner.flush().await?;
        Ok(())
    }

    /// Build a data frame for `id` and send it.
    pub async fn send(&mut self, id: u32, payload: &[u8]) -> Result<()> {
        let frame = CanFrame::with_payload(id, payload)?;
        self.write_frame(&frame).await
    }

    pub fn get_ref(&self) -> &T {
        &self.inner
    }

    pub fn get_mut(&mut self) -> &mut T {
        &mut self.inner
    }

    pub fn into_inner(self) -> T {
        self.inner
    }

    pub fn config(&self) -> &FrameConfig {
        &self.config
    }
}

#[cfg(test)]
mod tests {
    use std::collections::VecDeque;
    use std::io;
    use std::pin::Pin;
    use std::task::{Context, Poll};
    use std::time::Duration;

    use tokio::io::ReadBuf;

    use super::*;
    use crate::layout::{CANFD_MTU, CAN_MTU};

    /// One queued datagram per `poll_read`; pending forever once drained.
    #[derive(Default)]
    struct DatagramSource {
        queue: VecDeque<Vec<u8>>,
    }

    impl DatagramSource {
        fn with(frames: &[&CanFrame]) -> Self {
            Self {
                queue: frames.iter().map(|f| f.as_bytes().to_vec()).collect(),
            }
        }
    }

    impl AsyncRead for DatagramSource {
        fn poll_read(
            mut self: Pin<&mut Self>,
            _cx: &mut Context<'_>,
            buf: &mut ReadBuf<'_>,
        ) -> Poll<io::Result<()>> {
            match self.queue.pop_front() {
                Some(datagram) => {
                    let n = datagram.len().min(buf.remaining());
                    buf.put_slice(&datagram[..n]);
                    Poll::Ready(Ok(()))
                }
                None => Poll::Pending,
            }
        }
    }

    #[derive(Default)]
    struct DatagramSink {
        datagrams: Vec<Vec<u8>>,
        flushes: usize,
    }

    impl AsyncWrite for DatagramSink {
        fn poll_write(
            mut self: Pin<&mut Self>,
            _cx: &mut Context<'_>,
            buf: &[u8],
        ) -> Poll<io::Result<usize>> {
            self.datagrams.push(buf.to_vec());
            Poll::Ready(Ok(buf.len()))
        }

        fn poll_flush(mut self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<io::Result<()>> {
            self.flushes += 1;
            Poll::Ready(Ok(()))
        }

        fn poll_shutdown(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<io::Result<()>> {
            Poll::Ready(Ok(()))
        }
    }

    /// Never ready for writing.
    struct StalledSink;

    impl AsyncWrite for StalledSink {
        fn poll_write(
            self: Pin<&mut Self>,
            _cx: &mut Context<'_>,
            _buf: &[u8],
        ) -> Poll<io::Result<usize>> {
            Poll::Pending
        }

        fn poll_flush(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<io::Result<()>> {
            Poll::Ready(Ok(()))
        }

        fn poll_shutdown(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<io::Result<()>> {
            Poll::Ready(Ok(()))
        }
    }

    #[tokio::test]
    async fn receive_one_frame() {
        let sent = CanFrame::with_payload(0x123, &[1, 2, 3]).unwrap();
        let mut src = DatagramSource::with(&[&sent]);

        let frame = receive_frame_async(&mut src, &CancellationToken::new())
            .await
            .unwrap();
        assert_eq!(frame, sent);
        assert_eq!(frame.as_bytes().len(), CAN_MTU);
    }

    #[tokio::test]
    async fn receive_rejects_odd_datagram() {
        let mut src = DatagramSource::default();
        src.queue.push_back(vec![0u8; 40]);

        let err = receive_frame_async(&mut src, &CancellationToken::new())
            .await
            .unwrap_err();
        assert!(matches!(err, FrameError::InvalidFrameLength { len: 40 }));
    }

    #[tokio::test]
    async fn cancelled_token_wins_over_ready_data() {
        let sent = CanFrame::with_payload(0x1, &[]).unwrap();
        let mut src = DatagramSource::with(&[&sent]);
        let cancel = CancellationToken::new();
        cancel.cancel();

        let err = receive_frame_async(&mut src, &cancel).await.unwrap_err();
        assert!(matches!(err, FrameError::Cancelled));
        assert_eq!(src.queue.len(), 1);
    }

    #[tokio::test]
    async fn cancel_interrupts_pending_read() {
        let mut reader = AsyncFrameReader::new(DatagramSource::default());
        let cancel = CancellationToken::new();

        let trigger = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(10)).await;
            trigger.cancel();
        });

        let err = reader.read_frame_cancellable(&cancel).await.unwrap_err();
        assert!(matches!(err, FrameError::Cancelled));
    }

    #[tokio::test]
    async fn reader_yields_frames_in_order() {
        let a = CanFrame::with_payload(0x10, &[0xA]).unwrap();
        let b = CanFrame::with_payload(0x1FFF_FFFF, &[0xB; 33]).unwrap();
        let mut reader = AsyncFrameReader::new(DatagramSource::with(&[&a, &b]));

        assert_eq!(reader.read_frame().await.unwrap(), a);
        let second = reader.read_frame().await.unwrap();
        assert_eq!(second, b);
        assert_eq!(second.as_bytes().len(), CANFD_MTU);
    }

    #[tokio::test]
    async fn writer_sends_datagrams_and_flushes() {
        let mut writer = AsyncFrameWriter::new(DatagramSink::default());

        writer.send(0x42, b"hi").await.unwrap();
        let frame: CanFrame = "1ABCDEF0#R".parse().unwrap();
        writer.write_frame(&frame).await.unwrap();

        let sink = writer.into_inner();
        assert_eq!(sink.datagrams.len(), 2);
        assert_eq!(sink.flushes, 2);
        assert_eq!(sink.datagrams[1], frame.as_bytes());

        let first = CanFrame::from_buffer(sink.datagrams[0].as_slice()).unwrap();
        assert_eq!(first.id(), 0x42);
        assert_eq!(first.payload(), b"hi");
    }

    #[tokio::test]
    async fn cancel_interrupts_stalled_write() {
        let mut writer = AsyncFrameWriter::new(StalledSink);
        let cancel = CancellationToken::new();
        let trigger = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(10)).await;
            trigger.cancel();
        });

        let frame = CanFrame::classic();
        let err = writer
            .write_frame_cancellable(&frame, &cancel)
            .await
            .unwrap_err();
        assert!(matches!(err, FrameError::Cancelled));
    }

    #[tokio::test]
    async fn writer_rejects_invalid_payload_before_io() {
        let mut writer = AsyncFrameWriter::new(DatagramSink::default());
        let err = writer.send(1, &[0; 80]).await.unwrap_err();
        assert!(matches!(err, FrameError::PayloadLengthOutOfRange { .. }));
        assert!(writer.get_ref().datagrams.is_empty());
    }

    #[cfg(feature = "vcan_tests")]
    #[tokio::test]
    async fn roundtrip_over_vcan() {
        use canprims_transport::{AsyncCanSocket, CanSocketOptions};

        let opts = CanSocketOptions {
            receive_own_messages: true,
            ..CanSocketOptions::default()
        };
        let tx = AsyncCanSocket::open_with_options("vcan0", &opts).unwrap();
        let mut writer = AsyncFrameWriter::new(tx);
        let rx = AsyncCanSocket::open_with_options("vcan0", &opts).unwrap();
        let mut reader = AsyncFrameReader::new(rx);

        writer.send(0x7AB, &[7; 8]).await.unwrap();
        let frame = reader.read_frame().await.unwrap();
        assert_eq!(frame.id(), 0x7AB);
    }
}
