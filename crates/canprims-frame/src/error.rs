/// Errors that can occur while building, decoding or moving CAN frames.
#[derive(Debug, thiserror::Error)]
pub enum FrameError {
    /// The buffer (or received datagram) is neither 16 nor 72 bytes.
    #[error("invalid CAN frame length ({len} bytes, expected 16 or 72)")]
    InvalidFrameLength { len: usize },

    /// A payload length exceeds the ceiling of the frame format.
    #[error("payload length {len} out of range (max {max})")]
    PayloadLengthOutOfRange { len: usize, max: usize },

    /// An identifier does not fit in 29 bits.
    #[error("CAN identifier {id:#X} exceeds 29 bits")]
    IdentifierOutOfRange { id: u32 },

    /// A compact `ID#DATA` frame string could not be parsed.
    #[error("invalid frame syntax: {0}")]
    InvalidFrameSyntax(String),

    /// The transport accepted only part of a frame.
    #[error("incomplete frame write ({written} of {expected} bytes)")]
    IncompleteWrite { written: usize, expected: usize },

    /// The operation was cancelled while waiting on the transport.
    #[error("frame I/O cancelled")]
    Cancelled,

    /// An I/O error occurred while reading or writing frames.
    #[error("frame I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, FrameError>;

/// Fold a transport failure into the frame error space.
#[cfg(target_os = "linux")]
pub(crate) fn transport_to_frame_error(err: canprims_transport::TransportError) -> FrameError {
    match err {
        canprims_transport::TransportError::Io(io)
        | canprims_transport::TransportError::Open(io) => FrameError::Io(io),
        canprims_transport::TransportError::Bind { source, .. } => FrameError::Io(source),
        other => FrameError::Io(std::io::Error::other(other.to_string())),
    }
}
