use crate::options::SocketOption;

/// Errors that can occur while resolving, configuring or using a raw CAN socket.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    /// The interface name does not fit in `ifr_name` with its terminator.
    #[error("interface name too long ({len} bytes, max {max}): {name}")]
    NameTooLong { name: String, len: usize, max: usize },

    /// An empty interface name was supplied.
    #[error("interface name must not be empty")]
    EmptyInterfaceName,

    /// `SIOCGIFINDEX` reported `ENODEV`.
    #[error("no such CAN interface: {0}")]
    InterfaceNotFound(String),

    /// `SIOCGIFINDEX` failed for any reason other than `ENODEV`.
    #[error("interface index resolution failed (errno {0})")]
    InterfaceResolutionFailed(i32),

    /// A socket address buffer was not exactly `sockaddr_can` sized.
    #[error("invalid CAN socket address length ({len} bytes, expected 24)")]
    InvalidAddressLength { len: usize },

    /// A socket address carried a family other than `AF_CAN`.
    #[error("address family {family} is not AF_CAN")]
    AddressFamilyMismatch { family: u16 },

    /// Setting a `SOL_CAN_RAW` option failed.
    #[error("failed to set socket option {option} (errno {code})")]
    SocketOptionFailed { option: SocketOption, code: i32 },

    /// Failed to create the raw CAN socket.
    #[error("failed to open raw CAN socket: {0}")]
    Open(std::io::Error),

    /// Failed to bind the socket to the interface.
    #[error("failed to bind to interface index {if_index}: {source}")]
    Bind {
        if_index: i32,
        source: std::io::Error,
    },

    /// An I/O error occurred on the socket.
    #[error("transport I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, TransportError>;
