//! Raw SocketCAN transport.
//!
//! Everything needed to get from an interface name to a bound `CAN_RAW`
//! socket:
//! - `SIOCGIFINDEX` name -> index resolution over a `struct ifreq`
//! - `struct sockaddr_can` encoding for `bind`
//! - `SOL_CAN_RAW` toggles (loopback, receive-own, FD frames)
//!
//! The encoders sit on top of the [`SocketControl`] seam and are platform
//! independent; the socket types themselves are Linux only.

pub mod address;
pub mod error;
pub mod ifreq;
pub mod options;
pub mod sys;

#[cfg(target_os = "linux")]
pub mod socket;

#[cfg(all(target_os = "linux", feature = "async"))]
pub mod async_socket;

pub use address::{deserialize_address, serialize_address, InterfaceAddress, SOCKADDR_CAN_LEN};
pub use error::{Result, TransportError};
pub use ifreq::{encode_interface_name, resolve_interface_index, IfReq, IFNAMSIZ};
pub use options::{encode_option_value, set_option, CanSocketOptions, SocketOption};
pub use sys::SocketControl;

#[cfg(target_os = "linux")]
pub use socket::CanSocket;

#[cfg(all(target_os = "linux", feature = "async"))]
pub use async_socket::AsyncCanSocket;
