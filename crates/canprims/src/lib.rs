//! Raw SocketCAN for Rust: bit-exact CAN and CAN FD frames.
//!
//! canprims reads and writes the kernel's own `can_frame`/`canfd_frame` byte
//! layout directly, resolves interface names with `SIOCGIFINDEX`, and binds
//! raw `CAN_RAW` sockets with the usual loopback and FD toggles.
//!
//! # Crate Structure
//!
//! - [`transport`]: interface resolution, `sockaddr_can`, socket options, raw sockets
//! - [`frame`]: the frame codec and blocking/async frame I/O

/// Re-export transport types.
pub mod transport {
    pub use canprims_transport::*;
}

/// Re-export frame types.
pub mod frame {
    pub use canprims_frame::*;
}
