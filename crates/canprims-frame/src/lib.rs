//! Bit-exact CAN and CAN FD frames over raw SocketCAN datagrams.
//!
//! A [`CanFrame`] is a typed view over the kernel's own byte layout: 16 bytes
//! for classic CAN, 72 for CAN FD. Nothing is decoded into a separate
//! struct, so the bytes handed to `send` are exactly the bytes edited.
//!
//! - [`codec`]: the frame view, its invariants and the compact `ID#DATA` text form
//! - [`reader`] / [`writer`]: blocking one-datagram-per-frame I/O
//! - `async_io` (feature `async`): tokio I/O with cancellation

pub mod codec;
pub mod error;
pub mod layout;
pub mod reader;
pub mod writer;

#[cfg(feature = "async")]
pub mod async_io;

pub use codec::{CanFrame, FrameConfig, DEFAULT_POOL_CAPACITY};
pub use error::{FrameError, Result};
pub use layout::{
    FrameFormat, CANFD_BRS, CANFD_ESI, CANFD_MAX_DLEN, CANFD_MTU, CAN_MAX_DLEN, CAN_MTU, EFF_FLAG,
    EFF_MASK, ERR_FLAG, MAX_FRAME_SIZE, RTR_FLAG, SFF_MASK,
};
pub use reader::{receive_frame, FrameReader};
pub use writer::{send_frame, FrameWriter};

#[cfg(feature = "async")]
pub use async_io::{receive_frame_async, send_frame_async, AsyncFrameReader, AsyncFrameWriter};
