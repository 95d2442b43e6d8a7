use std::fmt;

use tracing::debug;

use crate::error::{Result, TransportError};
use crate::sys::{SocketControl, SOL_CAN_RAW};

/// Boolean `SOL_CAN_RAW` socket options.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SocketOption {
    /// `CAN_RAW_LOOPBACK`: loop sent frames back to other local sockets.
    Loopback,
    /// `CAN_RAW_RECV_OWN_MSGS`: receive this socket's own looped-back frames.
    ReceiveOwnMessages,
    /// `CAN_RAW_FD_FRAMES`: accept and deliver 72-byte CAN FD frames.
    FdFrames,
}

impl SocketOption {
    /// Kernel option name within `SOL_CAN_RAW`.
    pub const fn name(self) -> i32 {
        match self {
            SocketOption::Loopback => 3,
            SocketOption::ReceiveOwnMessages => 4,
            SocketOption::FdFrames => 5,
        }
    }

    /// Value a freshly created `CAN_RAW` socket starts with.
    pub const fn kernel_default(self) -> bool {
        matches!(self, SocketOption::Loopback)
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            SocketOption::Loopback => "CAN_RAW_LOOPBACK",
            SocketOption::ReceiveOwnMessages => "CAN_RAW_RECV_OWN_MSGS",
            SocketOption::FdFrames => "CAN_RAW_FD_FRAMES",
        }
    }
}

impl fmt::Display for SocketOption {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Encode a toggle as the 4-byte little-endian integer the kernel expects.
pub fn encode_option_value(enabled: bool) -> [u8; 4] {
    u32::from(enabled).to_le_bytes()
}

/// Apply one toggle to a raw CAN socket.
pub fn set_option<C: SocketControl + ?Sized>(
    handle: &C,
    option: SocketOption,
    enabled: bool,
) -> Result<()> {
    handle
        .set_raw_option(SOL_CAN_RAW, option.name(), &encode_option_value(enabled))
        .map_err(|err| TransportError::SocketOptionFailed {
            option,
            code: err.raw_os_error().unwrap_or(-1),
        })?;
    debug!(%option, enabled, "set CAN_RAW socket option");
    Ok(())
}

/// Socket option set applied when opening a [`CanSocket`](crate::CanSocket).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CanSocketOptions {
    /// Default: `true`.
    pub loopback: bool,
    /// Default: `false`.
    pub receive_own_messages: bool,
    /// Default: `false`. Must be on to send or receive 72-byte frames.
    pub fd_frames: bool,
}

impl Default for CanSocketOptions {
    fn default() -> Self {
        Self {
            loopback: SocketOption::Loopback.kernel_default(),
            receive_own_messages: SocketOption::ReceiveOwnMessages.kernel_default(),
            fd_frames: SocketOption::FdFrames.kernel_default(),
        }
    }
}

impl CanSocketOptions {
    /// Options with CAN FD frames enabled.
    pub fn fd() -> Self {
        Self {
            fd_frames: true,
            ..Self::default()
        }
    }

    /// Apply the toggles to a freshly opened socket, FD mode first.
    ///
    /// Toggles already at their kernel default are skipped, so a classic
    /// socket never touches `CAN_RAW_FD_FRAMES` (kernels without FD support
    /// reject it with `ENOPROTOOPT`).
    pub fn apply<C: SocketControl + ?Sized>(&self, handle: &C) -> Result<()> {
        for (option, enabled) in [
            (SocketOption::FdFrames, self.fd_frames),
            (SocketOption::Loopback, self.loopback),
            (SocketOption::ReceiveOwnMessages, self.receive_own_messages),
        ] {
            if enabled != option.kernel_default() {
                set_option(handle, option, enabled)?;
            }
        }
        Ok(())
    }
}
