//! Kernel frame layout shared by `struct can_frame` and `struct canfd_frame`.
//!
//! ```text
//! ┌──────────────────┬─────────┬──────────┬────────────┬───────────────────┐
//! │ can_id (4B LE)   │ len     │ flags    │ reserved   │ data              │
//! │ id | ERR|RTR|EFF │ (1B)    │ (1B, FD) │ (2B)       │ 8B or 64B         │
//! └──────────────────┴─────────┴──────────┴────────────┴───────────────────┘
//! ```
//!
//! The two formats differ only in total size; the buffer length is the sole
//! discriminant.

/// Size of a classic CAN frame.
pub const CAN_MTU: usize = 16;
/// Size of a CAN FD frame.
pub const CANFD_MTU: usize = 72;
/// Largest frame a receive buffer must hold.
pub const MAX_FRAME_SIZE: usize = CANFD_MTU;

pub const ID_OFFSET: usize = 0;
pub const LEN_OFFSET: usize = 4;
pub const FLAGS_OFFSET: usize = 5;
pub const DATA_OFFSET: usize = 8;

/// Payload ceiling of a classic frame.
pub const CAN_MAX_DLEN: usize = 8;
/// Payload ceiling of an FD frame.
pub const CANFD_MAX_DLEN: usize = 64;

/// Extended frame format flag (bit 31).
pub const EFF_FLAG: u32 = 0x8000_0000;
/// Remote transmission request flag (bit 30).
pub const RTR_FLAG: u32 = 0x4000_0000;
/// Error message frame flag (bit 29).
pub const ERR_FLAG: u32 = 0x2000_0000;

/// Valid bits of a standard (11-bit) identifier.
pub const SFF_MASK: u32 = 0x0000_07FF;
/// Valid bits of an extended (29-bit) identifier; also the id/flags split.
pub const EFF_MASK: u32 = 0x1FFF_FFFF;

/// CAN FD bit rate switch.
pub const CANFD_BRS: u8 = 0x01;
/// CAN FD error state indicator.
pub const CANFD_ESI: u8 = 0x02;

/// Which of the two kernel layouts a buffer holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FrameFormat {
    Classic,
    Fd,
}

impl FrameFormat {
    /// Classify a buffer by its length.
    pub const fn from_len(len: usize) -> Option<Self> {
        match len {
            CAN_MTU => Some(FrameFormat::Classic),
            CANFD_MTU => Some(FrameFormat::Fd),
            _ => None,
        }
    }

    /// Format needed to carry `payload_len` bytes.
    pub const fn for_payload(payload_len: usize) -> Option<Self> {
        if payload_len <= CAN_MAX_DLEN {
            Some(FrameFormat::Classic)
        } else if payload_len <= CANFD_MAX_DLEN {
            Some(FrameFormat::Fd)
        } else {
            None
        }
    }

    /// Total buffer size.
    pub const fn mtu(self) -> usize {
        match self {
            FrameFormat::Classic => CAN_MTU,
            FrameFormat::Fd => CANFD_MTU,
        }
    }

    /// Payload ceiling.
    pub const fn max_payload(self) -> usize {
        match self {
            FrameFormat::Classic => CAN_MAX_DLEN,
            FrameFormat::Fd => CANFD_MAX_DLEN,
        }
    }

    pub const fn is_fd(self) -> bool {
        matches!(self, FrameFormat::Fd)
    }
}
