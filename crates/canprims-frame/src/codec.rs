use std::fmt;
use std::str::FromStr;

use bytes::BytesMut;

use crate::error::{FrameError, Result};
use crate::layout::{
    FrameFormat, CANFD_MTU, CAN_MTU, DATA_OFFSET, EFF_FLAG, EFF_MASK, ERR_FLAG, FLAGS_OFFSET,
    ID_OFFSET, LEN_OFFSET, RTR_FLAG, SFF_MASK,
};

/// Default receive pool size: room for 64 FD frames before reallocating.
pub const DEFAULT_POOL_CAPACITY: usize = 64 * CANFD_MTU;

/// A CAN or CAN FD frame viewed in place over its kernel byte layout.
///
/// `B` is the backing storage: `BytesMut` for owned frames (the default),
/// `&[u8]`/`&mut [u8]` for borrowed views, `[u8; 16]`/`[u8; 72]` on the stack.
/// The buffer is the single source of truth; every accessor reads or writes
/// it directly.
///
/// Reads are available for any `B: AsRef<[u8]>`; writes additionally need
/// `B: AsMut<[u8]>`. Every write keeps these invariants:
/// - the length byte never exceeds the format's payload ceiling,
/// - bytes past the payload are zero after any length change,
/// - an RTR frame carries no payload,
/// - the id and the ERR/RTR/EFF bits are updated independently.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct CanFrame<B = BytesMut> {
    buf: B,
}

impl<B: AsRef<[u8]>> CanFrame<B> {
    /// Validate `buf` as a frame. Only 16- and 72-byte buffers are accepted.
    pub fn from_buffer(buf: B) -> Result<Self> {
        let len = buf.as_ref().len();
        if FrameFormat::from_len(len).is_none() {
            return Err(FrameError::InvalidFrameLength { len });
        }
        Ok(Self { buf })
    }

    fn bytes(&self) -> &[u8] {
        self.buf.as_ref()
    }

    pub fn format(&self) -> FrameFormat {
        if self.bytes().len() == CANFD_MTU {
            FrameFormat::Fd
        } else {
            FrameFormat::Classic
        }
    }

    /// Whether this is a 72-byte CAN FD frame.
    pub fn is_fd(&self) -> bool {
        self.format().is_fd()
    }

    /// Payload ceiling for this frame's format (8 or 64).
    pub fn capacity(&self) -> usize {
        self.format().max_payload()
    }

    /// The whole identifier word, flags included.
    pub fn raw_id(&self) -> u32 {
        let b = self.bytes();
        u32::from_le_bytes([
            b[ID_OFFSET],
            b[ID_OFFSET + 1],
            b[ID_OFFSET + 2],
            b[ID_OFFSET + 3],
        ])
    }

    /// The numeric identifier, always masked to 29 bits.
    pub fn id(&self) -> u32 {
        self.raw_id() & EFF_MASK
    }

    pub fn is_error(&self) -> bool {
        self.raw_id() & ERR_FLAG != 0
    }

    pub fn is_rtr(&self) -> bool {
        self.raw_id() & RTR_FLAG != 0
    }

    /// Extended format: the EFF bit is set or the id does not fit in 11 bits.
    pub fn is_extended(&self) -> bool {
        self.raw_id() & EFF_FLAG != 0 || self.id() > SFF_MASK
    }

    /// The length byte as stored.
    pub fn payload_len(&self) -> usize {
        self.bytes()[LEN_OFFSET] as usize
    }

    /// CAN FD flags byte (reserved on classic frames).
    pub fn fd_flags(&self) -> u8 {
        self.bytes()[FLAGS_OFFSET]
    }

    /// The whole data region (8 or 64 bytes), padding included.
    pub fn data(&self) -> &[u8] {
        &self.bytes()[DATA_OFFSET..]
    }

    /// The payload, clamped to the data region if the length byte overstates it.
    pub fn payload(&self) -> &[u8] {
        let len = self.payload_len().min(self.capacity());
        &self.data()[..len]
    }

    /// The full wire image (16 or 72 bytes).
    pub fn as_bytes(&self) -> &[u8] {
        self.bytes()
    }

    pub fn get_ref(&self) -> &B {
        &self.buf
    }

    /// Consume the frame and return its buffer.
    pub fn into_inner(self) -> B {
        self.buf
    }
}

impl<B: AsRef<[u8]> + AsMut<[u8]>> CanFrame<B> {
    fn bytes_mut(&mut self) -> &mut [u8] {
        self.buf.as_mut()
    }

    /// Replace the whole identifier word, flags included.
    pub fn set_raw_id(&mut self, raw_id: u32) {
        self.bytes_mut()[ID_OFFSET..ID_OFFSET + 4].copy_from_slice(&raw_id.to_le_bytes());
    }

    fn update_raw_id(&mut self, mask: u32, bits: u32) {
        let raw_id = (self.raw_id() & !mask) | (bits & mask);
        self.set_raw_id(raw_id);
    }

    /// Replace the low 29 bits, keeping ERR/RTR/EFF.
    pub fn set_id(&mut self, id: u32) {
        self.update_raw_id(EFF_MASK, id);
    }

    /// Toggle the explicit EFF bit. The numeric id is left alone.
    pub fn set_extended(&mut self, extended: bool) {
        self.update_raw_id(EFF_FLAG, if extended { EFF_FLAG } else { 0 });
    }

    pub fn set_error(&mut self, error: bool) {
        self.update_raw_id(ERR_FLAG, if error { ERR_FLAG } else { 0 });
    }

    /// Toggle RTR. Setting it also drops the payload (length 0).
    pub fn set_rtr(&mut self, rtr: bool) {
        self.update_raw_id(RTR_FLAG, if rtr { RTR_FLAG } else { 0 });
        if rtr {
            self.write_payload_len(0);
        }
    }

    /// Set the length byte and zero everything past the new payload.
    ///
    /// Fails without touching the buffer if `len` exceeds the format ceiling.
    pub fn set_payload_len(&mut self, len: usize) -> Result<()> {
        self.check_payload_len(len)?;
        self.write_payload_len(len);
        Ok(())
    }

    /// Copy `payload` in and set the length to match.
    pub fn set_payload(&mut self, payload: &[u8]) -> Result<()> {
        self.check_payload_len(payload.len())?;
        self.bytes_mut()[DATA_OFFSET..DATA_OFFSET + payload.len()].copy_from_slice(payload);
        self.write_payload_len(payload.len());
        Ok(())
    }

    /// Mutable view of the current payload.
    pub fn payload_mut(&mut self) -> &mut [u8] {
        let len = self.payload_len().min(self.capacity());
        &mut self.bytes_mut()[DATA_OFFSET..DATA_OFFSET + len]
    }

    pub fn set_fd_flags(&mut self, flags: u8) {
        self.bytes_mut()[FLAGS_OFFSET] = flags;
    }

    fn check_payload_len(&self, len: usize) -> Result<()> {
        let max = self.capacity();
        if len > max {
            return Err(FrameError::PayloadLengthOutOfRange { len, max });
        }
        Ok(())
    }

    fn write_payload_len(&mut self, len: usize) {
        let bytes = self.bytes_mut();
        bytes[LEN_OFFSET] = len as u8;
        bytes[DATA_OFFSET + len..].fill(0);
    }
}

impl CanFrame<BytesMut> {
    /// A zeroed frame: 72 bytes if `is_fd`, else 16.
    pub fn new(is_fd: bool) -> Self {
        let len = if is_fd { CANFD_MTU } else { CAN_MTU };
        Self {
            buf: BytesMut::zeroed(len),
        }
    }

    pub fn classic() -> Self {
        Self::new(false)
    }

    pub fn fd() -> Self {
        Self::new(true)
    }

    /// Data frame carrying `payload`, in the smallest format that fits.
    ///
    /// Ids above 0x7FF get the EFF bit; ids above 29 bits are rejected.
    pub fn with_payload(id: u32, payload: &[u8]) -> Result<Self> {
        if id > EFF_MASK {
            return Err(FrameError::IdentifierOutOfRange { id });
        }
        let format =
            FrameFormat::for_payload(payload.len()).ok_or(FrameError::PayloadLengthOutOfRange {
                len: payload.len(),
                max: FrameFormat::Fd.max_payload(),
            })?;

        let mut frame = Self::new(format.is_fd());
        frame.set_id(id);
        frame.set_extended(id > SFF_MASK);
        frame.set_payload(payload)?;
        Ok(frame)
    }
}

impl<B: AsRef<[u8]>> AsRef<[u8]> for CanFrame<B> {
    fn as_ref(&self) -> &[u8] {
        self.bytes()
    }
}

impl<B: AsRef<[u8]>> fmt::Debug for CanFrame<B> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CanFrame")
            .field("format", &self.format())
            .field("raw_id", &format_args!("{:#010X}", self.raw_id()))
            .field("len", &self.payload_len())
            .field("flags", &self.fd_flags())
            .field("payload", &hex::encode_upper(self.payload()))
            .finish()
    }
}

/// Compact `cansend`/`candump` notation.
///
/// ```text
/// 123#DEADBEEF     standard data frame
/// 12345678#R       extended RTR frame
/// 123##1AABBCC     FD frame, flags nibble 1 (BRS)
/// ```
impl<B: AsRef<[u8]>> fmt::Display for CanFrame<B> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_extended() {
            write!(f, "{:08X}", self.id())?;
        } else {
            write!(f, "{:03X}", self.id())?;
        }

        if self.is_fd() {
            write!(
                f,
                "##{:X}{}",
                self.fd_flags() & 0x0F,
                hex::encode_upper(self.payload())
            )
        } else if self.is_rtr() {
            f.write_str("#R")
        } else {
            write!(f, "#{}", hex::encode_upper(self.payload()))
        }
    }
}

impl FromStr for CanFrame<BytesMut> {
    type Err = FrameError;

    fn from_str(s: &str) -> Result<Self> {
        let s = s.trim();
        let (id_str, rest) = s
            .split_once('#')
            .ok_or_else(|| syntax_error("missing '#' between identifier and data"))?;

        let extended = match id_str.len() {
            3 => false,
            8 => true,
            _ => {
                return Err(syntax_error(
                    "identifier must be 3 (standard) or 8 (extended) hex digits",
                ))
            }
        };
        if !id_str.bytes().all(|b| b.is_ascii_hexdigit()) {
            return Err(syntax_error(format!("invalid identifier {id_str:?}")));
        }
        let id = u32::from_str_radix(id_str, 16)
            .map_err(|_| syntax_error(format!("invalid identifier {id_str:?}")))?;
        if id > EFF_MASK || (!extended && id > SFF_MASK) {
            return Err(FrameError::IdentifierOutOfRange { id });
        }

        let mut frame = if let Some(fd_rest) = rest.strip_prefix('#') {
            let mut chars = fd_rest.chars();
            let flags = chars
                .next()
                .and_then(|c| c.to_digit(16))
                .ok_or_else(|| syntax_error("FD frame needs a flags nibble after '##'"))?;
            let payload = decode_payload(chars.as_str())?;

            let mut frame = CanFrame::fd();
            frame.set_fd_flags(flags as u8);
            frame.set_payload(&payload)?;
            frame
        } else if rest.eq_ignore_ascii_case("r") {
            let mut frame = CanFrame::classic();
            frame.set_rtr(true);
            frame
        } else {
            let payload = decode_payload(rest)?;
            let mut frame = CanFrame::classic();
            frame.set_payload(&payload)?;
            frame
        };

        frame.set_id(id);
        frame.set_extended(extended);
        Ok(frame)
    }
}

fn decode_payload(text: &str) -> Result<Vec<u8>> {
    let digits: String = text.chars().filter(|c| *c != '.').collect();
    hex::decode(&digits).map_err(|err| syntax_error(format!("invalid payload {text:?}: {err}")))
}

fn syntax_error(message: impl Into<String>) -> FrameError {
    FrameError::InvalidFrameSyntax(message.into())
}

/// Configuration for frame readers and writers.
#[derive(Debug, Clone)]
pub struct FrameConfig {
    /// Initial receive pool size in bytes. Default: 64 FD frames.
    pub pool_capacity: usize,
    /// Read timeout for blocking operations.
    pub read_timeout: Option<std::time::Duration>,
    /// Write timeout for blocking operations.
    pub write_timeout: Option<std::time::Duration>,
}

impl Default for FrameConfig {
    fn default() -> Self {
        Self {
            pool_capacity: DEFAULT_POOL_CAPACITY,
            read_timeout: None,
            write_timeout: None,
        }
    }
}
