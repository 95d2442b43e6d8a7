use crate::error::{Result, TransportError};
use crate::sys::AF_CAN;

/// Size of `struct sockaddr_can`.
pub const SOCKADDR_CAN_LEN: usize = 24;

/// Bytes at the front of the address owned by the family tag.
pub const FAMILY_LEN: usize = 2;

const IFINDEX_OFFSET: usize = 4;

/// Shortest `sockaddr_can` the kernel reports: family, padding and index.
pub const SOCKADDR_CAN_MIN_LEN: usize = IFINDEX_OFFSET + 4;

/// A serialized `struct sockaddr_can`.
///
/// ```text
/// ┌────────────┬─────────┬──────────────┬──────────────────────┐
/// │ can_family │ padding │ can_ifindex  │ can_addr (reserved)  │
/// │ (2B)       │ (2B)    │ (4B, i32)    │ (16B, zero)          │
/// └────────────┴─────────┴──────────────┴──────────────────────┘
/// ```
///
/// Multi-byte fields use the platform's native byte order, like the kernel.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
#[repr(C, align(4))]
pub struct InterfaceAddress {
    bytes: [u8; SOCKADDR_CAN_LEN],
}

impl InterfaceAddress {
    /// Address for `if_index`. Index 0 binds to every CAN interface.
    pub fn new(if_index: i32) -> Self {
        let mut bytes = [0u8; SOCKADDR_CAN_LEN];
        bytes[..FAMILY_LEN].copy_from_slice(&AF_CAN.to_ne_bytes());
        bytes[IFINDEX_OFFSET..IFINDEX_OFFSET + 4].copy_from_slice(&if_index.to_ne_bytes());
        Self { bytes }
    }

    /// Parse a full 24-byte address, checking length and family.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        let bytes: [u8; SOCKADDR_CAN_LEN] = bytes
            .try_into()
            .map_err(|_| TransportError::InvalidAddressLength { len: bytes.len() })?;
        let addr = Self { bytes };
        if addr.family() != AF_CAN {
            return Err(TransportError::AddressFamilyMismatch {
                family: addr.family(),
            });
        }
        Ok(addr)
    }

    /// Parse an address written by `getsockname`, which may report only the
    /// leading [`SOCKADDR_CAN_MIN_LEN`] bytes. The rest of `bytes` must
    /// already be zeroed.
    #[cfg(any(target_os = "linux", test))]
    pub(crate) fn from_sockname(bytes: [u8; SOCKADDR_CAN_LEN], len: usize) -> Result<Self> {
        if !(SOCKADDR_CAN_MIN_LEN..=SOCKADDR_CAN_LEN).contains(&len) {
            return Err(TransportError::InvalidAddressLength { len });
        }
        Self::from_bytes(&bytes)
    }

    pub fn family(&self) -> u16 {
        u16::from_ne_bytes([self.bytes[0], self.bytes[1]])
    }

    pub fn if_index(&self) -> i32 {
        let mut raw = [0u8; 4];
        raw.copy_from_slice(&self.bytes[IFINDEX_OFFSET..IFINDEX_OFFSET + 4]);
        i32::from_ne_bytes(raw)
    }

    /// The whole structure, family tag included.
    pub fn as_bytes(&self) -> &[u8; SOCKADDR_CAN_LEN] {
        &self.bytes
    }

    /// Bytes `[2, 24)`: everything except the family tag.
    ///
    /// For socket APIs that stamp the family into the first two bytes
    /// themselves.
    pub fn body(&self) -> &[u8] {
        &self.bytes[FAMILY_LEN..]
    }

    /// Write [`body`](Self::body) into `dst[2..24]`, leaving `dst[0..2]`
    /// untouched for the caller's family tag.
    pub fn write_body(&self, dst: &mut [u8]) -> Result<()> {
        if dst.len() != SOCKADDR_CAN_LEN {
            return Err(TransportError::InvalidAddressLength { len: dst.len() });
        }
        dst[FAMILY_LEN..].copy_from_slice(self.body());
        Ok(())
    }

    #[cfg(target_os = "linux")]
    pub(crate) fn as_sockaddr_ptr(&self) -> *const libc::sockaddr {
        self.bytes.as_ptr().cast::<libc::sockaddr>()
    }
}

impl std::fmt::Debug for InterfaceAddress {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InterfaceAddress")
            .field("family", &self.family())
            .field("if_index", &self.if_index())
            .finish()
    }
}

/// Serialize the bind address for `if_index`.
pub fn serialize_address(if_index: i32) -> InterfaceAddress {
    InterfaceAddress::new(if_index)
}

/// Recover the interface index from a serialized `sockaddr_can`.
pub fn deserialize_address(bytes: &[u8]) -> Result<i32> {
    InterfaceAddress::from_bytes(bytes).map(|addr| addr.if_index())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn serializes_index_at_offset_four() {
        let addr = serialize_address(3);
        let bytes = addr.as_bytes();

        assert_eq!(&bytes[0..2], &AF_CAN.to_ne_bytes());
        assert_eq!(&bytes[4..8], &3i32.to_ne_bytes());
        assert_eq!(&bytes[2..4], &[0, 0]);
        assert!(bytes[8..].iter().all(|b| *b == 0));
    }

    #[test]
    fn body_skips_family_tag() {
        let addr = serialize_address(3);
        let body = addr.body();

        assert_eq!(body.len(), 22);
        assert_eq!(&body[2..6], &3i32.to_ne_bytes());
        assert!(body[..2].iter().all(|b| *b == 0));
        assert!(body[6..].iter().all(|b| *b == 0));
    }

    #[test]
    fn write_body_leaves_family_bytes_alone() {
        let mut dst = [0xEEu8; SOCKADDR_CAN_LEN];
        serialize_address(12).write_body(&mut dst).unwrap();

        assert_eq!(&dst[..2], &[0xEE, 0xEE]);
        assert_eq!(&dst[4..8], &12i32.to_ne_bytes());
        assert!(dst[8..].iter().all(|b| *b == 0));
    }

    #[test]
    fn write_body_rejects_wrong_destination_size() {
        let mut dst = [0u8; 16];
        let err = serialize_address(1).write_body(&mut dst).unwrap_err();
        assert!(matches!(
            err,
            TransportError::InvalidAddressLength { len: 16 }
        ));
    }

    #[test]
    fn deserialize_inverts_serialize() {
        let addr = serialize_address(42);
        assert_eq!(deserialize_address(addr.as_bytes()).unwrap(), 42);
    }

    #[test]
    fn deserialize_rejects_short_buffer() {
        let err = deserialize_address(&[0u8; 16]).unwrap_err();
        assert!(matches!(
            err,
            TransportError::InvalidAddressLength { len: 16 }
        ));
    }

    #[test]
    fn deserialize_rejects_foreign_family() {
        let mut bytes = *serialize_address(1).as_bytes();
        bytes[..2].copy_from_slice(&2u16.to_ne_bytes());

        let err = deserialize_address(&bytes).unwrap_err();
        assert!(matches!(
            err,
            TransportError::AddressFamilyMismatch { family: 2 }
        ));
    }

    #[test]
    fn sockname_accepts_kernel_short_form() {
        let mut bytes = [0u8; SOCKADDR_CAN_LEN];
        bytes[..SOCKADDR_CAN_MIN_LEN]
            .copy_from_slice(&serialize_address(7).as_bytes()[..SOCKADDR_CAN_MIN_LEN]);

        let addr = InterfaceAddress::from_sockname(bytes, SOCKADDR_CAN_MIN_LEN).unwrap();
        assert_eq!(addr.if_index(), 7);
        assert_eq!(addr, serialize_address(7));

        let full = InterfaceAddress::from_sockname(bytes, SOCKADDR_CAN_LEN).unwrap();
        assert_eq!(full.if_index(), 7);
    }

    #[test]
    fn sockname_rejects_truncated_index() {
        let bytes = *serialize_address(7).as_bytes();
        let err = InterfaceAddress::from_sockname(bytes, 6).unwrap_err();
        assert!(matches!(err, TransportError::InvalidAddressLength { len: 6 }));
    }

    #[test]
    fn negative_index_survives() {
        let addr = serialize_address(-1);
        assert_eq!(addr.if_index(), -1);
        assert_eq!(addr.family(), AF_CAN);
    }
}
