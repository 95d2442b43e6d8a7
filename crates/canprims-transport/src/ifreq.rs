use tracing::debug;

use crate::error::{Result, TransportError};
use crate::sys::{SocketControl, ENODEV, SIOCGIFINDEX};

/// Size of `ifr_name`, terminator included.
pub const IFNAMSIZ: usize = 16;

/// Longest interface name that still leaves room for the terminator.
pub const MAX_INTERFACE_NAME_LEN: usize = IFNAMSIZ - 1;

/// Byte offset of `ifr_ifindex` inside `struct ifreq`.
pub const IFR_IFINDEX_OFFSET: usize = IFNAMSIZ;

/// Size of the request buffer handed to the kernel.
///
/// The name/index layout only spans the first 20 bytes, but the kernel copies
/// a whole `struct ifreq` in and out (40 bytes on LP64, 32 on ILP32).
pub const IFREQ_LEN: usize = 40;

/// A `struct ifreq` request/response buffer.
///
/// ```text
/// ┌─────────────────────────┬───────────────┬──────────────┐
/// │ ifr_name (16B, NUL pad) │ ifr_ifindex   │ unused union │
/// │ offset 0..16            │ (4B) 16..20   │ 20..         │
/// └─────────────────────────┴───────────────┴──────────────┘
/// ```
#[derive(Clone, PartialEq, Eq)]
#[repr(C, align(8))]
pub struct IfReq {
    bytes: [u8; IFREQ_LEN],
}

impl IfReq {
    /// Build a zeroed request carrying `name` in `ifr_name`.
    pub fn with_name(name: &str) -> Result<Self> {
        let encoded = encode_interface_name(name)?;
        let mut bytes = [0u8; IFREQ_LEN];
        bytes[..IFNAMSIZ].copy_from_slice(&encoded);
        Ok(Self { bytes })
    }

    /// The `ifr_name` field.
    pub fn name_field(&self) -> &[u8] {
        &self.bytes[..IFNAMSIZ]
    }

    /// `ifr_ifindex`, valid after a successful `SIOCGIFINDEX`.
    pub fn if_index(&self) -> i32 {
        let mut raw = [0u8; 4];
        raw.copy_from_slice(&self.bytes[IFR_IFINDEX_OFFSET..IFR_IFINDEX_OFFSET + 4]);
        i32::from_ne_bytes(raw)
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn as_mut_bytes(&mut self) -> &mut [u8] {
        &mut self.bytes
    }
}

impl std::fmt::Debug for IfReq {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let end = self
            .name_field()
            .iter()
            .position(|b| *b == 0)
            .unwrap_or(IFNAMSIZ);
        f.debug_struct("IfReq")
            .field("name", &String::from_utf8_lossy(&self.bytes[..end]))
            .field("if_index", &self.if_index())
            .finish()
    }
}

/// Encode an interface name into a NUL-padded `ifr_name` field.
pub fn encode_interface_name(name: &str) -> Result<[u8; IFNAMSIZ]> {
    let raw = name.as_bytes();
    if raw.is_empty() {
        return Err(TransportError::EmptyInterfaceName);
    }
    if raw.len() > MAX_INTERFACE_NAME_LEN {
        return Err(TransportError::NameTooLong {
            name: name.to_string(),
            len: raw.len(),
            max: MAX_INTERFACE_NAME_LEN,
        });
    }

    let mut field = [0u8; IFNAMSIZ];
    field[..raw.len()].copy_from_slice(raw);
    Ok(field)
}

/// Map an interface name to its kernel index with `SIOCGIFINDEX`.
///
/// `handle` can be any open socket; it is only used as the `ioctl` target.
pub fn resolve_interface_index<C: SocketControl + ?Sized>(handle: &C, name: &str) -> Result<i32> {
    let mut req = IfReq::with_name(name)?;

    if let Err(err) = handle.ioctl(SIOCGIFINDEX, &mut req) {
        return Err(match err.raw_os_error() {
            Some(ENODEV) => TransportError::InterfaceNotFound(name.to_string()),
            Some(code) => TransportError::InterfaceResolutionFailed(code),
            None => TransportError::Io(err),
        });
    }

    let if_index = req.if_index();
    debug!(name, if_index, "resolved interface index");
    Ok(if_index)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sys::testing::FakeControl;

    #[test]
    fn encodes_name_with_nul_padding() {
        let field = encode_interface_name("can0").unwrap();
        assert_eq!(&field, b"can0\0\0\0\0\0\0\0\0\0\0\0\0");
    }

    #[test]
    fn accepts_fifteen_byte_name() {
        let field = encode_interface_name("abcdefghijklmno").unwrap();
        assert_eq!(&field[..15], b"abcdefghijklmno");
        assert_eq!(field[15], 0);
    }

    #[test]
    fn rejects_sixteen_byte_name() {
        let err = encode_interface_name("abcdefghijklmnop").unwrap_err();
        assert!(matches!(
            err,
            TransportError::NameTooLong { len: 16, max: 15, .. }
        ));
    }

    #[test]
    fn length_limit_counts_utf8_bytes() {
        // 9 chars, 18 bytes.
        let err = encode_interface_name("ééééééééé").unwrap_err();
        assert!(matches!(err, TransportError::NameTooLong { len: 18, .. }));
    }

    #[test]
    fn rejects_empty_name() {
        let err = encode_interface_name("").unwrap_err();
        assert!(matches!(err, TransportError::EmptyInterfaceName));
    }

    #[test]
    fn request_is_zeroed_past_the_name() {
        let req = IfReq::with_name("vcan0").unwrap();
        assert_eq!(&req.as_bytes()[..5], b"vcan0");
        assert!(req.as_bytes()[5..].iter().all(|b| *b == 0));
        assert_eq!(req.as_bytes().len(), IFREQ_LEN);
    }

    #[test]
    fn resolves_index_from_offset_sixteen() {
        let ctl = FakeControl {
            ioctl_result: Some(Ok(7)),
            ..FakeControl::default()
        };

        let index = resolve_interface_index(&ctl, "can0").unwrap();
        assert_eq!(index, 7);

        let requests = ctl.ioctl_requests.borrow();
        assert_eq!(requests.len(), 1);
        let (request, sent) = &requests[0];
        assert_eq!(*request, SIOCGIFINDEX);
        assert_eq!(&sent[..16], b"can0\0\0\0\0\0\0\0\0\0\0\0\0");
        assert!(sent[16..].iter().all(|b| *b == 0));
    }

    #[test]
    fn enodev_maps_to_interface_not_found() {
        let ctl = FakeControl {
            ioctl_result: Some(Err(ENODEV)),
            ..FakeControl::default()
        };

        let err = resolve_interface_index(&ctl, "can9").unwrap_err();
        assert!(matches!(err, TransportError::InterfaceNotFound(name) if name == "can9"));
    }

    #[test]
    fn other_errno_maps_to_resolution_failed() {
        let ctl = FakeControl {
            ioctl_result: Some(Err(13)),
            ..FakeControl::default()
        };

        let err = resolve_interface_index(&ctl, "can0").unwrap_err();
        assert!(matches!(err, TransportError::InterfaceResolutionFailed(13)));
    }

    #[test]
    fn name_too_long_fails_before_ioctl() {
        let ctl = FakeControl {
            ioctl_result: Some(Ok(1)),
            ..FakeControl::default()
        };

        let err = resolve_interface_index(&ctl, "a-very-long-can-name").unwrap_err();
        assert!(matches!(err, TransportError::NameTooLong { .. }));
        assert!(ctl.ioctl_requests.borrow().is_empty());
    }

    #[test]
    fn debug_shows_name_and_index() {
        let req = IfReq::with_name("can1").unwrap();
        let rendered = format!("{req:?}");
        assert!(rendered.contains("can1"));
        assert!(rendered.contains("if_index: 0"));
    }
}
