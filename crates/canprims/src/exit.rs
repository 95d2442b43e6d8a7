use std::fmt;
use std::io;

use canprims_frame::FrameError;
use canprims_transport::TransportError;

// sysexits-style codes, shared with the other *prims CLIs.
pub const SUCCESS: i32 = 0;
pub const FAILURE: i32 = 1;
pub const TRANSPORT_ERROR: i32 = 3;
pub const PERMISSION_DENIED: i32 = 50;
pub const DATA_INVALID: i32 = 60;
pub const USAGE: i32 = 64;
pub const TIMEOUT: i32 = 124;
pub const INTERNAL: i32 = 125;

pub type CliResult<T> = Result<T, CliError>;

#[derive(Debug)]
pub struct CliError {
    pub code: i32,
    pub message: String,
}

impl CliError {
    pub fn new(code: i32, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for CliError {}

pub fn io_error(context: &str, err: io::Error) -> CliError {
    let code = match err.kind() {
        io::ErrorKind::PermissionDenied => PERMISSION_DENIED,
        io::ErrorKind::TimedOut | io::ErrorKind::WouldBlock => TIMEOUT,
        io::ErrorKind::NotFound | io::ErrorKind::Unsupported => TRANSPORT_ERROR,
        _ => INTERNAL,
    };
    CliError::new(code, format!("{context}: {err}"))
}

pub fn transport_error(context: &str, err: TransportError) -> CliError {
    match err {
        TransportError::NameTooLong { .. } | TransportError::EmptyInterfaceName => {
            CliError::new(USAGE, format!("{context}: {err}"))
        }
        TransportError::Open(source) if source.kind() != io::ErrorKind::PermissionDenied => {
            CliError::new(TRANSPORT_ERROR, format!("{context}: {source}"))
        }
        TransportError::Open(source)
        | TransportError::Bind { source, .. }
        | TransportError::Io(source) => io_error(context, source),
        other => CliError::new(TRANSPORT_ERROR, format!("{context}: {other}")),
    }
}

pub fn frame_error(context: &str, err: FrameError) -> CliError {
    match err {
        FrameError::Io(source) => io_error(context, source),
        FrameError::InvalidFrameSyntax(_)
        | FrameError::PayloadLengthOutOfRange { .. }
        | FrameError::IdentifierOutOfRange { .. } => {
            CliError::new(USAGE, format!("{context}: {err}"))
        }
        FrameError::InvalidFrameLength { .. } => {
            CliError::new(DATA_INVALID, format!("{context}: {err}"))
        }
        FrameError::IncompleteWrite { .. } => {
            CliError::new(TRANSPORT_ERROR, format!("{context}: {err}"))
        }
        FrameError::Cancelled => CliError::new(FAILURE, format!("{context}: {err}")),
    }
}
