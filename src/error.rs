use std::error;
use std::fmt;
use std::io::{Error as IOError, ErrorKind};

use crate::types::TypeId;

/// Reason a received byte sequence was rejected before it could be
/// turned into an APCI/ASDU frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BadFrameReason {
    /// Byte 0 was not `0x68`.
    BadStart,
    /// Fewer bytes were available than the declared APDU length demands.
    Truncated,
    /// The ASDU's TypeID is not one this crate understands.
    UnknownType(u8),
}

impl fmt::Display for BadFrameReason {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            BadFrameReason::BadStart => write!(f, "frame did not start with 0x68"),
            BadFrameReason::Truncated => write!(f, "frame shorter than its declared length"),
            BadFrameReason::UnknownType(t) => write!(f, "unknown ASDU type id {}", t),
        }
    }
}

#[derive(Debug)]
pub enum Error {
    /// A shared lock (the point registry) was poisoned by a panicked
    /// holder.
    Lock,
    /// Socket layer failure; the connection is considered lost.
    Io(ErrorKind),
    /// A recv or handshake did not complete within its deadline. The
    /// session remains usable; callers may retry.
    Timeout,
    /// The codec could not make sense of received bytes.
    BadFrame(BadFrameReason),
    /// A command referenced an IOA with no matching registration.
    UnknownIoa { ioa: u32 },
    /// A command's TypeID did not match the IOA's registered TypeID.
    TypeMismatch {
        ioa: u32,
        expected: TypeId,
        got: TypeId,
    },
    /// An I-frame was sent or received while the link was not STARTED.
    NotStarted,
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Error::Lock => write!(f, "lock error: panicked"),
            Error::Io(kind) => write!(f, "IO error: {:?}", kind),
            Error::Timeout => write!(f, "timed out waiting for a response"),
            Error::BadFrame(reason) => write!(f, "bad frame: {}", reason),
            Error::UnknownIoa { ioa } => write!(f, "unknown IOA {}", ioa),
            Error::TypeMismatch { ioa, expected, got } => {
                write!(f, "IOA {} expected type {:?}, got {:?}", ioa, expected, got)
            }
            Error::NotStarted => write!(f, "link is not in the STARTED state"),
        }
    }
}

impl From<IOError> for Error {
    fn from(e: IOError) -> Self {
        match e.kind() {
            ErrorKind::WouldBlock | ErrorKind::TimedOut => Error::Timeout,
            kind => Error::Io(kind),
        }
    }
}

// This is important for other errors to wrap this one.
impl error::Error for Error {
    fn source(&self) -> Option<&(dyn error::Error + 'static)> {
        None
    }
}
