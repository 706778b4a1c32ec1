/// Stack status codes and the "buffer handed back" result.
///
/// The numeric codes are the ones the TCP/IP stack and the prebuilt MAC
/// library exchange as `i8` status values; `Error::code()` and
/// `Error::from_code()` convert at that boundary.
use crate::pbuf::Pbuf;

/// Stack error codes (non-zero `err_t` values).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Error {
    /// Out of memory.
    Mem,
    /// Buffer error (queue full, no room).
    Buf,
    /// Illegal value.
    Val,
    /// Low-level interface error.
    If,
    /// Illegal argument.
    Arg,
}

impl Error {
    /// Numeric status code as seen by C-side callers.
    pub const fn code(self) -> i8 {
        match self {
            Error::Mem => -1,
            Error::Buf => -2,
            Error::Val => -6,
            Error::If => -12,
            Error::Arg => -16,
        }
    }

    /// Map a driver/stack status code back to a result.
    ///
    /// Codes this crate does not model collapse to `Error::If`, since they
    /// can only come from the driver side of the link.
    pub const fn from_code(code: i8) -> Result<(), Error> {
        match code {
            0 => Ok(()),
            -1 => Err(Error::Mem),
            -2 => Err(Error::Buf),
            -6 => Err(Error::Val),
            -16 => Err(Error::Arg),
            _ => Err(Error::If),
        }
    }
}

impl core::fmt::Display for Error {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Error::Mem => write!(f, "out of memory"),
            Error::Buf => write!(f, "buffer error"),
            Error::Val => write!(f, "illegal value"),
            Error::If => write!(f, "low-level netif error"),
            Error::Arg => write!(f, "illegal argument"),
        }
    }
}

/// A callee refused a buffer.
///
/// `pbuf` is `Some` when ownership comes back to the caller (the callee did
/// not consume it) and `None` when the callee consumed the buffer but still
/// failed, e.g. the driver accepted a frame and then reported an error.
pub struct Rejected {
    pub err: Error,
    pub pbuf: Option<Pbuf>,
}

impl Rejected {
    /// Refusal that hands the buffer back untouched.
    pub fn returned(err: Error, pbuf: Pbuf) -> Self {
        Self { err, pbuf: Some(pbuf) }
    }

    /// Refusal after the buffer was consumed.
    pub fn consumed(err: Error) -> Self {
        Self { err, pbuf: None }
    }
}

impl core::fmt::Debug for Rejected {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Rejected")
            .field("err", &self.err)
            .field("returned", &self.pbuf.is_some())
            .finish()
    }
}
