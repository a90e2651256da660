use std::error::Error as StdError;
use std::fmt;
use std::io;

/// A specialized `Result` type for engine operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors surfaced while driving a request.
///
/// Every request terminates in exactly one of `Ok(Response)`,
/// `Err(Timeout)` or `Err(_)` -- the engine never retries internally and
/// never reports two outcomes for the same operation.
#[derive(Debug)]
pub enum Error {
    /// A socket-level failure: connect refused, reset, send/receive fault.
    Transport(io::Error),
    /// An operation did not complete within its configured timeout. The
    /// connection has been force-closed and is not reusable.
    Timeout,
    /// Malformed wire data: bad chunk-size line, oversized or truncated
    /// head, conflicting framing headers. The connection is closed because
    /// protocol state cannot be trusted after a framing error.
    Protocol(String),
    /// A header name contained a control or separator character. Raised at
    /// construction time, before any I/O occurs.
    InvalidToken(String),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Transport(err) => write!(f, "transport error: {}", err),
            Error::Timeout => write!(f, "operation timed out"),
            Error::Protocol(msg) => write!(f, "protocol error: {}", msg),
            Error::InvalidToken(text) => write!(f, "invalid header token: {:?}", text),
        }
    }
}

impl StdError for Error {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        match self {
            Error::Transport(err) => Some(err),
            _ => None,
        }
    }
}

impl From<io::Error> for Error {
    fn from(err: io::Error) -> Self {
        match err.kind() {
            io::ErrorKind::TimedOut => Error::Timeout,
            io::ErrorKind::InvalidData => Error::Protocol(err.to_string()),
            _ => Error::Transport(err),
        }
    }
}

impl Error {
    /// Construct a protocol error from a displayable cause.
    pub(crate) fn protocol(msg: impl fmt::Display) -> Self {
        Error::Protocol(msg.to_string())
    }
}
