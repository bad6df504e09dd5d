//! Error type for sending queries.

#![warn(missing_docs)]
#![warn(clippy::missing_docs_in_private_items)]

use std::error;
use std::fmt::{Display, Formatter};
use std::io;
use std::sync::Arc;

/// The error returned when a query could not be answered.
///
/// Each variant maps to an [`io::ErrorKind`] via [`Error::io_kind`] so that
/// callers only interested in a coarse cause code get a consistent one.
#[derive(Clone, Debug)]
pub enum Error {
    /// The configuration does not contain any servers.
    Config,

    /// The answer buffer is too small to hold a message header.
    BufferTooSmall,

    /// The query is too short to be a DNS message or too long to be sent.
    InvalidQuery,

    /// Creating a socket failed for a reason other than an unsupported
    /// address family.
    Socket(Arc<io::Error>),

    /// No server could be reached.
    ///
    /// Nothing at all was received from any server during the query and
    /// no stream transport error was recorded.
    NoServerReachable,

    /// Waiting for an answer timed out.
    ///
    /// Something was received from some server, just not the answer to
    /// this query.
    Timeout,

    /// The last error of a stream transport.
    Transport(Arc<io::Error>),

    /// A hook requested the query to be aborted.
    Aborted,
}

impl Error {
    /// Returns the cause code for the error.
    pub fn io_kind(&self) -> io::ErrorKind {
        match self {
            Error::Config => io::ErrorKind::NotFound,
            Error::BufferTooSmall => io::ErrorKind::InvalidInput,
            Error::InvalidQuery => io::ErrorKind::InvalidInput,
            Error::Socket(err) => err.kind(),
            Error::NoServerReachable => io::ErrorKind::ConnectionRefused,
            Error::Timeout => io::ErrorKind::TimedOut,
            Error::Transport(err) => err.kind(),
            Error::Aborted => io::ErrorKind::Other,
        }
    }

    /// Returns the underlying IO error if there is one.
    pub fn io_error(&self) -> Option<&io::Error> {
        match self {
            Error::Socket(err) | Error::Transport(err) => Some(err.as_ref()),
            _ => None,
        }
    }
}

impl Display for Error {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result<(), std::fmt::Error> {
        match self {
            Error::Config => write!(f, "no name servers configured"),
            Error::BufferTooSmall => {
                write!(f, "answer buffer smaller than a message header")
            }
            Error::InvalidQuery => {
                write!(f, "query too short or too long")
            }
            Error::Socket(err) => write!(f, "socket error: {}", err),
            Error::NoServerReachable => write!(f, "no server reachable"),
            Error::Timeout => write!(f, "timeout waiting for response"),
            Error::Transport(err) => write!(f, "transport error: {}", err),
            Error::Aborted => write!(f, "query aborted by hook"),
        }
    }
}

impl error::Error for Error {
    fn source(&self) -> Option<&(dyn error::Error + 'static)> {
        match self {
            Error::Socket(e) => Some(e),
            Error::Transport(e) => Some(e),
            _ => None,
        }
    }
}

impl From<Error> for io::Error {
    fn from(err: Error) -> Self {
        io::Error::new(err.io_kind(), err)
    }
}

//============ Testing ======================================================

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn cause_codes() {
        assert_eq!(Error::Timeout.io_kind(), io::ErrorKind::TimedOut);
        assert_eq!(
            Error::NoServerReachable.io_kind(),
            io::ErrorKind::ConnectionRefused
        );
        let err = Error::Transport(Arc::new(io::Error::from(
            io::ErrorKind::ConnectionReset,
        )));
        assert_eq!(err.io_kind(), io::ErrorKind::ConnectionReset);
        assert!(error::Error::source(&err).is_some());
        assert!(err.io_error().is_some());
        assert!(error::Error::source(&Error::Aborted).is_none());

        let io_err: io::Error = Error::Config.into();
        assert_eq!(io_err.kind(), io::ErrorKind::NotFound);
    }
}
