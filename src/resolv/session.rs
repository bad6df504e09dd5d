//! The transport session.
//!
//! A session holds at most one open socket: either a datagram socket,
//! possibly connected to a server, or a stream connected to a server. The
//! socket is created lazily by the transports and replaced whenever the
//! transport kind or the server changes. Between queries, a session may
//! stay open if the configuration asks for it.
//!
//! A session is owned by whoever sends queries and is passed by exclusive
//! reference, so no two queries can ever use it at the same time.

use super::error::Error;
use socket2::{Domain, Protocol, Socket, Type};
use std::io;
use std::net::{SocketAddr, TcpStream, UdpSocket};
use std::sync::Arc;
use tracing::{debug, trace, warn};

//------------ TransportKind -------------------------------------------------

/// The kind of transport a session is using.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum TransportKind {
    /// Connectionless datagram transport, i.e., UDP.
    Dgram,

    /// Connection-oriented stream transport, i.e., TCP.
    Stream,
}

//------------ AddrFamily ----------------------------------------------------

/// The address family of a socket.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum AddrFamily {
    /// IPv4.
    Inet,

    /// IPv6.
    Inet6,
}

impl AddrFamily {
    /// Returns the family of a socket address.
    pub fn of(addr: &SocketAddr) -> Self {
        if addr.is_ipv4() {
            AddrFamily::Inet
        } else {
            AddrFamily::Inet6
        }
    }
}

//------------ Session -------------------------------------------------------

/// A transport session reused across attempts and queries.
#[derive(Debug, Default)]
pub struct Session {
    sock: Option<Sock>,
}

/// The socket of an open session.
#[derive(Debug)]
enum Sock {
    /// A datagram socket.
    Dgram {
        sock: UdpSocket,
        family: AddrFamily,

        /// The peer if the socket is connected.
        peer: Option<SocketAddr>,
    },

    /// A connected stream.
    Stream { sock: TcpStream, peer: SocketAddr },
}

impl Session {
    /// Creates a new, closed session.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns whether the session has an open socket.
    pub fn is_open(&self) -> bool {
        self.sock.is_some()
    }

    /// Returns the transport kind of the open socket.
    pub fn kind(&self) -> Option<TransportKind> {
        match self.sock.as_ref()? {
            Sock::Dgram { .. } => Some(TransportKind::Dgram),
            Sock::Stream { .. } => Some(TransportKind::Stream),
        }
    }

    /// Returns the address family of the open socket.
    pub fn family(&self) -> Option<AddrFamily> {
        match self.sock.as_ref()? {
            Sock::Dgram { family, .. } => Some(*family),
            Sock::Stream { peer, .. } => Some(AddrFamily::of(peer)),
        }
    }

    /// Returns whether the open socket is connected to a peer.
    pub fn is_connected(&self) -> bool {
        self.peer().is_some()
    }

    /// Returns the peer the open socket is connected to.
    pub fn peer(&self) -> Option<SocketAddr> {
        match self.sock.as_ref()? {
            Sock::Dgram { peer, .. } => *peer,
            Sock::Stream { peer, .. } => Some(*peer),
        }
    }

    /// Returns the local address of the open socket.
    pub fn local_addr(&self) -> Option<SocketAddr> {
        match self.sock.as_ref()? {
            Sock::Dgram { sock, .. } => sock.local_addr().ok(),
            Sock::Stream { sock, .. } => sock.local_addr().ok(),
        }
    }

    /// Closes the session.
    pub fn close(&mut self) {
        if let Some(sock) = self.sock.take() {
            match sock {
                Sock::Dgram { peer, .. } => {
                    trace!(?peer, "closing datagram socket")
                }
                Sock::Stream { peer, .. } => {
                    trace!(%peer, "closing stream")
                }
            }
        }
    }
}

/// # Access for the transports
///
impl Session {
    /// Returns the datagram socket if it can be used for `addr`.
    ///
    /// The socket is usable if it has the family of `addr` and, if
    /// `connected` is true, is connected to `addr` or, if it is false, is
    /// not connected at all.
    pub(crate) fn dgram_for(
        &self,
        addr: &SocketAddr,
        connected: bool,
    ) -> Option<&UdpSocket> {
        match self.sock.as_ref()? {
            Sock::Dgram { sock, family, peer }
                if *family == AddrFamily::of(addr)
                    && (if connected {
                        *peer == Some(*addr)
                    } else {
                        peer.is_none()
                    }) =>
            {
                Some(sock)
            }
            _ => None,
        }
    }

    /// Replaces the open socket with a datagram socket.
    pub(crate) fn set_dgram(
        &mut self,
        sock: UdpSocket,
        family: AddrFamily,
        peer: Option<SocketAddr>,
    ) -> &UdpSocket {
        self.close();
        match self.sock.insert(Sock::Dgram { sock, family, peer }) {
            Sock::Dgram { sock, .. } => sock,
            Sock::Stream { .. } => unreachable!(),
        }
    }

    /// Returns the stream if it is connected to `addr`.
    pub(crate) fn stream_for(
        &mut self,
        addr: &SocketAddr,
    ) -> Option<&mut TcpStream> {
        match self.sock.as_mut()? {
            Sock::Stream { sock, peer } if peer == addr => Some(sock),
            _ => None,
        }
    }

    /// Replaces the open socket with a stream connected to `peer`.
    pub(crate) fn set_stream(
        &mut self,
        sock: TcpStream,
        peer: SocketAddr,
    ) -> &mut TcpStream {
        self.close();
        match self.sock.insert(Sock::Stream { sock, peer }) {
            Sock::Stream { sock, .. } => sock,
            Sock::Dgram { .. } => unreachable!(),
        }
    }
}

//------------ Socket Creation -----------------------------------------------

/// A function that creates a new socket.
///
/// This is normally [`Socket::new`].
pub(crate) type OpenSocket =
    fn(Domain, Type, Option<Protocol>) -> io::Result<Socket>;

/// The outcome of creating a socket.
#[derive(Debug)]
pub(crate) enum NewSocket {
    /// The socket was created.
    Created(Socket),

    /// The system doesn’t support the address family.
    Unsupported(io::Error),
}

/// Creates a new socket suitable for talking to `addr`.
///
/// An unsupported address family is reported as
/// [`NewSocket::Unsupported`]. Any other failure is a hard error.
pub(crate) fn new_socket(
    open: OpenSocket,
    addr: &SocketAddr,
    ty: Type,
    protocol: Protocol,
) -> Result<NewSocket, Error> {
    match open(Domain::for_address(*addr), ty, Some(protocol)) {
        Ok(sock) => Ok(NewSocket::Created(sock)),
        Err(err) if is_unsupported_family(&err) => {
            debug!(%addr, "address family not supported: {}", err);
            Ok(NewSocket::Unsupported(err))
        }
        Err(err) => {
            warn!(%addr, "failed to create socket: {}", err);
            Err(Error::Socket(Arc::new(err)))
        }
    }
}

/// Returns whether an error says the address family isn’t supported.
#[cfg(unix)]
pub(crate) fn is_unsupported_family(err: &io::Error) -> bool {
    matches!(
        err.raw_os_error(),
        Some(libc::EAFNOSUPPORT)
            | Some(libc::EPROTONOSUPPORT)
            | Some(libc::EPFNOSUPPORT)
    )
}

/// Returns whether an error says the address family isn’t supported.
#[cfg(not(unix))]
pub(crate) fn is_unsupported_family(err: &io::Error) -> bool {
    err.kind() == io::ErrorKind::Unsupported
}

//============ Testing ======================================================

#[cfg(test)]
mod test {
    use super::*;
    use std::net::TcpListener;

    #[test]
    fn dgram_lifecycle() {
        let mut session = Session::new();
        assert!(!session.is_open());
        assert_eq!(session.kind(), None);

        let sock = UdpSocket::bind("127.0.0.1:0").unwrap();
        let peer: SocketAddr = "127.0.0.1:53".parse().unwrap();
        session.set_dgram(sock, AddrFamily::Inet, Some(peer));
        assert_eq!(session.kind(), Some(TransportKind::Dgram));
        assert_eq!(session.family(), Some(AddrFamily::Inet));
        assert!(session.is_connected());
        assert!(session.local_addr().is_some());

        assert!(session.dgram_for(&peer, true).is_some());
        assert!(session.dgram_for(&peer, false).is_none());
        let other: SocketAddr = "127.0.0.2:53".parse().unwrap();
        assert!(session.dgram_for(&other, true).is_none());
        let v6: SocketAddr = "[::1]:53".parse().unwrap();
        assert!(session.dgram_for(&v6, true).is_none());
        assert!(session.stream_for(&peer).is_none());

        session.close();
        assert!(!session.is_open());
        assert!(!session.is_connected());
    }

    #[test]
    fn unconnected_dgram() {
        let mut session = Session::new();
        let sock = UdpSocket::bind("127.0.0.1:0").unwrap();
        session.set_dgram(sock, AddrFamily::Inet, None);
        let addr: SocketAddr = "192.0.2.1:53".parse().unwrap();
        assert!(!session.is_connected());
        assert!(session.dgram_for(&addr, false).is_some());
        assert!(session.dgram_for(&addr, true).is_none());
    }

    #[test]
    fn stream_replaces_dgram() {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        let mut session = Session::new();
        session.set_dgram(
            UdpSocket::bind("127.0.0.1:0").unwrap(),
            AddrFamily::Inet,
            None,
        );
        session.set_stream(TcpStream::connect(addr).unwrap(), addr);
        assert_eq!(session.kind(), Some(TransportKind::Stream));
        assert_eq!(session.peer(), Some(addr));
        assert!(session.stream_for(&addr).is_some());
        assert!(session.dgram_for(&addr, true).is_none());
    }

    #[test]
    fn new_udp_socket() {
        let addr: SocketAddr = "127.0.0.1:53".parse().unwrap();
        let sock =
            new_socket(Socket::new, &addr, Type::DGRAM, Protocol::UDP);
        assert!(matches!(sock, Ok(NewSocket::Created(_))));
    }

    #[test]
    #[cfg(unix)]
    fn new_socket_classifies() {
        fn no_family(
            _: Domain,
            _: Type,
            _: Option<Protocol>,
        ) -> io::Result<Socket> {
            Err(io::Error::from_raw_os_error(libc::EAFNOSUPPORT))
        }

        fn no_files(
            _: Domain,
            _: Type,
            _: Option<Protocol>,
        ) -> io::Result<Socket> {
            Err(io::Error::from_raw_os_error(libc::EMFILE))
        }

        let addr: SocketAddr = "[::1]:53".parse().unwrap();
        match new_socket(no_family, &addr, Type::STREAM, Protocol::TCP) {
            Ok(NewSocket::Unsupported(err)) => {
                assert_eq!(err.raw_os_error(), Some(libc::EAFNOSUPPORT))
            }
            res => panic!("unexpected result {:?}", res),
        }
        assert!(matches!(
            new_socket(no_files, &addr, Type::STREAM, Protocol::TCP),
            Err(Error::Socket(_))
        ));
    }

    #[test]
    #[cfg(unix)]
    fn unsupported_family() {
        let err = io::Error::from_raw_os_error(libc::EAFNOSUPPORT);
        assert!(is_unsupported_family(&err));
        let err = io::Error::from_raw_os_error(libc::EMFILE);
        assert!(!is_unsupported_family(&err));
    }
}
