//! Datagram transport.
//!
//! A single attempt sends the query to one server via UDP and waits for an
//! acceptable answer until the attempt’s timeout expires. Datagrams that
//! don’t qualify as an answer are dropped and waiting continues with
//! whatever time is left.
//!
//! The socket is connected to the server only if there is just one server
//! or this is the very first attempt of a query. Otherwise, an unconnected
//! socket is used and answers are identified by their content alone. This
//! way, a late answer from a server tried earlier is still accepted.

use super::error::Error;
use super::send::{Attempt, CallState};
use super::servers::Candidate;
use super::session::{new_socket, AddrFamily, NewSocket, Session};
use super::validate::{is_our_server, queries_match};
use crate::base::{Header, HEADER_LEN};
use rand::Rng;
use socket2::{Protocol, SockAddr, Socket, Type};
use std::io;
use std::net::{SocketAddr, UdpSocket};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, trace, warn};

/// How many times do we try a new random port if we get ‘address in use.’
const RETRY_RANDOM_PORT: usize = 10;

/// The lowest port we pick as a random source port.
const MIN_RANDOM_PORT: u16 = 1024;

//------------ attempt -------------------------------------------------------

/// Makes one attempt at sending the query to a server via UDP.
pub(crate) fn attempt(
    state: &mut CallState,
    session: &mut Session,
    cand: &Candidate,
    query: &[u8],
    answer: &mut [u8],
) -> Result<Attempt, Error> {
    let conf = state.conf;
    let options = &conf.options;
    let addr = cand.addr;
    let connect =
        state.servers.server_count() == 1 || cand.is_first_attempt();

    if session.dgram_for(&addr, connect).is_none() {
        session.close();
        let sock = new_socket(state.open, &addr, Type::DGRAM, Protocol::UDP)?;
        let sock = match sock {
            NewSocket::Created(sock) => sock,
            NewSocket::Unsupported(_) => return Ok(Attempt::NextServer),
        };
        let sock = bind(sock, &addr, options.random_port)?;
        if connect {
            if let Err(err) = sock.connect(addr) {
                debug!(%addr, "connect failed: {}", err);
                return Ok(Attempt::NextServer);
            }
        }
        trace!(%addr, connect, "created datagram socket");
        session.set_dgram(
            sock,
            AddrFamily::of(&addr),
            connect.then_some(addr),
        );
    }
    let sock = match session.dgram_for(&addr, connect) {
        Some(sock) => sock,
        None => return Ok(Attempt::NextServer),
    };

    let sent = if connect {
        sock.send(query)
    } else {
        sock.send_to(query, addr)
    };
    if let Err(err) = sent {
        debug!(%addr, "send failed: {}", err);
        session.close();
        return Ok(Attempt::NextServer);
    }

    let timeout = state.servers.timeout(
        state.policy,
        options.timeout,
        cand.round,
    );
    let deadline = Instant::now() + timeout;
    let query_id = Header::for_message_slice(query).id();

    loop {
        let now = Instant::now();
        if now >= deadline {
            debug!(%addr, ?timeout, "timeout");
            return Ok(Attempt::NextServer);
        }
        if let Err(err) = sock.set_read_timeout(Some(deadline - now)) {
            debug!(%addr, "failed to set timeout: {}", err);
            session.close();
            return Ok(Attempt::NextServer);
        }
        let (len, from) = match sock.recv_from(answer) {
            Ok(res) => res,
            Err(err)
                if matches!(
                    err.kind(),
                    io::ErrorKind::WouldBlock
                        | io::ErrorKind::TimedOut
                        | io::ErrorKind::Interrupted
                ) =>
            {
                continue
            }
            Err(err) => {
                debug!(%addr, "receive failed: {}", err);
                session.close();
                return Ok(Attempt::NextServer);
            }
        };
        state.got_something = true;

        if len < HEADER_LEN {
            debug!(%from, len, "undersized answer");
            state.servers.mark_bad(cand.index);
            session.close();
            return Ok(Attempt::NextServer);
        }
        let header = Header::for_message_slice(answer);
        if header.id() != query_id {
            trace!(%from, id = header.id(), "dropping answer: id mismatch");
            continue;
        }
        if !options.insecure1
            && !is_our_server(&from, state.servers.servers())
        {
            trace!(%from, "dropping answer: not from our server");
            continue;
        }
        if !options.insecure2 {
            match queries_match(query, &answer[..len]) {
                Ok(true) => {}
                Ok(false) => {
                    trace!(%from, "dropping answer: question mismatch");
                    continue;
                }
                Err(err) => {
                    trace!(%from, "dropping answer: {}", err);
                    continue;
                }
            }
        }
        if header.rcode().is_rejection() && !options.keep_rejected {
            debug!(%from, rcode = %header.rcode(), "server rejected query");
            state.servers.mark_bad(cand.index);
            session.close();
            return Ok(Attempt::NextServer);
        }
        if header.tc() && !options.ign_tc {
            session.close();
            return Ok(Attempt::SwitchToStream);
        }
        trace!(%from, len, "accepted answer");
        return Ok(Attempt::Accepted(len, from));
    }
}

/// Binds a datagram socket to a local address.
///
/// If `random_port` is true, we try to pick a random port a few times
/// before leaving the choice to the operating system.
fn bind(
    sock: Socket,
    addr: &SocketAddr,
    random_port: bool,
) -> Result<UdpSocket, Error> {
    let local: SocketAddr = if addr.is_ipv4() {
        ([0u8; 4], 0).into()
    } else {
        ([0u16; 8], 0).into()
    };
    if random_port {
        let mut rng = rand::thread_rng();
        let mut i = 0;
        loop {
            let port = rng.gen_range(MIN_RANDOM_PORT..=u16::MAX);
            let local = SocketAddr::new(local.ip(), port);
            match sock.bind(&SockAddr::from(local)) {
                Ok(()) => return Ok(sock.into()),
                Err(err) if err.kind() == io::ErrorKind::AddrInUse => {
                    if i == RETRY_RANDOM_PORT {
                        trace!("no free random port, leaving it to the OS");
                        break;
                    } else {
                        i += 1
                    }
                }
                Err(err) => return Err(bind_error(err)),
            }
        }
    }
    match sock.bind(&SockAddr::from(local)) {
        Ok(()) => Ok(sock.into()),
        Err(err) => Err(bind_error(err)),
    }
}

fn bind_error(err: io::Error) -> Error {
    warn!("failed to bind datagram socket: {}", err);
    Error::Socket(Arc::new(err))
}

//============ Testing ======================================================

#[cfg(test)]
mod test {
    use super::*;

    fn created(addr: &SocketAddr) -> Socket {
        match new_socket(Socket::new, addr, Type::DGRAM, Protocol::UDP) {
            Ok(NewSocket::Created(sock)) => sock,
            res => panic!("no socket: {:?}", res),
        }
    }

    #[test]
    fn bind_random_port() {
        let addr: SocketAddr = "127.0.0.1:53".parse().unwrap();
        let sock = created(&addr);
        let sock = bind(sock, &addr, true).unwrap();
        assert!(sock.local_addr().unwrap().port() >= MIN_RANDOM_PORT);
    }

    #[test]
    fn bind_any_port() {
        let addr: SocketAddr = "127.0.0.1:53".parse().unwrap();
        let sock = created(&addr);
        let sock = bind(sock, &addr, false).unwrap();
        assert!(sock.local_addr().unwrap().ip().is_unspecified());
    }
}
