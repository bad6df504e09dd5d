//! Stream transport.
//!
//! Messages on a stream are preceded by their length as a two octet
//! unsigned integer in network byte order. A single attempt writes the
//! query to a connection to the server and reads answers until it finds
//! one with the query’s ID. Answers with other IDs are leftovers from
//! earlier queries on the same connection and are skipped.
//!
//! If the peer resets the connection while we are waiting for the length
//! of an answer, the server is tried once more on a fresh connection. This
//! happens at most once per query.

use super::error::Error;
use super::send::{Attempt, CallState};
use super::servers::Candidate;
use super::session::{new_socket, NewSocket, Session};
use crate::base::{Header, HEADER_LEN};
use socket2::{Protocol, SockAddr, Type};
use std::io::{self, Read, Write};
use std::net::TcpStream;
use tracing::{debug, trace};

/// The size of the chunks we drain an oversized answer in.
const DRAIN_CHUNK: usize = 512;

//------------ attempt -------------------------------------------------------

/// Makes one attempt at sending the query to a server via TCP.
pub(crate) fn attempt(
    state: &mut CallState,
    session: &mut Session,
    cand: &Candidate,
    query: &[u8],
    answer: &mut [u8],
) -> Result<Attempt, Error> {
    let addr = cand.addr;
    let timeout = state.conf.options.stream_timeout();

    if session.stream_for(&addr).is_none() {
        session.close();
        let sock = new_socket(state.open, &addr, Type::STREAM, Protocol::TCP)?;
        let sock = match sock {
            NewSocket::Created(sock) => sock,
            NewSocket::Unsupported(err) => {
                state.last_error = Some(err);
                return Ok(Attempt::NextServer);
            }
        };
        let res = sock
            .connect_timeout(&SockAddr::from(addr), timeout)
            .and_then(|()| sock.set_read_timeout(Some(timeout)))
            .and_then(|()| sock.set_write_timeout(Some(timeout)));
        if let Err(err) = res {
            return Ok(fail(state, session, cand, "connect failed", err));
        }
        trace!(%addr, "connected stream");
        session.set_stream(sock.into(), addr);
    }
    let sock = match session.stream_for(&addr) {
        Some(sock) => sock,
        None => return Ok(Attempt::NextServer),
    };

    if let Err(err) = write_query(sock, query) {
        return Ok(fail(state, session, cand, "write failed", err));
    }
    let query_id = Header::for_message_slice(query).id();

    loop {
        let mut len = [0u8; 2];
        if let Err(err) = sock.read_exact(&mut len) {
            if err.kind() == io::ErrorKind::ConnectionReset
                && !state.conn_reset
            {
                debug!(%addr, "connection reset, trying again");
                state.conn_reset = true;
                state.last_error = Some(err);
                session.close();
                return Ok(Attempt::RetrySameServer);
            }
            return Ok(fail(state, session, cand, "read failed", err));
        }
        let declared = usize::from(u16::from_be_bytes(len));
        if declared < HEADER_LEN {
            let err = io::Error::new(
                io::ErrorKind::InvalidData,
                "answer shorter than a message header",
            );
            return Ok(fail(state, session, cand, "undersized answer", err));
        }

        let len = declared.min(answer.len());
        if let Err(err) = sock.read_exact(&mut answer[..len]) {
            return Ok(fail(state, session, cand, "read failed", err));
        }
        if declared > len {
            trace!(%addr, declared, len, "answer truncated");
            let mut header = Header::for_message_slice(answer);
            header.set_tc(true);
            header.write_to_message_slice(answer);
            if let Err(err) = drain(sock, declared - len) {
                return Ok(fail(state, session, cand, "read failed", err));
            }
        }

        let id = Header::for_message_slice(answer).id();
        if id != query_id {
            trace!(%addr, id, "dropping answer: id mismatch");
            continue;
        }
        trace!(%addr, len, "accepted answer");
        return Ok(Attempt::Accepted(len, addr));
    }
}

/// Writes the query with its length prefix.
fn write_query(sock: &mut TcpStream, query: &[u8]) -> Result<(), io::Error> {
    let len = u16::try_from(query.len()).map_err(|_| {
        io::Error::new(io::ErrorKind::InvalidInput, "query too long")
    })?;
    let mut buf = Vec::with_capacity(query.len() + 2);
    buf.extend_from_slice(&len.to_be_bytes());
    buf.extend_from_slice(query);
    sock.write_all(&buf)?;
    sock.flush()
}

/// Reads and discards `len` octets.
fn drain(sock: &mut TcpStream, mut len: usize) -> Result<(), io::Error> {
    let mut junk = [0u8; DRAIN_CHUNK];
    while len > 0 {
        let chunk = len.min(DRAIN_CHUNK);
        sock.read_exact(&mut junk[..chunk])?;
        len -= chunk;
    }
    Ok(())
}

/// Records a transport error and gives up on the server.
fn fail(
    state: &mut CallState,
    session: &mut Session,
    cand: &Candidate,
    what: &'static str,
    err: io::Error,
) -> Attempt {
    debug!(server = %cand.addr, "{}: {}", what, err);
    state.last_error = Some(err);
    state.servers.mark_bad(cand.index);
    session.close();
    Attempt::NextServer
}

//============ Testing ======================================================
