//! Mock name servers and message helpers for the integration tests.
//!
//! The servers run on their own threads on loopback addresses. They hand
//! every query to a closure that decides how to respond and count what
//! they have seen so tests can check how often a server was asked.

#![allow(dead_code)]

use domain_stub::base::iana::{Rcode, Rtype};
use domain_stub::base::{Dname, Header, HeaderSection, Question, HEADER_LEN};
use socket2::SockRef;
use std::io::{self, Read, Write};
use std::net::{SocketAddr, TcpListener, TcpStream, UdpSocket};
use std::str::FromStr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

/// How often the servers check whether they should stop.
const POLL: Duration = Duration::from_millis(20);

//------------ Logging -------------------------------------------------------

pub fn init_logging() {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_thread_ids(true)
        .without_time()
        .try_init()
        .ok();
}

//------------ Messages ------------------------------------------------------

/// Creates a query with a single question.
pub fn query(id: u16, qname: &str, qtype: Rtype) -> Vec<u8> {
    let mut header = HeaderSection::new();
    header.header_mut().set_id(id);
    header.header_mut().set_rd(true);
    header.counts_mut().set_qdcount(1);
    let mut msg = Vec::new();
    header.compose(&mut msg);
    Question::new_in(Dname::from_str(qname).unwrap(), qtype)
        .compose(&mut msg);
    msg
}

/// Creates an answer to `query` with one record whose data is `data`.
///
/// The answer is `query.len() + 12 + data.len()` octets long.
pub fn answer(query: &[u8], data: &[u8]) -> Vec<u8> {
    let mut section = HeaderSection::for_message_slice(query).unwrap();
    section.header_mut().set_qr(true);
    section.counts_mut().set_ancount(1);
    let mut msg = Vec::new();
    section.compose(&mut msg);
    msg.extend_from_slice(&query[HEADER_LEN..]);
    msg.extend_from_slice(b"\xc0\x0c\x00\x10\x00\x01\x00\x00\x0e\x10");
    msg.extend_from_slice(&(data.len() as u16).to_be_bytes());
    msg.extend_from_slice(data);
    msg
}

/// Returns a copy of `msg` with the header changed by `op`.
pub fn with_header(msg: &[u8], op: impl FnOnce(&mut Header)) -> Vec<u8> {
    let mut msg = msg.to_vec();
    let mut header = Header::for_message_slice(&msg);
    op(&mut header);
    header.write_to_message_slice(&mut msg);
    msg
}

/// Returns a copy of `msg` with a different ID.
pub fn with_id(msg: &[u8], id: u16) -> Vec<u8> {
    with_header(msg, |header| header.set_id(id))
}

/// Returns a copy of `msg` with the given response code.
pub fn with_rcode(msg: &[u8], rcode: Rcode) -> Vec<u8> {
    with_header(msg, |header| header.set_rcode(rcode))
}

/// Returns a copy of `msg` with the TC bit set.
pub fn truncated(msg: &[u8]) -> Vec<u8> {
    with_header(msg, |header| header.set_tc(true))
}

//------------ UdpServer -----------------------------------------------------

/// A mock UDP server.
pub struct UdpServer {
    addr: SocketAddr,
    stop: Arc<AtomicBool>,
    handle: Option<JoinHandle<usize>>,
}

impl UdpServer {
    /// Starts a server on a random loopback port.
    ///
    /// The handler receives the server socket, the query, and the address
    /// of the client. It responds by sending on the socket, or doesn’t.
    pub fn spawn<F>(handler: F) -> Self
    where
        F: FnMut(&UdpSocket, &[u8], SocketAddr) + Send + 'static,
    {
        Self::with_socket(UdpSocket::bind("127.0.0.1:0").unwrap(), handler)
    }

    /// Starts a server that never answers.
    pub fn silent() -> Self {
        Self::spawn(|_, _, _| {})
    }

    /// Starts a server that answers every query with `make(query)`.
    pub fn answering<F>(mut make: F) -> Self
    where
        F: FnMut(&[u8]) -> Vec<u8> + Send + 'static,
    {
        Self::spawn(move |sock, query, from| {
            sock.send_to(&make(query), from).unwrap();
        })
    }

    fn with_socket<F>(sock: UdpSocket, mut handler: F) -> Self
    where
        F: FnMut(&UdpSocket, &[u8], SocketAddr) + Send + 'static,
    {
        let addr = sock.local_addr().unwrap();
        let stop = Arc::new(AtomicBool::new(false));
        let thread_stop = stop.clone();
        let handle = thread::spawn(move || {
            sock.set_read_timeout(Some(POLL)).unwrap();
            let mut buf = vec![0u8; 65535];
            let mut count = 0;
            loop {
                match sock.recv_from(&mut buf) {
                    Ok((len, from)) => {
                        count += 1;
                        handler(&sock, &buf[..len], from);
                    }
                    Err(_) => {
                        if thread_stop.load(Ordering::Relaxed) {
                            return count;
                        }
                    }
                }
            }
        });
        UdpServer {
            addr,
            stop,
            handle: Some(handle),
        }
    }

    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    /// Stops the server and returns the number of queries received.
    pub fn finish(mut self) -> usize {
        self.stop.store(true, Ordering::Relaxed);
        self.handle.take().unwrap().join().unwrap()
    }
}

impl Drop for UdpServer {
    fn drop(&mut self) {
        self.stop.store(true, Ordering::Relaxed);
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

//------------ TcpServer -----------------------------------------------------

/// What a mock TCP server does with a query.
pub enum TcpAction {
    /// Send these messages, then wait for the next query.
    Reply(Vec<Vec<u8>>),

    /// Reset the connection.
    Reset,

    /// Close the connection.
    Close,
}

/// What a mock TCP server has seen.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct TcpStats {
    pub connections: usize,
    pub queries: usize,
}

/// A mock TCP server.
///
/// Connections are served one after another.
pub struct TcpServer {
    addr: SocketAddr,
    stop: Arc<AtomicBool>,
    handle: Option<JoinHandle<TcpStats>>,
}

impl TcpServer {
    /// Starts a server on a random loopback port.
    ///
    /// The handler receives the zero-based index of the connection and the
    /// query.
    pub fn spawn<F>(handler: F) -> Self
    where
        F: FnMut(usize, &[u8]) -> TcpAction + Send + 'static,
    {
        Self::with_listener(TcpListener::bind("127.0.0.1:0").unwrap(), handler)
    }

    /// Starts a server that answers every query with `make(query)`.
    pub fn answering<F>(mut make: F) -> Self
    where
        F: FnMut(&[u8]) -> Vec<u8> + Send + 'static,
    {
        Self::spawn(move |_, query| TcpAction::Reply(vec![make(query)]))
    }

    fn with_listener<F>(listener: TcpListener, mut handler: F) -> Self
    where
        F: FnMut(usize, &[u8]) -> TcpAction + Send + 'static,
    {
        let addr = listener.local_addr().unwrap();
        let stop = Arc::new(AtomicBool::new(false));
        let thread_stop = stop.clone();
        let handle = thread::spawn(move || {
            listener.set_nonblocking(true).unwrap();
            let mut stats = TcpStats::default();
            loop {
                match listener.accept() {
                    Ok((stream, _)) => {
                        let conn = stats.connections;
                        stats.connections += 1;
                        serve_stream(
                            stream,
                            conn,
                            &mut handler,
                            &mut stats,
                            &thread_stop,
                        );
                    }
                    Err(_) => {
                        if thread_stop.load(Ordering::Relaxed) {
                            return stats;
                        }
                        thread::sleep(Duration::from_millis(5));
                    }
                }
            }
        });
        TcpServer {
            addr,
            stop,
            handle: Some(handle),
        }
    }

    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    /// Stops the server and returns what it has seen.
    pub fn finish(mut self) -> TcpStats {
        self.stop.store(true, Ordering::Relaxed);
        self.handle.take().unwrap().join().unwrap()
    }
}

impl Drop for TcpServer {
    fn drop(&mut self) {
        self.stop.store(true, Ordering::Relaxed);
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

fn serve_stream<F>(
    mut stream: TcpStream,
    conn: usize,
    handler: &mut F,
    stats: &mut TcpStats,
    stop: &AtomicBool,
) where
    F: FnMut(usize, &[u8]) -> TcpAction,
{
    stream.set_nonblocking(false).unwrap();
    stream.set_read_timeout(Some(POLL)).unwrap();
    loop {
        let mut len = [0u8; 2];
        if !read_full(&mut stream, &mut len, stop) {
            return;
        }
        let mut query = vec![0u8; usize::from(u16::from_be_bytes(len))];
        if !read_full(&mut stream, &mut query, stop) {
            return;
        }
        stats.queries += 1;
        match handler(conn, &query) {
            TcpAction::Reply(msgs) => {
                for msg in msgs {
                    let mut buf = (msg.len() as u16).to_be_bytes().to_vec();
                    buf.extend_from_slice(&msg);
                    if stream.write_all(&buf).is_err() {
                        return;
                    }
                }
            }
            TcpAction::Reset => {
                SockRef::from(&stream)
                    .set_linger(Some(Duration::ZERO))
                    .unwrap();
                return;
            }
            TcpAction::Close => return,
        }
    }
}

/// Fills `buf` from the stream.
///
/// Returns `false` if the stream ended or the server is asked to stop.
fn read_full(
    stream: &mut TcpStream,
    buf: &mut [u8],
    stop: &AtomicBool,
) -> bool {
    let mut pos = 0;
    while pos < buf.len() {
        match stream.read(&mut buf[pos..]) {
            Ok(0) => return false,
            Ok(n) => pos += n,
            Err(err)
                if matches!(
                    err.kind(),
                    io::ErrorKind::WouldBlock | io::ErrorKind::TimedOut
                ) =>
            {
                if stop.load(Ordering::Relaxed) {
                    return false;
                }
            }
            Err(_) => return false,
        }
    }
    true
}

//------------ Server Pairs --------------------------------------------------

/// Starts a UDP and a TCP server listening on the same address.
pub fn spawn_pair<U, T>(udp: U, tcp: T) -> (UdpServer, TcpServer)
where
    U: FnMut(&UdpSocket, &[u8], SocketAddr) + Send + 'static,
    T: FnMut(usize, &[u8]) -> TcpAction + Send + 'static,
{
    for _ in 0..10 {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        if let Ok(sock) = UdpSocket::bind(listener.local_addr().unwrap()) {
            return (
                UdpServer::with_socket(sock, udp),
                TcpServer::with_listener(listener, tcp),
            );
        }
    }
    panic!("no port free for both UDP and TCP");
}
