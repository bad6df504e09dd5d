//! Sending a query and waiting for its answer.
//!
//! This module contains the dispatcher that walks a query through the
//! configured servers and rounds, picks the transport, runs the hooks, and
//! decides what to do with the outcome of each attempt.
//!
//! The entry points are the function [`send`] which takes all its
//! ingredients as arguments and the type [`StubSender`] which keeps them
//! together between queries.

use super::conf::ResolvConf;
use super::error::Error;
use super::hook::{
    Hooks, NoHooks, PostReceive, PostReceiveAction, PreSend, PreSendAction,
    MAX_HOOK_LOOPS,
};
use super::servers::{Candidate, RetransPolicy, ServerIter, ShiftBackoff};
use super::session::{OpenSocket, Session, TransportKind};
use super::{dgram, stream};
use crate::base::HEADER_LEN;
use socket2::Socket;
use std::io;
use std::net::SocketAddr;
use std::sync::Arc;
use tracing::{debug, trace, warn};

//------------ Attempt -------------------------------------------------------

/// The outcome of a single attempt at one server.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub(crate) enum Attempt {
    /// An answer of the given length from the given sender is in the
    /// answer buffer.
    Accepted(usize, SocketAddr),

    /// Go on with the next server.
    NextServer,

    /// Try the same server again without using up a round.
    RetrySameServer,

    /// Use stream transport from now on and try the same server again.
    SwitchToStream,

    /// Give up on the query.
    Abort,
}

//------------ CallState -----------------------------------------------------

/// The state of a single call to [`send`].
///
/// This is shared between the dispatcher and the transports.
#[derive(Debug)]
pub(crate) struct CallState<'a> {
    /// The configuration in use.
    pub conf: &'a ResolvConf,

    /// The servers left to try.
    pub servers: ServerIter<'a>,

    /// The retransmission policy.
    pub policy: &'a dyn RetransPolicy,

    /// Whether anything at all has been received from any server.
    pub got_something: bool,

    /// Whether we have already retried after a connection reset.
    pub conn_reset: bool,

    /// The last error of a stream transport.
    pub last_error: Option<io::Error>,

    /// The function creating sockets.
    pub open: OpenSocket,
}

impl<'a> CallState<'a> {
    fn new(
        conf: &'a ResolvConf,
        policy: &'a dyn RetransPolicy,
        open: OpenSocket,
    ) -> Self {
        CallState {
            conf,
            servers: ServerIter::new(&conf.servers, conf.options.attempts),
            policy,
            got_something: false,
            conn_reset: false,
            last_error: None,
            open,
        }
    }
}

//------------ send ----------------------------------------------------------

/// Sends a query and waits for the answer.
///
/// The query is sent to the servers of `conf` in order, going through the
/// list up to `conf.options.attempts` times. Datagram transport is used
/// unless the configuration asks for stream transport or the query is too
/// large. A truncated datagram answer causes the same server to be asked
/// again via stream transport.
///
/// The answer is written to `answer` and its length is returned. If the
/// answer was larger than `answer` and came in via stream transport, it is
/// cut short and the TC bit is set in its header.
///
/// The session is reused if it is suitable and is closed once the call is
/// done unless `conf.options.stay_open` allows keeping it.
///
/// The timeout for each attempt is derived via [`ShiftBackoff`]. Use
/// [`send_with_policy`] to provide a different policy.
pub fn send<H: Hooks + ?Sized>(
    conf: &ResolvConf,
    session: &mut Session,
    hooks: &mut H,
    query: &[u8],
    answer: &mut [u8],
) -> Result<usize, Error> {
    send_with_policy(conf, session, hooks, &ShiftBackoff, query, answer)
}

/// Sends a query using the given retransmission policy.
///
/// This is identical to [`send`] except that the timeout of each datagram
/// attempt is decided by `policy`.
pub fn send_with_policy<H: Hooks + ?Sized>(
    conf: &ResolvConf,
    session: &mut Session,
    hooks: &mut H,
    policy: &dyn RetransPolicy,
    query: &[u8],
    answer: &mut [u8],
) -> Result<usize, Error> {
    dispatch(conf, session, hooks, policy, Socket::new, query, answer)
}

/// Sends a query creating sockets through `open`.
fn dispatch<H: Hooks + ?Sized>(
    conf: &ResolvConf,
    session: &mut Session,
    hooks: &mut H,
    policy: &dyn RetransPolicy,
    open: OpenSocket,
    query: &[u8],
    answer: &mut [u8],
) -> Result<usize, Error> {
    if conf.servers.is_empty() {
        return Err(Error::Config);
    }
    if answer.len() < HEADER_LEN {
        return Err(Error::BufferTooSmall);
    }
    if !is_sendable(query) {
        return Err(Error::InvalidQuery);
    }

    let mut query = query.to_vec();
    let mut state = CallState::new(conf, policy, open);
    let mut use_vc =
        conf.options.use_vc || query.len() > conf.options.max_dgram_size;
    debug!(
        len = query.len(),
        servers = conf.servers.len(),
        use_vc,
        "sending query"
    );

    'servers: while let Some(mut cand) = state.servers.next() {
        loop {
            if state.servers.is_bad(cand.index) {
                session.close();
                continue 'servers;
            }
            if let Some(addr) = state.servers.servers().get(cand.index) {
                cand.addr = *addr;
            }
            trace!(
                round = cand.round,
                index = cand.index,
                server = %cand.addr,
                "trying server"
            );

            let attempt = match pre_send(hooks, &mut cand, &mut query, answer)
            {
                PreSendAction::Proceed => {
                    if !is_sendable(&query) {
                        debug!(len = query.len(), "invalid query after hook");
                        session.close();
                        return Err(Error::InvalidQuery);
                    }
                    let res = if use_vc {
                        stream::attempt(
                            &mut state, session, &cand, &query, answer,
                        )
                    } else {
                        dgram::attempt(
                            &mut state, session, &cand, &query, answer,
                        )
                    };
                    match res {
                        Ok(attempt) => attempt,
                        Err(err) => {
                            session.close();
                            return Err(err);
                        }
                    }
                }
                PreSendAction::NextServer => Attempt::NextServer,
                PreSendAction::Done(len) => {
                    trace!("query answered by pre-send hook");
                    return Ok(len.min(answer.len()));
                }
                PreSendAction::Modified | PreSendAction::Abort => {
                    Attempt::Abort
                }
            };

            let attempt = match attempt {
                Attempt::Accepted(len, from) => {
                    let attempt =
                        post_receive(hooks, &cand, from, &query, answer, len);
                    if attempt == Attempt::NextServer {
                        session.close();
                    }
                    attempt
                }
                attempt => attempt,
            };

            match attempt {
                Attempt::Accepted(len, _) => {
                    retain(conf, session, &cand);
                    return Ok(len);
                }
                Attempt::NextServer => continue 'servers,
                Attempt::RetrySameServer => {
                    debug!(server = %cand.addr, "retrying same server");
                }
                Attempt::SwitchToStream => {
                    debug!(
                        server = %cand.addr,
                        "answer truncated, switching to stream transport"
                    );
                    use_vc = true;
                }
                Attempt::Abort => {
                    debug!("query aborted by hook");
                    session.close();
                    return Err(Error::Aborted);
                }
            }
        }
    }

    session.close();
    let last_error = if use_vc { state.last_error.take() } else { None };
    let err = if let Some(err) = last_error {
        Error::Transport(Arc::new(err))
    } else if state.got_something {
        Error::Timeout
    } else {
        Error::NoServerReachable
    };
    warn!("query failed: {}", err);
    Err(err)
}

/// Returns whether a query has a length we can send.
fn is_sendable(query: &[u8]) -> bool {
    query.len() >= HEADER_LEN && query.len() <= usize::from(u16::MAX)
}

/// Runs the pre-send hook until it settles.
fn pre_send<H: Hooks + ?Sized>(
    hooks: &mut H,
    cand: &mut Candidate,
    query: &mut Vec<u8>,
    answer: &mut [u8],
) -> PreSendAction {
    for _ in 0..MAX_HOOK_LOOPS {
        let action = hooks.pre_send(&mut PreSend {
            index: cand.index,
            server: &mut cand.addr,
            query: &mut *query,
            answer: &mut *answer,
        });
        if action != PreSendAction::Modified {
            return action;
        }
        trace!("pre-send hook modified query");
    }
    debug!("pre-send hook loop limit reached");
    PreSendAction::Abort
}

/// Runs the post-receive hook until it settles.
///
/// Translates the hook’s verdict into the outcome of the attempt.
fn post_receive<H: Hooks + ?Sized>(
    hooks: &mut H,
    cand: &Candidate,
    from: SocketAddr,
    query: &[u8],
    answer: &mut [u8],
    mut len: usize,
) -> Attempt {
    for _ in 0..MAX_HOOK_LOOPS {
        let action = hooks.post_receive(&mut PostReceive {
            index: cand.index,
            server: from,
            query,
            answer: &mut *answer,
            len: &mut len,
        });
        match action {
            PostReceiveAction::Accept => {
                return Attempt::Accepted(len.min(answer.len()), from)
            }
            PostReceiveAction::NextServer => return Attempt::NextServer,
            PostReceiveAction::Abort => return Attempt::Abort,
            PostReceiveAction::Modified => {
                trace!("post-receive hook modified answer")
            }
        }
    }
    debug!("post-receive hook loop limit reached");
    Attempt::Abort
}

/// Closes the session after a successful call unless it may stay open.
///
/// A stream is kept only if it goes to the first server. A datagram socket
/// is kept only if there is only one server.
fn retain(conf: &ResolvConf, session: &mut Session, cand: &Candidate) {
    let keep = conf.options.stay_open
        && match session.kind() {
            Some(TransportKind::Stream) => cand.index == 0,
            Some(TransportKind::Dgram) => conf.servers.len() == 1,
            None => false,
        };
    if keep {
        trace!("keeping session open");
    } else {
        session.close();
    }
}

//------------ StubSender ----------------------------------------------------

/// Sends queries using a fixed configuration.
///
/// The sender owns the configuration, the session that may be kept open
/// between queries, the hooks, and the retransmission policy.
#[derive(Debug)]
pub struct StubSender<H = NoHooks> {
    /// The configuration.
    conf: ResolvConf,

    /// The session reused across queries.
    session: Session,

    /// The hooks run for each attempt.
    hooks: H,

    /// The policy for the timeout of each datagram attempt.
    policy: Box<dyn RetransPolicy>,
}

impl StubSender {
    /// Creates a new sender without hooks.
    pub fn new(conf: ResolvConf) -> Self {
        Self::with_hooks(conf, NoHooks)
    }
}

impl<H: Hooks> StubSender<H> {
    /// Creates a new sender with the given hooks.
    pub fn with_hooks(conf: ResolvConf, hooks: H) -> Self {
        StubSender {
            conf,
            session: Session::new(),
            hooks,
            policy: Box::new(ShiftBackoff),
        }
    }

    /// Replaces the retransmission policy.
    pub fn with_policy(
        mut self,
        policy: impl RetransPolicy + 'static,
    ) -> Self {
        self.policy = Box::new(policy);
        self
    }

    /// Sends a query and waits for the answer.
    ///
    /// See [`send`] for the details.
    pub fn send(
        &mut self,
        query: &[u8],
        answer: &mut [u8],
    ) -> Result<usize, Error> {
        send_with_policy(
            &self.conf,
            &mut self.session,
            &mut self.hooks,
            self.policy.as_ref(),
            query,
            answer,
        )
    }

    /// Closes the session if it is open.
    pub fn close(&mut self) {
        self.session.close()
    }
}

/// # Field Access
///
impl<H> StubSender<H> {
    /// Returns a reference to the configuration.
    pub fn conf(&self) -> &ResolvConf {
        &self.conf
    }

    /// Returns a reference to the session.
    pub fn session(&self) -> &Session {
        &self.session
    }

    /// Returns a reference to the hooks.
    pub fn hooks(&self) -> &H {
        &self.hooks
    }

    /// Returns a mutable reference to the hooks.
    pub fn hooks_mut(&mut self) -> &mut H {
        &mut self.hooks
    }
}

//============ Testing ======================================================
