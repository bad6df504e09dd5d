//! Hooks into query processing.
//!
//! A [`Hooks`] implementation can look at and interfere with every attempt
//! of a query. The pre-send hook runs before the query is sent to a server
//! and the post-receive hook runs once an answer has been accepted by the
//! transport. Both return an action telling the sender how to go on.
//!
//! A hook that changes the data it is handed returns the `Modified` action
//! and is then called again with the changed data. In order to catch hooks
//! that never settle, this happens at most [`MAX_HOOK_LOOPS`] times in a
//! row after which the query is aborted.

use std::net::SocketAddr;

/// How often a hook may ask to be called again before the query is aborted.
pub const MAX_HOOK_LOOPS: usize = 42;

//------------ PreSend -------------------------------------------------------

/// The data handed to the pre-send hook.
#[derive(Debug)]
pub struct PreSend<'a> {
    /// The index of the server in the configured server list.
    pub index: usize,

    /// The address the query is about to be sent to.
    ///
    /// The hook may change the address. The changed address is used for
    /// this attempt only.
    pub server: &'a mut SocketAddr,

    /// The query to be sent.
    ///
    /// This is a working copy of the query passed to the sender. Changes
    /// stay in place for all later attempts of the query. If the query
    /// ends up shorter than a header or longer than 65535 octets, the call
    /// fails with [`InvalidQuery`](super::Error::InvalidQuery).
    pub query: &'a mut Vec<u8>,

    /// The answer buffer.
    ///
    /// A hook answering the query itself writes the answer here and
    /// returns [`PreSendAction::Done`].
    pub answer: &'a mut [u8],
}

//------------ PreSendAction -------------------------------------------------

/// What to do after the pre-send hook has run.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum PreSendAction {
    /// Send the query.
    Proceed,

    /// Skip this server and go to the next one.
    NextServer,

    /// The hook has answered the query.
    ///
    /// The value is the length of the answer in the answer buffer.
    Done(usize),

    /// The hook has changed the query or server and wants to see it again.
    Modified,

    /// Abort the query.
    Abort,
}

//------------ PostReceive ---------------------------------------------------

/// The data handed to the post-receive hook.
#[derive(Debug)]
pub struct PostReceive<'a> {
    /// The index of the server in the configured server list.
    pub index: usize,

    /// The address the answer came from.
    ///
    /// With datagram transport, this may be a server tried before the one
    /// at `index` whose answer arrived late.
    pub server: SocketAddr,

    /// The query as sent.
    pub query: &'a [u8],

    /// The answer buffer.
    pub answer: &'a mut [u8],

    /// The length of the answer in the answer buffer.
    ///
    /// A hook changing the answer needs to update this, too. The value is
    /// capped at the size of the buffer.
    pub len: &'a mut usize,
}

impl<'a> PostReceive<'a> {
    /// Returns the received answer.
    pub fn message(&self) -> &[u8] {
        &self.answer[..(*self.len).min(self.answer.len())]
    }
}

//------------ PostReceiveAction ---------------------------------------------

/// What to do after the post-receive hook has run.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum PostReceiveAction {
    /// Return the answer.
    Accept,

    /// Drop the answer and go to the next server.
    NextServer,

    /// The hook has changed the answer and wants to see it again.
    Modified,

    /// Abort the query.
    Abort,
}

//------------ Hooks ---------------------------------------------------------

/// Callbacks invoked while sending a query.
///
/// Both methods have default implementations that let processing continue
/// unchanged, so an implementation only needs to provide what it is
/// interested in.
pub trait Hooks {
    /// Called before the query is sent to a server.
    fn pre_send(&mut self, _attempt: &mut PreSend) -> PreSendAction {
        PreSendAction::Proceed
    }

    /// Called after an answer has been received and accepted.
    fn post_receive(
        &mut self,
        _answer: &mut PostReceive,
    ) -> PostReceiveAction {
        PostReceiveAction::Accept
    }
}

impl<'a, H: Hooks + ?Sized> Hooks for &'a mut H {
    fn pre_send(&mut self, attempt: &mut PreSend) -> PreSendAction {
        (**self).pre_send(attempt)
    }

    fn post_receive(&mut self, answer: &mut PostReceive) -> PostReceiveAction {
        (**self).post_receive(answer)
    }
}

impl<H: Hooks + ?Sized> Hooks for Box<H> {
    fn pre_send(&mut self, attempt: &mut PreSend) -> PreSendAction {
        self.as_mut().pre_send(attempt)
    }

    fn post_receive(&mut self, answer: &mut PostReceive) -> PostReceiveAction {
        self.as_mut().post_receive(answer)
    }
}

//------------ NoHooks -------------------------------------------------------

/// Hooks that don’t do anything.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoHooks;

impl Hooks for NoHooks {}

//============ Testing ======================================================
