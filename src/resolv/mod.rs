//! Sending queries to upstream resolvers.
//!
//! This module contains the part of a stub resolver that takes a finished
//! query message, sends it to the configured name servers, and returns the
//! first acceptable answer. Building the query and parsing the answer
//! beyond its header and question section are left to the caller.
//!
//! Queries are sent via UDP first and retried over TCP if the answer comes
//! back truncated. Servers are tried in the order they are configured, going
//! through the list as many times as the configuration says. Everything
//! happens synchronously on the calling thread.
//!
//! The simplest way to send queries is [`StubSender`] which owns the
//! configuration and the transport [`Session`]:
//!
//! ```no_run
//! use domain_stub::resolv::{ResolvConf, StubSender};
//!
//! let mut conf = ResolvConf::new();
//! conf.finalize();
//! let mut sender = StubSender::new(conf);
//!
//! # let query = [0u8; 17];
//! let mut answer = [0u8; 512];
//! let len = sender.send(&query, &mut answer).unwrap();
//! println!("{} octets of answer", len);
//! ```
//!
//! Alternatively, the function [`send`] takes all ingredients explicitly.
//! Processing of each query can be followed and influenced through
//! [`Hooks`].

pub use self::conf::{ResolvConf, ResolvOptions};
pub use self::error::Error;
pub use self::hook::{
    Hooks, NoHooks, PostReceive, PostReceiveAction, PreSend, PreSendAction,
};
pub use self::send::{send, send_with_policy, StubSender};
pub use self::servers::{RetransPolicy, ShiftBackoff};
pub use self::session::{AddrFamily, Session, TransportKind};

pub mod conf;
mod dgram;
pub mod error;
pub mod hook;
mod send;
pub mod servers;
pub mod session;
mod stream;
pub mod validate;
