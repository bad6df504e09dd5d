//! Iterating over servers and rounds.
//!
//! A query walks through the configured server list in order, repeating
//! the walk for the configured number of rounds. Servers that failed hard
//! are marked bad and skipped for the rest of the query. How long to wait
//! for an answer in each attempt is decided by a [`RetransPolicy`].

use std::fmt;
use std::net::SocketAddr;
use std::time::Duration;
use tracing::trace;

/// The shortest timeout an attempt will ever have.
pub const MIN_TIMEOUT: Duration = Duration::from_millis(1);

//------------ RetransPolicy -------------------------------------------------

/// A policy for the time to wait for an answer in each attempt.
pub trait RetransPolicy: fmt::Debug {
    /// Returns the timeout for an attempt.
    ///
    /// `base` is the configured timeout, `round` the zero-based round of
    /// the attempt, and `servers` the number of configured servers.
    fn timeout(&self, base: Duration, round: usize, servers: usize)
        -> Duration;
}

//------------ ShiftBackoff --------------------------------------------------

/// The classic resolver back-off.
///
/// The base timeout is doubled with every round. From the second round
/// on, the result is divided by the number of servers so a full round
/// takes about as long as a single attempt would for one server. The
/// timeout never drops below [`MIN_TIMEOUT`].
#[derive(Clone, Copy, Debug, Default)]
pub struct ShiftBackoff;

impl RetransPolicy for ShiftBackoff {
    fn timeout(
        &self,
        base: Duration,
        round: usize,
        servers: usize,
    ) -> Duration {
        let factor = u32::try_from(round)
            .ok()
            .and_then(|round| 1u32.checked_shl(round))
            .unwrap_or(u32::MAX);
        let mut timeout = base.saturating_mul(factor);
        if round > 0 && servers > 1 {
            timeout /= u32::try_from(servers).unwrap_or(u32::MAX);
        }
        timeout.max(MIN_TIMEOUT)
    }
}

//------------ BadServers ----------------------------------------------------

/// The set of servers not to be asked again during a query.
///
/// Servers are identified by their index in the server list. The set grows
/// as needed.
#[derive(Clone, Debug, Default)]
pub struct BadServers {
    bad: Vec<bool>,
}

impl BadServers {
    /// Creates a new, empty set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a server to the set.
    ///
    /// Returns whether the server was newly added.
    pub fn insert(&mut self, index: usize) -> bool {
        if index >= self.bad.len() {
            self.bad.resize(index + 1, false);
        }
        !std::mem::replace(&mut self.bad[index], true)
    }

    /// Returns whether a server is in the set.
    pub fn contains(&self, index: usize) -> bool {
        self.bad.get(index).copied().unwrap_or(false)
    }

    /// Returns the number of servers in the set.
    pub fn len(&self) -> usize {
        self.bad.iter().filter(|bad| **bad).count()
    }

    /// Returns whether the set is empty.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

//------------ Candidate -----------------------------------------------------

/// A server to try next.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct Candidate {
    /// The zero-based round.
    pub round: usize,

    /// The index of the server in the server list.
    pub index: usize,

    /// The address to send the query to.
    ///
    /// This starts out as the configured address but may be replaced by a
    /// pre-send hook.
    pub addr: SocketAddr,
}

impl Candidate {
    /// Returns whether this is the very first attempt of a query.
    pub fn is_first_attempt(&self) -> bool {
        self.round == 0 && self.index == 0
    }
}

//------------ ServerIter ----------------------------------------------------

/// Enumerates the (round, server) pairs of a query.
#[derive(Clone, Debug)]
pub struct ServerIter<'a> {
    /// The configured servers.
    servers: &'a [SocketAddr],

    /// The number of rounds.
    attempts: usize,

    /// The current round.
    round: usize,

    /// The index of the next server to consider in this round.
    next: usize,

    /// The servers to skip.
    bad: BadServers,
}

impl<'a> ServerIter<'a> {
    /// Creates a new iterator over `attempts` rounds through `servers`.
    pub fn new(servers: &'a [SocketAddr], attempts: usize) -> Self {
        ServerIter {
            servers,
            attempts,
            round: 0,
            next: 0,
            bad: BadServers::new(),
        }
    }

    /// Returns the configured servers.
    pub fn servers(&self) -> &'a [SocketAddr] {
        self.servers
    }

    /// Returns the number of configured servers.
    pub fn server_count(&self) -> usize {
        self.servers.len()
    }

    /// Marks a server as bad.
    ///
    /// Marking a server more than once has no further effect.
    pub fn mark_bad(&mut self, index: usize) {
        if self.bad.insert(index) {
            trace!("marking server {} as bad", index);
        }
    }

    /// Returns whether a server has been marked bad.
    pub fn is_bad(&self, index: usize) -> bool {
        self.bad.contains(index)
    }

    /// Returns the set of bad servers.
    pub fn bad(&self) -> &BadServers {
        &self.bad
    }

    /// Returns the timeout for an attempt in the given round.
    pub fn timeout(
        &self,
        policy: &dyn RetransPolicy,
        base: Duration,
        round: usize,
    ) -> Duration {
        policy.timeout(base, round, self.servers.len())
    }
}

impl<'a> Iterator for ServerIter<'a> {
    type Item = Candidate;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if self.round >= self.attempts || self.servers.is_empty() {
                return None;
            }
            if self.next >= self.servers.len() {
                self.round += 1;
                self.next = 0;
                continue;
            }
            let index = self.next;
            self.next += 1;
            if self.bad.contains(index) {
                trace!("skipping bad server {}", index);
                continue;
            }
            return Some(Candidate {
                round: self.round,
                index,
                addr: self.servers[index],
            });
        }
    }
}

//============ Testing ======================================================
