//! The query transmission engine of a DNS stub resolver.
//!
//! This crate sends a DNS query message to a list of upstream name servers
//! and returns the first acceptable answer. It takes care of choosing
//! between UDP and TCP, of retrying across servers and rounds with growing
//! timeouts, and of checking that a received message really answers the
//! query.
//!
//! # Modules
//!
//! * [base] contains the bits of DNS message handling needed for this:
//!   the message header, domain names, and the question section, and
//! * [resolv] contains the configuration, the transports, and the
//!   dispatcher sending the queries.
//!
//! # Reference of Feature Flags
//!
//! * `serde`: Enables serde serialization for the resolver configuration.
//!
//! # Logging
//!
//! The crate logs its decisions via the [tracing] crate. No subscriber is
//! installed, this is left to the application.

#![allow(renamed_and_removed_lints)]
#![allow(clippy::unknown_clippy_lints)]
#![cfg_attr(docsrs, feature(doc_cfg))]

pub mod base;
pub mod resolv;
