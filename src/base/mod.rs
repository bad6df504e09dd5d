//! Handling of DNS data.
//!
//! This module provides the small part of the DNS wire format the
//! transmission engine needs to look at: the [header] of a message, the
//! [question] section including possibly compressed domain [name]s, and
//! the [iana] parameters found in both.
//!
//! Building complete messages or parsing records is not done here. The
//! engine receives its queries already encoded and hands back answers as
//! raw octets.

pub use self::header::{Header, HeaderCounts, HeaderSection, HEADER_LEN};
pub use self::name::Dname;
pub use self::question::{Question, QuestionSection};
pub use self::wire::{FormError, Parser};

pub mod header;
pub mod iana;
pub mod name;
pub mod question;
pub mod wire;
