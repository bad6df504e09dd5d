//! IANA Definitions for DNS.
//!
//! This module contains types for the parameters defined in IANA registries
//! that the engine needs to look at: the opcode and response code from the
//! message header and the record type and class of a question.
//!
//! There are two methods `from_int()` and `to_int()` to convert from and
//! to raw integer values. `Display` renders the common mnemonics.

pub use self::class::Class;
pub use self::opcode::Opcode;
pub use self::rcode::Rcode;
pub use self::rtype::Rtype;

pub mod class;
pub mod opcode;
pub mod rcode;
pub mod rtype;
