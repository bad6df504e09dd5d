//! DNS OpCodes.

use core::{cmp, fmt, hash};

//------------ Opcode --------------------------------------------------------

/// DNS OpCodes.
///
/// The opcode specifies the kind of query to be performed.
///
/// The opcode and its initial set of values are defined in [RFC 1035].
/// Additional values have been defined over time. All currently assigned
/// values can be found in the [IANA registry].
///
/// [RFC 1035]: https://tools.ietf.org/html/rfc1035
/// [IANA registry]: http://www.iana.org/assignments/dns-parameters/dns-parameters.xhtml#dns-parameters-5
#[derive(Clone, Copy, Debug)]
pub enum Opcode {
    /// A standard query (0).
    Query,

    /// An inverse query (IQUERY) (1, obsolete).
    IQuery,

    /// A server status request (2).
    Status,

    /// A NOTIFY query (4, RFC 1996).
    Notify,

    /// An UPDATE query (5, RFC 2136).
    ///
    /// Responses to an UPDATE carry the zone section in place of the
    /// question section which means question matching does not apply.
    Update,

    /// A raw integer opcode value.
    ///
    /// When converting to an `u8`, only the lower four bits are used.
    Int(u8),
}

impl Opcode {
    /// Creates an Opcode value from an integer value.
    ///
    /// Only considers the lower four bits of `value`.
    pub fn from_int(value: u8) -> Opcode {
        use self::Opcode::*;

        match value & 0x0F {
            0 => Query,
            1 => IQuery,
            2 => Status,
            4 => Notify,
            5 => Update,
            value => Int(value),
        }
    }

    /// Returns the integer value for this opcode.
    pub fn to_int(self) -> u8 {
        use self::Opcode::*;

        match self {
            Query => 0,
            IQuery => 1,
            Status => 2,
            Notify => 4,
            Update => 5,
            Int(value) => value & 0x0F,
        }
    }
}

//--- Display

impl fmt::Display for Opcode {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match Opcode::from_int(self.to_int()) {
            Opcode::Query => f.write_str("QUERY"),
            Opcode::IQuery => f.write_str("IQUERY"),
            Opcode::Status => f.write_str("STATUS"),
            Opcode::Notify => f.write_str("NOTIFY"),
            Opcode::Update => f.write_str("UPDATE"),
            Opcode::Int(value) => value.fmt(f),
        }
    }
}

//--- PartialEq, Eq, and Hash

impl cmp::PartialEq for Opcode {
    fn eq(&self, other: &Self) -> bool {
        self.to_int() == other.to_int()
    }
}

impl cmp::Eq for Opcode {}

impl hash::Hash for Opcode {
    fn hash<H: hash::Hasher>(&self, state: &mut H) {
        self.to_int().hash(state)
    }
}
