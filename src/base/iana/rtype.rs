//! Resource record types.

use core::fmt;

//------------ Rtype ---------------------------------------------------------

/// Resource Record Types.
///
/// Each resource records has a 16 bit type value indicating what kind of
/// information is represented by the record. The engine never interprets
/// record data, so the type is a thin wrapper around the raw value with
/// constants for the types commonly found in the question of a stub
/// query.
///
/// See the [IANA registry] for a complete list.
///
/// [IANA registry]: http://www.iana.org/assignments/dns-parameters/dns-parameters.xhtml#dns-parameters-4
#[derive(Clone, Copy, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub struct Rtype(u16);

impl Rtype {
    /// A host address.
    pub const A: Rtype = Rtype(1);

    /// An authoritative name server.
    pub const NS: Rtype = Rtype(2);

    /// The canonical name for an alias.
    pub const CNAME: Rtype = Rtype(5);

    /// Marks the start of a zone of authority.
    pub const SOA: Rtype = Rtype(6);

    /// A domain name pointer.
    pub const PTR: Rtype = Rtype(12);

    /// Mail exchange.
    pub const MX: Rtype = Rtype(15);

    /// Text strings.
    pub const TXT: Rtype = Rtype(16);

    /// IPv6 address.
    pub const AAAA: Rtype = Rtype(28);

    /// Server selection.
    pub const SRV: Rtype = Rtype(33);

    /// A request for all records the server has available.
    pub const ANY: Rtype = Rtype(255);

    /// Creates a record type from its integer value.
    pub const fn from_int(value: u16) -> Self {
        Rtype(value)
    }

    /// Returns the integer value of the record type.
    pub const fn to_int(self) -> u16 {
        self.0
    }
}

impl From<u16> for Rtype {
    fn from(value: u16) -> Self {
        Rtype(value)
    }
}

impl fmt::Display for Rtype {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match *self {
            Rtype::A => f.write_str("A"),
            Rtype::NS => f.write_str("NS"),
            Rtype::CNAME => f.write_str("CNAME"),
            Rtype::SOA => f.write_str("SOA"),
            Rtype::PTR => f.write_str("PTR"),
            Rtype::MX => f.write_str("MX"),
            Rtype::TXT => f.write_str("TXT"),
            Rtype::AAAA => f.write_str("AAAA"),
            Rtype::SRV => f.write_str("SRV"),
            Rtype::ANY => f.write_str("ANY"),
            Rtype(value) => write!(f, "TYPE{}", value),
        }
    }
}
