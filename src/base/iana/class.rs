//! DNS CLASSes.

use core::fmt;

//------------ Class ---------------------------------------------------------

/// DNS CLASSes.
///
/// The domain name space is partitioned into separate classes for different
/// network types. In practice, only the IN class is really relevant.
#[derive(Clone, Copy, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub struct Class(u16);

impl Class {
    /// Internet (IN).
    pub const IN: Class = Class(1);

    /// Chaosnet (CH).
    pub const CH: Class = Class(3);

    /// Hesiod (HS).
    pub const HS: Class = Class(4);

    /// Query class ANY (*).
    pub const ANY: Class = Class(255);

    /// Creates a class from its integer value.
    pub const fn from_int(value: u16) -> Self {
        Class(value)
    }

    /// Returns the integer value of the class.
    pub const fn to_int(self) -> u16 {
        self.0
    }
}

impl From<u16> for Class {
    fn from(value: u16) -> Self {
        Class(value)
    }
}

impl fmt::Display for Class {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match *self {
            Class::IN => f.write_str("IN"),
            Class::CH => f.write_str("CH"),
            Class::HS => f.write_str("HS"),
            Class::ANY => f.write_str("ANY"),
            Class(value) => write!(f, "CLASS{}", value),
        }
    }
}
