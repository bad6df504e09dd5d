//! Consuming data in wire format.
//!
//! The engine never decodes a complete message. It only needs to walk the
//! header and the question section of a message, so all we need here is a
//! small cursor over an octets slice and the error it produces when the
//! data runs out or is malformed.

use core::fmt;

//------------ Parser --------------------------------------------------------

/// A cursor over the octets of a DNS message.
///
/// The parser keeps the complete message around since names in the
/// question section may be compressed and thus refer to earlier parts of
/// the message.
#[derive(Clone, Copy, Debug)]
pub struct Parser<'a> {
    /// The complete message.
    octets: &'a [u8],

    /// The current position in `octets`.
    pos: usize,
}

impl<'a> Parser<'a> {
    /// Creates a parser positioned at `pos` of `octets`.
    pub fn from_position(octets: &'a [u8], pos: usize) -> Self {
        Parser { octets, pos }
    }

    /// Returns the complete message the parser walks over.
    pub fn octets(&self) -> &'a [u8] {
        self.octets
    }

    /// Returns the current position.
    pub fn pos(&self) -> usize {
        self.pos
    }

    /// Returns the number of octets left to parse.
    pub fn remaining(&self) -> usize {
        self.octets.len().saturating_sub(self.pos)
    }

    /// Moves the position forward by `len` octets.
    pub fn advance(&mut self, len: usize) -> Result<(), FormError> {
        if len > self.remaining() {
            return Err(FormError::new("short input"));
        }
        self.pos += len;
        Ok(())
    }

    /// Takes a single octet.
    pub fn parse_u8(&mut self) -> Result<u8, FormError> {
        let res = *self
            .octets
            .get(self.pos)
            .ok_or(FormError::new("short input"))?;
        self.pos += 1;
        Ok(res)
    }

    /// Takes a big endian 16 bit value.
    pub fn parse_u16(&mut self) -> Result<u16, FormError> {
        if self.remaining() < 2 {
            return Err(FormError::new("short input"));
        }
        let res = u16::from_be_bytes([
            self.octets[self.pos],
            self.octets[self.pos + 1],
        ]);
        self.pos += 2;
        Ok(res)
    }
}

//------------ FormError -----------------------------------------------------

/// A message or part of it was not in the expected format.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct FormError(&'static str);

impl FormError {
    /// Creates a new error with the given reason.
    #[must_use]
    pub fn new(msg: &'static str) -> Self {
        FormError(msg)
    }

    /// Returns the reason of the error.
    pub fn reason(self) -> &'static str {
        self.0
    }
}

impl fmt::Display for FormError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "format error: {}", self.0)
    }
}

impl std::error::Error for FormError {}

//============ Testing =======================================================
