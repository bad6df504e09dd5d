//! Domain names.
//!
//! Only a single domain name type exists here: [`Dname`], an owned,
//! absolute domain name in uncompressed wire format. It is produced by
//! parsing a possibly compressed name out of a message and compares
//! ASCII-case-insensitively as required by [RFC 4343].
//!
//! [RFC 4343]: https://tools.ietf.org/html/rfc4343

use super::wire::{FormError, Parser};
use core::str::FromStr;
use core::{fmt, hash};

/// The maximum length of a domain name in wire format.
pub const MAX_NAME_LEN: usize = 255;

/// The maximum length of a single label.
pub const MAX_LABEL_LEN: usize = 63;

//------------ Dname ---------------------------------------------------------

/// An uncompressed, absolute domain name.
///
/// The name is kept as a sequence of length-prefixed labels ending in the
/// empty root label.
#[derive(Clone, Debug)]
pub struct Dname {
    octets: Vec<u8>,
}

impl Dname {
    /// Returns the root name.
    pub fn root() -> Self {
        Dname { octets: vec![0] }
    }

    /// Parses a name from the current position of `parser`.
    ///
    /// Compression pointers are followed as long as they stay within the
    /// message. A pointer loop, a label running past the end of the
    /// message, a name longer than 255 octets, or a label type other than
    /// a normal label or a pointer are format errors.
    ///
    /// On success, the parser is positioned right after the name as it
    /// appears at its original position, i.e., after the first pointer if
    /// there was one.
    pub fn parse(parser: &mut Parser<'_>) -> Result<Self, FormError> {
        let msg = parser.octets();
        let mut pos = parser.pos();
        let mut end = None;
        let mut checked = 0;
        let mut octets = Vec::new();

        loop {
            let len = *msg.get(pos).ok_or(FormError::new("short name"))?;
            match len & 0xC0 {
                0x00 => {
                    let len = usize::from(len);
                    let label = msg
                        .get(pos + 1..pos + 1 + len)
                        .ok_or(FormError::new("short label"))?;
                    if octets.len() + 1 + len > MAX_NAME_LEN {
                        return Err(FormError::new("long name"));
                    }
                    octets.push(len as u8);
                    octets.extend_from_slice(label);
                    pos += 1 + len;
                    if len == 0 {
                        break;
                    }
                }
                0xC0 => {
                    let low =
                        *msg.get(pos + 1).ok_or(FormError::new("short name"))?;
                    if end.is_none() {
                        end = Some(pos + 2);
                    }
                    checked += 2;
                    if checked >= msg.len() {
                        return Err(FormError::new("compression loop"));
                    }
                    pos = usize::from(len & 0x3F) << 8 | usize::from(low);
                }
                _ => return Err(FormError::new("unknown label type")),
            }
        }

        let end = end.unwrap_or(pos);
        parser.advance(end - parser.pos())?;
        Ok(Dname { octets })
    }

    /// Returns the wire format of the name.
    pub fn as_slice(&self) -> &[u8] {
        &self.octets
    }

    /// Returns whether this is the root name.
    pub fn is_root(&self) -> bool {
        self.octets.len() == 1
    }

    /// Returns an iterator over the labels of the name.
    ///
    /// The final, empty root label is not included.
    pub fn iter_labels(&self) -> impl Iterator<Item = &[u8]> + '_ {
        let mut pos = 0;
        core::iter::from_fn(move || {
            let len = usize::from(*self.octets.get(pos)?);
            if len == 0 {
                return None;
            }
            let label = &self.octets[pos + 1..pos + 1 + len];
            pos += 1 + len;
            Some(label)
        })
    }

    /// Appends the uncompressed wire format of the name to `target`.
    pub fn compose(&self, target: &mut Vec<u8>) {
        target.extend_from_slice(&self.octets)
    }
}

//--- FromStr

impl FromStr for Dname {
    type Err = FromStrError;

    /// Creates a name from its presentation format.
    ///
    /// The name is always taken as absolute whether or not it has a
    /// trailing dot. Backslash escapes, both `\X` and `\DDD`, are
    /// supported.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s == "." {
            return Ok(Dname::root());
        }
        if s.is_empty() {
            return Err(FromStrError::EmptyLabel);
        }

        let mut octets = Vec::new();
        let mut label = Vec::new();
        let mut chars = s.bytes();
        let mut trailing_dot = false;
        while let Some(ch) = chars.next() {
            trailing_dot = false;
            match ch {
                b'.' => {
                    push_label(&mut octets, &label)?;
                    label.clear();
                    trailing_dot = true;
                }
                b'\\' => {
                    let ch = chars.next().ok_or(FromStrError::BadEscape)?;
                    if ch.is_ascii_digit() {
                        let mut value = u16::from(ch - b'0');
                        for _ in 0..2 {
                            let ch = chars
                                .next()
                                .filter(u8::is_ascii_digit)
                                .ok_or(FromStrError::BadEscape)?;
                            value = value * 10 + u16::from(ch - b'0');
                        }
                        label.push(
                            u8::try_from(value)
                                .map_err(|_| FromStrError::BadEscape)?,
                        );
                    } else {
                        label.push(ch)
                    }
                }
                _ => label.push(ch),
            }
        }
        if !trailing_dot {
            push_label(&mut octets, &label)?;
        }
        octets.push(0);
        if octets.len() > MAX_NAME_LEN {
            return Err(FromStrError::LongName);
        }
        Ok(Dname { octets })
    }
}

fn push_label(octets: &mut Vec<u8>, label: &[u8]) -> Result<(), FromStrError> {
    if label.is_empty() {
        return Err(FromStrError::EmptyLabel);
    }
    if label.len() > MAX_LABEL_LEN {
        return Err(FromStrError::LongLabel);
    }
    octets.push(label.len() as u8);
    octets.extend_from_slice(label);
    Ok(())
}

//--- PartialEq, Eq, and Hash

impl PartialEq for Dname {
    fn eq(&self, other: &Self) -> bool {
        // Length octets are never in the ASCII letter range, so comparing
        // the whole wire format ignoring case only affects label content.
        self.octets.eq_ignore_ascii_case(&other.octets)
    }
}

impl Eq for Dname {}

impl hash::Hash for Dname {
    fn hash<H: hash::Hasher>(&self, state: &mut H) {
        for ch in &self.octets {
            ch.to_ascii_lowercase().hash(state)
        }
    }
}

//--- Display

impl fmt::Display for Dname {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        if self.is_root() {
            return f.write_str(".");
        }
        for (idx, label) in self.iter_labels().enumerate() {
            if idx > 0 {
                f.write_str(".")?;
            }
            for &ch in label {
                if ch == b'.' || ch == b'\\' {
                    write!(f, "\\{}", ch as char)?;
                } else if ch.is_ascii_graphic() {
                    write!(f, "{}", ch as char)?;
                } else {
                    write!(f, "\\{:03}", ch)?;
                }
            }
        }
        Ok(())
    }
}

//------------ FromStrError --------------------------------------------------

/// An error happened when converting a string into a domain name.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum FromStrError {
    /// The name contained an empty label.
    EmptyLabel,

    /// A label was longer than 63 octets.
    LongLabel,

    /// The name was longer than 255 octets in wire format.
    LongName,

    /// An illegal escape sequence was encountered.
    BadEscape,
}

impl fmt::Display for FromStrError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(match *self {
            FromStrError::EmptyLabel => "empty label",
            FromStrError::LongLabel => "label too long",
            FromStrError::LongName => "domain name too long",
            FromStrError::BadEscape => "illegal escape sequence",
        })
    }
}

impl std::error::Error for FromStrError {}

//============ Testing =======================================================

#[cfg(test)]
mod test {
    use super::*;

    fn parse_at(msg: &[u8], pos: usize) -> Result<(Dname, usize), FormError> {
        let mut parser = Parser::from_position(msg, pos);
        let name = Dname::parse(&mut parser)?;
        Ok((name, parser.pos()))
    }

    #[test]
    fn from_str() {
        let name = Dname::from_str("www.Example.com").unwrap();
        assert_eq!(name.as_slice(), b"\x03www\x07Example\x03com\x00");
        assert_eq!(Dname::from_str("www.example.com.").unwrap(), name);
        assert_eq!(Dname::from_str(".").unwrap(), Dname::root());
        assert_eq!(
            Dname::from_str("a\\.b.c").unwrap().as_slice(),
            b"\x03a.b\x01c\x00"
        );
        assert_eq!(
            Dname::from_str("\\065.b").unwrap().as_slice(),
            b"\x01A\x01b\x00"
        );
        assert_eq!(Dname::from_str("a..b"), Err(FromStrError::EmptyLabel));
        assert_eq!(Dname::from_str(""), Err(FromStrError::EmptyLabel));
        assert_eq!(Dname::from_str("a\\9"), Err(FromStrError::BadEscape));
        assert_eq!(
            Dname::from_str(&"x".repeat(64)),
            Err(FromStrError::LongLabel)
        );
    }

    #[test]
    fn display() {
        let name = Dname::from_str("a\\.b.example.com").unwrap();
        assert_eq!(format!("{}", name), "a\\.b.example.com");
        assert_eq!(format!("{}", Dname::root()), ".");
    }

    #[test]
    fn case_insensitive() {
        assert_eq!(
            Dname::from_str("WWW.example.COM").unwrap(),
            Dname::from_str("www.EXAMPLE.com").unwrap()
        );
        assert_ne!(
            Dname::from_str("www.example.com").unwrap(),
            Dname::from_str("ww.example.com").unwrap()
        );
    }

    #[test]
    fn parse_uncompressed() {
        let msg = b"\x00\x03foo\x03bar\x00\x01";
        let (name, pos) = parse_at(msg, 1).unwrap();
        assert_eq!(name, Dname::from_str("foo.bar").unwrap());
        assert_eq!(pos, 10);
    }

    #[test]
    fn parse_compressed() {
        // foo.bar at 0, www + pointer to 0 at 9.
        let msg = b"\x03foo\x03bar\x00\x03www\xc0\x00\xff";
        let (name, pos) = parse_at(msg, 9).unwrap();
        assert_eq!(name, Dname::from_str("www.foo.bar").unwrap());
        assert_eq!(pos, 15);
    }

    #[test]
    fn parse_errors() {
        // Pointer pointing at itself.
        assert!(parse_at(b"\xc0\x00", 0).is_err());
        // Two pointers pointing at each other.
        assert!(parse_at(b"\xc0\x02\xc0\x00", 0).is_err());
        // Pointer beyond the end.
        assert!(parse_at(b"\x03foo\xc0\x40", 0).is_err());
        // Label running past the end.
        assert!(parse_at(b"\x05foo", 0).is_err());
        // Missing root label.
        assert!(parse_at(b"\x03foo", 0).is_err());
        // Extended label type.
        assert!(parse_at(b"\x41foo\x00", 0).is_err());
    }
}
