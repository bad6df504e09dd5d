//! The question section of a DNS message.
//!
//! This module defines the type [`Question`] which represents an entry in
//! the question section of a DNS message and the [`QuestionSection`]
//! iterator that walks over all questions of a message.

use super::header::{HeaderCounts, HEADER_LEN};
use super::iana::{Class, Rtype};
use super::name::Dname;
use super::wire::{FormError, Parser};
use core::fmt;

//------------ Question ------------------------------------------------------

/// A question in a DNS message.
///
/// In DNS, a question describes what is requested in a query. It consists
/// of three elements: a domain name, a record type, and a class.
///
/// Two questions are equal if their record types and classes are equal and
/// their names are equal ignoring ASCII case.
#[derive(Clone, Debug, Eq, Hash, PartialEq)]
pub struct Question {
    /// The domain name of the question.
    qname: Dname,

    /// The record type of the question.
    qtype: Rtype,

    /// The class of the quesiton.
    qclass: Class,
}

/// # Creation and Conversion
///
impl Question {
    /// Creates a new question from its three componets.
    pub fn new(qname: Dname, qtype: Rtype, qclass: Class) -> Self {
        Question {
            qname,
            qtype,
            qclass,
        }
    }

    /// Creates a new question from a name and record type, assuming class IN.
    pub fn new_in(qname: Dname, qtype: Rtype) -> Self {
        Self::new(qname, qtype, Class::IN)
    }

    /// Converts the question into the qname.
    pub fn into_qname(self) -> Dname {
        self.qname
    }
}

/// # Field Access
///
impl Question {
    /// Returns a reference to the domain nmae in the question,
    pub fn qname(&self) -> &Dname {
        &self.qname
    }

    /// Returns the record type of the question.
    pub fn qtype(&self) -> Rtype {
        self.qtype
    }

    /// Returns the class of the question.
    pub fn qclass(&self) -> Class {
        self.qclass
    }
}

/// # Parsing and Composing
///
impl Question {
    /// Parses a question from the current position of `parser`.
    pub fn parse(parser: &mut Parser<'_>) -> Result<Self, FormError> {
        let qname = Dname::parse(parser)?;
        let qtype = Rtype::from_int(parser.parse_u16()?);
        let qclass = Class::from_int(parser.parse_u16()?);
        Ok(Question::new(qname, qtype, qclass))
    }

    /// Appends the uncompressed wire format of the question to `target`.
    pub fn compose(&self, target: &mut Vec<u8>) {
        self.qname.compose(target);
        target.extend_from_slice(&self.qtype.to_int().to_be_bytes());
        target.extend_from_slice(&self.qclass.to_int().to_be_bytes());
    }
}

//--- Display

impl fmt::Display for Question {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        if self.qname.is_root() {
            write!(f, ". {} {}", self.qclass, self.qtype)
        } else {
            write!(f, "{}. {} {}", self.qname, self.qclass, self.qtype)
        }
    }
}

//------------ QuestionSection -----------------------------------------------

/// An iterator over the question section of a message.
///
/// The iterator yields as many questions as the QDCOUNT field of the
/// header announces. If a question cannot be parsed, the error is returned
/// and iteration ends.
#[derive(Clone, Debug)]
pub struct QuestionSection<'a> {
    /// The parser positioned at the next question.
    parser: Parser<'a>,

    /// The number of questions left.
    count: u16,
}

impl<'a> QuestionSection<'a> {
    /// Creates an iterator over the question section of `msg`.
    ///
    /// Fails if `msg` is too short for a header.
    pub fn new(msg: &'a [u8]) -> Result<Self, FormError> {
        if msg.len() < HEADER_LEN {
            return Err(FormError::new("short message"));
        }
        Ok(QuestionSection {
            parser: Parser::from_position(msg, HEADER_LEN),
            count: HeaderCounts::for_message_slice(msg).qdcount(),
        })
    }

    /// Returns the number of questions not yet returned.
    pub fn remaining(&self) -> u16 {
        self.count
    }
}

impl<'a> Iterator for QuestionSection<'a> {
    type Item = Result<Question, FormError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.count == 0 {
            return None;
        }
        match Question::parse(&mut self.parser) {
            Ok(question) => {
                self.count -= 1;
                Some(Ok(question))
            }
            Err(err) => {
                self.count = 0;
                Some(Err(err))
            }
        }
    }
}

//============ Testing =======================================================
