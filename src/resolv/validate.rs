//! Checking whether a message is an acceptable answer.
//!
//! These are the checks applied to a datagram before it is taken as the
//! answer to a query: the question section of the answer has to reproduce
//! that of the query and the answer has to come from one of the configured
//! servers. Anything failing the checks is quietly dropped since it may be
//! a late answer to an earlier query or an attempt at spoofing.

use crate::base::iana::{Class, Opcode, Rtype};
use crate::base::{Dname, FormError, Header, QuestionSection};
use crate::base::{HeaderCounts, HEADER_LEN};
use std::net::SocketAddr;

/// Returns whether a question for `name`, `qtype`, and `qclass` is in `msg`.
///
/// Names are compared ignoring ASCII case. A format error is returned if
/// the question section of `msg` cannot be parsed up to the matching
/// question.
pub fn name_in_query(
    name: &Dname,
    qtype: Rtype,
    qclass: Class,
    msg: &[u8],
) -> Result<bool, FormError> {
    for question in QuestionSection::new(msg)? {
        let question = question?;
        if question.qtype() == qtype
            && question.qclass() == qclass
            && question.qname() == name
        {
            return Ok(true);
        }
    }
    Ok(false)
}

/// Returns whether the questions of `query` are all present in `answer`.
///
/// Both messages have to have the same number of questions. The order of
/// the questions in `answer` is irrelevant.
///
/// UPDATE messages don’t have a question section but a zone section, so if
/// both messages are UPDATEs, they are considered to match.
///
/// A format error is returned if either message is too short for a header
/// or the question sections cannot be parsed.
pub fn queries_match(query: &[u8], answer: &[u8]) -> Result<bool, FormError> {
    if query.len() < HEADER_LEN || answer.len() < HEADER_LEN {
        return Err(FormError::new("short message"));
    }
    if Header::for_message_slice(query).opcode() == Opcode::Update
        && Header::for_message_slice(answer).opcode() == Opcode::Update
    {
        return Ok(true);
    }
    if HeaderCounts::for_message_slice(query).qdcount()
        != HeaderCounts::for_message_slice(answer).qdcount()
    {
        return Ok(false);
    }
    for question in QuestionSection::new(query)? {
        let question = question?;
        if !name_in_query(
            question.qname(),
            question.qtype(),
            question.qclass(),
            answer,
        )? {
            return Ok(false);
        }
    }
    Ok(true)
}

/// Returns whether `addr` is one of the servers in `servers`.
///
/// The address family and port have to match. A configured server with an
/// unspecified address (i.e., `0.0.0.0` or `::`) matches any address of its
/// family.
pub fn is_our_server(addr: &SocketAddr, servers: &[SocketAddr]) -> bool {
    servers.iter().any(|server| {
        server.is_ipv4() == addr.is_ipv4()
            && server.port() == addr.port()
            && (server.ip().is_unspecified() || server.ip() == addr.ip())
    })
}

//============ Testing ======================================================

#[cfg(test)]
mod test {
    use super::*;
    use crate::base::header::HeaderSection;
    use crate::base::Question;
    use core::str::FromStr;

    fn message(opcode: Opcode, questions: &[(&str, Rtype)]) -> Vec<u8> {
        let mut header = HeaderSection::new();
        header.header_mut().set_id(0x1234);
        header.header_mut().set_opcode(opcode);
        header.counts_mut().set_qdcount(questions.len() as u16);
        let mut msg = Vec::new();
        header.compose(&mut msg);
        for (name, rtype) in questions {
            Question::new_in(Dname::from_str(name).unwrap(), *rtype)
                .compose(&mut msg);
        }
        msg
    }

    #[test]
    fn name_in_query_ignores_case() {
        let msg = message(
            Opcode::Query,
            &[("example.com", Rtype::A), ("Example.NET", Rtype::MX)],
        );
        let name = Dname::from_str("EXAMPLE.net").unwrap();
        assert_eq!(name_in_query(&name, Rtype::MX, Class::IN, &msg), Ok(true));
        assert_eq!(name_in_query(&name, Rtype::A, Class::IN, &msg), Ok(false));
        assert_eq!(name_in_query(&name, Rtype::MX, Class::CH, &msg), Ok(false));
    }

    #[test]
    fn name_in_query_format_error() {
        let mut msg = message(Opcode::Query, &[("example.com", Rtype::A)]);
        // Replace the name by a pointer past the end of the message.
        msg.truncate(HEADER_LEN);
        msg.extend_from_slice(b"\xc0\xff\x00\x01\x00\x01");
        let name = Dname::from_str("example.com").unwrap();
        assert!(name_in_query(&name, Rtype::A, Class::IN, &msg).is_err());
    }

    #[test]
    fn queries_match_is_order_independent() {
        let a = message(
            Opcode::Query,
            &[("a.example", Rtype::A), ("b.example", Rtype::AAAA)],
        );
        let b = message(
            Opcode::Query,
            &[("b.example", Rtype::AAAA), ("a.example", Rtype::A)],
        );
        assert_eq!(queries_match(&a, &b), Ok(true));
        assert_eq!(queries_match(&b, &a), Ok(true));
    }

    #[test]
    fn queries_match_requires_every_question() {
        let a = message(
            Opcode::Query,
            &[("a.example", Rtype::A), ("b.example", Rtype::AAAA)],
        );
        let dropped = message(
            Opcode::Query,
            &[("a.example", Rtype::A), ("c.example", Rtype::AAAA)],
        );
        let fewer = message(Opcode::Query, &[("a.example", Rtype::A)]);
        assert_eq!(queries_match(&a, &dropped), Ok(false));
        assert_eq!(queries_match(&a, &fewer), Ok(false));
    }

    #[test]
    fn queries_match_tolerates_repeated_questions() {
        let a = message(
            Opcode::Query,
            &[("a.example", Rtype::A), ("a.example", Rtype::A)],
        );
        let b = message(
            Opcode::Query,
            &[("a.example", Rtype::A), ("z.example", Rtype::TXT)],
        );
        assert_eq!(queries_match(&a, &b), Ok(true));
    }

    #[test]
    fn queries_match_update() {
        let a = message(Opcode::Update, &[("a.example", Rtype::SOA)]);
        let b = message(Opcode::Update, &[]);
        assert_eq!(queries_match(&a, &b), Ok(true));
        let c = message(Opcode::Query, &[]);
        assert_eq!(queries_match(&a, &c), Ok(false));
    }

    #[test]
    fn queries_match_short() {
        let a = message(Opcode::Query, &[("a.example", Rtype::A)]);
        assert!(queries_match(&a, &a[..8]).is_err());
    }

    #[test]
    fn our_server() {
        let servers: Vec<SocketAddr> = vec![
            "192.0.2.1:53".parse().unwrap(),
            "[2001:db8::1]:53".parse().unwrap(),
        ];
        assert!(is_our_server(&"192.0.2.1:53".parse().unwrap(), &servers));
        assert!(is_our_server(
            &"[2001:db8::1]:53".parse().unwrap(),
            &servers
        ));
        assert!(!is_our_server(&"192.0.2.2:53".parse().unwrap(), &servers));
        assert!(!is_our_server(&"192.0.2.1:54".parse().unwrap(), &servers));
        assert!(!is_our_server(
            &"[2001:db8::2]:53".parse().unwrap(),
            &servers
        ));
    }

    #[test]
    fn our_server_wildcard() {
        let servers: Vec<SocketAddr> = vec!["0.0.0.0:53".parse().unwrap()];
        assert!(is_our_server(&"192.0.2.7:53".parse().unwrap(), &servers));
        assert!(is_our_server(&"127.0.0.1:53".parse().unwrap(), &servers));
        assert!(!is_our_server(&"[::1]:53".parse().unwrap(), &servers));

        let servers: Vec<SocketAddr> = vec!["[::]:53".parse().unwrap()];
        assert!(is_our_server(&"[2001:db8::9]:53".parse().unwrap(), &servers));
        assert!(!is_our_server(&"192.0.2.7:53".parse().unwrap(), &servers));
    }
}
