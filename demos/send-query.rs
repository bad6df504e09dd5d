//! Sends a query for a name and prints what comes back.
//!
//! Usage: `send-query <name> [<type>] [<server>...]`
//!
//! The type is given as a number and defaults to 1, i.e., A. Servers are
//! given as `addr:port`. Without servers, `127.0.0.1:53` is used. Set the
//! `RUST_LOG` environment variable to see what is going on, e.g.,
//! `RUST_LOG=domain_stub=trace`.

use domain_stub::base::iana::Rtype;
use domain_stub::base::{
    Dname, Header, HeaderCounts, HeaderSection, Question, QuestionSection,
};
use domain_stub::resolv::{ResolvConf, StubSender};
use std::env;
use std::net::SocketAddr;
use std::process::exit;
use std::str::FromStr;

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_thread_ids(true)
        .without_time()
        .try_init()
        .ok();

    let mut args = env::args().skip(1);
    let Some(name) = args.next() else {
        eprintln!("Usage: send-query <name> [<type>] [<server>...]");
        exit(1);
    };
    let qname = match Dname::from_str(&name) {
        Ok(qname) => qname,
        Err(err) => {
            eprintln!("Invalid name '{}': {}", name, err);
            exit(1);
        }
    };
    let qtype = match args.next().map(|arg| u16::from_str(&arg)) {
        None => Rtype::A,
        Some(Ok(value)) => Rtype::from_int(value),
        Some(Err(err)) => {
            eprintln!("Invalid type: {}", err);
            exit(1);
        }
    };
    let mut servers = Vec::new();
    for arg in args {
        match SocketAddr::from_str(&arg) {
            Ok(addr) => servers.push(addr),
            Err(err) => {
                eprintln!("Invalid server '{}': {}", arg, err);
                exit(1);
            }
        }
    }

    let mut conf = ResolvConf::with_servers(servers);
    conf.finalize();
    print!("{}", conf);

    let mut header = HeaderSection::new();
    header.header_mut().set_random_id();
    header.header_mut().set_rd(true);
    header.counts_mut().set_qdcount(1);
    let mut query = Vec::new();
    header.compose(&mut query);
    Question::new_in(qname, qtype).compose(&mut query);

    let mut sender = StubSender::new(conf);
    let mut answer = vec![0u8; 65535];
    let len = match sender.send(&query, &mut answer) {
        Ok(len) => len,
        Err(err) => {
            eprintln!("Query failed: {}", err);
            exit(1);
        }
    };
    let answer = &answer[..len];

    let header = Header::for_message_slice(answer);
    let counts = HeaderCounts::for_message_slice(answer);
    println!(
        ";; id {} {} {}{}, {} octets",
        header.id(),
        header.opcode(),
        header.rcode(),
        if header.tc() { " (truncated)" } else { "" },
        len
    );
    println!(
        ";; QUERY: {}, ANSWER: {}, AUTHORITY: {}, ADDITIONAL: {}",
        counts.qdcount(),
        counts.ancount(),
        counts.nscount(),
        counts.arcount()
    );
    if let Ok(questions) = QuestionSection::new(answer) {
        for question in questions.flatten() {
            println!(";{}", question);
        }
    }
}
