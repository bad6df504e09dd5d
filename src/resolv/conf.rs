//! Resolver configuration
//!
//! The configuration consists of the list of name servers to send queries
//! to and a set of options that govern how the queries are sent. Both are
//! modeled along the lines of the options of the BSD and glibc resolvers.
//!
//! Loading the configuration, e.g., from `/etc/resolv.conf`, is left to
//! the caller. Values can be created through [`ResolvConf::new`] and then
//! manipulated directly. With the `serde` feature enabled, both types can
//! also be serialized and deserialized.

use std::fmt;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::time::Duration;

/// The default port for DNS.
pub const DNS_PORT: u16 = 53;

/// The largest query we will send over datagram transport by default.
///
/// This is the classic 512 octet limit of [RFC 1035].
///
/// [RFC 1035]: https://tools.ietf.org/html/rfc1035
pub const DEF_MAX_DGRAM_SIZE: usize = 512;

//------------ ResolvOptions ------------------------------------------------

/// Options for the resolver configuration.
#[derive(Clone, Debug, Eq, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct ResolvOptions {
    /// Base timeout to wait for a response.
    ///
    /// The actual timeout for each attempt is derived from this value by
    /// the retransmission policy.
    pub timeout: Duration,

    /// Number of rounds through the server list before giving up.
    pub attempts: usize,

    /// Always use TCP.
    pub use_vc: bool,

    /// Keep the connection open between queries.
    ///
    /// For stream transport, the connection is only kept if the answer
    /// came from the first server. For datagram transport, the socket is
    /// only kept if there is only one server.
    pub stay_open: bool,

    /// Ignore truncation, don’t retry with TCP.
    ///
    /// A truncated answer will be returned as is.
    pub ign_tc: bool,

    /// Don’t check that a datagram answer came from a configured server.
    pub insecure1: bool,

    /// Don’t check that the question section of an answer matches the
    /// query.
    pub insecure2: bool,

    /// Accept answers that reject the query.
    ///
    /// Normally, an answer with a SERVFAIL, NOTIMP, or REFUSED response
    /// code causes the server to be skipped for the rest of the query. With
    /// this option set, such an answer is returned instead. This is useful
    /// for diagnostic tools that want to see what a server says.
    pub keep_rejected: bool,

    /// The size of the largest query to send over datagram transport.
    ///
    /// Larger queries are sent over stream transport right away.
    pub max_dgram_size: usize,

    /// Timeout for connecting, reading, and writing stream transports.
    ///
    /// If this is `None`, `timeout` is used.
    pub stream_timeout: Option<Duration>,

    /// Bind datagram sockets to a randomly chosen local port.
    ///
    /// If this is off, the operating system picks the port.
    pub random_port: bool,
}

impl ResolvOptions {
    /// Returns the timeout for stream transports.
    pub fn stream_timeout(&self) -> Duration {
        self.stream_timeout.unwrap_or(self.timeout)
    }
}

impl Default for ResolvOptions {
    fn default() -> Self {
        ResolvOptions {
            timeout: Duration::new(5, 0),
            attempts: 2,

            // enabled by default:
            random_port: true,

            // everthing else is not:
            use_vc: false,
            stay_open: false,
            ign_tc: false,
            insecure1: false,
            insecure2: false,
            keep_rejected: false,

            max_dgram_size: DEF_MAX_DGRAM_SIZE,
            stream_timeout: None,
        }
    }
}

//------------ ResolvConf ---------------------------------------------------

/// Resolver configuration.
///
/// This type collects all information necessary to configure how a stub
/// resolver talks to its upstream resolvers.
///
/// The type follows the builder pattern. After creating a value with
/// `ResolvConf::new()` you can manipulate the members. Once you are happy
/// with them, you call `finalize()` to make sure the configuration is
/// valid.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct ResolvConf {
    /// Addresses of servers to query.
    ///
    /// The order is significant: servers are tried in this order in each
    /// round.
    pub servers: Vec<SocketAddr>,

    /// Default options.
    pub options: ResolvOptions,
}

/// # Management
///
impl ResolvConf {
    /// Creates a new, empty configuration.
    ///
    /// Using an empty configuration will fail since it does not contain
    /// any name servers. Call `self.finalize()` to make it usable.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a configuration for the given servers with default options.
    pub fn with_servers(
        servers: impl IntoIterator<Item = SocketAddr>,
    ) -> Self {
        ResolvConf {
            servers: servers.into_iter().collect(),
            options: ResolvOptions::default(),
        }
    }

    /// Finalizes the configuration for actual use.
    ///
    /// If `servers` is empty, it adds `127.0.0.1:53`. This is exactly what
    /// glibc does. Zero attempts are bumped to one and a zero timeout to
    /// one millisecond.
    pub fn finalize(&mut self) {
        if self.servers.is_empty() {
            self.servers.push(SocketAddr::new(
                IpAddr::V4(Ipv4Addr::LOCALHOST),
                DNS_PORT,
            ));
        }
        if self.options.attempts == 0 {
            self.options.attempts = 1
        }
        if self.options.timeout.is_zero() {
            self.options.timeout = Duration::from_millis(1)
        }
    }
}

//--- Display

impl fmt::Display for ResolvConf {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        for server in &self.servers {
            f.write_str("nameserver ")?;
            if server.port() == DNS_PORT {
                writeln!(f, "{}", server.ip())?;
            } else {
                writeln!(f, "{}", server)?;
            }
        }

        // Collect options so we only print them if there are any non-default
        // ones.
        let default = ResolvOptions::default();
        let mut options = Vec::new();

        if self.options.timeout != default.timeout {
            // XXX This ignores fractional seconds.
            options
                .push(format!("timeout:{}", self.options.timeout.as_secs()));
        }
        if self.options.attempts != default.attempts {
            options.push(format!("attempts:{}", self.options.attempts));
        }
        if self.options.use_vc {
            options.push("use-vc".into())
        }
        if self.options.stay_open {
            options.push("stay-open".into())
        }
        if self.options.ign_tc {
            options.push("ign-tc".into())
        }
        if self.options.insecure1 {
            options.push("insecure1".into())
        }
        if self.options.insecure2 {
            options.push("insecure2".into())
        }
        if self.options.keep_rejected {
            options.push("keep-rejected".into())
        }

        if !options.is_empty() {
            f.write_str("options")?;
            for option in options {
                write!(f, " {}", option)?;
            }
            f.write_str("\n")?;
        }

        Ok(())
    }
}

//============ Testing ======================================================

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn defaults() {
        let options = ResolvOptions::default();
        assert_eq!(options.timeout, Duration::from_secs(5));
        assert_eq!(options.attempts, 2);
        assert_eq!(options.max_dgram_size, 512);
        assert_eq!(options.stream_timeout(), Duration::from_secs(5));
        assert!(options.random_port);
        assert!(!options.use_vc && !options.stay_open && !options.ign_tc);
    }

    #[test]
    fn finalize() {
        let mut conf = ResolvConf::new();
        conf.options.attempts = 0;
        conf.finalize();
        assert_eq!(conf.servers, vec!["127.0.0.1:53".parse().unwrap()]);
        assert_eq!(conf.options.attempts, 1);

        let mut conf =
            ResolvConf::with_servers(vec!["192.0.2.1:53".parse().unwrap()]);
        conf.finalize();
        assert_eq!(conf.servers.len(), 1);
    }

    #[test]
    fn display() {
        let mut conf = ResolvConf::with_servers(vec![
            "192.0.2.1:53".parse().unwrap(),
            "[2001:db8::1]:5353".parse().unwrap(),
        ]);
        conf.options.use_vc = true;
        conf.options.attempts = 3;
        assert_eq!(
            format!("{}", conf),
            "nameserver 192.0.2.1\n\
             nameserver [2001:db8::1]:5353\n\
             options attempts:3 use-vc\n"
        );
    }

    #[test]
    #[cfg(feature = "serde")]
    fn serde_round_trip() {
        let mut conf =
            ResolvConf::with_servers(vec!["192.0.2.1:53".parse().unwrap()]);
        conf.options.stay_open = true;
        let json = serde_json::to_string(&conf).unwrap();
        let back: ResolvConf = serde_json::from_str(&json).unwrap();
        assert_eq!(conf, back);

        let partial: ResolvConf =
            serde_json::from_str(r#"{"options": {"use_vc": true}}"#).unwrap();
        assert!(partial.servers.is_empty());
        assert!(partial.options.use_vc);
        assert_eq!(partial.options.attempts, 2);
    }
}
