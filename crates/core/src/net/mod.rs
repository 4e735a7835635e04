//! Local addressing: address-family grammars, socket-address text helpers and
//! the cached local address resolver.

mod probe;
mod resolver;

use std::{fmt, net::IpAddr, num::ParseIntError};

use once_cell::sync::Lazy;
use regex::Regex;
use thiserror::Error;

pub use probe::{AddressProbe, InterfaceProbe, InterfaceReport, SystemProbe};
pub use resolver::{is_usable_candidate, AddressResolver, DiscoveryError, LOCALHOST_NAME};

/// Loopback literal substituted when no usable local address exists.
pub const LOCALHOST: &str = "127.0.0.1";

/// The "all interfaces" literal.
pub const ANY_HOST: &str = "0.0.0.0";

static IPV4_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^((25[0-5]|2[0-4]\d|[01]?\d\d?)\.){3}(25[0-5]|2[0-4]\d|[01]?\d\d?)$")
        .expect("valid ipv4 pattern")
});

// Fully expanded form only; `::` abbreviations do not match.
static IPV6_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^([\da-fA-F]{1,4}:){7}[\da-fA-F]{1,4}$").expect("valid ipv6 pattern"));

/// Errors raised synchronously when address text or an endpoint is malformed.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AddressError {
    #[error("invalid port in address `{input}`: {source}")]
    InvalidPort {
        input: String,
        #[source]
        source: ParseIntError,
    },
    #[error("incomplete endpoint `{address}`: a host and a non-zero port are required")]
    IncompleteEndpoint { address: String },
    #[error("address `{input}` is not an IPv4 literal")]
    UnsupportedFamily { input: String },
}

/// Dotted-quad IPv4 literal, each octet 0-255. No surrounding whitespace.
pub fn is_ipv4(text: &str) -> bool {
    matches_pattern(text, &IPV4_PATTERN)
}

/// Eight colon-separated hex groups of one to four digits.
pub fn is_ipv6(text: &str) -> bool {
    matches_pattern(text, &IPV6_PATTERN)
}

fn matches_pattern(text: &str, pattern: &Regex) -> bool {
    if text.trim().is_empty() {
        return false;
    }
    pattern.is_match(text)
}

/// Returns `true` when `text` is an IPv4 or IPv6 literal that survives the
/// exclusion policy: `include_local == false` rejects [`LOCALHOST`] and
/// `include_any == false` rejects [`ANY_HOST`].
pub fn is_valid_ip(text: &str, include_local: bool, include_any: bool) -> bool {
    if text.trim().is_empty() {
        return false;
    }
    if !(is_ipv4(text) || is_ipv6(text)) {
        return false;
    }
    if !include_local && text == LOCALHOST {
        return false;
    }
    if !include_any && text == ANY_HOST {
        return false;
    }
    true
}

/// Syntactic check only: loopback and any-host are both accepted.
pub fn is_valid_ip_default(text: &str) -> bool {
    is_valid_ip(text, true, true)
}

/// Renders an IP the way the grammars expect it: dotted quad for IPv4 and the
/// uncompressed eight-group form for IPv6 (`2001:db8:0:0:0:0:0:1`).
pub fn host_address(ip: &IpAddr) -> String {
    match ip {
        IpAddr::V4(v4) => v4.to_string(),
        IpAddr::V6(v6) => v6
            .segments()
            .iter()
            .map(|segment| format!("{segment:x}"))
            .collect::<Vec<_>>()
            .join(":"),
    }
}

/// Splits `host:port` on the last colon. Without a colon the whole input is
/// the host and the port is 0.
pub fn parse_socket_address(text: &str) -> Result<(String, u16), AddressError> {
    match text.rsplit_once(':') {
        Some((host, port)) => {
            let port = port.parse().map_err(|source| AddressError::InvalidPort {
                input: text.to_string(),
                source,
            })?;
            Ok((host.to_string(), port))
        }
        None => Ok((text.to_string(), 0)),
    }
}

/// Canonical `ip:port` text for logs and request metadata.
pub fn format_socket_address(address: &NetworkAddress) -> String {
    format!("{}:{}", address.host_text(), address.port())
}

/// Packs `a.b.c.d:port` into a sortable key: `a` at bit 40, `b` at 32, `c` at
/// 24, `d` at 16 and the port in the low 16 bits. IPv4 literals only.
pub fn to_ordered_integer(text: &str) -> Result<u64, AddressError> {
    let (host, port) = parse_socket_address(text)?;
    let ip = host
        .parse::<std::net::Ipv4Addr>()
        .map_err(|_| AddressError::UnsupportedFamily {
            input: text.to_string(),
        })?;
    Ok(pack_ipv4(ip, port))
}

fn pack_ipv4(ip: std::net::Ipv4Addr, port: u16) -> u64 {
    let [a, b, c, d] = ip.octets();
    (u64::from(a) << 40)
        | (u64::from(b) << 32)
        | (u64::from(c) << 24)
        | (u64::from(d) << 16)
        | u64::from(port)
}

/// Precondition guard for callers that need a fully specified endpoint: a
/// host (name or IP) and a non-zero port.
pub fn assert_valid_socket_address(address: &NetworkAddress) -> Result<(), AddressError> {
    if !address.has_host() || address.port() == 0 {
        return Err(AddressError::IncompleteEndpoint {
            address: address.to_string(),
        });
    }
    Ok(())
}

/// A resolved `(host-or-ip, port)` pair. Port 0 means unspecified.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct NetworkAddress {
    ip: Option<IpAddr>,
    hostname: Option<String>,
    port: u16,
}

impl NetworkAddress {
    pub fn from_ip(ip: IpAddr) -> Self {
        Self {
            ip: Some(ip),
            hostname: None,
            port: 0,
        }
    }

    /// Assembles an address from already known parts. Nothing is resolved.
    pub fn new(ip: Option<IpAddr>, hostname: Option<String>, port: u16) -> Self {
        Self { ip, hostname, port }
    }

    /// Builds an address from `host[:port]` text. The host is kept as the
    /// hostname; it also becomes the IP when it is an IP literal. No name
    /// resolution happens here.
    pub fn parse(text: &str) -> Result<Self, AddressError> {
        let (host, port) = parse_socket_address(text)?;
        let ip = host.parse::<IpAddr>().ok();
        let hostname = if host.is_empty() { None } else { Some(host) };
        Ok(Self { ip, hostname, port })
    }

    pub fn with_port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    pub fn with_hostname(mut self, hostname: impl Into<String>) -> Self {
        self.hostname = Some(hostname.into());
        self
    }

    pub fn ip(&self) -> Option<IpAddr> {
        self.ip
    }

    /// The rendered IP literal, see [`host_address`].
    pub fn ip_text(&self) -> Option<String> {
        self.ip.as_ref().map(host_address)
    }

    pub fn hostname(&self) -> Option<&str> {
        self.hostname.as_deref()
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    /// Whether either half of the host side is known.
    pub fn has_host(&self) -> bool {
        self.ip.is_some() || self.hostname.is_some()
    }

    pub fn ordered_key(&self) -> Option<u64> {
        match self.ip? {
            IpAddr::V4(v4) => Some(pack_ipv4(v4, self.port)),
            IpAddr::V6(_) => None,
        }
    }

    // IP literal first, hostname as a last resort.
    fn host_text(&self) -> String {
        self.ip_text()
            .or_else(|| self.hostname.clone())
            .unwrap_or_default()
    }
}

impl fmt::Display for NetworkAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (&self.hostname, self.ip_text()) {
            (Some(name), Some(ip)) if *name != ip => write!(f, "{name}/{ip}:{}", self.port),
            _ => write!(f, "{}:{}", self.host_text(), self.port),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::{Ipv4Addr, Ipv6Addr};

    #[test]
    fn ipv4_grammar_accepts_every_octet_in_range() {
        for octet in 0..=255u16 {
            let text = format!("{octet}.{octet}.0.{octet}");
            assert!(is_ipv4(&text), "{text}");
        }
        assert!(is_ipv4("192.168.1.5"));
        assert!(is_ipv4("010.001.0.1"));
    }

    #[test]
    fn ipv4_grammar_rejects_out_of_range_and_wrong_arity() {
        for text in [
            "256.0.0.1",
            "1.2.3.300",
            "1.2.3",
            "1.2.3.4.5",
            "1..3.4",
            "a.b.c.d",
            " 1.2.3.4",
            "1.2.3.4:80",
        ] {
            assert!(!is_ipv4(text), "{text}");
        }
    }

    #[test]
    fn ipv6_grammar_only_matches_expanded_form() {
        assert!(is_ipv6("2001:db8:0:0:0:0:0:1"));
        assert!(is_ipv6("FE80:0000:0000:0000:0202:B3FF:FE1E:8329"));
        for text in [
            "2001:db8::1",
            "::1",
            "1:2:3:4:5:6:7",
            "1:2:3:4:5:6:7:8:9",
            "12345:0:0:0:0:0:0:1",
            "g:0:0:0:0:0:0:1",
        ] {
            assert!(!is_ipv6(text), "{text}");
        }
    }

    #[test]
    fn blank_input_is_never_an_address() {
        for text in ["", "   "] {
            assert!(!is_ipv4(text));
            assert!(!is_ipv6(text));
            for (local, any) in [(true, true), (true, false), (false, true), (false, false)] {
                assert!(!is_valid_ip(text, local, any));
            }
        }
    }

    #[test]
    fn exclusion_flags_apply_independently() {
        assert!(!is_valid_ip("127.0.0.1", false, true));
        assert!(is_valid_ip("127.0.0.1", true, true));
        assert!(!is_valid_ip("0.0.0.0", true, false));
        assert!(is_valid_ip("0.0.0.0", false, true));
        assert!(!is_valid_ip("0.0.0.0", false, false));
        assert!(is_valid_ip("10.1.2.3", false, false));
        assert!(is_valid_ip_default("127.0.0.1"));
        assert!(!is_valid_ip_default("localhost"));
    }

    #[test]
    fn ipv6_is_rendered_uncompressed() {
        let ip = IpAddr::V6(Ipv6Addr::new(0x2001, 0xdb8, 0, 0, 0, 0, 0, 1));
        let text = host_address(&ip);
        assert_eq!(text, "2001:db8:0:0:0:0:0:1");
        assert!(is_ipv6(&text));
    }

    #[test]
    fn parses_host_and_port() {
        assert_eq!(
            parse_socket_address("10.0.0.1:8080").unwrap(),
            ("10.0.0.1".to_string(), 8080)
        );
        assert_eq!(
            parse_socket_address("10.0.0.1").unwrap(),
            ("10.0.0.1".to_string(), 0)
        );
    }

    #[test]
    fn non_numeric_port_is_rejected() {
        let err = parse_socket_address("10.0.0.1:http").unwrap_err();
        assert!(matches!(err, AddressError::InvalidPort { .. }));
        assert!(parse_socket_address("10.0.0.1:70000").is_err());
    }

    #[test]
    fn format_then_parse_round_trips() {
        let samples = [
            NetworkAddress::from_ip(IpAddr::V4(Ipv4Addr::new(192, 168, 1, 5))).with_port(80),
            NetworkAddress::from_ip(IpAddr::V4(Ipv4Addr::new(10, 0, 0, 1)))
                .with_hostname("gateway.internal")
                .with_port(65535),
            NetworkAddress::from_ip(IpAddr::V6(Ipv6Addr::new(0x2001, 0xdb8, 0, 0, 0, 0, 0, 1)))
                .with_port(443),
        ];
        for address in samples {
            let (host, port) = parse_socket_address(&format_socket_address(&address)).unwrap();
            assert_eq!(Some(host), address.ip_text());
            assert_eq!(port, address.port());
        }
    }

    #[test]
    fn ordered_integer_packs_octets_and_port() {
        let value = to_ordered_integer("192.168.1.5:80").unwrap();
        assert_eq!((value >> 40) & 0xff, 192);
        assert_eq!((value >> 32) & 0xff, 168);
        assert_eq!((value >> 24) & 0xff, 1);
        assert_eq!((value >> 16) & 0xff, 5);
        assert_eq!(value & 0xffff, 80);
    }

    #[test]
    fn ordered_integer_compares_ip_before_port() {
        let low_ip_high_port = to_ordered_integer("10.0.0.1:65535").unwrap();
        let high_ip_low_port = to_ordered_integer("10.0.0.2:1").unwrap();
        assert!(low_ip_high_port < high_ip_low_port);

        let parsed = NetworkAddress::parse("10.0.0.2:1").unwrap();
        assert_eq!(parsed.ordered_key(), Some(high_ip_low_port));
    }

    #[test]
    fn ordered_integer_is_ipv4_only() {
        let err = to_ordered_integer("example.com:80").unwrap_err();
        assert!(matches!(err, AddressError::UnsupportedFamily { .. }));
        let v6 = NetworkAddress::from_ip(IpAddr::V6(Ipv6Addr::LOCALHOST)).with_port(1);
        assert_eq!(v6.ordered_key(), None);
    }

    #[test]
    fn endpoint_guard_requires_host_and_port() {
        let complete = NetworkAddress::parse("10.0.0.1:8080").unwrap();
        assert!(assert_valid_socket_address(&complete).is_ok());

        let no_port = NetworkAddress::parse("10.0.0.1").unwrap();
        assert!(matches!(
            assert_valid_socket_address(&no_port),
            Err(AddressError::IncompleteEndpoint { .. })
        ));

        let ip_only = NetworkAddress::from_ip(IpAddr::V4(Ipv4Addr::new(10, 0, 0, 1))).with_port(80);
        assert!(assert_valid_socket_address(&ip_only).is_ok());

        let name_only = NetworkAddress::new(None, Some("ecs.aliyuncs.com".into()), 443);
        assert!(assert_valid_socket_address(&name_only).is_ok());

        let no_host = NetworkAddress::new(None, None, 80);
        assert!(matches!(
            assert_valid_socket_address(&no_host),
            Err(AddressError::IncompleteEndpoint { .. })
        ));
    }

    #[test]
    fn parse_keeps_hostnames_without_resolving() {
        let address = NetworkAddress::parse("ecs.aliyuncs.com:443").unwrap();
        assert_eq!(address.ip(), None);
        assert_eq!(address.hostname(), Some("ecs.aliyuncs.com"));
        assert_eq!(format_socket_address(&address), "ecs.aliyuncs.com:443");
    }
}
