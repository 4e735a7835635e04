use std::net::IpAddr;

use metrics::counter;
use once_cell::sync::OnceCell;
use thiserror::Error;
use tracing::{debug, error, warn};

use super::{host_address, is_valid_ip, InterfaceProbe, NetworkAddress, SystemProbe, LOCALHOST};

/// Host name reported when no local address could be resolved.
pub const LOCALHOST_NAME: &str = "localhost";

/// A single failed probe during local address discovery. These are logged
/// and skipped, never returned to callers of the resolver.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DiscoveryError {
    #[error("failed to query local host address: {0}")]
    LocalHost(String),
    #[error("failed to list network interfaces: {0}")]
    InterfaceListing(String),
    #[error("failed to list addresses of interface `{interface}`: {reason}")]
    AddressListing { interface: String, reason: String },
    #[error("failed to read an address of interface `{interface}`: {reason}")]
    Address { interface: String, reason: String },
    #[error("failed to read the local host name: {0}")]
    HostName(String),
}

impl DiscoveryError {
    pub fn stage(&self) -> &'static str {
        match self {
            Self::LocalHost(_) => "local_host",
            Self::InterfaceListing(_) => "interface_listing",
            Self::AddressListing { .. } => "address_listing",
            Self::Address { .. } => "address",
            Self::HostName(_) => "host_name",
        }
    }
}

/// Finds one usable local address and remembers the answer, including a
/// negative one, for the lifetime of the resolver.
pub struct AddressResolver<P = SystemProbe> {
    probe: P,
    cached: OnceCell<Option<NetworkAddress>>,
}

impl AddressResolver<SystemProbe> {
    pub fn system() -> Self {
        Self::new(SystemProbe)
    }
}

impl Default for AddressResolver<SystemProbe> {
    fn default() -> Self {
        Self::system()
    }
}

impl<P: InterfaceProbe> AddressResolver<P> {
    pub fn new(probe: P) -> Self {
        Self {
            probe,
            cached: OnceCell::new(),
        }
    }

    /// Resolves on first use, then serves the cached value. There is no
    /// invalidation; interface changes are picked up by a new resolver.
    pub fn resolve_local_address(&self) -> Option<NetworkAddress> {
        self.cached.get_or_init(|| self.discover()).clone()
    }

    /// The resolved IP literal, or [`LOCALHOST`] when nothing usable exists.
    pub fn local_ip(&self) -> String {
        self.resolve_local_address()
            .and_then(|address| address.ip_text())
            .unwrap_or_else(|| LOCALHOST.to_string())
    }

    /// The resolved address's host name. Falls back to its IP literal when
    /// the name is unknown, and to [`LOCALHOST_NAME`] when nothing resolved.
    pub fn local_host_name(&self) -> String {
        match self.resolve_local_address() {
            Some(address) => address
                .hostname()
                .map(str::to_string)
                .or_else(|| address.ip_text())
                .unwrap_or_else(|| LOCALHOST_NAME.to_string()),
            None => LOCALHOST_NAME.to_string(),
        }
    }

    fn discover(&self) -> Option<NetworkAddress> {
        match self.probe.local_host() {
            Ok(ip) if is_usable_candidate(&ip) => {
                debug!(ip = %ip, "using reported local host address");
                return Some(self.found(ip, "local_host"));
            }
            Ok(ip) => debug!(ip = %ip, "reported local host address is not usable"),
            Err(err) => record_failure(&err),
        }

        match self.probe.interfaces() {
            Ok(interfaces) => {
                for interface in interfaces {
                    let addresses = match interface.addresses {
                        Ok(addresses) => addresses,
                        Err(err) => {
                            record_failure(&err);
                            continue;
                        }
                    };
                    for probe in addresses {
                        match probe {
                            Ok(ip) if is_usable_candidate(&ip) => {
                                debug!(interface = %interface.name, ip = %ip, "using interface address");
                                return Some(self.found(ip, "interface"));
                            }
                            Ok(_) => {}
                            Err(err) => record_failure(&err),
                        }
                    }
                }
            }
            Err(err) => record_failure(&err),
        }

        counter!("address_discovery_total", "result" => "none").increment(1);
        error!("could not determine a local ip address, falling back to {LOCALHOST}");
        None
    }

    fn found(&self, ip: IpAddr, result: &'static str) -> NetworkAddress {
        counter!("address_discovery_total", "result" => result).increment(1);
        let address = NetworkAddress::from_ip(ip);
        match self.probe.host_name() {
            Ok(name) if !name.trim().is_empty() => address.with_hostname(name),
            Ok(_) => address,
            Err(err) => {
                record_failure(&err);
                address
            }
        }
    }
}

/// Non-loopback and syntactically an address. Loopback is excluded here no
/// matter what the general validity flags allow.
pub fn is_usable_candidate(ip: &IpAddr) -> bool {
    if ip.is_loopback() {
        return false;
    }
    is_valid_ip(&host_address(ip), true, true)
}

fn record_failure(err: &DiscoveryError) {
    counter!("address_discovery_failures_total", "stage" => err.stage()).increment(1);
    warn!(error = %err, "failed to retrieve ip address");
}
