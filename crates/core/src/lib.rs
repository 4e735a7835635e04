//! Shared building blocks for the watt client crates.
//!
//! `net` answers "which local address does this process speak from", while
//! `config` and `telemetry` hold the environment contract and observability
//! wiring that every binary in the workspace shares.

pub mod config;
pub mod net;
pub mod telemetry;

pub use config::ConfigError;
pub use net::{
    assert_valid_socket_address, format_socket_address, host_address, is_ipv4, is_ipv6,
    is_usable_candidate, is_valid_ip, is_valid_ip_default, parse_socket_address,
    to_ordered_integer, AddressError, AddressResolver, DiscoveryError, InterfaceProbe,
    InterfaceReport, NetworkAddress, SystemProbe, ANY_HOST, LOCALHOST, LOCALHOST_NAME,
};
pub use telemetry::{init_telemetry, TelemetryConfig, TelemetryError, TelemetryGuard};
