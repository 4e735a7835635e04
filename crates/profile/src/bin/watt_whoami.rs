//! Prints the identity this process would use for API calls: local address,
//! region and whether a credential is available. Secrets are never printed.
//!
//! `--metrics` appends the Prometheus counters gathered while resolving.

use std::{env, process};

use watt_core::{init_telemetry, AddressResolver, TelemetryConfig};
use watt_profile::{ProfileConfig, ProfileManager};

fn main() {
    let show_metrics = env::args().skip(1).any(|arg| arg == "--metrics");

    let telemetry_config = match TelemetryConfig::from_env() {
        Ok(config) => config,
        Err(err) => {
            eprintln!("failed to load telemetry configuration: {err}");
            process::exit(1);
        }
    };
    let telemetry = match init_telemetry(&telemetry_config) {
        Ok(guard) => guard,
        Err(err) => {
            eprintln!("failed to initialize telemetry: {err}");
            process::exit(1);
        }
    };

    let config = match ProfileConfig::load_from_env() {
        Ok(config) => config,
        Err(err) => {
            eprintln!("failed to load profile configuration: {err}");
            process::exit(1);
        }
    };

    let resolver = AddressResolver::system();
    let manager = ProfileManager::default();
    let profile = manager.install_from_config(&config);

    println!("Host name: {}", resolver.local_host_name());
    println!("Local IP: {}", resolver.local_ip());
    println!("Region: {}", profile.region_id().unwrap_or("<unset>"));
    match profile.credential() {
        Ok(Some(credential)) => println!("Access key: {}", credential.access_key_id()),
        Ok(None) => println!("Access key: <none, unauthenticated>"),
        Err(err) => {
            eprintln!("failed to resolve credential: {err}");
            process::exit(1);
        }
    }
    println!("VPC endpoint: {}", profile.is_using_vpc_endpoint());

    if show_metrics {
        print!("{}", telemetry.render_metrics());
    }
}
