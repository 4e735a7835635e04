use std::net::IpAddr;

use super::DiscoveryError;

/// Outcome of reading one address bound to an interface.
pub type AddressProbe = Result<IpAddr, DiscoveryError>;

/// One interface as reported by the platform. `addresses` fails as a whole
/// when the interface could not be queried; individual entries fail when a
/// single address could not be read.
#[derive(Debug, Clone)]
pub struct InterfaceReport {
    pub name: String,
    pub addresses: Result<Vec<AddressProbe>, DiscoveryError>,
}

impl InterfaceReport {
    pub fn new(name: impl Into<String>, addresses: Vec<IpAddr>) -> Self {
        Self {
            name: name.into(),
            addresses: Ok(addresses.into_iter().map(Ok).collect()),
        }
    }
}

/// Operating-environment primitives consulted by the resolver. Every call is
/// best effort.
pub trait InterfaceProbe: Send + Sync {
    /// The address the environment reports for the local host.
    fn local_host(&self) -> Result<IpAddr, DiscoveryError>;

    /// All interfaces, in platform order.
    fn interfaces(&self) -> Result<Vec<InterfaceReport>, DiscoveryError>;

    /// The machine's own name, attached to whichever address wins.
    fn host_name(&self) -> Result<String, DiscoveryError>;
}

impl<T: InterfaceProbe + ?Sized> InterfaceProbe for std::sync::Arc<T> {
    fn local_host(&self) -> Result<IpAddr, DiscoveryError> {
        (**self).local_host()
    }

    fn interfaces(&self) -> Result<Vec<InterfaceReport>, DiscoveryError> {
        (**self).interfaces()
    }

    fn host_name(&self) -> Result<String, DiscoveryError> {
        (**self).host_name()
    }
}

/// Probe backed by the host's routing table and interface list.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemProbe;

impl InterfaceProbe for SystemProbe {
    fn local_host(&self) -> Result<IpAddr, DiscoveryError> {
        local_ip_address::local_ip().map_err(|err| DiscoveryError::LocalHost(err.to_string()))
    }

    fn interfaces(&self) -> Result<Vec<InterfaceReport>, DiscoveryError> {
        let pairs = local_ip_address::list_afinet_netifas()
            .map_err(|err| DiscoveryError::InterfaceListing(err.to_string()))?;
        Ok(group_by_interface(pairs))
    }

    fn host_name(&self) -> Result<String, DiscoveryError> {
        let name = hostname::get().map_err(|err| DiscoveryError::HostName(err.to_string()))?;
        name.into_string().map_err(|raw| {
            DiscoveryError::HostName(format!("host name is not valid utf-8: {raw:?}"))
        })
    }
}

// The platform hands back flat (name, ip) pairs; regroup them while keeping
// first-seen interface order and per-interface address order.
fn group_by_interface(pairs: Vec<(String, IpAddr)>) -> Vec<InterfaceReport> {
    let mut reports: Vec<InterfaceReport> = Vec::new();
    for (name, ip) in pairs {
        match reports.iter_mut().find(|report| report.name == name) {
            Some(InterfaceReport {
                addresses: Ok(addresses),
                ..
            }) => addresses.push(Ok(ip)),
            Some(_) => {}
            None => reports.push(InterfaceReport::new(name, vec![ip])),
        }
    }
    reports
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::Ipv4Addr;

    #[test]
    fn grouping_preserves_platform_order() {
        let ip = |last| IpAddr::V4(Ipv4Addr::new(10, 0, 0, last));
        let pairs = vec![
            ("eth0".to_string(), ip(1)),
            ("lo".to_string(), ip(2)),
            ("eth0".to_string(), ip(3)),
        ];

        let reports = group_by_interface(pairs);
        let names: Vec<_> = reports.iter().map(|r| r.name.as_str()).collect();
        assert_eq!(names, ["eth0", "lo"]);

        let eth0: Vec<_> = reports[0]
            .addresses
            .as_ref()
            .unwrap()
            .iter()
            .map(|probe| *probe.as_ref().unwrap())
            .collect();
        assert_eq!(eth0, [ip(1), ip(3)]);
    }
}
