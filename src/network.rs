//! Local address detection and subnet enumeration.

use std::net::{IpAddr, Ipv4Addr};

use ipnetwork::Ipv4Network;

use crate::{Error, Result};

/// Prefix length of the range scanned for peers.
pub const SUBNET_PREFIX: u8 = 24;

/// Every host address on the local /24 except `local`, in ascending order.
///
/// The network and broadcast addresses (`.0` and `.255`) are never candidates.
pub fn enumerate_candidates(local: Ipv4Addr) -> Result<Vec<Ipv4Addr>> {
    let subnet = Ipv4Network::new(local, SUBNET_PREFIX)?;
    let network = subnet.network();
    let broadcast = subnet.broadcast();
    Ok(subnet
        .iter()
        .filter(|ip| *ip != network && *ip != broadcast && *ip != local)
        .collect())
}

/// Detect the IPv4 address this host uses on the local network.
pub fn local_ipv4() -> Result<Ipv4Addr> {
    let ip = local_ip_address::local_ip().map_err(|e| {
        tracing::debug!(error = %e, "local address lookup failed");
        Error::NoLocalAddress
    })?;
    usable_ipv4(ip)
}

/// Accept only a routable IPv4 address.
pub fn usable_ipv4(ip: IpAddr) -> Result<Ipv4Addr> {
    match ip {
        IpAddr::V4(v4) if !v4.is_loopback() && !v4.is_unspecified() => Ok(v4),
        _ => Err(Error::NoLocalAddress),
    }
}
