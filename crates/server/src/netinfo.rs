//! Local network address discovery
//!
//! Backing for the `server-config` request: clients on the local network
//! need to know which address to point their sockets at. Connecting a UDP
//! socket does not send any packets; it just asks the OS which source
//! address it would route from.

use std::net::{IpAddr, Ipv4Addr, UdpSocket};

/// Best guess at the address LAN clients can reach us on.
///
/// Probes the route toward a private-range target first, so on a machine
/// with both a LAN interface and a public one the RFC1918 address wins.
/// Falls back to the default-route source address, then to localhost when
/// the machine has no route out at all.
pub fn local_ip() -> IpAddr {
    if let Some(ip) = route_source("10.255.255.255:80").filter(is_lan_address) {
        return ip;
    }
    route_source("198.51.100.1:80").unwrap_or(IpAddr::V4(Ipv4Addr::LOCALHOST))
}

/// The source address the OS would route from toward `target`.
fn route_source(target: &str) -> Option<IpAddr> {
    let socket = UdpSocket::bind("0.0.0.0:0").ok()?;
    socket.connect(target).ok()?;
    let ip = socket.local_addr().ok()?.ip();
    match ip {
        IpAddr::V4(v4) if !v4.is_loopback() && !v4.is_unspecified() => Some(ip),
        _ => None,
    }
}

/// True for the RFC1918 ranges clients on the same network can dial.
fn is_lan_address(ip: &IpAddr) -> bool {
    match ip {
        IpAddr::V4(v4) => v4.is_private(),
        IpAddr::V6(_) => false,
    }
}
