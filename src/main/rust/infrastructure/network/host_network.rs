use std::net::{IpAddr, Ipv4Addr};

use async_trait::async_trait;
use tokio::net::UdpSocket;

use crate::domain::ports::{NetworkInterfaces, PortProbe};

/// Checks external ports by attempting a UDP bind on every address
///
/// SRT runs over UDP, so a successful bind means a listener can take the port.
#[derive(Debug, Default)]
pub struct UdpPortProbe;

impl UdpPortProbe {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl PortProbe for UdpPortProbe {
    async fn is_available(&self, port: u16) -> bool {
        UdpSocket::bind((Ipv4Addr::UNSPECIFIED, port)).await.is_ok()
    }
}

/// Host interface enumeration
#[derive(Debug, Default)]
pub struct HostInterfaces;

impl HostInterfaces {
    pub fn new() -> Self {
        Self
    }
}

impl NetworkInterfaces for HostInterfaces {
    fn ipv4_addresses(&self, interface: Option<&str>) -> Vec<Ipv4Addr> {
        let interfaces = match local_ip_address::list_afinet_netifas() {
            Ok(interfaces) => interfaces,
            Err(e) => {
                tracing::warn!("Failed to list network interfaces: {}", e);
                return Vec::new();
            }
        };

        interfaces
            .into_iter()
            .filter(|(name, _)| interface.map_or(true, |wanted| wanted == name.as_str()))
            .filter_map(|(_, ip)| match ip {
                IpAddr::V4(v4) if !v4.is_loopback() => Some(v4),
                _ => None,
            })
            .collect()
    }
}
