use std::net::Ipv4Addr;

/// Port for enumerating this node's addresses
pub trait NetworkInterfaces: Send + Sync {
    /// Non-loopback IPv4 addresses, optionally limited to one interface
    fn ipv4_addresses(&self, interface: Option<&str>) -> Vec<Ipv4Addr>;
}
