use std::net::{IpAddr, Ipv4Addr};
use std::time::Duration;

use super::PortRange;

/// Default bound on AV transport construction
pub const DEFAULT_INITIALIZE_TIMEOUT: Duration = Duration::from_secs(3);

/// What teardown of an identifier that is not present reports
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AbsentTeardown {
    /// Acknowledge with success, removal is idempotent
    #[default]
    Acknowledge,
    /// Report `NotFound`
    NotFound,
}

/// Immutable node configuration handed to the agent at construction
#[derive(Debug, Clone, PartialEq)]
pub struct AgentConfig {
    internal_ip: IpAddr,
    internal_ports: PortRange,
    external_ports: PortRange,
    external_ip: Option<IpAddr>,
    network_interface: Option<String>,
    initialize_timeout: Duration,
    absent_teardown: AbsentTeardown,
}

impl AgentConfig {
    pub fn new(internal_ports: PortRange, external_ports: PortRange) -> Self {
        Self {
            internal_ip: IpAddr::V4(Ipv4Addr::LOCALHOST),
            internal_ports,
            external_ports,
            external_ip: None,
            network_interface: None,
            initialize_timeout: DEFAULT_INITIALIZE_TIMEOUT,
            absent_teardown: AbsentTeardown::default(),
        }
    }

    pub fn with_internal_ip(mut self, ip: IpAddr) -> Self {
        self.internal_ip = ip;
        self
    }

    pub fn with_external_ip(mut self, ip: Option<IpAddr>) -> Self {
        self.external_ip = ip;
        self
    }

    pub fn with_network_interface(mut self, name: Option<String>) -> Self {
        self.network_interface = name.filter(|n| !n.is_empty());
        self
    }

    pub fn with_initialize_timeout(mut self, timeout: Duration) -> Self {
        self.initialize_timeout = timeout;
        self
    }

    pub fn with_absent_teardown(mut self, policy: AbsentTeardown) -> Self {
        self.absent_teardown = policy;
        self
    }

    pub fn internal_ip(&self) -> IpAddr {
        self.internal_ip
    }

    pub fn internal_ports(&self) -> PortRange {
        self.internal_ports
    }

    pub fn external_ports(&self) -> PortRange {
        self.external_ports
    }

    pub fn external_ip(&self) -> Option<IpAddr> {
        self.external_ip
    }

    pub fn network_interface(&self) -> Option<&str> {
        self.network_interface.as_deref()
    }

    pub fn initialize_timeout(&self) -> Duration {
        self.initialize_timeout
    }

    pub fn absent_teardown(&self) -> AbsentTeardown {
        self.absent_teardown
    }
}
