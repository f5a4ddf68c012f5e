use std::net::IpAddr;
use std::time::Duration;

use clap::Parser;

use crate::domain::value_objects::{AbsentTeardown, AgentConfig, PortRange};

#[derive(Parser, Debug, Clone)]
#[command(
    name = "streaming-agent",
    version = "0.1.0",
    author = "Hawkeye Video Pipeline",
    about = "Per-node connection lifecycle manager for media streaming workers"
)]
pub struct Config {
    /// Address internal pipe endpoints bind to
    #[arg(long, env = "INTERNAL_IP", default_value = "127.0.0.1")]
    pub internal_ip: IpAddr,

    /// First port of the internal pipe range
    #[arg(long, env = "INTERNAL_MIN_PORT", default_value = "45000")]
    pub internal_min_port: u16,

    /// Last port of the internal pipe range
    #[arg(long, env = "INTERNAL_MAX_PORT", default_value = "45999")]
    pub internal_max_port: u16,

    /// First port of the external SRT listener range
    #[arg(long, env = "EXTERNAL_MIN_PORT", default_value = "30000")]
    pub external_min_port: u16,

    /// Last port of the external SRT listener range
    #[arg(long, env = "EXTERNAL_MAX_PORT", default_value = "30999")]
    pub external_max_port: u16,

    /// Public address advertised to SRT callers
    #[arg(long, env = "EXTERNAL_IP")]
    pub external_ip: Option<IpAddr>,

    /// Restrict advertised addresses to this interface
    #[arg(long, env = "NETWORK_INTERFACE")]
    pub network_interface: Option<String>,

    /// AV transport initialization timeout in milliseconds
    #[arg(long, env = "INITIALIZE_TIMEOUT_MS", default_value = "3000")]
    pub initialize_timeout_ms: u64,

    /// Report NotFound when tearing down an unknown connection
    #[arg(long, env = "STRICT_TEARDOWN")]
    pub strict_teardown: bool,

    /// Metrics server port
    #[arg(long, env = "METRICS_PORT", default_value = "9003")]
    pub metrics_port: u16,

    /// Enable verbose logging
    #[arg(short, long)]
    pub verbose: bool,
}

/// Minimum allowed port (ports below 1024 are privileged)
const MIN_USER_PORT: u16 = 1024;

impl Config {
    pub fn validate(&self) -> anyhow::Result<()> {
        Self::validate_port(self.internal_min_port, "internal min")?;
        Self::validate_port(self.internal_max_port, "internal max")?;
        Self::validate_port(self.external_min_port, "external min")?;
        Self::validate_port(self.external_max_port, "external max")?;
        Self::validate_port(self.metrics_port, "metrics")?;

        if self.internal_max_port < self.internal_min_port {
            anyhow::bail!(
                "Internal max port ({}) cannot be less than min port ({})",
                self.internal_max_port,
                self.internal_min_port
            );
        }

        if self.external_max_port < self.external_min_port {
            anyhow::bail!(
                "External max port ({}) cannot be less than min port ({})",
                self.external_max_port,
                self.external_min_port
            );
        }

        let overlaps = self.internal_min_port <= self.external_max_port
            && self.external_min_port <= self.internal_max_port;
        if overlaps {
            anyhow::bail!("Internal and external port ranges must not overlap");
        }

        if self.initialize_timeout_ms == 0 {
            anyhow::bail!("Initialization timeout cannot be 0");
        }

        Ok(())
    }

    fn validate_port(port: u16, name: &str) -> anyhow::Result<()> {
        if port == 0 {
            anyhow::bail!("Invalid {} port: port cannot be 0", name);
        }
        if port < MIN_USER_PORT {
            anyhow::bail!(
                "Invalid {} port: {} is a privileged port (< {}). Use a port >= {}",
                name,
                port,
                MIN_USER_PORT,
                MIN_USER_PORT
            );
        }
        Ok(())
    }

    pub fn to_agent_config(&self) -> crate::domain::errors::Result<AgentConfig> {
        let internal = PortRange::new(self.internal_min_port, self.internal_max_port)?;
        let external = PortRange::new(self.external_min_port, self.external_max_port)?;
        let absent_teardown = if self.strict_teardown {
            AbsentTeardown::NotFound
        } else {
            AbsentTeardown::Acknowledge
        };

        Ok(AgentConfig::new(internal, external)
            .with_internal_ip(self.internal_ip)
            .with_external_ip(self.external_ip)
            .with_network_interface(self.network_interface.clone())
            .with_initialize_timeout(Duration::from_millis(self.initialize_timeout_ms))
            .with_absent_teardown(absent_teardown))
    }
}
