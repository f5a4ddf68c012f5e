use std::net::IpAddr;
use std::sync::Arc;

use crate::domain::errors::Result;
use crate::domain::value_objects::{Direction, InternalConnectOptions, InternalPipeOptions};

/// Local end of a pipe between co-located pipeline stages
pub trait PipeEndpoint: Send + Sync {
    fn local_port(&self) -> u16;

    /// Pair the endpoint with its remote peer
    fn connect(&self, options: &InternalConnectOptions) -> Result<()>;

    fn close(&self);
}

/// Port for opening pipe endpoints on a given local port
pub trait PipeEndpointFactory: Send + Sync {
    fn open(
        &self,
        ip: IpAddr,
        port: u16,
        direction: Direction,
        options: &InternalPipeOptions,
    ) -> Result<Arc<dyn PipeEndpoint>>;
}
