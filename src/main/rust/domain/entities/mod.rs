mod connection_entry;
mod port_pool;

pub use connection_entry::{ConnectionEntry, ConnectionInfo, Feed, TransportHandle};
pub use port_pool::{PortLease, PortPool};
