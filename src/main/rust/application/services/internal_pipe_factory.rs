use std::collections::HashMap;
use std::net::IpAddr;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use crate::domain::entities::{PortLease, PortPool};
use crate::domain::errors::Result;
use crate::domain::ports::{PipeEndpoint, PipeEndpointFactory};
use crate::domain::value_objects::{
    Direction, InternalEndpointInfo, InternalPipeOptions, PortRange,
};

type SlotKey = (String, Direction);

struct PipeSlot {
    endpoint: Arc<dyn PipeEndpoint>,
    lease: PortLease,
}

/// Allocates internal pipe endpoints and their ports per `(connectionId, direction)`
///
/// The factory is the only allocator of internal ports on the node.
pub struct InternalPipeFactory {
    ip: IpAddr,
    pool: PortPool,
    endpoints: Arc<dyn PipeEndpointFactory>,
    slots: Mutex<HashMap<SlotKey, PipeSlot>>,
}

impl InternalPipeFactory {
    pub fn new(ip: IpAddr, range: PortRange, endpoints: Arc<dyn PipeEndpointFactory>) -> Self {
        Self {
            ip,
            pool: PortPool::new("internal", range),
            endpoints,
            slots: Mutex::new(HashMap::new()),
        }
    }

    fn slots(&self) -> MutexGuard<'_, HashMap<SlotKey, PipeSlot>> {
        self.slots.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn key(id: &str, direction: Direction) -> SlotKey {
        (id.to_string(), direction)
    }

    /// Open an endpoint on the first free internal port
    pub fn create(
        &self,
        id: &str,
        direction: Direction,
        options: &InternalPipeOptions,
    ) -> Result<InternalEndpointInfo> {
        let mut slots = self.slots();
        if let Some(slot) = slots.get(&Self::key(id, direction)) {
            tracing::debug!(connection_id = id, %direction, "internal endpoint already exists");
            return Ok(InternalEndpointInfo {
                ip: self.ip,
                port: slot.lease.port(),
            });
        }

        for port in self.pool.free_ports() {
            let Some(lease) = self.pool.try_lease(port) else {
                continue;
            };

            match self.endpoints.open(self.ip, port, direction, options) {
                Ok(endpoint) => {
                    tracing::info!(
                        connection_id = id,
                        %direction,
                        port,
                        "internal endpoint opened"
                    );
                    slots.insert(Self::key(id, direction), PipeSlot { endpoint, lease });
                    return Ok(InternalEndpointInfo { ip: self.ip, port });
                }
                Err(e) => {
                    tracing::debug!(port, "skipping internal port: {}", e);
                }
            }
        }

        tracing::warn!(connection_id = id, range = %self.pool.range(), "internal ports exhausted");
        Err(self.pool.range().exhausted())
    }

    pub fn fetch(&self, id: &str, direction: Direction) -> Option<Arc<dyn PipeEndpoint>> {
        self.slots()
            .get(&Self::key(id, direction))
            .map(|slot| slot.endpoint.clone())
    }

    /// Close the endpoint and release its port; idempotent
    pub fn destroy(&self, id: &str, direction: Direction) -> bool {
        let slot = self.slots().remove(&Self::key(id, direction));
        match slot {
            Some(PipeSlot { endpoint, lease }) => {
                endpoint.close();
                tracing::info!(connection_id = id, %direction, port = lease.port(), "internal endpoint destroyed");
                true
            }
            None => false,
        }
    }

    pub fn destroy_all(&self) -> usize {
        let drained: Vec<PipeSlot> = self.slots().drain().map(|(_, slot)| slot).collect();
        let count = drained.len();
        for slot in drained {
            slot.endpoint.close();
        }
        count
    }

    pub fn leased_count(&self) -> usize {
        self.pool.leased_count()
    }

    pub fn pool(&self) -> &PortPool {
        &self.pool
    }
}
