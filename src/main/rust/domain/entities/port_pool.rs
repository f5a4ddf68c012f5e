use std::collections::BTreeSet;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use crate::domain::errors::Result;
use crate::domain::value_objects::PortRange;

type Leases = Arc<Mutex<BTreeSet<u16>>>;

fn lock(leases: &Mutex<BTreeSet<u16>>) -> MutexGuard<'_, BTreeSet<u16>> {
    leases.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Bookkeeping of leased ports within one configured range
#[derive(Debug, Clone)]
pub struct PortPool {
    name: &'static str,
    range: PortRange,
    leased: Leases,
}

impl PortPool {
    pub fn new(name: &'static str, range: PortRange) -> Self {
        Self {
            name,
            range,
            leased: Arc::new(Mutex::new(BTreeSet::new())),
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn range(&self) -> PortRange {
        self.range
    }

    /// First-fit lease of the lowest port not currently leased
    pub fn lease_first_free(&self) -> Result<PortLease> {
        let mut leased = lock(&self.leased);
        for port in self.range.ports() {
            if leased.insert(port) {
                return Ok(PortLease {
                    port,
                    leases: self.leased.clone(),
                });
            }
        }
        Err(self.range.exhausted())
    }

    /// Lease one specific port if it is in range and free
    pub fn try_lease(&self, port: u16) -> Option<PortLease> {
        if !self.range.contains(port) {
            return None;
        }

        let mut leased = lock(&self.leased);
        leased.insert(port).then(|| PortLease {
            port,
            leases: self.leased.clone(),
        })
    }

    /// Unleased ports in first-fit order (point-in-time)
    pub fn free_ports(&self) -> Vec<u16> {
        let leased = lock(&self.leased);
        self.range
            .ports()
            .filter(|port| !leased.contains(port))
            .collect()
    }

    pub fn is_leased(&self, port: u16) -> bool {
        lock(&self.leased).contains(&port)
    }

    pub fn leased_count(&self) -> usize {
        lock(&self.leased).len()
    }
}

/// One leased port; returned to its pool when dropped
#[derive(Debug)]
pub struct PortLease {
    port: u16,
    leases: Leases,
}

impl PortLease {
    pub fn port(&self) -> u16 {
        self.port
    }
}

impl Drop for PortLease {
    fn drop(&mut self) {
        lock(&self.leases).remove(&self.port);
    }
}
