use std::collections::{HashMap, HashSet};
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use crate::domain::entities::{ConnectionEntry, ConnectionInfo, Feed};
use crate::domain::errors::{DomainError, Result};
use crate::domain::ports::{MetricsReporter, StatusNotifier};
use crate::domain::value_objects::{
    ConnectionState, Direction, FaultMessage, SessionStatus, StatusNotification,
};

#[derive(Default)]
struct RegistryState {
    entries: HashMap<String, ConnectionEntry>,
    pending: HashSet<String>,
    epoch: u64,
}

impl RegistryState {
    fn is_occupied(&self, id: &str) -> bool {
        self.entries.contains_key(id) || self.pending.contains(id)
    }
}

/// Entry refused by the registry, handed back so its resources can be released
#[derive(Debug)]
pub struct RejectedEntry {
    error: DomainError,
    entry: ConnectionEntry,
}

impl RejectedEntry {
    pub fn error(&self) -> &DomainError {
        &self.error
    }

    pub fn into_parts(self) -> (DomainError, ConnectionEntry) {
        (self.error, self.entry)
    }
}

/// Canonical table of the connections handled by this node
///
/// Every test-and-insert, removal and routing update happens under one lock,
/// which is never held across an `.await`.
pub struct ConnectionRegistry {
    state: Mutex<RegistryState>,
    notifier: Arc<dyn StatusNotifier>,
    metrics: Arc<dyn MetricsReporter>,
}

impl ConnectionRegistry {
    pub fn new(notifier: Arc<dyn StatusNotifier>, metrics: Arc<dyn MetricsReporter>) -> Self {
        Self {
            state: Mutex::new(RegistryState::default()),
            notifier,
            metrics,
        }
    }

    fn lock(&self) -> MutexGuard<'_, RegistryState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Claim `id` for a connection that is being created
    pub fn reserve(self: &Arc<Self>, id: &str) -> Result<Reservation> {
        let mut state = self.lock();
        if state.is_occupied(id) {
            return Err(DomainError::DuplicateConnection(id.to_string()));
        }
        state.pending.insert(id.to_string());

        Ok(Reservation {
            id: id.to_string(),
            epoch: state.epoch,
            registry: Arc::clone(self),
            settled: false,
        })
    }

    /// Atomic test-and-insert
    pub fn add_connection(&self, entry: ConnectionEntry) -> std::result::Result<(), RejectedEntry> {
        let mut state = self.lock();
        if state.is_occupied(entry.id()) {
            return Err(RejectedEntry {
                error: DomainError::DuplicateConnection(entry.id().to_string()),
                entry,
            });
        }

        state.entries.insert(entry.id().to_string(), entry);
        self.metrics.report_active_connections(state.entries.len());
        Ok(())
    }

    fn commit(
        &self,
        id: &str,
        epoch: u64,
        entry: ConnectionEntry,
    ) -> std::result::Result<(), RejectedEntry> {
        let mut state = self.lock();
        state.pending.remove(id);

        if entry.id() != id {
            return Err(RejectedEntry {
                error: DomainError::InvalidOptions(format!(
                    "reservation for {} cannot record {}",
                    id,
                    entry.id()
                )),
                entry,
            });
        }
        if state.epoch != epoch {
            return Err(RejectedEntry {
                error: DomainError::Discarded(id.to_string()),
                entry,
            });
        }
        if state.entries.contains_key(id) {
            return Err(RejectedEntry {
                error: DomainError::DuplicateConnection(id.to_string()),
                entry,
            });
        }

        state.entries.insert(id.to_string(), entry);
        self.metrics.report_active_connections(state.entries.len());
        Ok(())
    }

    fn release_pending(&self, id: &str) {
        self.lock().pending.remove(id);
    }

    pub fn get_connection(&self, id: &str) -> Option<ConnectionInfo> {
        self.lock().entries.get(id).map(ConnectionEntry::info)
    }

    pub fn state(&self, id: &str) -> ConnectionState {
        let state = self.lock();
        if state.entries.contains_key(id) {
            ConnectionState::Active
        } else if state.pending.contains(id) {
            ConnectionState::Creating
        } else {
            ConnectionState::Absent
        }
    }

    /// Remove and return the entry; absent ids are a no-op
    pub fn remove_connection(&self, id: &str) -> Option<ConnectionEntry> {
        let mut state = self.lock();
        let entry = state.entries.remove(id)?;

        for other in state.entries.values_mut() {
            if other.feed_mut().drop_source(id) {
                tracing::debug!(connection_id = %other.id(), source = id, "feed source removed");
            }
        }

        self.metrics.report_active_connections(state.entries.len());
        Some(entry)
    }

    pub fn get_ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.lock().entries.keys().cloned().collect();
        ids.sort();
        ids
    }

    pub fn len(&self) -> usize {
        self.lock().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Start a new epoch and snapshot the ids to tear down
    ///
    /// Reservations taken before this call can no longer commit.
    pub fn begin_shutdown(&self) -> Vec<String> {
        let mut state = self.lock();
        state.epoch += 1;

        let mut ids: Vec<String> = state.entries.keys().cloned().collect();
        ids.sort();
        ids
    }

    /// Route the named inbound sources into outbound connection `id`
    pub fn linkup(&self, id: &str, audio_from: Option<&str>, video_from: Option<&str>) -> Result<()> {
        let mut state = self.lock();

        let target = state
            .entries
            .get(id)
            .ok_or_else(|| DomainError::NotFound(id.to_string()))?;
        if target.direction() != Direction::Out {
            return Err(DomainError::InvalidLink(format!(
                "{} is not an outbound connection",
                id
            )));
        }
        if audio_from.is_none() && video_from.is_none() {
            return Err(DomainError::InvalidLink(format!(
                "no audio or video source named for {}",
                id
            )));
        }

        for source in [audio_from, video_from].into_iter().flatten() {
            let entry = state
                .entries
                .get(source)
                .ok_or_else(|| DomainError::NotFound(source.to_string()))?;
            if entry.direction() != Direction::In {
                return Err(DomainError::InvalidLink(format!(
                    "{} is not an inbound connection",
                    source
                )));
            }
        }

        let feed = Feed {
            audio_from: audio_from.map(str::to_string),
            video_from: video_from.map(str::to_string),
        };
        if let Some(target) = state.entries.get_mut(id) {
            target.link(feed);
        }

        tracing::debug!(connection_id = id, ?audio_from, ?video_from, "linked up");
        Ok(())
    }

    pub fn cutoff(&self, id: &str) -> Result<()> {
        let mut state = self.lock();
        let entry = state
            .entries
            .get_mut(id)
            .ok_or_else(|| DomainError::NotFound(id.to_string()))?;
        entry.cut();

        tracing::debug!(connection_id = id, "cut off");
        Ok(())
    }

    /// Notify every controller whose connection the fault touches
    ///
    /// Returns the number of notifications sent. Entries are left in place.
    pub fn on_fault_detected(&self, message: &FaultMessage) -> usize {
        let affected: Vec<StatusNotification> = {
            let state = self.lock();
            state
                .entries
                .values()
                .filter(|entry| entry.id() == message.id || entry.feed().draws_from(&message.id))
                .map(|entry| StatusNotification {
                    controller: entry.controller().clone(),
                    session_id: entry.id().to_string(),
                    direction: entry.direction(),
                    status: SessionStatus::failed(message.describe()),
                })
                .collect()
        };

        let count = affected.len();
        for notification in affected {
            tracing::warn!(
                connection_id = %notification.session_id,
                "{}",
                message.describe()
            );
            self.notifier.notify(notification);
        }

        self.metrics.report_faults_forwarded(count);
        count
    }
}

/// Holds an id in the `Creating` state until committed or dropped
pub struct Reservation {
    id: String,
    epoch: u64,
    registry: Arc<ConnectionRegistry>,
    settled: bool,
}

impl Reservation {
    pub fn id(&self) -> &str {
        &self.id
    }

    /// `Creating -> Active`
    pub fn commit(mut self, entry: ConnectionEntry) -> std::result::Result<(), RejectedEntry> {
        self.settled = true;
        self.registry.commit(&self.id, self.epoch, entry)
    }
}

impl Drop for Reservation {
    fn drop(&mut self) {
        if !self.settled {
            self.registry.release_pending(&self.id);
        }
    }
}

impl fmt::Debug for Reservation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Reservation")
            .field("id", &self.id)
            .field("epoch", &self.epoch)
            .finish()
    }
}
