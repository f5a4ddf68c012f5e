use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};

use super::PortLease;
use crate::domain::ports::{AvTransport, PipeEndpoint};
use crate::domain::value_objects::{ConnectionType, ControllerRef, Direction};

/// Resource backing a connection entry
pub enum TransportHandle {
    Internal(Arc<dyn PipeEndpoint>),
    Streaming {
        transport: Box<dyn AvTransport>,
        lease: Option<PortLease>,
    },
}

impl TransportHandle {
    pub fn connection_type(&self) -> ConnectionType {
        match self {
            TransportHandle::Internal(_) => ConnectionType::Internal,
            TransportHandle::Streaming { .. } => ConnectionType::Streaming,
        }
    }

    /// Close the backing resource and return any leased port
    pub fn shutdown(self) {
        match self {
            TransportHandle::Internal(endpoint) => endpoint.close(),
            TransportHandle::Streaming { transport, lease } => {
                transport.close();
                drop(lease);
            }
        }
    }
}

impl fmt::Debug for TransportHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TransportHandle::Internal(endpoint) => f
                .debug_tuple("Internal")
                .field(&endpoint.local_port())
                .finish(),
            TransportHandle::Streaming { lease, .. } => f
                .debug_struct("Streaming")
                .field("lease", &lease.as_ref().map(PortLease::port))
                .finish(),
        }
    }
}

/// Upstream connections feeding an outbound connection
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Feed {
    pub audio_from: Option<String>,
    pub video_from: Option<String>,
}

impl Feed {
    pub fn is_empty(&self) -> bool {
        self.audio_from.is_none() && self.video_from.is_none()
    }

    pub fn draws_from(&self, id: &str) -> bool {
        self.audio_from.as_deref() == Some(id) || self.video_from.as_deref() == Some(id)
    }

    /// Forget `id` as a source, returns whether anything changed
    pub fn drop_source(&mut self, id: &str) -> bool {
        let mut changed = false;
        if self.audio_from.as_deref() == Some(id) {
            self.audio_from = None;
            changed = true;
        }
        if self.video_from.as_deref() == Some(id) {
            self.video_from = None;
            changed = true;
        }
        changed
    }
}

/// Point-in-time view of an entry
#[derive(Debug, Clone, PartialEq)]
pub struct ConnectionInfo {
    pub id: String,
    pub connection_type: ConnectionType,
    pub direction: Direction,
    pub controller: ControllerRef,
    pub feed: Feed,
    pub port: Option<u16>,
}

/// One logical connection handled by this node
#[derive(Debug)]
pub struct ConnectionEntry {
    id: String,
    direction: Direction,
    controller: ControllerRef,
    handle: TransportHandle,
    feed: Feed,
    created_at: Instant,
}

impl ConnectionEntry {
    pub fn internal(
        id: impl Into<String>,
        direction: Direction,
        controller: ControllerRef,
        endpoint: Arc<dyn PipeEndpoint>,
    ) -> Self {
        Self::new(id.into(), direction, controller, TransportHandle::Internal(endpoint))
    }

    pub fn streaming(
        id: impl Into<String>,
        direction: Direction,
        controller: ControllerRef,
        transport: Box<dyn AvTransport>,
        lease: Option<PortLease>,
    ) -> Self {
        Self::new(
            id.into(),
            direction,
            controller,
            TransportHandle::Streaming { transport, lease },
        )
    }

    fn new(
        id: String,
        direction: Direction,
        controller: ControllerRef,
        handle: TransportHandle,
    ) -> Self {
        Self {
            id,
            direction,
            controller,
            handle,
            feed: Feed::default(),
            created_at: Instant::now(),
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn connection_type(&self) -> ConnectionType {
        self.handle.connection_type()
    }

    pub fn direction(&self) -> Direction {
        self.direction
    }

    pub fn controller(&self) -> &ControllerRef {
        &self.controller
    }

    pub fn feed(&self) -> &Feed {
        &self.feed
    }

    pub fn uptime(&self) -> Duration {
        self.created_at.elapsed()
    }

    pub fn port(&self) -> Option<u16> {
        match &self.handle {
            TransportHandle::Internal(endpoint) => Some(endpoint.local_port()),
            TransportHandle::Streaming { lease, .. } => lease.as_ref().map(PortLease::port),
        }
    }

    pub fn link(&mut self, feed: Feed) {
        self.feed = feed;
    }

    pub fn cut(&mut self) {
        self.feed = Feed::default();
    }

    pub(crate) fn feed_mut(&mut self) -> &mut Feed {
        &mut self.feed
    }

    pub fn info(&self) -> ConnectionInfo {
        ConnectionInfo {
            id: self.id.clone(),
            connection_type: self.connection_type(),
            direction: self.direction,
            controller: self.controller.clone(),
            feed: self.feed.clone(),
            port: self.port(),
        }
    }

    pub fn into_handle(self) -> TransportHandle {
        self.handle
    }
}
