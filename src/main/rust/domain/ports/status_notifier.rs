use std::fmt;
use std::sync::Arc;

use crate::domain::value_objects::{
    ControllerRef, Direction, SessionStatus, StatusNotification,
};

/// Port for pushing status notifications to controllers
pub trait StatusNotifier: Send + Sync {
    fn notify(&self, notification: StatusNotification);
}

/// Notifier bound to one `(controller, sessionId, direction)`
#[derive(Clone)]
pub struct StatusSink {
    notifier: Arc<dyn StatusNotifier>,
    controller: ControllerRef,
    session_id: String,
    direction: Direction,
}

impl StatusSink {
    pub fn new(
        notifier: Arc<dyn StatusNotifier>,
        controller: ControllerRef,
        session_id: impl Into<String>,
        direction: Direction,
    ) -> Self {
        Self {
            notifier,
            controller,
            session_id: session_id.into(),
            direction,
        }
    }

    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    pub fn direction(&self) -> Direction {
        self.direction
    }

    pub fn report(&self, status: SessionStatus) {
        self.notifier.notify(StatusNotification {
            controller: self.controller.clone(),
            session_id: self.session_id.clone(),
            direction: self.direction,
            status,
        });
    }

    /// Post-construction failure of an otherwise active transport
    pub fn fatal(&self, error: impl fmt::Display) {
        tracing::error!(
            connection_id = %self.session_id,
            direction = %self.direction,
            "transport fatal error: {}",
            error
        );
        self.report(SessionStatus::failed(format!(
            "transport fatal error: {}",
            error
        )));
    }
}

impl fmt::Debug for StatusSink {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StatusSink")
            .field("controller", &self.controller)
            .field("session_id", &self.session_id)
            .field("direction", &self.direction)
            .finish()
    }
}
