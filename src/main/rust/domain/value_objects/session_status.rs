use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::Direction;
use crate::domain::errors::DomainError;

/// Opaque reference routing notifications back to the owning session
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ControllerRef(String);

impl ControllerRef {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ControllerRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Status pushed to a controller out-of-band
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum SessionStatus {
    Ready {
        #[serde(skip_serializing_if = "Option::is_none")]
        info: Option<String>,
    },
    Failed {
        reason: String,
    },
    Progress {
        details: Value,
    },
}

impl SessionStatus {
    pub fn failed(reason: impl Into<String>) -> Self {
        SessionStatus::Failed {
            reason: reason.into(),
        }
    }

    pub fn is_failure(&self) -> bool {
        matches!(self, SessionStatus::Failed { .. })
    }
}

impl From<&DomainError> for SessionStatus {
    fn from(err: &DomainError) -> Self {
        SessionStatus::failed(err.to_string())
    }
}

/// `(sessionId, direction, status)` addressed to one controller
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusNotification {
    pub controller: ControllerRef,
    pub session_id: String,
    pub direction: Direction,
    pub status: SessionStatus,
}

/// Fault report naming a connection (or an upstream feeding others)
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct FaultMessage {
    pub id: String,
    #[serde(default)]
    pub reason: Option<String>,
}

impl FaultMessage {
    pub fn new(id: impl Into<String>, reason: Option<String>) -> Self {
        Self {
            id: id.into(),
            reason,
        }
    }

    pub fn describe(&self) -> String {
        match &self.reason {
            Some(reason) => format!("fault detected on {}: {}", self.id, reason),
            None => format!("fault detected on {}", self.id),
        }
    }
}
