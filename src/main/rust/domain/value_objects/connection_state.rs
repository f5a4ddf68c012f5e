use std::fmt;

/// Lifecycle state of one connection identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    /// No entry and no creation in flight
    Absent,
    /// Identifier reserved, transport still being established
    Creating,
    /// Entry recorded in the registry
    Active,
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Absent => write!(f, "ABSENT"),
            Self::Creating => write!(f, "CREATING"),
            Self::Active => write!(f, "ACTIVE"),
        }
    }
}

impl ConnectionState {
    /// Whether the identifier is taken (creating or active)
    pub fn is_occupied(&self) -> bool {
        !matches!(self, Self::Absent)
    }
}

impl Default for ConnectionState {
    fn default() -> Self {
        Self::Absent
    }
}
