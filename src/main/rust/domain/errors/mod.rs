use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DomainError {
    #[error("Connection already exists: {0}")]
    DuplicateConnection(String),

    #[error("Connection type invalid: {0}")]
    InvalidConnectionType(String),

    #[error("Invalid connection options: {0}")]
    InvalidOptions(String),

    #[error("Invalid SRT URL: {0}")]
    InvalidSrtUrl(String),

    #[error("Invalid port: port cannot be zero")]
    InvalidPort,

    #[error("Invalid port range: [{min}, {max}]")]
    InvalidPortRange { min: u16, max: u16 },

    #[error("Transport creation failed: {0}")]
    TransportCreationFailed(String),

    #[error("Target already exists: {0}")]
    TargetAlreadyExists(String),

    #[error("No free port in range [{min}, {max}]")]
    PortExhausted { min: u16, max: u16 },

    #[error("Connection not found: {0}")]
    NotFound(String),

    #[error("Invalid link: {0}")]
    InvalidLink(String),

    #[error("Connection {0} discarded by node shutdown")]
    Discarded(String),
}

pub type Result<T> = std::result::Result<T, DomainError>;
