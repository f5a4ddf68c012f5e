use std::net::{IpAddr, SocketAddr};
use std::path::Path;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::{ConnectionType, SrtMode};
use crate::domain::errors::{DomainError, Result};

/// Ingress buffer size when the controller does not name one
pub const DEFAULT_BUFFER_SIZE: u32 = 8192;

fn default_buffer_size() -> u32 {
    DEFAULT_BUFFER_SIZE
}

fn invalid_options(err: serde_json::Error) -> DomainError {
    DomainError::InvalidOptions(err.to_string())
}

/// Whether a media kind is expected on a connection
///
/// Controllers send `true`/`false`, `"auto"`, or a media description object
/// (which counts as present).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(try_from = "Value")]
pub enum MediaPresence {
    Auto,
    Yes,
    #[default]
    No,
}

impl MediaPresence {
    pub fn as_str(&self) -> &'static str {
        match self {
            MediaPresence::Auto => "auto",
            MediaPresence::Yes => "yes",
            MediaPresence::No => "no",
        }
    }

    pub fn is_requested(&self) -> bool {
        !matches!(self, MediaPresence::No)
    }
}

impl TryFrom<Value> for MediaPresence {
    type Error = String;

    fn try_from(value: Value) -> std::result::Result<Self, Self::Error> {
        match value {
            Value::Null | Value::Bool(false) => Ok(MediaPresence::No),
            Value::Bool(true) | Value::Object(_) => Ok(MediaPresence::Yes),
            Value::String(s) => match s.as_str() {
                "auto" => Ok(MediaPresence::Auto),
                "yes" => Ok(MediaPresence::Yes),
                "no" => Ok(MediaPresence::No),
                other => Err(format!("unknown media presence: {}", other)),
            },
            other => Err(format!("unsupported media value: {}", other)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(default)]
pub struct MediaSpec {
    pub audio: MediaPresence,
    pub video: MediaPresence,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StreamProtocol {
    Rtsp,
    Rtmp,
    Hls,
    Dash,
    Srt,
    Http,
    File,
    #[default]
    #[serde(other)]
    Generic,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransportProtocol {
    #[default]
    Tcp,
    Udp,
}

impl TransportProtocol {
    pub fn as_str(&self) -> &'static str {
        match self {
            TransportProtocol::Tcp => "tcp",
            TransportProtocol::Udp => "udp",
        }
    }
}

/// Source side of a streaming publish
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IngressConnection {
    #[serde(default)]
    pub url: Option<String>,
    #[serde(rename = "type", alias = "protocol", default)]
    pub protocol: StreamProtocol,
    #[serde(default)]
    pub transport_protocol: TransportProtocol,
    #[serde(default = "default_buffer_size")]
    pub buffer_size: u32,
    #[serde(default)]
    pub mode: Option<SrtMode>,
    #[serde(default)]
    pub latency: Option<u32>,
    #[serde(default, alias = "listen_timeout")]
    pub listen_timeout: Option<u32>,
    #[serde(default)]
    pub passphrase: Option<String>,
}

impl IngressConnection {
    pub fn is_srt(&self) -> bool {
        self.protocol == StreamProtocol::Srt
    }

    pub fn srt_mode(&self) -> SrtMode {
        self.mode.unwrap_or_default()
    }

    pub fn passphrase_requested(&self) -> bool {
        self.passphrase.as_deref().is_some_and(|p| !p.is_empty())
    }

    pub fn require_url(&self) -> Result<&str> {
        self.url
            .as_deref()
            .filter(|url| !url.is_empty())
            .ok_or_else(|| DomainError::InvalidOptions("connection url is required".to_string()))
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct StreamingInOptions {
    #[serde(default)]
    pub media: MediaSpec,
    pub connection: IngressConnection,
}

/// Destination side of a streaming subscribe
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EgressConnection {
    #[serde(default)]
    pub protocol: StreamProtocol,
    pub url: String,
    /// Protocol-specific parameters passed through to the transport
    #[serde(flatten)]
    pub parameters: Map<String, Value>,
}

impl EgressConnection {
    /// Segmenting outputs must not overwrite an existing local target
    pub fn ensure_target_available(&self) -> Result<()> {
        let segmented = matches!(self.protocol, StreamProtocol::Hls | StreamProtocol::Dash);
        if segmented && !self.url.starts_with("http") && Path::new(&self.url).exists() {
            return Err(DomainError::TargetAlreadyExists(self.url.clone()));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct StreamingOutOptions {
    #[serde(default)]
    pub media: MediaSpec,
    pub connection: EgressConnection,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PipeProtocol {
    #[default]
    Udp,
    Tcp,
}

/// Options for pre-allocating an internal pipe endpoint
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
pub struct InternalPipeOptions {
    #[serde(default)]
    pub protocol: PipeProtocol,
}

/// Peer an internal endpoint pairs with
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct InternalConnectOptions {
    pub ip: IpAddr,
    pub port: u16,
}

impl InternalConnectOptions {
    pub fn peer(&self) -> SocketAddr {
        SocketAddr::new(self.ip, self.port)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum PublishOptions {
    Internal(InternalConnectOptions),
    Streaming(StreamingInOptions),
}

impl PublishOptions {
    /// Decode a controller payload for the named connection type
    pub fn from_json(connection_type: &str, payload: Value) -> Result<Self> {
        match connection_type.parse::<ConnectionType>()? {
            ConnectionType::Internal => serde_json::from_value(payload)
                .map(PublishOptions::Internal)
                .map_err(invalid_options),
            ConnectionType::Streaming => serde_json::from_value(payload)
                .map(PublishOptions::Streaming)
                .map_err(invalid_options),
        }
    }

    pub fn connection_type(&self) -> ConnectionType {
        match self {
            PublishOptions::Internal(_) => ConnectionType::Internal,
            PublishOptions::Streaming(_) => ConnectionType::Streaming,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum SubscribeOptions {
    Internal(InternalConnectOptions),
    Streaming(StreamingOutOptions),
}

impl SubscribeOptions {
    pub fn from_json(connection_type: &str, payload: Value) -> Result<Self> {
        match connection_type.parse::<ConnectionType>()? {
            ConnectionType::Internal => serde_json::from_value(payload)
                .map(SubscribeOptions::Internal)
                .map_err(invalid_options),
            ConnectionType::Streaming => serde_json::from_value(payload)
                .map(SubscribeOptions::Streaming)
                .map_err(invalid_options),
        }
    }

    pub fn connection_type(&self) -> ConnectionType {
        match self {
            SubscribeOptions::Internal(_) => ConnectionType::Internal,
            SubscribeOptions::Streaming(_) => ConnectionType::Streaming,
        }
    }
}
