use std::net::IpAddr;

use serde::Serialize;

/// Address the remote side dials to reach an internal endpoint
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct InternalEndpointInfo {
    pub ip: IpAddr,
    pub port: u16,
}

/// Acknowledgment returned by `publish`
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum PublishReply {
    /// Connection recorded in the registry
    Published,
    /// SRT listener reserved; the transport is still being established
    SrtListening {
        ip: Vec<IpAddr>,
        port: u16,
        streamid: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        passphrase: Option<String>,
    },
    /// SRT caller transport constructed and recorded
    SrtCalling { streamid: String },
}
