use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::oneshot;

use super::StatusSink;
use crate::domain::errors::Result;
use crate::domain::value_objects::{
    EgressConnection, IngressConnection, MediaPresence, MediaSpec, StreamingOutOptions,
    TransportProtocol, DEFAULT_BUFFER_SIZE,
};

/// Construction parameters for an ingest transport
#[derive(Debug, Clone, PartialEq)]
pub struct IngressParams {
    pub has_audio: MediaPresence,
    pub has_video: MediaPresence,
    pub transport_protocol: TransportProtocol,
    pub buffer_size: u32,
    pub url: String,
}

impl IngressParams {
    pub fn new(media: &MediaSpec, connection: &IngressConnection, url: String) -> Self {
        Self {
            has_audio: media.audio,
            has_video: media.video,
            transport_protocol: connection.transport_protocol,
            buffer_size: connection.buffer_size,
            url,
        }
    }

    /// SRT ingest always runs over UDP; the controller's transport and buffer settings do not apply
    pub fn srt(media: &MediaSpec, url: String) -> Self {
        Self {
            has_audio: media.audio,
            has_video: media.video,
            transport_protocol: TransportProtocol::Udp,
            buffer_size: DEFAULT_BUFFER_SIZE,
            url,
        }
    }
}

/// Construction parameters for an egress transport
#[derive(Debug, Clone, PartialEq)]
pub struct EgressParams {
    pub require_audio: bool,
    pub require_video: bool,
    pub connection: EgressConnection,
    pub initialize_timeout: Duration,
}

impl EgressParams {
    pub fn new(options: &StreamingOutOptions, initialize_timeout: Duration) -> Self {
        Self {
            require_audio: options.media.audio.is_requested(),
            require_video: options.media.video.is_requested(),
            connection: options.connection.clone(),
            initialize_timeout,
        }
    }
}

/// Live AV transport owned by exactly one connection entry
pub trait AvTransport: Send {
    /// Stop the transport; consuming `self` makes a second close impossible
    fn close(self: Box<Self>);
}

/// Outcome of egress initialization, `Err` carries a readable reason
pub type InitializationResult = std::result::Result<(), String>;

/// Egress transport plus the pending result of its initialization
pub struct EgressTransport {
    pub transport: Box<dyn AvTransport>,
    pub initialized: oneshot::Receiver<InitializationResult>,
}

/// Port for the wire-level audio/video back-end
///
/// Progress and post-construction fatal errors are reported through the
/// [`StatusSink`] handed to each constructor.
#[async_trait]
pub trait AvTransportFactory: Send + Sync {
    async fn create_ingress(
        &self,
        connection_id: &str,
        params: IngressParams,
        status: StatusSink,
    ) -> Result<Box<dyn AvTransport>>;

    async fn create_egress(
        &self,
        connection_id: &str,
        params: EgressParams,
        status: StatusSink,
    ) -> Result<EgressTransport>;
}
