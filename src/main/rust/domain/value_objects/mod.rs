mod agent_config;
mod connection_options;
mod connection_state;
mod connection_type;
mod port_range;
mod replies;
mod session_status;
mod srt_url;

pub use agent_config::{AbsentTeardown, AgentConfig, DEFAULT_INITIALIZE_TIMEOUT};
pub use connection_options::{
    EgressConnection, IngressConnection, InternalConnectOptions, InternalPipeOptions,
    MediaPresence, MediaSpec, PipeProtocol, PublishOptions, StreamProtocol, StreamingInOptions,
    StreamingOutOptions, SubscribeOptions, TransportProtocol, DEFAULT_BUFFER_SIZE,
};
pub use connection_state::ConnectionState;
pub use connection_type::{ConnectionType, Direction};
pub use port_range::PortRange;
pub use replies::{InternalEndpointInfo, PublishReply};
pub use session_status::{
    ControllerRef, FaultMessage, SessionStatus, StatusNotification,
};
pub use srt_url::{SrtMode, SrtUrl, GENERATED_PASSPHRASE_LEN};
