pub mod application;
pub mod config;
pub mod domain;
pub mod infrastructure;

// Re-exports for convenience
pub use application::services::{
    AgentDependencies, ConnectionRegistry, InternalPipeFactory, SrtNegotiator, StreamingAgent,
};
pub use config::Config;
pub use domain::entities::{ConnectionEntry, ConnectionInfo, Feed, PortLease, PortPool};
pub use domain::errors::{DomainError, Result};
pub use domain::ports::{
    AvTransport, AvTransportFactory, EgressParams, EgressTransport, IngressParams,
    InitializationResult, MetricsReporter, NetworkInterfaces, PipeEndpoint, PipeEndpointFactory,
    PortProbe, StatusNotifier, StatusSink,
};
pub use domain::value_objects::{
    AbsentTeardown, AgentConfig, ConnectionState, ConnectionType, ControllerRef, Direction,
    FaultMessage, InternalConnectOptions, InternalEndpointInfo, InternalPipeOptions,
    PublishOptions, PublishReply, SessionStatus, SrtMode, SrtUrl, StatusNotification,
    SubscribeOptions,
};
pub use infrastructure::gstreamer::{GStreamerTransportFactory, PipelineBuilder};
pub use infrastructure::metrics::{serve_metrics, PrometheusReporter};
pub use infrastructure::network::{
    ChannelNotifier, HostInterfaces, SocketPipeFactory, UdpPortProbe,
};
