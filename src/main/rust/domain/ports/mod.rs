mod av_transport;
mod internal_pipe;
mod metrics_reporter;
mod network_interfaces;
mod port_probe;
mod status_notifier;

pub use av_transport::{
    AvTransport, AvTransportFactory, EgressParams, EgressTransport, IngressParams,
    InitializationResult,
};
pub use internal_pipe::{PipeEndpoint, PipeEndpointFactory};
pub use metrics_reporter::MetricsReporter;
pub use network_interfaces::NetworkInterfaces;
pub use port_probe::PortProbe;
pub use status_notifier::{StatusNotifier, StatusSink};
