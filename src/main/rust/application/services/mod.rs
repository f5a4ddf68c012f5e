mod av_launcher;
mod connection_registry;
mod internal_pipe_factory;
mod srt_negotiator;
mod streaming_agent;


pub use av_launcher::{AvTransportLauncher, PendingInitialization};
pub use connection_registry::{ConnectionRegistry, RejectedEntry, Reservation};
pub use internal_pipe_factory::InternalPipeFactory;
pub use srt_negotiator::SrtNegotiator;
pub use streaming_agent::{AgentDependencies, StreamingAgent};
