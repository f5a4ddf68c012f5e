mod channel_notifier;
mod host_network;
mod socket_pipe;

pub use channel_notifier::ChannelNotifier;
pub use host_network::{HostInterfaces, UdpPortProbe};
pub use socket_pipe::{SocketEndpoint, SocketPipeFactory};
