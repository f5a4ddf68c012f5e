mod gstreamer_transport;
mod pipeline_builder;

pub use gstreamer_transport::{GStreamerTransport, GStreamerTransportFactory};
pub use pipeline_builder::PipelineBuilder;
