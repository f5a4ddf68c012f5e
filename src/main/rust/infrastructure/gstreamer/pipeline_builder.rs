use crate::domain::ports::{EgressParams, IngressParams};
use crate::domain::value_objects::StreamProtocol;

/// Jitter buffer applied to RTSP sources, in milliseconds
const RTSP_LATENCY_MS: u32 = 200;

pub struct PipelineBuilder;

impl PipelineBuilder {
    /// Launch string for an ingest source
    ///
    /// Media is terminated in a fakesink; downstream stages attach through
    /// internal pipes.
    pub fn build_ingress_string(params: &IngressParams) -> String {
        let source = if params.url.starts_with("srt://") {
            format!("srtsrc uri=\"{}\" ! queue", params.url)
        } else if params.url.starts_with("rtsp://") {
            format!(
                "rtspsrc location={} protocols={} latency={} ! queue",
                params.url,
                params.transport_protocol.as_str(),
                RTSP_LATENCY_MS
            )
        } else {
            format!(
                "urisourcebin uri=\"{}\" buffer-size={} ! queue",
                params.url, params.buffer_size
            )
        };

        format!("{} ! fakesink sync=false", source)
    }

    /// Launch string for an egress sink fed through the `feed` appsrc
    pub fn build_egress_string(params: &EgressParams) -> String {
        let url = &params.connection.url;
        let sink = match params.connection.protocol {
            StreamProtocol::Srt => format!(
                "mpegtsmux alignment=7 ! srtsink uri=\"{}\" wait-for-connection=false",
                url
            ),
            StreamProtocol::Hls => format!(
                "mpegtsmux ! hlssink playlist-location={}/index.m3u8 location={}/segment%05d.ts",
                url, url
            ),
            StreamProtocol::Dash => format!("dashsink mpd-root-path={}", url),
            StreamProtocol::Rtmp => format!("flvmux streamable=true ! rtmpsink location=\"{}\"", url),
            StreamProtocol::Rtsp => format!("rtspclientsink location={}", url),
            StreamProtocol::Http => format!("souphttpclientsink location={}", url),
            StreamProtocol::File | StreamProtocol::Generic => format!("filesink location={}", url),
        };

        format!("appsrc name=feed is-live=true format=time ! queue ! {}", sink)
    }
}
