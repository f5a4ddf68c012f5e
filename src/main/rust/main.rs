use std::sync::Arc;

use anyhow::Result;
use clap::Parser;
use tracing::{error, info};

use streaming_agent::{
    serve_metrics, AgentDependencies, ChannelNotifier, Config, GStreamerTransportFactory,
    HostInterfaces, PrometheusReporter, SocketPipeFactory, StreamingAgent, UdpPortProbe,
};

#[tokio::main]
async fn main() -> Result<()> {
    // Parse configuration
    let config = Config::parse();
    config.validate()?;

    // Initialize logging
    let filter = if config.verbose { "debug" } else { "info" };

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(filter)),
        )
        .init();

    // Initialize GStreamer (infrastructure concern)
    gstreamer::init()?;

    // Initialize metrics
    PrometheusReporter::init_metrics()?;

    let agent_config = config
        .to_agent_config()
        .map_err(|e| anyhow::anyhow!("{}", e))?;

    info!("Starting streaming agent");
    info!("  Internal pipes: {} {}", agent_config.internal_ip(), agent_config.internal_ports());
    info!("  SRT listeners: {}", agent_config.external_ports());
    info!("  Metrics port: {}", config.metrics_port);

    // Create infrastructure implementations (dependency injection)
    let (notifier, mut notifications) = ChannelNotifier::new();
    let agent = Arc::new(StreamingAgent::new(
        agent_config,
        AgentDependencies {
            transports: Arc::new(GStreamerTransportFactory::new()),
            pipes: Arc::new(SocketPipeFactory::new()),
            probe: Arc::new(UdpPortProbe::new()),
            interfaces: Arc::new(HostInterfaces::new()),
            notifier: Arc::new(notifier),
            metrics: Arc::new(PrometheusReporter::new()),
        },
    ));

    // Relay status notifications to the log as JSON lines
    let relay = tokio::spawn(async move {
        while let Some(notification) = notifications.recv().await {
            match serde_json::to_string(&notification) {
                Ok(line) => info!(target: "status", "{}", line),
                Err(e) => error!("Failed to encode status notification: {}", e),
            }
        }
    });

    let metrics_server = tokio::spawn(serve_metrics(config.metrics_port, agent.clone()));

    tokio::signal::ctrl_c().await?;
    info!("Received shutdown signal");

    agent.close().await;
    metrics_server.abort();
    relay.abort();

    info!("Streaming agent shutdown complete");
    Ok(())
}
