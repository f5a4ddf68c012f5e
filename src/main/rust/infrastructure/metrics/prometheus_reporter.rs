use lazy_static::lazy_static;
use prometheus::{Encoder, IntCounter, IntCounterVec, IntGauge, IntGaugeVec, Opts, Registry, TextEncoder};

use crate::domain::ports::MetricsReporter;
use crate::domain::value_objects::{ConnectionType, Direction};

lazy_static! {
    pub static ref REGISTRY: Registry = Registry::new();

    // Connections currently recorded in the registry
    pub static ref ACTIVE_CONNECTIONS: IntGauge = IntGauge::new(
        "streaming_agent_active_connections",
        "Number of active connections on this node"
    ).expect("metric can be created");

    pub static ref CONNECTIONS_CREATED: IntCounterVec = IntCounterVec::new(
        Opts::new(
            "streaming_agent_connections_created_total",
            "Total number of connections created"
        ),
        &["type", "direction"]
    ).expect("metric can be created");

    pub static ref CONNECTION_FAILURES: IntCounterVec = IntCounterVec::new(
        Opts::new(
            "streaming_agent_connection_failures_total",
            "Total number of failed connection attempts"
        ),
        &["type", "direction"]
    ).expect("metric can be created");

    // Ports leased per pool (internal, srt)
    pub static ref PORTS_LEASED: IntGaugeVec = IntGaugeVec::new(
        Opts::new("streaming_agent_ports_leased", "Ports currently leased"),
        &["pool"]
    ).expect("metric can be created");

    pub static ref FAULTS_FORWARDED: IntCounter = IntCounter::new(
        "streaming_agent_faults_forwarded_total",
        "Total number of fault notifications forwarded to controllers"
    ).expect("metric can be created");
}

pub struct PrometheusReporter;

impl PrometheusReporter {
    pub fn new() -> Self {
        Self
    }

    pub fn init_metrics() -> Result<(), prometheus::Error> {
        REGISTRY.register(Box::new(ACTIVE_CONNECTIONS.clone()))?;
        REGISTRY.register(Box::new(CONNECTIONS_CREATED.clone()))?;
        REGISTRY.register(Box::new(CONNECTION_FAILURES.clone()))?;
        REGISTRY.register(Box::new(PORTS_LEASED.clone()))?;
        REGISTRY.register(Box::new(FAULTS_FORWARDED.clone()))?;
        Ok(())
    }

    pub fn gather_metrics() -> Vec<u8> {
        let encoder = TextEncoder::new();
        let metric_families = REGISTRY.gather();
        let mut buffer = vec![];
        if let Err(e) = encoder.encode(&metric_families, &mut buffer) {
            tracing::error!("Failed to encode metrics: {}", e);
            return b"# Error encoding metrics\n".to_vec();
        }
        buffer
    }
}

impl Default for PrometheusReporter {
    fn default() -> Self {
        Self::new()
    }
}

impl MetricsReporter for PrometheusReporter {
    fn report_active_connections(&self, count: usize) {
        ACTIVE_CONNECTIONS.set(count as i64);
    }

    fn report_connection_created(&self, connection_type: ConnectionType, direction: Direction) {
        CONNECTIONS_CREATED
            .with_label_values(&[connection_type.as_str(), direction.as_str()])
            .inc();
    }

    fn report_connection_failed(&self, connection_type: ConnectionType, direction: Direction) {
        CONNECTION_FAILURES
            .with_label_values(&[connection_type.as_str(), direction.as_str()])
            .inc();
    }

    fn report_ports_leased(&self, pool: &str, count: usize) {
        PORTS_LEASED.with_label_values(&[pool]).set(count as i64);
    }

    fn report_faults_forwarded(&self, count: usize) {
        FAULTS_FORWARDED.inc_by(count as u64);
    }
}
