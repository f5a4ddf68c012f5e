#![allow(dead_code)]

use std::collections::HashSet;
use std::future::Future;
use std::net::{IpAddr, Ipv4Addr};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::{oneshot, Notify};

use streaming_agent::{
    AgentConfig, AgentDependencies, AvTransport, AvTransportFactory, ConnectionType, Direction,
    DomainError, EgressParams, EgressTransport, IngressParams, InitializationResult,
    InternalConnectOptions, InternalPipeOptions, MetricsReporter, NetworkInterfaces, PipeEndpoint,
    PipeEndpointFactory, PortProbe, Result, SessionStatus, StatusNotification, StatusNotifier,
    StatusSink, StreamingAgent,
};
use streaming_agent::domain::value_objects::PortRange;

pub struct FakeTransport {
    closed: Arc<AtomicUsize>,
}

impl AvTransport for FakeTransport {
    fn close(self: Box<Self>) {
        self.closed.fetch_add(1, Ordering::SeqCst);
    }
}

/// AV back-end double: records parameters and status sinks, can fail or hold construction
#[derive(Default)]
pub struct FakeTransports {
    pub fail_ingress: AtomicBool,
    pub egress_outcome: Mutex<Option<InitializationResult>>,
    pub gate: Mutex<Option<Arc<Notify>>>,
    pub closed: Arc<AtomicUsize>,
    pub ingress_params: Mutex<Vec<IngressParams>>,
    pub egress_params: Mutex<Vec<EgressParams>>,
    pub sinks: Mutex<Vec<StatusSink>>,
}

impl FakeTransports {
    /// Hold every construction until the returned gate is notified
    pub fn hold(&self) -> Arc<Notify> {
        let gate = Arc::new(Notify::new());
        *self.gate.lock().unwrap() = Some(gate.clone());
        gate
    }

    pub fn closed(&self) -> usize {
        self.closed.load(Ordering::SeqCst)
    }

    pub fn ingress_urls(&self) -> Vec<String> {
        self.ingress_params
            .lock()
            .unwrap()
            .iter()
            .map(|p| p.url.clone())
            .collect()
    }

    pub fn ingress_params(&self) -> Vec<IngressParams> {
        self.ingress_params.lock().unwrap().clone()
    }

    /// Status sink handed to the transport constructed for `connection_id`
    pub fn sink(&self, connection_id: &str) -> Option<StatusSink> {
        self.sinks
            .lock()
            .unwrap()
            .iter()
            .rev()
            .find(|s| s.session_id() == connection_id)
            .cloned()
    }

    async fn wait_gate(&self) {
        let gate = self.gate.lock().unwrap().clone();
        if let Some(gate) = gate {
            gate.notified().await;
        }
    }
}

#[async_trait]
impl AvTransportFactory for FakeTransports {
    async fn create_ingress(
        &self,
        _connection_id: &str,
        params: IngressParams,
        status: StatusSink,
    ) -> Result<Box<dyn AvTransport>> {
        self.ingress_params.lock().unwrap().push(params);
        self.sinks.lock().unwrap().push(status);
        self.wait_gate().await;

        if self.fail_ingress.load(Ordering::SeqCst) {
            return Err(DomainError::TransportCreationFailed(
                "source unreachable".to_string(),
            ));
        }
        Ok(Box::new(FakeTransport {
            closed: self.closed.clone(),
        }))
    }

    async fn create_egress(
        &self,
        _connection_id: &str,
        params: EgressParams,
        status: StatusSink,
    ) -> Result<EgressTransport> {
        self.egress_params.lock().unwrap().push(params);
        self.sinks.lock().unwrap().push(status);
        self.wait_gate().await;

        let (tx, rx) = oneshot::channel();
        let outcome = self.egress_outcome.lock().unwrap().clone().unwrap_or(Ok(()));
        let _ = tx.send(outcome);

        Ok(EgressTransport {
            transport: Box::new(FakeTransport {
                closed: self.closed.clone(),
            }),
            initialized: rx,
        })
    }
}

pub struct FakeEndpoint {
    port: u16,
    pub connected: Mutex<Option<InternalConnectOptions>>,
    pub closed: AtomicBool,
}

impl PipeEndpoint for FakeEndpoint {
    fn local_port(&self) -> u16 {
        self.port
    }

    fn connect(&self, options: &InternalConnectOptions) -> Result<()> {
        *self.connected.lock().unwrap() = Some(*options);
        Ok(())
    }

    fn close(&self) {
        self.closed.store(true, Ordering::SeqCst);
    }
}

#[derive(Default)]
pub struct FakeEndpoints {
    pub opened: Mutex<Vec<Arc<FakeEndpoint>>>,
}

impl FakeEndpoints {
    pub fn open_count(&self) -> usize {
        self.opened
            .lock()
            .unwrap()
            .iter()
            .filter(|e| !e.closed.load(Ordering::SeqCst))
            .count()
    }
}

impl PipeEndpointFactory for FakeEndpoints {
    fn open(
        &self,
        _ip: IpAddr,
        port: u16,
        _direction: Direction,
        _options: &InternalPipeOptions,
    ) -> Result<Arc<dyn PipeEndpoint>> {
        let endpoint = Arc::new(FakeEndpoint {
            port,
            connected: Mutex::new(None),
            closed: AtomicBool::new(false),
        });
        self.opened.lock().unwrap().push(endpoint.clone());
        Ok(endpoint)
    }
}

/// Ports reported as bound by some other process
#[derive(Default)]
pub struct FakeProbe {
    pub taken: Mutex<HashSet<u16>>,
}

impl FakeProbe {
    pub fn take(&self, port: u16) {
        self.taken.lock().unwrap().insert(port);
    }
}

#[async_trait]
impl PortProbe for FakeProbe {
    async fn is_available(&self, port: u16) -> bool {
        !self.taken.lock().unwrap().contains(&port)
    }
}

pub struct FakeInterfaces;

impl NetworkInterfaces for FakeInterfaces {
    fn ipv4_addresses(&self, _interface: Option<&str>) -> Vec<Ipv4Addr> {
        vec![Ipv4Addr::new(192, 168, 1, 10)]
    }
}

#[derive(Default)]
pub struct RecordingNotifier {
    pub notifications: Mutex<Vec<StatusNotification>>,
}

impl RecordingNotifier {
    pub fn statuses(&self, session_id: &str) -> Vec<SessionStatus> {
        self.notifications
            .lock()
            .unwrap()
            .iter()
            .filter(|n| n.session_id == session_id)
            .map(|n| n.status.clone())
            .collect()
    }

    pub fn all(&self) -> Vec<StatusNotification> {
        self.notifications.lock().unwrap().clone()
    }
}

impl StatusNotifier for RecordingNotifier {
    fn notify(&self, notification: StatusNotification) {
        self.notifications.lock().unwrap().push(notification);
    }
}

pub struct NoopMetrics;

impl MetricsReporter for NoopMetrics {
    fn report_active_connections(&self, _count: usize) {}
    fn report_connection_created(&self, _: ConnectionType, _: Direction) {}
    fn report_connection_failed(&self, _: ConnectionType, _: Direction) {}
    fn report_ports_leased(&self, _pool: &str, _count: usize) {}
    fn report_faults_forwarded(&self, _count: usize) {}
}

/// Internal range [9000, 9002], external range [10000, 10002]
pub fn test_config() -> AgentConfig {
    AgentConfig::new(
        PortRange::new(9000, 9002).unwrap(),
        PortRange::new(10000, 10002).unwrap(),
    )
    .with_initialize_timeout(Duration::from_secs(5))
}

pub struct Harness {
    pub agent: Arc<StreamingAgent>,
    pub transports: Arc<FakeTransports>,
    pub endpoints: Arc<FakeEndpoints>,
    pub probe: Arc<FakeProbe>,
    pub notifier: Arc<RecordingNotifier>,
}

impl Harness {
    pub fn new() -> Self {
        Self::with_config(test_config())
    }

    pub fn with_config(config: AgentConfig) -> Self {
        let transports = Arc::new(FakeTransports::default());
        let endpoints = Arc::new(FakeEndpoints::default());
        let probe = Arc::new(FakeProbe::default());
        let notifier = Arc::new(RecordingNotifier::default());

        let agent = Arc::new(StreamingAgent::new(
            config,
            AgentDependencies {
                transports: transports.clone(),
                pipes: endpoints.clone(),
                probe: probe.clone(),
                interfaces: Arc::new(FakeInterfaces),
                notifier: notifier.clone(),
                metrics: Arc::new(NoopMetrics),
            },
        ));

        Self {
            agent,
            transports,
            endpoints,
            probe,
            notifier,
        }
    }
}

pub fn loopback() -> IpAddr {
    IpAddr::V4(Ipv4Addr::LOCALHOST)
}

/// Poll `condition` until it holds or two seconds pass
pub async fn wait_for<F>(mut condition: F) -> bool
where
    F: FnMut() -> bool,
{
    for _ in 0..200 {
        if condition() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    condition()
}

/// Run `future` with a generous upper bound so a hung test fails instead of stalling
pub async fn bounded<T>(future: impl Future<Output = T>) -> T {
    tokio::time::timeout(Duration::from_secs(10), future)
        .await
        .expect("operation did not finish in time")
}
