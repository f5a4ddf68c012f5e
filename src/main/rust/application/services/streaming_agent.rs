use std::sync::Arc;

use super::av_launcher::AvTransportLauncher;
use super::connection_registry::{ConnectionRegistry, Reservation};
use super::internal_pipe_factory::InternalPipeFactory;
use super::srt_negotiator::SrtNegotiator;
use crate::domain::entities::{ConnectionEntry, ConnectionInfo, TransportHandle};
use crate::domain::errors::{DomainError, Result};
use crate::domain::ports::{
    AvTransportFactory, IngressParams, MetricsReporter, NetworkInterfaces, PipeEndpoint,
    PipeEndpointFactory, PortProbe, StatusNotifier,
};
use crate::domain::value_objects::{
    AbsentTeardown, AgentConfig, ConnectionState, ConnectionType, ControllerRef, Direction,
    FaultMessage, InternalConnectOptions, InternalEndpointInfo, InternalPipeOptions,
    PublishOptions, PublishReply, StreamingInOptions, SubscribeOptions,
};

/// Collaborators the agent is wired to
pub struct AgentDependencies {
    pub transports: Arc<dyn AvTransportFactory>,
    pub pipes: Arc<dyn PipeEndpointFactory>,
    pub probe: Arc<dyn PortProbe>,
    pub interfaces: Arc<dyn NetworkInterfaces>,
    pub notifier: Arc<dyn StatusNotifier>,
    pub metrics: Arc<dyn MetricsReporter>,
}

/// Lifecycle orchestrator for every connection on this node
///
/// Identifiers move `Absent -> Creating -> Active -> Absent`. The
/// `Creating` phase is held by a registry reservation, so concurrent
/// operations on the same id are rejected instead of interleaving.
pub struct StreamingAgent {
    config: AgentConfig,
    registry: Arc<ConnectionRegistry>,
    pipes: InternalPipeFactory,
    launcher: Arc<AvTransportLauncher>,
    srt: SrtNegotiator,
    metrics: Arc<dyn MetricsReporter>,
}

impl StreamingAgent {
    pub fn new(config: AgentConfig, deps: AgentDependencies) -> Self {
        let registry = Arc::new(ConnectionRegistry::new(
            deps.notifier.clone(),
            deps.metrics.clone(),
        ));
        let pipes = InternalPipeFactory::new(config.internal_ip(), config.internal_ports(), deps.pipes);
        let launcher = Arc::new(AvTransportLauncher::new(
            deps.transports,
            deps.notifier,
            config.initialize_timeout(),
        ));
        let srt = SrtNegotiator::new(
            config.external_ports(),
            deps.probe,
            deps.interfaces,
            config.network_interface().map(str::to_string),
            config.external_ip(),
            launcher.clone(),
            deps.metrics.clone(),
        );

        Self {
            config,
            registry,
            pipes,
            launcher,
            srt,
            metrics: deps.metrics,
        }
    }

    pub fn config(&self) -> &AgentConfig {
        &self.config
    }

    pub fn registry(&self) -> &Arc<ConnectionRegistry> {
        &self.registry
    }

    pub fn connection_count(&self) -> usize {
        self.registry.len()
    }

    pub fn connection_state(&self, id: &str) -> ConnectionState {
        self.registry.state(id)
    }

    pub fn get_connection(&self, id: &str) -> Option<ConnectionInfo> {
        self.registry.get_connection(id)
    }

    pub fn internal_ports_leased(&self) -> usize {
        self.pipes.leased_count()
    }

    pub fn srt_ports_leased(&self) -> usize {
        self.srt.leased_count()
    }

    fn report_leases(&self) {
        self.metrics
            .report_ports_leased(self.pipes.pool().name(), self.pipes.leased_count());
        self.metrics
            .report_ports_leased(self.srt.pool().name(), self.srt.leased_count());
    }

    pub async fn create_internal_connection(
        &self,
        id: &str,
        direction: Direction,
        options: InternalPipeOptions,
    ) -> Result<InternalEndpointInfo> {
        tracing::debug!(connection_id = id, %direction, protocol = ?options.protocol, "createInternalConnection");
        let info = self.pipes.create(id, direction, &options)?;
        self.report_leases();
        Ok(info)
    }

    pub async fn destroy_internal_connection(&self, id: &str, direction: Direction) -> Result<()> {
        tracing::debug!(connection_id = id, %direction, "destroyInternalConnection");

        let backs_entry = self.registry.get_connection(id).is_some_and(|info| {
            info.connection_type == ConnectionType::Internal && info.direction == direction
        });
        let destroyed = if backs_entry {
            match self.registry.remove_connection(id) {
                Some(entry) => {
                    self.release_entry(entry);
                    true
                }
                None => self.pipes.destroy(id, direction),
            }
        } else {
            self.pipes.destroy(id, direction)
        };
        self.report_leases();

        if destroyed {
            Ok(())
        } else {
            self.absent(id)
        }
    }

    /// Create an inbound connection
    pub async fn publish(
        &self,
        id: &str,
        controller: ControllerRef,
        options: PublishOptions,
    ) -> Result<PublishReply> {
        let connection_type = options.connection_type();
        tracing::debug!(connection_id = id, %connection_type, %controller, "publish");

        let result = match self.registry.reserve(id) {
            Ok(reservation) => self.publish_reserved(reservation, controller, options).await,
            Err(e) => Err(e),
        };

        match &result {
            Ok(PublishReply::SrtListening { .. }) => {}
            Ok(_) => {
                tracing::info!(connection_id = id, %connection_type, "published");
                self.metrics
                    .report_connection_created(connection_type, Direction::In);
            }
            Err(e) => {
                tracing::warn!(connection_id = id, %connection_type, "publish failed: {}", e);
                self.metrics
                    .report_connection_failed(connection_type, Direction::In);
            }
        }
        self.report_leases();
        result
    }

    async fn publish_reserved(
        &self,
        reservation: Reservation,
        controller: ControllerRef,
        options: PublishOptions,
    ) -> Result<PublishReply> {
        match options {
            PublishOptions::Internal(connect) => {
                let endpoint = self.connect_internal(reservation.id(), Direction::In, &connect)?;
                let entry =
                    ConnectionEntry::internal(reservation.id(), Direction::In, controller, endpoint);
                self.commit(reservation, entry)?;
                Ok(PublishReply::Published)
            }
            PublishOptions::Streaming(streaming) if streaming.connection.is_srt() => {
                self.srt.publish(reservation, controller, streaming).await
            }
            PublishOptions::Streaming(streaming) => {
                self.publish_streaming(reservation, controller, streaming)
                    .await
            }
        }
    }

    async fn publish_streaming(
        &self,
        reservation: Reservation,
        controller: ControllerRef,
        options: StreamingInOptions,
    ) -> Result<PublishReply> {
        let url = options.connection.require_url()?.to_string();
        let params = IngressParams::new(&options.media, &options.connection, url);
        let transport = self
            .launcher
            .launch_ingress(reservation.id(), &controller, params)
            .await?;

        let entry = ConnectionEntry::streaming(
            reservation.id(),
            Direction::In,
            controller,
            transport,
            None,
        );
        self.commit(reservation, entry)?;
        Ok(PublishReply::Published)
    }

    pub async fn unpublish(&self, id: &str) -> Result<()> {
        tracing::debug!(connection_id = id, "unpublish");
        self.teardown(id, Direction::In)
    }

    /// Create an outbound connection
    ///
    /// Streaming egress is recorded once constructed; its initialization
    /// result and later fatal errors reach the controller as statuses.
    pub async fn subscribe(
        &self,
        id: &str,
        controller: ControllerRef,
        options: SubscribeOptions,
    ) -> Result<()> {
        let connection_type = options.connection_type();
        tracing::debug!(connection_id = id, %connection_type, %controller, "subscribe");

        let result = match self.registry.reserve(id) {
            Ok(reservation) => self.subscribe_reserved(reservation, controller, options).await,
            Err(e) => Err(e),
        };

        match &result {
            Ok(()) => {
                tracing::info!(connection_id = id, %connection_type, "subscribed");
                self.metrics
                    .report_connection_created(connection_type, Direction::Out);
            }
            Err(e) => {
                tracing::warn!(connection_id = id, %connection_type, "subscribe failed: {}", e);
                self.metrics
                    .report_connection_failed(connection_type, Direction::Out);
            }
        }
        result
    }

    async fn subscribe_reserved(
        &self,
        reservation: Reservation,
        controller: ControllerRef,
        options: SubscribeOptions,
    ) -> Result<()> {
        match options {
            SubscribeOptions::Internal(connect) => {
                let endpoint = self.connect_internal(reservation.id(), Direction::Out, &connect)?;
                let entry =
                    ConnectionEntry::internal(reservation.id(), Direction::Out, controller, endpoint);
                self.commit(reservation, entry)
            }
            SubscribeOptions::Streaming(streaming) => {
                let (transport, pending) = self
                    .launcher
                    .launch_egress(reservation.id(), &controller, &streaming)
                    .await?;

                let entry = ConnectionEntry::streaming(
                    reservation.id(),
                    Direction::Out,
                    controller,
                    transport,
                    None,
                );
                self.commit(reservation, entry)?;
                pending.watch();
                Ok(())
            }
        }
    }

    pub async fn unsubscribe(&self, id: &str) -> Result<()> {
        tracing::debug!(connection_id = id, "unsubscribe");
        self.teardown(id, Direction::Out)
    }

    pub async fn linkup(
        &self,
        id: &str,
        audio_from: Option<&str>,
        video_from: Option<&str>,
    ) -> Result<()> {
        self.registry.linkup(id, audio_from, video_from)
    }

    pub async fn cutoff(&self, id: &str) -> Result<()> {
        self.registry.cutoff(id)
    }

    /// Tear down every connection on the node
    ///
    /// Creations still in flight are discarded when they finish.
    pub async fn close(&self) {
        let ids = self.registry.begin_shutdown();
        let mut released = 0;

        for id in &ids {
            match self.registry.remove_connection(id) {
                Some(entry) => {
                    self.release_entry(entry);
                    released += 1;
                }
                None => tracing::debug!(connection_id = %id, "already removed during close"),
            }
        }

        let endpoints = self.pipes.destroy_all();
        self.report_leases();

        if released > 0 || endpoints > 0 {
            tracing::info!(connections = released, endpoints, "streaming agent closed");
        }
    }

    pub fn on_fault_detected(&self, message: &FaultMessage) -> usize {
        self.registry.on_fault_detected(message)
    }

    fn connect_internal(
        &self,
        id: &str,
        direction: Direction,
        connect: &InternalConnectOptions,
    ) -> Result<Arc<dyn PipeEndpoint>> {
        let endpoint = self.pipes.fetch(id, direction).ok_or_else(|| {
            DomainError::TransportCreationFailed(format!(
                "no internal {} endpoint created for {}",
                direction, id
            ))
        })?;
        endpoint.connect(connect)?;
        Ok(endpoint)
    }

    fn commit(&self, reservation: Reservation, entry: ConnectionEntry) -> Result<()> {
        reservation.commit(entry).map_err(|rejected| {
            let (error, entry) = rejected.into_parts();
            self.release_entry(entry);
            error
        })
    }

    fn teardown(&self, id: &str, direction: Direction) -> Result<()> {
        let Some(entry) = self.registry.remove_connection(id) else {
            return self.absent(id);
        };

        if entry.direction() != direction {
            tracing::warn!(
                connection_id = id,
                expected = %direction,
                actual = %entry.direction(),
                "tearing down connection with unexpected direction"
            );
        }

        let uptime = entry.uptime();
        self.release_entry(entry);
        self.report_leases();
        tracing::info!(
            connection_id = id,
            %direction,
            uptime_secs = uptime.as_secs_f64(),
            "connection removed"
        );
        Ok(())
    }

    fn release_entry(&self, entry: ConnectionEntry) {
        let id = entry.id().to_string();
        let direction = entry.direction();

        match entry.into_handle() {
            TransportHandle::Internal(endpoint) => {
                if !self.pipes.destroy(&id, direction) {
                    endpoint.close();
                }
            }
            handle => handle.shutdown(),
        }
    }

    fn absent(&self, id: &str) -> Result<()> {
        match self.config.absent_teardown() {
            AbsentTeardown::Acknowledge => {
                tracing::debug!(connection_id = id, "teardown of absent connection acknowledged");
                Ok(())
            }
            AbsentTeardown::NotFound => Err(DomainError::NotFound(id.to_string())),
        }
    }
}
