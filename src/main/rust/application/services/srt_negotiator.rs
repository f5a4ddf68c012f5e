use std::net::IpAddr;
use std::sync::Arc;

use super::av_launcher::AvTransportLauncher;
use super::connection_registry::Reservation;
use crate::domain::entities::{ConnectionEntry, PortLease, PortPool};
use crate::domain::errors::Result;
use crate::domain::ports::{IngressParams, MetricsReporter, NetworkInterfaces, PortProbe};
use crate::domain::value_objects::{
    ConnectionType, ControllerRef, Direction, PortRange, PublishReply, SessionStatus, SrtMode,
    SrtUrl, StreamingInOptions,
};

/// External SRT ingest: port discovery, URL composition and transport setup
///
/// In listener mode the controller is answered as soon as a port is
/// reserved; the transport is established in the background and its outcome
/// arrives as a status notification.
pub struct SrtNegotiator {
    pool: PortPool,
    probe: Arc<dyn PortProbe>,
    interfaces: Arc<dyn NetworkInterfaces>,
    network_interface: Option<String>,
    advertise_ip: Option<IpAddr>,
    launcher: Arc<AvTransportLauncher>,
    metrics: Arc<dyn MetricsReporter>,
}

impl SrtNegotiator {
    pub fn new(
        range: PortRange,
        probe: Arc<dyn PortProbe>,
        interfaces: Arc<dyn NetworkInterfaces>,
        network_interface: Option<String>,
        advertise_ip: Option<IpAddr>,
        launcher: Arc<AvTransportLauncher>,
        metrics: Arc<dyn MetricsReporter>,
    ) -> Self {
        Self {
            pool: PortPool::new("srt", range),
            probe,
            interfaces,
            network_interface,
            advertise_ip,
            launcher,
            metrics,
        }
    }

    pub fn pool(&self) -> &PortPool {
        &self.pool
    }

    pub fn leased_count(&self) -> usize {
        self.pool.leased_count()
    }

    fn report_leases(&self) {
        self.metrics
            .report_ports_leased(self.pool.name(), self.pool.leased_count());
    }

    /// First port in range that is neither leased here nor bound on the host
    pub async fn find_listener_port(&self) -> Result<PortLease> {
        for port in self.pool.free_ports() {
            if !self.probe.is_available(port).await {
                tracing::debug!(port, "srt port bound on host, skipping");
                continue;
            }
            if let Some(lease) = self.pool.try_lease(port) {
                return Ok(lease);
            }
        }

        tracing::warn!(range = %self.pool.range(), "no free srt listener port");
        Err(self.pool.range().exhausted())
    }

    /// Addresses a remote caller may dial to reach a local listener
    pub fn advertised_addresses(&self) -> Vec<IpAddr> {
        let mut addresses: Vec<IpAddr> = self
            .interfaces
            .ipv4_addresses(self.network_interface.as_deref())
            .into_iter()
            .map(IpAddr::V4)
            .collect();

        if let Some(ip) = self.advertise_ip {
            if !addresses.contains(&ip) {
                addresses.push(ip);
            }
        }
        addresses
    }

    pub async fn publish(
        &self,
        reservation: Reservation,
        controller: ControllerRef,
        options: StreamingInOptions,
    ) -> Result<PublishReply> {
        match options.connection.srt_mode() {
            SrtMode::Listener => self.publish_listener(reservation, controller, options).await,
            mode => self.publish_caller(reservation, controller, options, mode).await,
        }
    }

    async fn publish_listener(
        &self,
        reservation: Reservation,
        controller: ControllerRef,
        options: StreamingInOptions,
    ) -> Result<PublishReply> {
        let lease = self.find_listener_port().await?;
        let port = lease.port();
        self.report_leases();

        let passphrase = options
            .connection
            .passphrase_requested()
            .then(SrtUrl::generate_passphrase);
        let url = SrtUrl::listener(port)
            .with_latency(options.connection.latency)
            .with_listen_timeout(options.connection.listen_timeout)
            .with_passphrase(passphrase.clone());

        let id = reservation.id().to_string();
        tracing::info!(connection_id = %id, port, "srt listener reserved");

        let reply = PublishReply::SrtListening {
            ip: self.advertised_addresses(),
            port,
            streamid: id.clone(),
            passphrase,
        };

        let params = IngressParams::srt(&options.media, url.to_string());
        let listening_on = url.base().to_string();
        let launcher = self.launcher.clone();
        let metrics = self.metrics.clone();
        let pool = self.pool.clone();

        tokio::spawn(async move {
            let sink = launcher.status_sink(&controller, &id, Direction::In);

            match launcher.launch_ingress(&id, &controller, params).await {
                Ok(transport) => {
                    let entry = ConnectionEntry::streaming(
                        id.as_str(),
                        Direction::In,
                        controller,
                        transport,
                        Some(lease),
                    );
                    match reservation.commit(entry) {
                        Ok(()) => {
                            tracing::info!(connection_id = %id, listening_on = %listening_on, "srt listener established");
                            metrics.report_connection_created(ConnectionType::Streaming, Direction::In);
                            sink.report(SessionStatus::Ready {
                                info: Some(listening_on),
                            });
                        }
                        Err(rejected) => {
                            let (error, entry) = rejected.into_parts();
                            tracing::warn!(connection_id = %id, "srt listener not recorded: {}", error);
                            entry.into_handle().shutdown();
                        }
                    }
                }
                Err(e) => {
                    tracing::error!(connection_id = %id, "srt listener setup failed: {}", e);
                    drop(lease);
                    drop(reservation);
                    metrics.report_connection_failed(ConnectionType::Streaming, Direction::In);
                    sink.report(SessionStatus::from(&e));
                }
            }

            metrics.report_ports_leased(pool.name(), pool.leased_count());
        });

        Ok(reply)
    }

    async fn publish_caller(
        &self,
        reservation: Reservation,
        controller: ControllerRef,
        options: StreamingInOptions,
        mode: SrtMode,
    ) -> Result<PublishReply> {
        let url = SrtUrl::remote(options.connection.require_url()?, mode)?
            .with_latency(options.connection.latency)
            .with_passphrase(options.connection.passphrase.clone());

        let id = reservation.id().to_string();
        tracing::debug!(connection_id = %id, %mode, peer = url.base(), "dialing srt peer");

        let params = IngressParams::srt(&options.media, url.to_string());
        let transport = self.launcher.launch_ingress(&id, &controller, params).await?;

        let entry = ConnectionEntry::streaming(id.as_str(), Direction::In, controller, transport, None);
        if let Err(rejected) = reservation.commit(entry) {
            let (error, entry) = rejected.into_parts();
            entry.into_handle().shutdown();
            return Err(error);
        }

        tracing::info!(connection_id = %id, %mode, "srt caller established");
        Ok(PublishReply::SrtCalling { streamid: id })
    }
}
