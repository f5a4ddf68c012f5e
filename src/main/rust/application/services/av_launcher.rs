use std::sync::Arc;
use std::time::Duration;

use tokio::sync::oneshot;
use tokio::time::timeout;

use crate::domain::errors::{DomainError, Result};
use crate::domain::ports::{
    AvTransport, AvTransportFactory, EgressParams, IngressParams, InitializationResult,
    StatusNotifier, StatusSink,
};
use crate::domain::value_objects::{ControllerRef, Direction, SessionStatus, StreamingOutOptions};

/// Bounds AV transport construction and wires up status reporting
pub struct AvTransportLauncher {
    transports: Arc<dyn AvTransportFactory>,
    notifier: Arc<dyn StatusNotifier>,
    initialize_timeout: Duration,
}

impl AvTransportLauncher {
    pub fn new(
        transports: Arc<dyn AvTransportFactory>,
        notifier: Arc<dyn StatusNotifier>,
        initialize_timeout: Duration,
    ) -> Self {
        Self {
            transports,
            notifier,
            initialize_timeout,
        }
    }

    pub fn status_sink(&self, controller: &ControllerRef, id: &str, direction: Direction) -> StatusSink {
        StatusSink::new(self.notifier.clone(), controller.clone(), id, direction)
    }

    pub fn initialize_timeout(&self) -> Duration {
        self.initialize_timeout
    }

    pub async fn launch_ingress(
        &self,
        id: &str,
        controller: &ControllerRef,
        params: IngressParams,
    ) -> Result<Box<dyn AvTransport>> {
        tracing::debug!(connection_id = id, url = %params.url, "creating ingress transport");
        let sink = self.status_sink(controller, id, Direction::In);

        timeout(
            self.initialize_timeout,
            self.transports.create_ingress(id, params, sink),
        )
        .await
        .map_err(|_| {
            DomainError::TransportCreationFailed(format!(
                "initialization timed out after {}ms",
                self.initialize_timeout.as_millis()
            ))
        })?
    }

    /// Construct an egress transport; its initialization completes later
    pub async fn launch_egress(
        &self,
        id: &str,
        controller: &ControllerRef,
        options: &StreamingOutOptions,
    ) -> Result<(Box<dyn AvTransport>, PendingInitialization)> {
        options.connection.ensure_target_available()?;

        tracing::debug!(connection_id = id, url = %options.connection.url, "creating egress transport");
        let sink = self.status_sink(controller, id, Direction::Out);
        let params = EgressParams::new(options, self.initialize_timeout);

        let egress = timeout(
            self.initialize_timeout,
            self.transports.create_egress(id, params, sink.clone()),
        )
        .await
        .map_err(|_| {
            DomainError::TransportCreationFailed(format!(
                "construction timed out after {}ms",
                self.initialize_timeout.as_millis()
            ))
        })??;

        Ok((
            egress.transport,
            PendingInitialization {
                initialized: egress.initialized,
                sink,
                target: options.connection.url.clone(),
                timeout: self.initialize_timeout,
            },
        ))
    }
}

/// Egress initialization still in flight
#[derive(Debug)]
pub struct PendingInitialization {
    initialized: oneshot::Receiver<InitializationResult>,
    sink: StatusSink,
    target: String,
    timeout: Duration,
}

impl PendingInitialization {
    /// Forward the initialization outcome to the controller as a status
    pub fn watch(self) {
        tokio::spawn(async move {
            let status = match timeout(self.timeout, self.initialized).await {
                Ok(Ok(Ok(()))) => SessionStatus::Ready {
                    info: Some(self.target.clone()),
                },
                Ok(Ok(Err(reason))) => SessionStatus::failed(reason),
                Ok(Err(_)) => {
                    SessionStatus::failed("transport dropped before initialization completed")
                }
                Err(_) => SessionStatus::failed(format!(
                    "initialization timed out after {}ms",
                    self.timeout.as_millis()
                )),
            };

            if status.is_failure() {
                tracing::warn!(
                    connection_id = %self.sink.session_id(),
                    destination = %self.target,
                    "egress initialization failed"
                );
            } else {
                tracing::info!(
                    connection_id = %self.sink.session_id(),
                    destination = %self.target,
                    "egress initialized"
                );
            }
            self.sink.report(status);
        });
    }
}
