use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;

use anyhow::Context;
use async_trait::async_trait;
use gstreamer::prelude::*;
use serde_json::json;
use tokio::sync::oneshot;

use super::PipelineBuilder;
use crate::domain::errors::{DomainError, Result};
use crate::domain::ports::{
    AvTransport, AvTransportFactory, EgressParams, EgressTransport, IngressParams,
    InitializationResult, StatusSink,
};
use crate::domain::value_objects::SessionStatus;

/// Timeout for bus polling (100ms allows responsive shutdown)
const BUS_POLL_TIMEOUT_MS: u64 = 100;

/// How the first transition to `Playing` is announced
enum Initialization {
    Progress,
    Channel(oneshot::Sender<InitializationResult>),
}

/// AV transports backed by GStreamer launch pipelines
#[derive(Debug, Default)]
pub struct GStreamerTransportFactory;

impl GStreamerTransportFactory {
    pub fn new() -> Self {
        Self
    }

    fn create_pipeline(pipeline_str: &str) -> anyhow::Result<gstreamer::Pipeline> {
        let pipeline = gstreamer::parse::launch(pipeline_str)
            .context("Failed to parse pipeline")?
            .downcast::<gstreamer::Pipeline>()
            .map_err(|_| anyhow::anyhow!("Failed to downcast to Pipeline"))?;

        Ok(pipeline)
    }

    fn start(
        connection_id: &str,
        pipeline_str: &str,
        sink: StatusSink,
        initialization: Initialization,
    ) -> Result<GStreamerTransport> {
        tracing::info!(connection_id, "Creating pipeline: {}", pipeline_str);

        let pipeline = Self::create_pipeline(pipeline_str)
            .map_err(|e| DomainError::TransportCreationFailed(format!("{:#}", e)))?;

        if let Err(e) = pipeline.set_state(gstreamer::State::Playing) {
            let _ = pipeline.set_state(gstreamer::State::Null);
            return Err(DomainError::TransportCreationFailed(e.to_string()));
        }

        let bus = pipeline.bus().ok_or_else(|| {
            DomainError::TransportCreationFailed("Failed to get bus".to_string())
        })?;

        let running = Arc::new(AtomicBool::new(true));
        let watcher = BusWatcher {
            pipeline: pipeline.clone(),
            running: running.clone(),
            tracker: InitializationTracker::new(sink, initialization),
        };

        let spawned = thread::Builder::new()
            .name(format!("bus-{}", connection_id))
            .spawn(move || watcher.run(bus));
        if let Err(e) = spawned {
            let _ = pipeline.set_state(gstreamer::State::Null);
            return Err(DomainError::TransportCreationFailed(e.to_string()));
        }

        Ok(GStreamerTransport { pipeline, running })
    }
}

/// Run pipeline setup on the blocking pool; GStreamer state changes block the calling thread
async fn run_blocking<T, F>(setup: F) -> Result<T>
where
    F: FnOnce() -> Result<T> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(setup).await.map_err(|e| {
        DomainError::TransportCreationFailed(format!("pipeline setup task failed: {}", e))
    })?
}

#[async_trait]
impl AvTransportFactory for GStreamerTransportFactory {
    async fn create_ingress(
        &self,
        connection_id: &str,
        params: IngressParams,
        status: StatusSink,
    ) -> Result<Box<dyn AvTransport>> {
        let pipeline_str = PipelineBuilder::build_ingress_string(&params);
        let connection_id = connection_id.to_string();

        let transport = run_blocking(move || {
            Self::start(&connection_id, &pipeline_str, status, Initialization::Progress)
        })
        .await?;
        Ok(Box::new(transport))
    }

    async fn create_egress(
        &self,
        connection_id: &str,
        params: EgressParams,
        status: StatusSink,
    ) -> Result<EgressTransport> {
        let pipeline_str = PipelineBuilder::build_egress_string(&params);
        let connection_id = connection_id.to_string();
        let (tx, rx) = oneshot::channel();

        let transport = run_blocking(move || {
            Self::start(&connection_id, &pipeline_str, status, Initialization::Channel(tx))
        })
        .await?;

        Ok(EgressTransport {
            transport: Box::new(transport),
            initialized: rx,
        })
    }
}

/// Running pipeline plus the flag stopping its bus watcher
///
/// Dropping it stops the pipeline, including when setup finishes after the
/// caller has given up waiting.
pub struct GStreamerTransport {
    pipeline: gstreamer::Pipeline,
    running: Arc<AtomicBool>,
}

impl AvTransport for GStreamerTransport {
    fn close(self: Box<Self>) {}
}

impl Drop for GStreamerTransport {
    fn drop(&mut self) {
        self.running.store(false, Ordering::SeqCst);
        if let Err(e) = self.pipeline.set_state(gstreamer::State::Null) {
            tracing::warn!("Failed to stop pipeline: {}", e);
        }
    }
}

struct BusWatcher {
    pipeline: gstreamer::Pipeline,
    running: Arc<AtomicBool>,
    tracker: InitializationTracker,
}

impl BusWatcher {
    fn run(mut self, bus: gstreamer::Bus) {
        // Use a timed pop to allow periodic shutdown checks
        let timeout = gstreamer::ClockTime::from_mseconds(BUS_POLL_TIMEOUT_MS);

        while self.running.load(Ordering::SeqCst) {
            if let Some(msg) = bus.timed_pop(timeout) {
                if self.process_bus_message(&msg) {
                    break;
                }
            }
        }

        tracing::debug!(connection_id = %self.tracker.sink.session_id(), "bus watcher stopped");
    }

    /// Returns true when the pipeline is finished
    fn process_bus_message(&mut self, msg: &gstreamer::Message) -> bool {
        let live = self.running.load(Ordering::SeqCst);

        match msg.view() {
            gstreamer::MessageView::Eos(_) => {
                tracing::info!(connection_id = %self.tracker.sink.session_id(), "End of stream");
                let _ = self.pipeline.set_state(gstreamer::State::Null);
                self.tracker.end_of_stream(live);
                true
            }
            gstreamer::MessageView::Error(err) => {
                let error_msg = format!(
                    "Error from {:?}: {} ({:?})",
                    err.src().map(|s| s.path_string()),
                    err.error(),
                    err.debug()
                );
                let _ = self.pipeline.set_state(gstreamer::State::Null);
                self.tracker.error(error_msg, live);
                true
            }
            gstreamer::MessageView::StateChanged(state_changed) => {
                let from_pipeline = state_changed
                    .src()
                    .map(|s| s == &self.pipeline)
                    .unwrap_or(false);

                if from_pipeline {
                    tracing::debug!(
                        connection_id = %self.tracker.sink.session_id(),
                        "Pipeline state changed from {:?} to {:?}",
                        state_changed.old(),
                        state_changed.current()
                    );
                    if state_changed.current() == gstreamer::State::Playing {
                        self.tracker.initialized();
                    }
                }
                false
            }
            gstreamer::MessageView::Warning(warn) => {
                tracing::warn!(
                    connection_id = %self.tracker.sink.session_id(),
                    "Warning from {:?}: {} ({:?})",
                    warn.src().map(|s| s.path_string()),
                    warn.error(),
                    warn.debug()
                );
                false
            }
            _ => false,
        }
    }
}

/// Routes pipeline milestones either to a pending egress initialization or
/// to the controller as status notifications
struct InitializationTracker {
    sink: StatusSink,
    initialization: Option<Initialization>,
}

impl InitializationTracker {
    fn new(sink: StatusSink, initialization: Initialization) -> Self {
        Self {
            sink,
            initialization: Some(initialization),
        }
    }

    fn initialized(&mut self) {
        match self.initialization.take() {
            Some(Initialization::Channel(tx)) => {
                let _ = tx.send(Ok(()));
            }
            Some(Initialization::Progress) => {
                self.sink.report(SessionStatus::Progress {
                    details: json!({"state": "playing"}),
                });
            }
            None => {}
        }
    }

    /// Resolve a pending initialization with an error, returns whether one was pending
    fn fail(&mut self, reason: String) -> bool {
        match self.initialization.take() {
            Some(Initialization::Channel(tx)) => {
                let _ = tx.send(Err(reason));
                true
            }
            Some(Initialization::Progress) | None => false,
        }
    }

    /// `live` is false once the transport has been closed
    fn error(&mut self, reason: String, live: bool) {
        if !self.fail(reason.clone()) && live {
            self.sink.fatal(reason);
        }
    }

    fn end_of_stream(&mut self, live: bool) {
        if !self.fail("end of stream before initialization".to_string()) && live {
            self.sink.report(SessionStatus::Progress {
                details: json!({"event": "eos"}),
            });
        }
    }
}
