use tokio::sync::mpsc;

use crate::domain::ports::StatusNotifier;
use crate::domain::value_objects::StatusNotification;

/// Forwards status notifications into an unbounded channel
///
/// The receiving side relays them to controllers.
#[derive(Debug, Clone)]
pub struct ChannelNotifier {
    tx: mpsc::UnboundedSender<StatusNotification>,
}

impl ChannelNotifier {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<StatusNotification>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }
}

impl StatusNotifier for ChannelNotifier {
    fn notify(&self, notification: StatusNotification) {
        if let Err(e) = self.tx.send(notification) {
            tracing::warn!(
                connection_id = %e.0.session_id,
                "status notification dropped, receiver closed"
            );
        }
    }
}
