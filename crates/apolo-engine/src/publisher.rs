//! In-process threshold event bus

use apolo_core::models::ThresholdEvent;
use apolo_core::traits::EventPublisher;
use apolo_core::AppResult;
use async_trait::async_trait;
use tokio::sync::broadcast;
use tracing::debug;

/// Broadcasts events to every live subscriber; events published with no
/// subscriber are dropped
#[derive(Clone)]
pub struct BroadcastPublisher {
    sender: broadcast::Sender<ThresholdEvent>,
}

impl BroadcastPublisher {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<ThresholdEvent> {
        self.sender.subscribe()
    }
}

#[async_trait]
impl EventPublisher for BroadcastPublisher {
    async fn publish(&self, event: ThresholdEvent) -> AppResult<()> {
        let event_type = event.event_type().to_string();
        match self.sender.send(event) {
            Ok(receivers) => debug!(event_type = %event_type, receivers, "Event published"),
            Err(_) => debug!(event_type = %event_type, "No subscribers for event"),
        }
        Ok(())
    }
}
