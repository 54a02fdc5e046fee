use serde::Serialize;
use tokio::sync::broadcast;

// Late subscribers miss older events; there is no replay.
const CHANNEL_CAPACITY: usize = 32;

/// Progress event published on the broadcast channel every
/// [`PROGRESS_INTERVAL`](crate::config::PROGRESS_INTERVAL) epochs, for the
/// observability layer to consume. Delivery is best effort.
#[derive(Debug, Clone, Serialize)]
pub struct TrainingProgress {
    pub epoch: usize,
    pub loss: f32,
    pub total_epochs: usize,
}

pub(crate) fn channel() -> broadcast::Sender<TrainingProgress> {
    broadcast::channel(CHANNEL_CAPACITY).0
}
