mod error;
mod orchestrator;
mod progress;
mod training;

pub use error::OrchestraError;
pub use orchestrator::{LayerHandle, LayerInfo, Orchestrator};
pub use progress::TrainingProgress;
pub use training::{EpochLoss, TrainingState, FAILED_EPOCH_LOSS};
