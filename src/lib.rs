pub mod activation;
pub mod config;
pub mod layer;
pub mod loss;
pub mod optimizer;
pub mod orchestra;
pub mod placement;

pub use activation::Activation;
pub use config::{LayerConfig, NodeId, DEFAULT_RELAY_TIMEOUT, PROGRESS_INTERVAL};
pub use layer::{LayerActor, LayerError};
pub use optimizer::{GradientDescent, Optimizer, ParameterGradients, Parameters};
pub use orchestra::{
    EpochLoss, LayerHandle, LayerInfo, OrchestraError, Orchestrator, TrainingProgress,
    FAILED_EPOCH_LOSS,
};
pub use placement::PlacementRegistry;
