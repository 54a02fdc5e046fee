mod actor;
mod error;
pub mod messages;

pub use actor::LayerActor;
pub use error::LayerError;
