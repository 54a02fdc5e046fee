use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::activation::Activation;

/// Identifier of a cluster node. The local node always exists.
pub type NodeId = String;

/// Upper bound on a single cross-layer relay round-trip.
pub const DEFAULT_RELAY_TIMEOUT: Duration = Duration::from_secs(10);

/// A progress event is published every this many epochs.
pub const PROGRESS_INTERVAL: usize = 10;

/// Immutable descriptor of one layer in the pipeline, ordered by `id`.
///
/// Consumed once by `initialize_network` to construct a layer actor. A
/// config without an explicit `node` gets one assigned round-robin by the
/// placement registry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LayerConfig {
    pub id: usize,
    pub input_size: usize,
    pub output_size: usize,
    pub activation: Activation,
    #[serde(default)]
    pub node: Option<NodeId>,
}

impl LayerConfig {
    pub fn new(id: usize, input_size: usize, output_size: usize, activation: Activation) -> Self {
        Self {
            id,
            input_size,
            output_size,
            activation,
            node: None,
        }
    }

    /// Pins this layer to an explicit node instead of round-robin placement.
    pub fn on_node(mut self, node: impl Into<NodeId>) -> Self {
        self.node = Some(node.into());
        self
    }
}
