use std::{error::Error, fmt};

use crate::{config::NodeId, layer::LayerError};

/// All errors surfaced at the orchestrator boundary.
#[derive(Debug)]
pub enum OrchestraError {
    /// An operation that needs a topology ran before `initialize_network`.
    NoLayers,
    /// The given layer configs cannot form a pipeline.
    InvalidTopology(String),
    /// A config names a node that never joined the cluster.
    UnknownNode { node: NodeId, layer: usize },
    /// Training data does not fit the topology's boundary dimensions.
    InvalidInput {
        what: &'static str,
        got: usize,
        expected: usize,
    },
    /// A layer answered the call with its own failure.
    LayerCall { layer: usize, source: LayerError },
    /// A layer's mailbox is gone or the call timed out at this boundary.
    LayerUnreachable { layer: usize, reason: String },
}

impl fmt::Display for OrchestraError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NoLayers => write!(f, "no layers: the network is not initialized"),
            Self::InvalidTopology(msg) => write!(f, "invalid topology: {msg}"),
            Self::UnknownNode { node, layer } => {
                write!(f, "layer {layer} is assigned to unknown node {node}")
            }
            Self::InvalidInput {
                what,
                got,
                expected,
            } => write!(f, "invalid {what}: got {got}, expected {expected}"),
            Self::LayerCall { layer, source } => write!(f, "layer {layer} call failed: {source}"),
            Self::LayerUnreachable { layer, reason } => {
                write!(f, "layer {layer} unreachable: {reason}")
            }
        }
    }
}

impl Error for OrchestraError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::LayerCall { source, .. } => Some(source),
            _ => None,
        }
    }
}
