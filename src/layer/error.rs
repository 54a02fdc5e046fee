use std::{error::Error, fmt, time::Duration};

/// Failures produced by a single layer-actor call.
///
/// Precondition violations (`MissingForwardCache`, `ShapeMismatch`) are fatal
/// to the call that triggered them and leave the actor's state untouched.
/// Relay variants report a successor or predecessor that could not be
/// reached in time.
#[derive(Debug)]
pub enum LayerError {
    /// A backward pass was requested with no matching forward pass cached.
    MissingForwardCache { layer: usize },
    /// An input, gradient or parameter set does not match the layer's dims.
    ShapeMismatch {
        layer: usize,
        what: &'static str,
        got: (usize, usize),
        expected: (usize, usize),
    },
    /// The next hop did not answer within the relay bound.
    RelayTimeout { layer: usize, waited: Duration },
    /// The next hop's mailbox is gone or rejected the call.
    RelayUnreachable { layer: usize, reason: String },
}

impl fmt::Display for LayerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LayerError::MissingForwardCache { layer } => {
                write!(f, "backward without a prior forward at layer {layer}")
            }
            LayerError::ShapeMismatch {
                layer,
                what,
                got,
                expected,
            } => write!(
                f,
                "shape mismatch for {what} at layer {layer}: got {}x{}, expected {}x{}",
                got.0, got.1, expected.0, expected.1
            ),
            LayerError::RelayTimeout { layer, waited } => {
                write!(f, "relay from layer {layer} timed out after {waited:?}")
            }
            LayerError::RelayUnreachable { layer, reason } => {
                write!(f, "relay from layer {layer} unreachable: {reason}")
            }
        }
    }
}

impl Error for LayerError {}
