use actix::prelude::*;
use ndarray::{Array1, Array2};

use super::error::LayerError;
use crate::optimizer::Parameters;

/// A batch of activations flowing toward the tail. The reply carries the
/// terminal prediction of the whole downstream chain.
#[derive(Message)]
#[rtype(result = "Result<Array2<f32>, LayerError>")]
pub struct Forward(pub Array2<f32>);

/// A loss gradient flowing toward the head.
#[derive(Message)]
#[rtype(result = "Result<Gradients, LayerError>")]
pub struct Backward(pub Array2<f32>);

/// Reply to a [`Backward`] call.
#[derive(Debug, Clone)]
pub struct Gradients {
    pub weight_grad: Array2<f32>,
    pub bias_grad: Array1<f32>,
    /// Present only when the layer has a predecessor to relay to.
    pub input_grad: Option<Array2<f32>>,
}

/// Snapshot read of the layer's current parameters.
#[derive(Message)]
#[rtype(result = "Parameters")]
pub struct GetParameters;

/// Wholesale parameter replacement; shapes must match the layer's dims.
#[derive(Message)]
#[rtype(result = "Result<(), LayerError>")]
pub struct UpdateParameters(pub Parameters);

/// Rewires the layer's neighbor handles. Addresses only, no ownership.
#[derive(Message)]
#[rtype(result = "()")]
pub struct SetNeighbors {
    pub predecessor: Option<Recipient<Backward>>,
    pub successor: Option<Recipient<Forward>>,
}

/// Fire-and-forget trigger for one optimizer step over the buffered
/// gradients. Skipped when no backward pass has reached this layer yet.
#[derive(Message)]
#[rtype(result = "()")]
pub struct ApplyUpdate {
    pub learning_rate: f32,
}
