use actix::prelude::*;
use ndarray::{Array1, Array2};

/// A layer's full parameter set: weights (input x output) and bias.
#[derive(Debug, Clone, MessageResponse)]
pub struct Parameters {
    pub weights: Array2<f32>,
    pub bias: Array1<f32>,
}

/// Gradients matching a [`Parameters`] pair, produced by one backward pass.
#[derive(Debug, Clone)]
pub struct ParameterGradients {
    pub weight_grad: Array2<f32>,
    pub bias_grad: Array1<f32>,
}

/// Defines the strategy for updating a layer's parameters from its gradients.
///
/// An `Optimizer` is responsible for the mathematical transition of parameters
/// from state `t` to `t+1`. One instance is shared across every layer actor,
/// and each actor applies it to its own buffered gradients.
pub trait Optimizer: Send + Sync {
    /// Produces the updated parameters for one layer.
    ///
    /// # Arguments
    /// * `params` - The layer's current parameters.
    /// * `grads` - The gradients buffered by the layer's last backward pass.
    /// * `learning_rate` - Step size for this update round.
    ///
    /// # Returns
    /// The parameters the layer should hold after the update.
    fn step(&self, params: Parameters, grads: &ParameterGradients, learning_rate: f32)
        -> Parameters;
}

/// Plain gradient descent: `w -= lr * gw`, `b -= lr * gb`.
#[derive(Debug, Default, Clone, Copy)]
pub struct GradientDescent;

impl GradientDescent {
    pub fn new() -> Self {
        Self
    }
}

impl Optimizer for GradientDescent {
    fn step(
        &self,
        mut params: Parameters,
        grads: &ParameterGradients,
        learning_rate: f32,
    ) -> Parameters {
        params
            .weights
            .zip_mut_with(&grads.weight_grad, |w, g| *w -= learning_rate * g);
        params
            .bias
            .zip_mut_with(&grads.bias_grad, |b, g| *b -= learning_rate * g);
        params
    }
}
