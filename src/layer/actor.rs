use std::{sync::Arc, time::Duration};

use actix::prelude::*;
use futures::future::ready;
use log::{debug, warn};
use ndarray::{Array1, Array2, Axis};
use rand::Rng;

use super::{
    error::LayerError,
    messages::{
        ApplyUpdate, Backward, Forward, GetParameters, Gradients, SetNeighbors, UpdateParameters,
    },
};
use crate::{
    activation::Activation,
    config::LayerConfig,
    optimizer::{Optimizer, ParameterGradients, Parameters},
};

/// The `(input, pre_activation)` pair linking a forward call to its matching
/// backward call. Overwritten wholesale by every forward pass and consumed
/// by the backward pass that uses it.
struct ForwardCache {
    input: Array2<f32>,
    pre_activation: Array2<f32>,
}

/// One pipeline stage. Owns a layer's parameters and relays batches to its
/// successor and gradients to its predecessor by address.
///
/// The actor's mailbox serializes every call, so forward and backward
/// invocations never observe each other mid-mutation.
pub struct LayerActor {
    id: usize,
    input_size: usize,
    output_size: usize,
    activation: Activation,

    weights: Array2<f32>,
    bias: Array1<f32>,
    cache: Option<ForwardCache>,
    gradients: Option<ParameterGradients>,

    predecessor: Option<Recipient<Backward>>,
    successor: Option<Recipient<Forward>>,

    optimizer: Arc<dyn Optimizer>,
    relay_timeout: Duration,
}

impl LayerActor {
    /// Builds a detached layer actor from its config. Weights start uniform
    /// in [-0.5, 0.5), biases at zero; neighbors are wired afterwards with
    /// [`SetNeighbors`].
    pub fn new(config: &LayerConfig, optimizer: Arc<dyn Optimizer>, relay_timeout: Duration) -> Self {
        let mut rng = rand::rng();
        let weights = Array2::from_shape_fn((config.input_size, config.output_size), |_| {
            rng.random_range(-0.5..0.5)
        });

        Self {
            id: config.id,
            input_size: config.input_size,
            output_size: config.output_size,
            activation: config.activation,
            weights,
            bias: Array1::zeros(config.output_size),
            cache: None,
            gradients: None,
            predecessor: None,
            successor: None,
            optimizer,
            relay_timeout,
        }
    }
}

impl Actor for LayerActor {
    type Context = Context<Self>;

    fn started(&mut self, _ctx: &mut Self::Context) {
        debug!(
            "layer actor started: layer={} dims={}x{} activation={:?}",
            self.id, self.input_size, self.output_size, self.activation
        );
    }
}

impl Handler<Forward> for LayerActor {
    type Result = ResponseFuture<Result<Array2<f32>, LayerError>>;

    fn handle(&mut self, Forward(input): Forward, _ctx: &mut Self::Context) -> Self::Result {
        if input.ncols() != self.input_size {
            let err = LayerError::ShapeMismatch {
                layer: self.id,
                what: "input",
                got: input.dim(),
                expected: (input.nrows(), self.input_size),
            };
            return Box::pin(ready(Err(err)));
        }

        let z = input.dot(&self.weights) + &self.bias;
        let out = z.mapv(|v| self.activation.f(v));
        self.cache = Some(ForwardCache {
            input,
            pre_activation: z,
        });

        let Some(next) = self.successor.clone() else {
            // Tail of the chain: the activation is the prediction.
            return Box::pin(ready(Ok(out)));
        };

        let layer = self.id;
        let timeout = self.relay_timeout;
        Box::pin(async move {
            match tokio::time::timeout(timeout, next.send(Forward(out))).await {
                Err(_) => {
                    warn!("forward relay timed out: layer={layer} waited={timeout:?}");
                    Err(LayerError::RelayTimeout {
                        layer,
                        waited: timeout,
                    })
                }
                Ok(Err(e)) => {
                    warn!("forward relay unreachable: layer={layer} {e}");
                    Err(LayerError::RelayUnreachable {
                        layer,
                        reason: e.to_string(),
                    })
                }
                Ok(Ok(result)) => result,
            }
        })
    }
}

impl Handler<Backward> for LayerActor {
    type Result = Result<Gradients, LayerError>;

    fn handle(&mut self, Backward(grad): Backward, _ctx: &mut Self::Context) -> Self::Result {
        let cache = match self.cache.take() {
            Some(c) if grad.dim() == c.pre_activation.dim() => c,
            Some(c) => {
                let expected = c.pre_activation.dim();
                // A rejected gradient leaves the cache for the matching call.
                self.cache = Some(c);
                return Err(LayerError::ShapeMismatch {
                    layer: self.id,
                    what: "gradient",
                    got: grad.dim(),
                    expected,
                });
            }
            None => return Err(LayerError::MissingForwardCache { layer: self.id }),
        };

        let mut delta = grad;
        delta.zip_mut_with(&cache.pre_activation, |d, &z| *d *= self.activation.df(z));

        let weight_grad = cache.input.t().dot(&delta);
        let bias_grad = delta.sum_axis(Axis(0));
        let input_grad = self
            .predecessor
            .is_some()
            .then(|| delta.dot(&self.weights.t()));

        self.gradients = Some(ParameterGradients {
            weight_grad: weight_grad.clone(),
            bias_grad: bias_grad.clone(),
        });

        // Detached relay upstream: the caller's reply never waits on it.
        if let (Some(pred), Some(g)) = (self.predecessor.clone(), input_grad.clone()) {
            let layer = self.id;
            let timeout = self.relay_timeout;
            actix::spawn(async move {
                match tokio::time::timeout(timeout, pred.send(Backward(g))).await {
                    Err(_) => warn!("backward relay timed out: layer={layer} waited={timeout:?}"),
                    Ok(Err(e)) => warn!("backward relay unreachable: layer={layer} {e}"),
                    Ok(Ok(Err(e))) => warn!("backward relay rejected upstream: layer={layer} {e}"),
                    Ok(Ok(Ok(_))) => {}
                }
            });
        }

        Ok(Gradients {
            weight_grad,
            bias_grad,
            input_grad,
        })
    }
}

impl Handler<GetParameters> for LayerActor {
    type Result = Parameters;

    fn handle(&mut self, _msg: GetParameters, _ctx: &mut Self::Context) -> Self::Result {
        Parameters {
            weights: self.weights.clone(),
            bias: self.bias.clone(),
        }
    }
}

impl Handler<UpdateParameters> for LayerActor {
    type Result = Result<(), LayerError>;

    fn handle(&mut self, msg: UpdateParameters, _ctx: &mut Self::Context) -> Self::Result {
        let UpdateParameters(params) = msg;

        if params.weights.dim() != (self.input_size, self.output_size) {
            return Err(LayerError::ShapeMismatch {
                layer: self.id,
                what: "weights",
                got: params.weights.dim(),
                expected: (self.input_size, self.output_size),
            });
        }
        if params.bias.len() != self.output_size {
            return Err(LayerError::ShapeMismatch {
                layer: self.id,
                what: "bias",
                got: (1, params.bias.len()),
                expected: (1, self.output_size),
            });
        }

        self.weights = params.weights;
        self.bias = params.bias;
        Ok(())
    }
}

impl Handler<SetNeighbors> for LayerActor {
    type Result = ();

    fn handle(&mut self, msg: SetNeighbors, _ctx: &mut Self::Context) {
        self.predecessor = msg.predecessor;
        self.successor = msg.successor;
    }
}

impl Handler<ApplyUpdate> for LayerActor {
    type Result = ();

    fn handle(&mut self, msg: ApplyUpdate, _ctx: &mut Self::Context) {
        let Some(grads) = self.gradients.take() else {
            // Backward relay for this round is still in flight or failed.
            debug!("update skipped, no gradients buffered: layer={}", self.id);
            return;
        };

        let params = Parameters {
            weights: self.weights.clone(),
            bias: self.bias.clone(),
        };
        let updated = self.optimizer.step(params, &grads, msg.learning_rate);

        self.weights = updated.weights;
        self.bias = updated.bias;
        debug!(
            "parameters updated: layer={} lr={}",
            self.id, msg.learning_rate
        );
    }
}
