use std::{collections::HashSet, sync::Arc, time::Duration};

use actix::{Actor, Addr};
use log::{info, warn};
use ndarray::Array2;
use serde::Serialize;
use tokio::sync::broadcast;

use super::{
    error::OrchestraError,
    progress::{self, TrainingProgress},
    training::{EpochLoss, TrainingState, FAILED_EPOCH_LOSS},
};
use crate::{
    activation::Activation,
    config::{LayerConfig, NodeId, DEFAULT_RELAY_TIMEOUT, PROGRESS_INTERVAL},
    layer::{
        messages::{ApplyUpdate, Backward, Forward, GetParameters, SetNeighbors},
        LayerActor,
    },
    loss,
    optimizer::{GradientDescent, Optimizer},
    placement::PlacementRegistry,
};

/// One entry of the topology view: a layer's address plus the static facts
/// needed to route to it.
pub struct LayerHandle {
    id: usize,
    addr: Addr<LayerActor>,
    node: NodeId,
    input_size: usize,
    output_size: usize,
    activation: Activation,
}

impl LayerHandle {
    pub fn id(&self) -> usize {
        self.id
    }

    pub fn addr(&self) -> &Addr<LayerActor> {
        &self.addr
    }

    pub fn node(&self) -> &NodeId {
        &self.node
    }

    pub fn input_size(&self) -> usize {
        self.input_size
    }

    pub fn output_size(&self) -> usize {
        self.output_size
    }

    pub fn activation(&self) -> Activation {
        self.activation
    }
}

/// Per-layer descriptor reported to the observability layer, parameter
/// shapes read live from the actor.
#[derive(Debug, Clone, Serialize)]
pub struct LayerInfo {
    pub id: usize,
    pub node: NodeId,
    pub activation: Activation,
    pub input_size: usize,
    pub output_size: usize,
    pub weight_shape: (usize, usize),
    pub bias_size: usize,
}

/// Drives the layer-actor pipeline: owns the topology and the epoch loop.
///
/// One instance per cluster, meant to be driven from a single caller-owned
/// task; `&mut self` receivers keep initialization and training serialized.
/// The epoch loop never aborts on a per-epoch failure — a failed forward
/// pass records [`FAILED_EPOCH_LOSS`] and the run continues.
pub struct Orchestrator {
    registry: PlacementRegistry,
    topology: Vec<LayerHandle>,
    training: TrainingState,
    optimizer: Arc<dyn Optimizer>,
    progress: broadcast::Sender<TrainingProgress>,
    relay_timeout: Duration,
}

impl Orchestrator {
    /// Creates an orchestrator whose cluster contains only the local node.
    pub fn new(local_node: impl Into<NodeId>) -> Self {
        Self {
            registry: PlacementRegistry::new(local_node),
            topology: Vec::new(),
            training: TrainingState::default(),
            optimizer: Arc::new(GradientDescent::new()),
            progress: progress::channel(),
            relay_timeout: DEFAULT_RELAY_TIMEOUT,
        }
    }

    /// Replaces the parameter-update rule shared by every layer actor.
    /// Takes effect for actors spawned by later `initialize_network` calls.
    pub fn with_optimizer(mut self, optimizer: Arc<dyn Optimizer>) -> Self {
        self.optimizer = optimizer;
        self
    }

    /// Overrides the per-hop relay bound (default 10s).
    pub fn with_relay_timeout(mut self, timeout: Duration) -> Self {
        self.relay_timeout = timeout;
        self
    }

    /// Joins the given nodes to the cluster. Returns the full membership;
    /// nodes that failed to join are logged and left out.
    pub fn connect_nodes(&mut self, nodes: impl IntoIterator<Item = NodeId>) -> Vec<NodeId> {
        self.registry.connect(nodes)
    }

    /// Current cluster membership in placement order.
    pub fn get_connected_nodes(&self) -> Vec<NodeId> {
        self.registry.members().to_vec()
    }

    /// Subscribes to the progress broadcast. Events published before the
    /// subscription are not replayed.
    pub fn subscribe_progress(&self) -> broadcast::Receiver<TrainingProgress> {
        self.progress.subscribe()
    }

    /// Builds the pipeline: places each config on a node, spawns one layer
    /// actor per config in that node's arbiter, and wires the chain.
    ///
    /// The stored topology is replaced wholesale; actors of a previous
    /// topology are dropped with their last address, with no draining of
    /// in-flight calls.
    ///
    /// # Errors
    /// `InvalidTopology` for an empty sequence or duplicate ids,
    /// `UnknownNode` when an explicit assignment names a node that never
    /// joined, `LayerUnreachable` if a freshly spawned actor cannot be
    /// wired.
    pub async fn initialize_network(
        &mut self,
        configs: Vec<LayerConfig>,
    ) -> Result<(), OrchestraError> {
        if configs.is_empty() {
            return Err(OrchestraError::InvalidTopology(
                "a pipeline needs at least one layer".into(),
            ));
        }

        let mut seen = HashSet::new();
        for config in &configs {
            if !seen.insert(config.id) {
                return Err(OrchestraError::InvalidTopology(format!(
                    "duplicate layer id {}",
                    config.id
                )));
            }
        }

        let placed = self.registry.distribute(configs);

        let mut handles = Vec::with_capacity(placed.len());
        for config in placed {
            let Some(node) = config.node.clone() else {
                return Err(OrchestraError::InvalidTopology(format!(
                    "layer {} has no node assignment",
                    config.id
                )));
            };
            let Some(arbiter) = self.registry.arbiter(&node) else {
                return Err(OrchestraError::UnknownNode {
                    node,
                    layer: config.id,
                });
            };

            let optimizer = Arc::clone(&self.optimizer);
            let timeout = self.relay_timeout;
            let cfg = config.clone();
            let addr =
                LayerActor::start_in_arbiter(arbiter, move |_| LayerActor::new(&cfg, optimizer, timeout));

            handles.push(LayerHandle {
                id: config.id,
                addr,
                node,
                input_size: config.input_size,
                output_size: config.output_size,
                activation: config.activation,
            });
        }

        for i in 0..handles.len() {
            let predecessor = (i > 0).then(|| handles[i - 1].addr.clone().recipient());
            let successor =
                (i + 1 < handles.len()).then(|| handles[i + 1].addr.clone().recipient());

            handles[i]
                .addr
                .send(SetNeighbors {
                    predecessor,
                    successor,
                })
                .await
                .map_err(|e| OrchestraError::LayerUnreachable {
                    layer: handles[i].id,
                    reason: e.to_string(),
                })?;
        }

        info!(
            "topology initialized: layers={} nodes={}",
            handles.len(),
            self.registry.members().len()
        );
        self.topology = handles;
        Ok(())
    }

    /// Runs the full training loop: forward, loss, backward, update, once
    /// per epoch, one batch fully round-tripped before the next begins.
    ///
    /// A failed forward pass records [`FAILED_EPOCH_LOSS`] for that epoch
    /// and the run continues. Every tenth epoch a [`TrainingProgress`]
    /// event is broadcast.
    ///
    /// # Returns
    /// The chronological loss history of this run.
    ///
    /// # Errors
    /// `NoLayers` before initialization, `InvalidInput` when the batch does
    /// not fit the pipeline's boundary dimensions.
    pub async fn train(
        &mut self,
        data: Array2<f32>,
        targets: Array2<f32>,
        epochs: usize,
        learning_rate: f32,
    ) -> Result<Vec<EpochLoss>, OrchestraError> {
        let (head_input, tail_output) = match (self.topology.first(), self.topology.last()) {
            (Some(head), Some(tail)) => (head.input_size, tail.output_size),
            _ => return Err(OrchestraError::NoLayers),
        };

        if targets.nrows() != data.nrows() {
            return Err(OrchestraError::InvalidInput {
                what: "target rows",
                got: targets.nrows(),
                expected: data.nrows(),
            });
        }
        if data.ncols() != head_input {
            return Err(OrchestraError::InvalidInput {
                what: "input columns",
                got: data.ncols(),
                expected: head_input,
            });
        }
        if targets.ncols() != tail_output {
            return Err(OrchestraError::InvalidInput {
                what: "target columns",
                got: targets.ncols(),
                expected: tail_output,
            });
        }

        self.training = TrainingState::new(learning_rate);
        info!(
            "training started: epochs={epochs} lr={learning_rate} batch={}",
            data.nrows()
        );

        for epoch in 1..=epochs {
            let loss = self.run_epoch(&data, &targets, learning_rate).await;
            self.training.record(epoch, loss);

            if epoch % PROGRESS_INTERVAL == 0 {
                // Best-effort publish; no subscribers is not a failure.
                let _ = self.progress.send(TrainingProgress {
                    epoch,
                    loss,
                    total_epochs: epochs,
                });
            }
        }

        info!(
            "training finished: epochs={epochs} final_loss={:?}",
            self.training.history().last().map(|e| e.loss)
        );
        Ok(self.training.history().to_vec())
    }

    async fn run_epoch(&self, data: &Array2<f32>, targets: &Array2<f32>, learning_rate: f32) -> f32 {
        let predictions = match self.forward_pass(data.clone()).await {
            Ok(p) => p,
            Err(e) => {
                warn!("forward pass failed, recording sentinel loss: {e}");
                return FAILED_EPOCH_LOSS;
            }
        };

        let loss = loss::mse(predictions.view(), targets.view());
        let grad = loss::mse_gradient(predictions.view(), targets.view());

        if let Some(tail) = self.topology.last() {
            match tokio::time::timeout(self.chain_timeout(), tail.addr.send(Backward(grad))).await {
                Err(_) => warn!("backward pass timed out at tail: layer={}", tail.id),
                Ok(Err(e)) => warn!("backward pass unreachable at tail: layer={} {e}", tail.id),
                Ok(Ok(Err(e))) => warn!("backward pass rejected at tail: layer={} {e}", tail.id),
                Ok(Ok(Ok(_))) => {}
            }
        }

        // Fire-and-forget: epoch N+1's forward pass may overtake these.
        for handle in &self.topology {
            handle.addr.do_send(ApplyUpdate { learning_rate });
        }

        loss
    }

    /// One synchronous forward round-trip through the whole chain.
    ///
    /// # Errors
    /// `NoLayers` before initialization, `LayerCall`/`LayerUnreachable` on
    /// chain failures.
    pub async fn predict(&self, input: Array2<f32>) -> Result<Array2<f32>, OrchestraError> {
        self.forward_pass(input).await
    }

    async fn forward_pass(&self, input: Array2<f32>) -> Result<Array2<f32>, OrchestraError> {
        let head = self.topology.first().ok_or(OrchestraError::NoLayers)?;

        match tokio::time::timeout(self.chain_timeout(), head.addr.send(Forward(input))).await {
            Err(_) => Err(OrchestraError::LayerUnreachable {
                layer: head.id,
                reason: format!("forward call timed out after {:?}", self.chain_timeout()),
            }),
            Ok(Err(e)) => Err(OrchestraError::LayerUnreachable {
                layer: head.id,
                reason: e.to_string(),
            }),
            Ok(Ok(Err(e))) => Err(OrchestraError::LayerCall {
                layer: head.id,
                source: e,
            }),
            Ok(Ok(Ok(prediction))) => Ok(prediction),
        }
    }

    /// Loss history of the current (or last finished) run, chronological:
    /// index 0 is epoch 1.
    pub fn get_loss_history(&self) -> &[EpochLoss] {
        self.training.history()
    }

    /// Reports every layer of the current topology, reading each actor's
    /// live parameter shapes.
    pub async fn get_layer_info(&self) -> Result<Vec<LayerInfo>, OrchestraError> {
        let mut infos = Vec::with_capacity(self.topology.len());

        for handle in &self.topology {
            let params = tokio::time::timeout(self.relay_timeout, handle.addr.send(GetParameters))
                .await
                .map_err(|_| OrchestraError::LayerUnreachable {
                    layer: handle.id,
                    reason: "parameter read timed out".into(),
                })?
                .map_err(|e| OrchestraError::LayerUnreachable {
                    layer: handle.id,
                    reason: e.to_string(),
                })?;

            infos.push(LayerInfo {
                id: handle.id,
                node: handle.node.clone(),
                activation: handle.activation,
                input_size: handle.input_size,
                output_size: handle.output_size,
                weight_shape: params.weights.dim(),
                bias_size: params.bias.len(),
            });
        }

        Ok(infos)
    }

    /// The current topology, head first.
    pub fn layers(&self) -> &[LayerHandle] {
        &self.topology
    }

    // Every hop gets the relay budget, plus one for the head's own mailbox.
    fn chain_timeout(&self) -> Duration {
        self.relay_timeout * (self.topology.len() as u32 + 1)
    }
}
