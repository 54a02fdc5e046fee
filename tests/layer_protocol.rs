use std::{sync::Arc, time::Duration};

use actix::prelude::*;
use ndarray::array;

use pipeline_orchestra::{
    layer::messages::{ApplyUpdate, Backward, Forward, GetParameters, SetNeighbors, UpdateParameters},
    Activation, GradientDescent, LayerActor, LayerConfig, LayerError, Parameters,
};

fn spawn_layer(id: usize, input: usize, output: usize, activation: Activation) -> Addr<LayerActor> {
    let config = LayerConfig::new(id, input, output, activation);
    LayerActor::new(&config, Arc::new(GradientDescent::new()), Duration::from_secs(1)).start()
}

#[actix_rt::test]
async fn linear_layer_gradients_are_exact() {
    let layer = spawn_layer(1, 2, 2, Activation::Linear);

    layer
        .send(UpdateParameters(Parameters {
            weights: array![[1.0, 0.0], [0.0, 1.0]],
            bias: array![0.5, -0.5],
        }))
        .await
        .unwrap()
        .unwrap();

    let x = array![[1.0, 2.0], [3.0, 4.0]];
    let out = layer.send(Forward(x)).await.unwrap().unwrap();
    assert_eq!(out, array![[1.5, 1.5], [3.5, 3.5]]);

    let g = array![[1.0, 1.0], [2.0, 2.0]];
    let grads = layer.send(Backward(g)).await.unwrap().unwrap();

    // weight_grad == X^T . g, bias_grad == column-sum(g), exactly.
    assert_eq!(grads.weight_grad, array![[7.0, 7.0], [10.0, 10.0]]);
    assert_eq!(grads.bias_grad, array![3.0, 3.0]);
    // No predecessor: no input gradient is produced.
    assert!(grads.input_grad.is_none());
}

#[actix_rt::test]
async fn backward_without_forward_is_a_precondition_error() {
    let layer = spawn_layer(1, 2, 2, Activation::Relu);

    let result = layer.send(Backward(array![[1.0, 1.0]])).await.unwrap();
    match result {
        Err(LayerError::MissingForwardCache { layer: 1 }) => {}
        other => panic!("expected MissingForwardCache, got {other:?}"),
    }
}

#[actix_rt::test]
async fn backward_consumes_the_forward_cache() {
    let layer = spawn_layer(1, 2, 1, Activation::Linear);

    layer
        .send(Forward(array![[1.0, 1.0]]))
        .await
        .unwrap()
        .unwrap();
    layer
        .send(Backward(array![[1.0]]))
        .await
        .unwrap()
        .unwrap();

    // The cache was consumed by the matching backward call.
    let second = layer.send(Backward(array![[1.0]])).await.unwrap();
    assert!(matches!(
        second,
        Err(LayerError::MissingForwardCache { .. })
    ));
}

#[actix_rt::test]
async fn parameters_round_trip_exactly() {
    let layer = spawn_layer(3, 2, 3, Activation::Sigmoid);

    let weights = array![[0.1, 0.2, 0.3], [0.4, 0.5, 0.6]];
    let bias = array![-1.0, 0.0, 1.0];
    layer
        .send(UpdateParameters(Parameters {
            weights: weights.clone(),
            bias: bias.clone(),
        }))
        .await
        .unwrap()
        .unwrap();

    let params = layer.send(GetParameters).await.unwrap();
    assert_eq!(params.weights, weights);
    assert_eq!(params.bias, bias);
}

#[actix_rt::test]
async fn mis_shaped_update_is_rejected_and_state_kept() {
    let layer = spawn_layer(1, 2, 3, Activation::Linear);
    let before = layer.send(GetParameters).await.unwrap();

    let result = layer
        .send(UpdateParameters(Parameters {
            weights: array![[1.0, 2.0]],
            bias: array![0.0, 0.0, 0.0],
        }))
        .await
        .unwrap();
    assert!(matches!(result, Err(LayerError::ShapeMismatch { .. })));

    let after = layer.send(GetParameters).await.unwrap();
    assert_eq!(after.weights, before.weights);
    assert_eq!(after.bias, before.bias);
}

#[actix_rt::test]
async fn forward_rejects_wrong_input_width() {
    let layer = spawn_layer(1, 2, 2, Activation::Relu);

    let result = layer.send(Forward(array![[1.0, 2.0, 3.0]])).await.unwrap();
    assert!(matches!(result, Err(LayerError::ShapeMismatch { .. })));
}

#[actix_rt::test]
async fn apply_update_steps_once_per_backward() {
    let layer = spawn_layer(1, 1, 1, Activation::Linear);

    layer
        .send(UpdateParameters(Parameters {
            weights: array![[2.0]],
            bias: array![0.0],
        }))
        .await
        .unwrap()
        .unwrap();

    layer.send(Forward(array![[1.0]])).await.unwrap().unwrap();
    // delta = 1, weight_grad = 1, bias_grad = 1
    layer.send(Backward(array![[1.0]])).await.unwrap().unwrap();

    layer.do_send(ApplyUpdate { learning_rate: 0.5 });
    let params = layer.send(GetParameters).await.unwrap();
    assert_eq!(params.weights, array![[1.5]]);
    assert_eq!(params.bias, array![-0.5]);

    // The buffered gradients were consumed: a second update is a no-op.
    layer.do_send(ApplyUpdate { learning_rate: 0.5 });
    let params = layer.send(GetParameters).await.unwrap();
    assert_eq!(params.weights, array![[1.5]]);
    assert_eq!(params.bias, array![-0.5]);
}

#[actix_rt::test]
async fn chained_layers_relay_forward_and_backward() {
    let head = spawn_layer(1, 2, 2, Activation::Linear);
    let tail = spawn_layer(2, 2, 1, Activation::Linear);

    head.send(SetNeighbors {
        predecessor: None,
        successor: Some(tail.clone().recipient()),
    })
    .await
    .unwrap();
    tail.send(SetNeighbors {
        predecessor: Some(head.clone().recipient()),
        successor: None,
    })
    .await
    .unwrap();

    head.send(UpdateParameters(Parameters {
        weights: array![[1.0, 0.0], [0.0, 1.0]],
        bias: array![0.0, 0.0],
    }))
    .await
    .unwrap()
    .unwrap();
    tail.send(UpdateParameters(Parameters {
        weights: array![[1.0], [1.0]],
        bias: array![0.0],
    }))
    .await
    .unwrap()
    .unwrap();

    // The head's reply carries the tail's prediction.
    let out = head
        .send(Forward(array![[2.0, 3.0]]))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(out, array![[5.0]]);

    // Backward at the tail replies with the tail's own gradients and
    // relays upstream without blocking.
    let grads = tail.send(Backward(array![[1.0]])).await.unwrap().unwrap();
    assert_eq!(grads.weight_grad, array![[2.0], [3.0]]);
    assert_eq!(grads.bias_grad, array![1.0]);
    assert_eq!(grads.input_grad, Some(array![[1.0, 1.0]]));
}
