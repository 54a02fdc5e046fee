use ndarray::array;

use pipeline_orchestra::{Activation, LayerConfig, OrchestraError, Orchestrator};

fn two_layer_configs() -> Vec<LayerConfig> {
    vec![
        LayerConfig::new(1, 2, 4, Activation::Relu),
        LayerConfig::new(2, 4, 1, Activation::Linear),
    ]
}

#[actix_rt::test]
async fn predict_before_initialization_is_a_no_layers_error() {
    let orchestrator = Orchestrator::new("local");

    let result = orchestrator.predict(array![[0.0, 1.0]]).await;
    match result {
        Err(OrchestraError::NoLayers) => {}
        other => panic!("expected NoLayers, got {other:?}"),
    }
}

#[actix_rt::test]
async fn initialize_builds_the_chain_in_input_order() {
    let mut orchestrator = Orchestrator::new("local");
    orchestrator
        .initialize_network(two_layer_configs())
        .await
        .unwrap();

    let ids: Vec<_> = orchestrator.layers().iter().map(|l| l.id()).collect();
    assert_eq!(ids, [1, 2]);
    for layer in orchestrator.layers() {
        assert_eq!(layer.node(), "local");
    }

    let prediction = orchestrator.predict(array![[0.0, 1.0]]).await.unwrap();
    assert_eq!(prediction.dim(), (1, 1));
}

#[actix_rt::test]
async fn empty_and_duplicate_configs_are_rejected() {
    let mut orchestrator = Orchestrator::new("local");

    let result = orchestrator.initialize_network(Vec::new()).await;
    assert!(matches!(result, Err(OrchestraError::InvalidTopology(_))));

    let duplicated = vec![
        LayerConfig::new(7, 2, 2, Activation::Linear),
        LayerConfig::new(7, 2, 2, Activation::Linear),
    ];
    let result = orchestrator.initialize_network(duplicated).await;
    assert!(matches!(result, Err(OrchestraError::InvalidTopology(_))));
}

#[actix_rt::test]
async fn explicit_unknown_node_is_rejected() {
    let mut orchestrator = Orchestrator::new("local");

    let configs = vec![LayerConfig::new(1, 2, 1, Activation::Linear).on_node("ghost")];
    let result = orchestrator.initialize_network(configs).await;
    match result {
        Err(OrchestraError::UnknownNode { node, layer: 1 }) => assert_eq!(node, "ghost"),
        other => panic!("expected UnknownNode, got {other:?}"),
    }
}

#[actix_rt::test]
async fn reinitialization_replaces_the_topology_wholesale() {
    let mut orchestrator = Orchestrator::new("local");
    orchestrator
        .initialize_network(two_layer_configs())
        .await
        .unwrap();
    assert_eq!(orchestrator.layers().len(), 2);

    orchestrator
        .initialize_network(vec![LayerConfig::new(9, 3, 1, Activation::Sigmoid)])
        .await
        .unwrap();

    let layers = orchestrator.layers();
    assert_eq!(layers.len(), 1);
    assert_eq!(layers[0].id(), 9);

    let prediction = orchestrator.predict(array![[1.0, 2.0, 3.0]]).await.unwrap();
    assert_eq!(prediction.dim(), (1, 1));
}

#[actix_rt::test]
async fn layers_spread_across_connected_nodes() {
    let mut orchestrator = Orchestrator::new("local");
    let members = orchestrator.connect_nodes(["east".to_string(), "west".to_string()]);
    assert_eq!(members, ["local", "east", "west"]);
    assert_eq!(orchestrator.get_connected_nodes(), members);

    orchestrator
        .initialize_network(vec![
            LayerConfig::new(1, 2, 4, Activation::Relu),
            LayerConfig::new(2, 4, 4, Activation::Relu),
            LayerConfig::new(3, 4, 1, Activation::Linear),
        ])
        .await
        .unwrap();

    let nodes: Vec<_> = orchestrator.layers().iter().map(|l| l.node().clone()).collect();
    assert_eq!(nodes, ["local", "east", "west"]);

    // The chain still answers across arbiter boundaries.
    let prediction = orchestrator.predict(array![[0.5, -0.5]]).await.unwrap();
    assert_eq!(prediction.dim(), (1, 1));
}

#[actix_rt::test]
async fn layer_info_reports_live_parameter_shapes() {
    let mut orchestrator = Orchestrator::new("local");
    orchestrator
        .initialize_network(two_layer_configs())
        .await
        .unwrap();

    let info = orchestrator.get_layer_info().await.unwrap();
    assert_eq!(info.len(), 2);

    assert_eq!(info[0].id, 1);
    assert_eq!(info[0].activation, Activation::Relu);
    assert_eq!(info[0].weight_shape, (2, 4));
    assert_eq!(info[0].bias_size, 4);

    assert_eq!(info[1].id, 2);
    assert_eq!(info[1].weight_shape, (4, 1));
    assert_eq!(info[1].bias_size, 1);
}
