use std::env;

use anyhow::Result;
use log::info;
use ndarray::array;

use pipeline_orchestra::{Activation, LayerConfig, Orchestrator};

/// Demo run: a two-layer pipeline learning XOR across three nodes.
///
/// Usage: pipeline-orchestra [epochs] [learning_rate]
#[actix_rt::main]
async fn main() -> Result<()> {
    env_logger::init();

    let args: Vec<String> = env::args().collect();
    let epochs = args
        .get(1)
        .map(|s| s.parse::<usize>())
        .transpose()?
        .unwrap_or(200);
    let learning_rate = args
        .get(2)
        .map(|s| s.parse::<f32>())
        .transpose()?
        .unwrap_or(0.1);

    let mut orchestrator = Orchestrator::new("local");
    let members = orchestrator.connect_nodes(["alpha".to_string(), "beta".to_string()]);
    info!("cluster members: {members:?}");

    orchestrator
        .initialize_network(vec![
            LayerConfig::new(1, 2, 4, Activation::Relu),
            LayerConfig::new(2, 4, 1, Activation::Linear),
        ])
        .await?;

    let mut progress = orchestrator.subscribe_progress();
    actix_rt::spawn(async move {
        while let Ok(event) = progress.recv().await {
            println!(
                "epoch {}/{}: loss {:.6}",
                event.epoch, event.total_epochs, event.loss
            );
        }
    });

    let data = array![[0.0, 0.0], [0.0, 1.0], [1.0, 0.0], [1.0, 1.0]];
    let targets = array![[0.0], [1.0], [1.0], [0.0]];

    let history = orchestrator
        .train(data.clone(), targets, epochs, learning_rate)
        .await?;

    let predictions = orchestrator.predict(data).await?;
    println!("predictions after training:\n{predictions:.4}");
    println!("loss history: {}", serde_json::to_string(&history)?);

    Ok(())
}
