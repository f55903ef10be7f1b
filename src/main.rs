use std::path::PathBuf;

use log::*;

mod cli;
mod utils;

use ffnet::{LogMonitor, NeuralNetwork, NeuralNetworkTrainer, TrainingDataSet, TrainingParams};
use utils::*;

fn main() {
    let cli = init();
    let data = TrainingDataSet::load_from_file(&cli.input_file, cli.training_quota, cli.generalization_quota)
        .unwrap_or_else(|e| {
            error!("{}", e);
            std::process::exit(1);
        });
    let (Some(input_size), Some(target_size)) = (data.input_size(), data.target_size()) else {
        error!("{:?} contains no examples", cli.input_file);
        std::process::exit(1);
    };

    // input and output layer sizes come from the data, hidden ones from the CLI
    let mut layer_sizes = vec![input_size];
    layer_sizes.extend(&cli.hidden_layers);
    layer_sizes.push(target_size);
    let seed = cli.seed.unwrap_or_else(|| return rand::random());
    info!("layer sizes: {:?}, activation: {}, seed: {}", layer_sizes, cli.activation, seed);

    let mut net = NeuralNetwork::new(&layer_sizes, cli.activation, seed).unwrap_or_else(|e| {
        error!("{}", e);
        std::process::exit(1);
    });
    if let Some(path) = &cli.load_weights {
        net.load_weights(path).unwrap_or_else(|e| {
            error!("{}", e);
            std::process::exit(1);
        });
    }
    net.attach_data(data).unwrap_or_else(|e| {
        error!("{}", e);
        std::process::exit(1);
    });

    let params = TrainingParams {
        learning_rate: cli.learning_rate,
        momentum: cli.momentum,
        use_batch: cli.batch,
        max_epochs: cli.max_epochs,
        desired_accuracy: cli.desired_accuracy,
    };
    let mut trainer = NeuralNetworkTrainer::new(&mut net, params)
        .unwrap_or_else(|e| {
            error!("{}", e);
            std::process::exit(1);
        })
        .with_monitor(Box::new(LogMonitor::default()));
    let report = trainer.train_network().unwrap_or_else(|e| {
        error!("{}", e);
        std::process::exit(1);
    });
    info!(
        "training finished: {:?} after {} epochs, accuracy {:.2}% training / {:.2}% generalization",
        report.outcome, report.epochs, report.training_accuracy, report.generalization_accuracy
    );

    let save_path = cli.save_weights.clone().unwrap_or_else(|| {
        let timestamp = chrono::Local::now().format("%Y-%m-%d_%H-%M-%S");
        return PathBuf::from(format!("weights_{}.txt", timestamp));
    });
    net.save_weights(&save_path).unwrap_or_else(|e| {
        error!("{}", e);
        std::process::exit(1);
    });
}
