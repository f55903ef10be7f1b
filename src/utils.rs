use clap::Parser;
use env_logger::Env;
use log::warn;

use crate::cli::{Cli, LogLevel};

/// Parse the CLI, initialize logging and fix up values that can be repaired
/// without aborting.
pub fn init() -> Cli {
    let mut cli = Cli::parse();
    let loglevel = match cli.log_level {
        LogLevel::Error => "off,ffnet=error",
        LogLevel::Warn => "off,ffnet=warn",
        LogLevel::Info => "off,ffnet=info",
        LogLevel::Debug => "off,ffnet=debug",
        LogLevel::Trace => "off,ffnet=trace",
        LogLevel::Off => "off",
    };
    if std::env::var("RUST_LOG").is_err() {
        std::env::set_var("RUST_LOG", loglevel)
    }
    env_logger::init_from_env(Env::default());

    if cli.learning_rate <= 0.0 {
        cli.learning_rate = 0.1;
        warn!("Learning rate must be positive, overwriting to {}", cli.learning_rate);
    }
    if cli.momentum < 0.0 {
        cli.momentum = 0.0;
        warn!("Momentum can't be negative, overwriting to {}", cli.momentum);
    } else if cli.momentum >= 1.0 {
        cli.momentum = 0.5;
        warn!("Momentum must be smaller than 1, overwriting to {}", cli.momentum);
    }
    if cli.max_epochs == 0 {
        cli.max_epochs = 1;
        warn!("Need at least one epoch, overwriting to {}", cli.max_epochs);
    }
    if !(0.0..=100.0).contains(&cli.desired_accuracy) {
        cli.desired_accuracy = 99.5;
        warn!("Desired accuracy is a percentage, overwriting to {}", cli.desired_accuracy);
    }
    let quotas_valid = (0.0..=1.0).contains(&cli.training_quota)
        && (0.0..=1.0).contains(&cli.generalization_quota)
        && cli.training_quota + cli.generalization_quota <= 1.0;
    if !quotas_valid {
        cli.training_quota = 0.6;
        cli.generalization_quota = 0.2;
        warn!(
            "Invalid quotas, overwriting to {} training and {} generalization",
            cli.training_quota, cli.generalization_quota
        );
    }
    return cli;
}
