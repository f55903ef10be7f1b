use std::path::PathBuf;

use clap::{Parser, ValueEnum};
use ffnet::ActivationFn;

#[derive(Parser, Debug)]
pub struct Cli {
    /// level of logging details (into stderr)
    #[arg(short, long, value_enum, default_value_t = LogLevel::Info)]
    pub log_level: LogLevel,

    /// path to file with training examples, one `pattern-values ; target-values` pair per line
    #[arg(short, long)]
    pub input_file: PathBuf,

    /// Hidden layer sizes separated by commas, e.g. 4,3
    ///
    /// Input and output layer sizes are taken from the data file.
    #[arg(long, value_delimiter = ',')]
    pub hidden_layers: Vec<usize>,

    /// activation function used by every layer: Sigmoid (sig, s) or Rectifier (relu, r)
    #[arg(long, default_value_t = ActivationFn::Sigmoid, value_parser = clap::value_parser!(ActivationFn))]
    pub activation: ActivationFn,

    /// learning rate
    #[arg(long, default_value_t = 0.1)]
    pub learning_rate: f64,

    /// learning momentum, must be larger or equal to 0 and smaller than 1
    #[arg(long, default_value_t = 0.9)]
    pub momentum: f64,

    /// accumulate weight deltas over the whole epoch instead of updating after every pattern
    #[arg(long, default_value_t = false)]
    pub batch: bool,

    /// max number of training epochs
    #[arg(long, default_value_t = 10_000)]
    pub max_epochs: u32,

    /// accuracy (in percent) at which training stops
    #[arg(long, default_value_t = 99.5)]
    pub desired_accuracy: f64,

    /// fraction of the examples used for weight updates
    #[arg(long, default_value_t = 0.6)]
    pub training_quota: f64,

    /// fraction of the examples held out for the generalization accuracy estimate
    #[arg(long, default_value_t = 0.2)]
    pub generalization_quota: f64,

    /// seed for the weight initialization, random when omitted
    #[arg(long)]
    pub seed: Option<u64>,

    /// file where the trained weights will be saved, a timestamped name is generated when omitted
    #[arg(long)]
    pub save_weights: Option<PathBuf>,

    /// file with previously saved weights to start from instead of random ones
    #[arg(long)]
    pub load_weights: Option<PathBuf>,
}

#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, ValueEnum, Debug)]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
    Off,
}
