//! Feedforward neural networks with supervised backpropagation training.
//!
//! A [`TrainingDataSet`] is built by hand or loaded from a file, attached to
//! a [`NeuralNetwork`] whose input and output layers match the data, and a
//! [`NeuralNetworkTrainer`] then runs the epoch loop over the borrowed
//! network until the desired accuracy is reached or the epoch limit runs
//! out. Afterwards the network answers [`NeuralNetwork::feed_forward`]
//! queries and its weights can be saved and loaded as text.

pub mod act_fn;
pub mod dataset;
pub mod error;
pub mod layer;
pub mod monitor;
pub mod net;
pub mod trainer;

pub use act_fn::ActivationFn;
pub use dataset::{DataEntry, TrainingDataSet};
pub use error::Error;
pub use layer::Layer;
pub use monitor::{LogMonitor, NullMonitor, TrainingMonitor};
pub use net::NeuralNetwork;
pub use trainer::{NeuralNetworkTrainer, TrainingOutcome, TrainingParams, TrainingReport, ACCURACY_TOLERANCE};
