use log::{info, trace};
use nalgebra::{DMatrix, DVector};

use crate::{
    act_fn::ActivationFn,
    dataset::DataEntry,
    error::Error,
    layer::Layer,
    monitor::{NullMonitor, TrainingMonitor},
    net::{forward_pass, NeuralNetwork},
};

/// Per-output tolerance used when scoring a pattern as correct. The same
/// value is meant for external [`NeuralNetwork::clamp_output`] acceptance
/// checks, so both sides of a convergence judgment use one rule.
pub const ACCURACY_TOLERANCE: f64 = 99.0;

/// Hyperparameters for one training run.
#[derive(Debug, Clone, Copy)]
pub struct TrainingParams {
    pub learning_rate: f64,
    /// fraction of the previous weight delta carried into the current one
    pub momentum: f64,
    /// apply accumulated deltas once per epoch instead of after every pattern
    pub use_batch: bool,
    pub max_epochs: u32,
    /// accuracy (in percent) at which training stops
    pub desired_accuracy: f64,
}

impl TrainingParams {
    fn validate(&self) -> Result<(), Error> {
        if !self.learning_rate.is_finite() || self.learning_rate <= 0.0 {
            return Err(Error::Range(format!("learning rate must be positive, got {}", self.learning_rate)));
        }
        if !(0.0..1.0).contains(&self.momentum) {
            return Err(Error::Range(format!(
                "momentum must be larger or equal to 0 and smaller than 1, got {}",
                self.momentum
            )));
        }
        if !(0.0..=100.0).contains(&self.desired_accuracy) {
            return Err(Error::Range(format!(
                "desired accuracy is a percentage within [0, 100], got {}",
                self.desired_accuracy
            )));
        }
        if self.max_epochs == 0 {
            return Err(Error::Range(String::from("max epochs must be at least 1")));
        }
        return Ok(());
    }
}

/// How a training run ended. Persistent non-convergence is not a failure of
/// the trainer; retrying with other hyperparameters is the caller's call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrainingOutcome {
    /// One of the measured accuracies reached the desired accuracy.
    Converged,
    /// The epoch limit fired first.
    MaxEpochsExceeded,
}

/// Summary of a finished training run.
#[derive(Debug, Clone, Copy)]
pub struct TrainingReport {
    pub outcome: TrainingOutcome,
    pub epochs: u32,
    pub training_accuracy: f64,
    pub generalization_accuracy: f64,
}

/// Short-lived driver of the epoch loop. Borrows the network mutably for
/// the whole run, so nothing else can touch the weights while it trains;
/// the transient state here is discarded with the trainer, the mutated
/// weights stay in the network.
pub struct NeuralNetworkTrainer<'a> {
    net: &'a mut NeuralNetwork,
    params: TrainingParams,
    monitor: Box<dyn TrainingMonitor>,
    epoch: u32,
    previous_deltas: Vec<DMatrix<f64>>,
    training_accuracy: f64,
    generalization_accuracy: f64,
}

impl<'a> NeuralNetworkTrainer<'a> {
    /// Create a trainer for one run over the given network.
    pub fn new(net: &'a mut NeuralNetwork, params: TrainingParams) -> Result<Self, Error> {
        params.validate()?;
        // deltas start at zero so the very first update carries no momentum term
        let previous_deltas = net
            .layers
            .iter()
            .map(|layer| return DMatrix::zeros(layer.weights.nrows(), layer.weights.ncols()))
            .collect();
        return Ok(NeuralNetworkTrainer {
            net,
            params,
            monitor: Box::new(NullMonitor),
            epoch: 0,
            previous_deltas,
            training_accuracy: 0.0,
            generalization_accuracy: 0.0,
        });
    }

    /// Replace the default no-op monitor with the given one.
    pub fn with_monitor(mut self, monitor: Box<dyn TrainingMonitor>) -> Self {
        self.monitor = monitor;
        return self;
    }

    /// Run the epoch loop until the desired accuracy is reached or the
    /// epoch limit fires, mutating the borrowed network's weights in place.
    pub fn train_network(&mut self) -> Result<TrainingReport, Error> {
        let net = &mut *self.net;
        let data = match net.data {
            Some(ref data) => data,
            None => return Err(Error::NotAttached),
        };
        info!(
            "starting training: {} training / {} generalization examples, {:?}",
            data.training_set().len(),
            data.generalization_set().len(),
            self.params
        );
        trace!("entering training loop");
        loop {
            if self.params.use_batch {
                // accumulate raw gradients over the whole epoch without touching the weights
                let mut accumulated: Vec<DMatrix<f64>> = net
                    .layers
                    .iter()
                    .map(|layer| return DMatrix::zeros(layer.weights.nrows(), layer.weights.ncols()))
                    .collect();
                for entry in data.training_set() {
                    let gradients = compute_gradients(&net.layers, net.activation, entry);
                    for (accum, gradient) in accumulated.iter_mut().zip(gradients) {
                        *accum += gradient;
                    }
                }
                // apply the averaged deltas once at the end of the epoch
                let count = data.training_set().len();
                if count > 0 {
                    for (layer_idx, accum) in accumulated.into_iter().enumerate() {
                        let delta = self.params.learning_rate * (accum / count as f64)
                            + self.params.momentum * &self.previous_deltas[layer_idx];
                        net.layers[layer_idx].weights += &delta;
                        self.previous_deltas[layer_idx] = delta;
                    }
                }
            } else {
                // online mode: later patterns in the same epoch see already updated weights
                for entry in data.training_set() {
                    let gradients = compute_gradients(&net.layers, net.activation, entry);
                    for (layer_idx, gradient) in gradients.into_iter().enumerate() {
                        let delta = self.params.learning_rate * gradient
                            + self.params.momentum * &self.previous_deltas[layer_idx];
                        net.layers[layer_idx].weights += &delta;
                        self.previous_deltas[layer_idx] = delta;
                    }
                }
            }

            // pure evaluation passes, no further weight changes this epoch
            self.training_accuracy = measure_accuracy(&net.layers, net.activation, data.training_set());
            self.generalization_accuracy = measure_accuracy(&net.layers, net.activation, data.generalization_set());
            self.epoch += 1;
            self.monitor.on_epoch(self.epoch, self.training_accuracy, self.generalization_accuracy);

            if self.training_accuracy >= self.params.desired_accuracy
                || self.generalization_accuracy >= self.params.desired_accuracy
            {
                info!(
                    "accuracy {:.2}% training / {:.2}% generalization -> reached desired accuracy {}% after {} epochs",
                    self.training_accuracy, self.generalization_accuracy, self.params.desired_accuracy, self.epoch
                );
                return Ok(TrainingReport {
                    outcome: TrainingOutcome::Converged,
                    epochs: self.epoch,
                    training_accuracy: self.training_accuracy,
                    generalization_accuracy: self.generalization_accuracy,
                });
            }
            if self.epoch >= self.params.max_epochs {
                info!(
                    "reached maximum number of epochs ({}) with accuracy {:.2}% training / {:.2}% generalization",
                    self.params.max_epochs, self.training_accuracy, self.generalization_accuracy
                );
                return Ok(TrainingReport {
                    outcome: TrainingOutcome::MaxEpochsExceeded,
                    epochs: self.epoch,
                    training_accuracy: self.training_accuracy,
                    generalization_accuracy: self.generalization_accuracy,
                });
            }
        }
    }

    /// Number of epochs run so far.
    pub fn epochs_run(&self) -> u32 {
        return self.epoch;
    }

    /// Accuracy over the training set after the last finished epoch.
    pub fn training_accuracy(&self) -> f64 {
        return self.training_accuracy;
    }

    /// Accuracy over the held-out generalization set after the last finished epoch.
    pub fn generalization_accuracy(&self) -> f64 {
        return self.generalization_accuracy;
    }
}

/// Run one example through the network and return the error gradient with
/// respect to every weight, shaped like the network's weight matrices. The
/// caller decides when and how the matching deltas get applied.
fn compute_gradients(layers: &[Layer], act_fn: ActivationFn, entry: &DataEntry) -> Vec<DMatrix<f64>> {
    let (zets, activations) = forward_pass(layers, act_fn, &entry.pattern);
    let last = layers.len() - 1;

    // walk the layers backwards, chaining every delta through the current
    // (pre-update) weights of the layer above it
    let mut deltas: Vec<DVector<f64>> = Vec::with_capacity(layers.len());
    let target = DVector::from_column_slice(&entry.target);
    let output_error = target - activations.last().unwrap();
    let output_prime = zets[last].map(|val| return act_fn.compute_prime(val));
    deltas.push(output_error.component_mul(&output_prime));
    for layer_idx in (0..last).rev() {
        let next = &layers[layer_idx + 1];
        // the bias column does not feed back into the previous layer
        let carried = next.weights.columns(0, next.input_count()).transpose() * deltas.last().unwrap();
        let prime = zets[layer_idx].map(|val| return act_fn.compute_prime(val));
        deltas.push(carried.component_mul(&prime));
    }
    deltas.reverse();

    // outer product of each delta with the layer's augmented input activations
    return deltas
        .iter()
        .enumerate()
        .map(|(layer_idx, delta)| {
            let aug = activations[layer_idx].push(1.0);
            return delta * aug.transpose();
        })
        .collect();
}

/// Percentage of entries whose every output value passes the clamp test
/// against its target. An empty subset scores 0.
fn measure_accuracy(layers: &[Layer], act_fn: ActivationFn, entries: &[DataEntry]) -> f64 {
    if entries.is_empty() {
        return 0.0;
    }
    // prepare the counter of correct classifications
    let mut correct = 0;
    for entry in entries {
        let (_, activations) = forward_pass(layers, act_fn, &entry.pattern);
        let output = activations.last().unwrap();
        let all_pass = output
            .iter()
            .zip(entry.target.iter())
            .all(|(actual, expected)| return NeuralNetwork::clamp_output(*actual, *expected, ACCURACY_TOLERANCE));
        if all_pass {
            correct += 1;
        }
    }
    // return the final accuracy as percentage
    return correct as f64 / entries.len() as f64 * 100.0;
}

#[cfg(test)]
mod tests {
    use approx::assert_relative_eq;

    use super::*;
    use crate::dataset::TrainingDataSet;

    fn params() -> TrainingParams {
        return TrainingParams {
            learning_rate: 0.5,
            momentum: 0.0,
            use_batch: false,
            max_epochs: 10,
            desired_accuracy: 100.0,
        };
    }

    #[test]
    fn rejects_out_of_domain_hyperparameters() {
        let mut net = NeuralNetwork::new(&[1, 1], ActivationFn::Sigmoid, 1).unwrap();
        for bad in [
            TrainingParams { learning_rate: 0.0, ..params() },
            TrainingParams { learning_rate: f64::NAN, ..params() },
            TrainingParams { momentum: 1.0, ..params() },
            TrainingParams { momentum: -0.1, ..params() },
            TrainingParams { desired_accuracy: 101.0, ..params() },
            TrainingParams { max_epochs: 0, ..params() },
        ] {
            assert!(matches!(NeuralNetworkTrainer::new(&mut net, bad), Err(Error::Range(_))));
        }
    }

    #[test]
    fn refuses_to_train_without_attached_data() {
        let mut net = NeuralNetwork::new(&[1, 1], ActivationFn::Sigmoid, 1).unwrap();
        let mut trainer = NeuralNetworkTrainer::new(&mut net, params()).unwrap();
        assert!(matches!(trainer.train_network(), Err(Error::NotAttached)));
    }

    #[test]
    fn never_runs_past_max_epochs() {
        let mut net = NeuralNetwork::new(&[1, 1], ActivationFn::Sigmoid, 3).unwrap();
        let mut data = TrainingDataSet::new();
        // a sigmoid output rounded to one decimal can never match 0.37,
        // so accuracy stays at 0 and the epoch limit must fire
        data.add_entry(vec![1.0], vec![0.37]).unwrap();
        data.partition(1.0, 0.0).unwrap();
        net.attach_data(data).unwrap();

        let mut trainer = NeuralNetworkTrainer::new(&mut net, TrainingParams { max_epochs: 5, ..params() }).unwrap();
        let report = trainer.train_network().unwrap();
        assert_eq!(report.outcome, TrainingOutcome::MaxEpochsExceeded);
        assert_eq!(report.epochs, 5);
        assert_eq!(trainer.epochs_run(), 5);
        assert_eq!(report.training_accuracy, 0.0);
    }

    #[test]
    fn converges_as_soon_as_the_desired_accuracy_is_met() {
        let mut net = NeuralNetwork::new(&[1, 1], ActivationFn::Sigmoid, 3).unwrap();
        let mut data = TrainingDataSet::new();
        data.add_entry(vec![1.0], vec![0.37]).unwrap();
        data.partition(1.0, 0.0).unwrap();
        net.attach_data(data).unwrap();

        // desired accuracy 0 is satisfied by any measurement
        let relaxed = TrainingParams { desired_accuracy: 0.0, ..params() };
        let mut trainer = NeuralNetworkTrainer::new(&mut net, relaxed).unwrap();
        let report = trainer.train_network().unwrap();
        assert_eq!(report.outcome, TrainingOutcome::Converged);
        assert_eq!(report.epochs, 1);
    }

    #[test]
    fn zero_momentum_reduces_to_plain_gradient_descent() {
        let mut net = NeuralNetwork::new(&[1, 1], ActivationFn::Sigmoid, 7).unwrap();
        let before = net.layers[0].weights.clone();
        let mut data = TrainingDataSet::new();
        data.add_entry(vec![0.8], vec![1.0]).unwrap();
        data.partition(1.0, 0.0).unwrap();
        net.attach_data(data).unwrap();

        let one_epoch = TrainingParams { max_epochs: 1, ..params() };
        let mut trainer = NeuralNetworkTrainer::new(&mut net, one_epoch).unwrap();
        trainer.train_network().unwrap();

        // reference update computed by hand for the single weight and bias
        let zet = before[(0, 0)] * 0.8 + before[(0, 1)];
        let out = 1.0 / (1.0 + (-zet).exp());
        let delta = (1.0 - out) * out * (1.0 - out);
        assert_relative_eq!(net.layers[0].weights[(0, 0)], before[(0, 0)] + 0.5 * delta * 0.8, epsilon = 1e-12);
        assert_relative_eq!(net.layers[0].weights[(0, 1)], before[(0, 1)] + 0.5 * delta, epsilon = 1e-12);
    }

    #[test]
    fn momentum_carries_the_previous_delta() {
        // two identical nets, one trained with momentum for two epochs
        let mut plain = NeuralNetwork::new(&[1, 1], ActivationFn::Sigmoid, 7).unwrap();
        let mut damped = NeuralNetwork::new(&[1, 1], ActivationFn::Sigmoid, 7).unwrap();
        for net in [&mut plain, &mut damped] {
            let mut data = TrainingDataSet::new();
            data.add_entry(vec![0.8], vec![1.0]).unwrap();
            data.partition(1.0, 0.0).unwrap();
            net.attach_data(data).unwrap();
        }
        let two_epochs = TrainingParams { max_epochs: 2, ..params() };
        NeuralNetworkTrainer::new(&mut plain, two_epochs).unwrap().train_network().unwrap();
        let with_momentum = TrainingParams { momentum: 0.5, max_epochs: 2, ..params() };
        NeuralNetworkTrainer::new(&mut damped, with_momentum).unwrap().train_network().unwrap();
        // the second epoch's update differs once a previous delta exists
        assert_ne!(plain.layers[0].weights, damped.layers[0].weights);
    }

    #[test]
    fn batch_of_one_matches_a_single_online_update() {
        let mut online = NeuralNetwork::new(&[2, 2, 1], ActivationFn::Sigmoid, 13).unwrap();
        let mut batch = NeuralNetwork::new(&[2, 2, 1], ActivationFn::Sigmoid, 13).unwrap();
        for net in [&mut online, &mut batch] {
            let mut data = TrainingDataSet::new();
            data.add_entry(vec![0.2, 0.9], vec![1.0]).unwrap();
            data.partition(1.0, 0.0).unwrap();
            net.attach_data(data).unwrap();
        }
        let one_epoch = TrainingParams { max_epochs: 1, ..params() };
        NeuralNetworkTrainer::new(&mut online, one_epoch).unwrap().train_network().unwrap();
        let batched = TrainingParams { use_batch: true, max_epochs: 1, ..params() };
        NeuralNetworkTrainer::new(&mut batch, batched).unwrap().train_network().unwrap();
        assert_eq!(online.layers, batch.layers);
    }

    #[test]
    fn batch_mode_ignores_pattern_order_within_an_epoch() {
        // same two entries in both orders must give identical batch updates
        let entries = [(vec![0.1, 0.4], vec![0.0]), (vec![0.9, 0.2], vec![1.0])];
        let mut forward = NeuralNetwork::new(&[2, 2, 1], ActivationFn::Sigmoid, 21).unwrap();
        let mut reversed = NeuralNetwork::new(&[2, 2, 1], ActivationFn::Sigmoid, 21).unwrap();
        let mut data_fwd = TrainingDataSet::new();
        let mut data_rev = TrainingDataSet::new();
        for (pattern, target) in entries.iter() {
            data_fwd.add_entry(pattern.clone(), target.clone()).unwrap();
        }
        for (pattern, target) in entries.iter().rev() {
            data_rev.add_entry(pattern.clone(), target.clone()).unwrap();
        }
        data_fwd.partition(1.0, 0.0).unwrap();
        data_rev.partition(1.0, 0.0).unwrap();
        forward.attach_data(data_fwd).unwrap();
        reversed.attach_data(data_rev).unwrap();

        let batched = TrainingParams { use_batch: true, max_epochs: 1, ..params() };
        NeuralNetworkTrainer::new(&mut forward, batched).unwrap().train_network().unwrap();
        NeuralNetworkTrainer::new(&mut reversed, batched).unwrap().train_network().unwrap();
        assert_eq!(forward.layers, reversed.layers);
    }

    #[test]
    fn generalization_set_is_evaluated_but_not_trained_on() {
        let mut net = NeuralNetwork::new(&[2, 2, 1], ActivationFn::Sigmoid, 5).unwrap();
        let mut data = TrainingDataSet::new();
        for i in 0..4 {
            data.add_entry(vec![i as f64, 1.0], vec![0.37]).unwrap();
        }
        data.partition(0.5, 0.5).unwrap();
        net.attach_data(data).unwrap();

        let mut trainer = NeuralNetworkTrainer::new(&mut net, TrainingParams { max_epochs: 3, ..params() }).unwrap();
        let report = trainer.train_network().unwrap();
        // unreachable targets keep both accuracies at zero
        assert_eq!(report.training_accuracy, 0.0);
        assert_eq!(report.generalization_accuracy, 0.0);
        assert_eq!(report.outcome, TrainingOutcome::MaxEpochsExceeded);
    }
}
