use log::trace;

/// Receives epoch progress from a trainer. Implementations must not touch
/// the network being trained.
pub trait TrainingMonitor {
    fn on_epoch(&mut self, epoch: u32, training_accuracy: f64, generalization_accuracy: f64);
}

/// Default monitor that ignores everything.
pub struct NullMonitor;

impl TrainingMonitor for NullMonitor {
    fn on_epoch(&mut self, _epoch: u32, _training_accuracy: f64, _generalization_accuracy: f64) {}
}

/// Forwards progress to the `log` facade whenever the training accuracy
/// moved since the last emitted line.
#[derive(Default)]
pub struct LogMonitor {
    last_logged: f64,
}

impl TrainingMonitor for LogMonitor {
    fn on_epoch(&mut self, epoch: u32, training_accuracy: f64, generalization_accuracy: f64) {
        if (training_accuracy - self.last_logged).abs() > 0.01 {
            trace!("accuracy: {training_accuracy:3.2}% training, {generalization_accuracy:3.2}% generalization (after {epoch} epochs)");
            // update the last LOGGED accuracy, otherwise small changes could accumulate unnoticed
            self.last_logged = training_accuracy;
        }
    }
}
