use std::path::Path;

use log::{info, trace};

use crate::error::Error;

/// One labeled example: an input pattern and the expected target vector.
/// Created once, never mutated afterwards.
#[derive(Debug, Clone, PartialEq)]
pub struct DataEntry {
    pub pattern: Vec<f64>,
    pub target: Vec<f64>,
}

/// Ordered collection of labeled examples, split by quotas into a training
/// set, a held-out generalization set and a validation set.
///
/// Entries are staged with [`add_entry`](Self::add_entry) and split with an
/// explicit [`partition`](Self::partition) call, or both at once with
/// [`load_from_file`](Self::load_from_file). The split is deterministic:
/// the first `⌊n·training_quota⌋` entries (in insertion order) form the
/// training set, the next `⌊n·generalization_quota⌋` the generalization
/// set, and the rest the validation set.
#[derive(Debug, Clone, Default)]
pub struct TrainingDataSet {
    entries: Vec<DataEntry>,
    training_count: usize,
    generalization_count: usize,
}

impl TrainingDataSet {
    pub fn new() -> Self {
        return TrainingDataSet::default();
    }

    /// Append one example to the staging list. Any previous partition is
    /// discarded, so [`partition`](Self::partition) must be called again.
    pub fn add_entry(&mut self, pattern: Vec<f64>, target: Vec<f64>) -> Result<(), Error> {
        if let Some(first) = self.entries.first() {
            if pattern.len() != first.pattern.len() {
                return Err(Error::Dimension(format!(
                    "pattern has {} values, existing entries have {}",
                    pattern.len(),
                    first.pattern.len()
                )));
            }
            if target.len() != first.target.len() {
                return Err(Error::Dimension(format!(
                    "target has {} values, existing entries have {}",
                    target.len(),
                    first.target.len()
                )));
            }
        }
        self.training_count = 0;
        self.generalization_count = 0;
        self.entries.push(DataEntry { pattern, target });
        return Ok(());
    }

    /// Split the entries into the three subsets according to the quotas.
    pub fn partition(&mut self, training_quota: f64, generalization_quota: f64) -> Result<(), Error> {
        if !(0.0..=1.0).contains(&training_quota) {
            return Err(Error::Range(format!("training quota must be within [0, 1], got {}", training_quota)));
        }
        if !(0.0..=1.0).contains(&generalization_quota) {
            return Err(Error::Range(format!(
                "generalization quota must be within [0, 1], got {}",
                generalization_quota
            )));
        }
        if training_quota + generalization_quota > 1.0 + f64::EPSILON {
            return Err(Error::Range(format!(
                "quotas sum to {}, must not exceed 1",
                training_quota + generalization_quota
            )));
        }
        let n = self.entries.len();
        self.training_count = (n as f64 * training_quota).floor() as usize;
        self.generalization_count = (n as f64 * generalization_quota).floor() as usize;
        trace!(
            "partitioned {} entries into {} training / {} generalization / {} validation",
            n,
            self.training_count,
            self.generalization_count,
            n - self.training_count - self.generalization_count
        );
        return Ok(());
    }

    /// Load and partition examples from a text file with one example per
    /// non-empty line in the form `pattern-values ; target-values`, values
    /// separated by whitespace.
    pub fn load_from_file(path: impl AsRef<Path>, training_quota: f64, generalization_quota: f64) -> Result<Self, Error> {
        let path = path.as_ref();
        trace!("loading training data from {:?}", path);
        let text = std::fs::read_to_string(path)?;
        let mut set = TrainingDataSet::new();
        for (line_idx, line) in text.lines().enumerate() {
            if line.trim().is_empty() {
                continue;
            }
            let mut halves = line.split(';');
            let (Some(pattern_half), Some(target_half), None) = (halves.next(), halves.next(), halves.next()) else {
                return Err(Error::Format(format!(
                    "{}. line of {:?} must contain exactly one ';' between pattern and target",
                    line_idx + 1,
                    path
                )));
            };
            let pattern = parse_values(pattern_half, line_idx, path)?;
            let target = parse_values(target_half, line_idx, path)?;
            if pattern.is_empty() || target.is_empty() {
                return Err(Error::Format(format!(
                    "{}. line of {:?} needs at least one value on both sides of ';'",
                    line_idx + 1,
                    path
                )));
            }
            if let Some(first) = set.entries.first() {
                if pattern.len() != first.pattern.len() || target.len() != first.target.len() {
                    return Err(Error::Format(format!(
                        "{}. line of {:?} has {}+{} values, expected {}+{} like the first example",
                        line_idx + 1,
                        path,
                        pattern.len(),
                        target.len(),
                        first.pattern.len(),
                        first.target.len()
                    )));
                }
            }
            set.entries.push(DataEntry { pattern, target });
        }
        set.partition(training_quota, generalization_quota)?;
        info!("loaded {} examples from {:?}", set.entries.len(), path);
        return Ok(set);
    }

    /// Entries used for weight updates.
    pub fn training_set(&self) -> &[DataEntry] {
        return &self.entries[..self.training_count];
    }

    /// Held-out entries used to estimate accuracy on unseen data.
    pub fn generalization_set(&self) -> &[DataEntry] {
        return &self.entries[self.training_count..self.training_count + self.generalization_count];
    }

    /// Entries reserved for final validation, untouched by training.
    pub fn validation_set(&self) -> &[DataEntry] {
        return &self.entries[self.training_count + self.generalization_count..];
    }

    pub fn len(&self) -> usize {
        return self.entries.len();
    }

    pub fn is_empty(&self) -> bool {
        return self.entries.is_empty();
    }

    /// Length of every entry's pattern, `None` while the set is empty.
    pub fn input_size(&self) -> Option<usize> {
        return self.entries.first().map(|e| return e.pattern.len());
    }

    /// Length of every entry's target, `None` while the set is empty.
    pub fn target_size(&self) -> Option<usize> {
        return self.entries.first().map(|e| return e.target.len());
    }
}

fn parse_values(chunk: &str, line_idx: usize, path: &Path) -> Result<Vec<f64>, Error> {
    let mut values = vec![];
    for piece in chunk.split_whitespace() {
        let Ok(n) = piece.parse::<f64>() else {
            return Err(Error::Format(format!(
                "can't parse {:?} on {}. line of {:?} into f64",
                piece,
                line_idx + 1,
                path
            )));
        };
        values.push(n);
    }
    return Ok(values);
}
