use nalgebra::{DMatrix, DVector};
use rand::Rng;

/// Weights between two consecutive layers. The last column holds the bias
/// weights, fed by an implicit constant 1.0 appended to every input.
#[derive(Debug, Clone, PartialEq)]
pub struct Layer {
    pub weights: DMatrix<f64>,
}

impl Layer {
    /// Create a layer with small random weights drawn from the given generator.
    pub fn random(neuron_count: usize, input_count: usize, rng: &mut impl Rng) -> Self {
        return Layer {
            weights: DMatrix::from_fn(neuron_count, input_count + 1, |_, _| return rng.random_range(-0.5..0.5)),
        };
    }

    /// Number of neurons in this layer (rows of the weight matrix).
    pub fn neuron_count(&self) -> usize {
        return self.weights.nrows();
    }

    /// Number of inputs expected from the previous layer (bias column excluded).
    pub fn input_count(&self) -> usize {
        return self.weights.ncols() - 1;
    }

    /// Compute the pre-activation values from the previous layer's activations.
    pub fn compute_raw(&self, input: &DVector<f64>) -> DVector<f64> {
        // append the implicit 1.0 bias input before applying the weights
        let aug = input.push(1.0);
        return &self.weights * aug;
    }
}
