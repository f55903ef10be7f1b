use std::{fmt::Display, str::FromStr};

/// Activation function shared by every layer of a network
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActivationFn {
    Sigmoid,
    Rectifier,
}

impl ActivationFn {
    /// Computes the value of f(x) for given x, where f() is the activation function (self)
    pub fn compute(&self, val: f64) -> f64 {
        match &self {
            Self::Sigmoid => return 1.0 / (1.0 + (-val).exp()),
            Self::Rectifier => return val.max(0.0),
        };
    }

    /// Computes the value of f'(x) for given x, where f'() is derivative (prime) of the activation function (self).
    /// The rectifier derivative at exactly 0 is taken as 0.
    pub fn compute_prime(&self, val: f64) -> f64 {
        match &self {
            Self::Sigmoid => {
                let temp = self.compute(val);
                return temp * (1.0 - temp);
            }
            Self::Rectifier => {
                if val > 0.0 {
                    return 1.0;
                } else {
                    return 0.0;
                }
            }
        };
    }
}

impl Display for ActivationFn {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        return write!(f, "{:?}", self);
    }
}

impl FromStr for ActivationFn {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Sigmoid" | "sigmoid" | "sig" | "s" => return Ok(ActivationFn::Sigmoid),
            "Rectifier" | "rectifier" | "relu" | "r" => return Ok(ActivationFn::Rectifier),
            _ => return Err(format!("Unrecognized activation function: {:?}", s)),
        }
    }
}
