//! Optimizer.
//!
//! Plain stochastic gradient descent. The update reads the mean-batch gradients
//! left in each dense layer by [`Mlp::compute_gradients`] and has no state of its
//! own.

use crate::{Error, Mlp, Result};

#[derive(Debug, Clone, Copy)]
/// Stochastic gradient descent with a fixed learning rate.
pub struct Sgd {
    lr: f32,
}

impl Sgd {
    #[inline]
    /// Construct an SGD optimizer.
    ///
    /// Returns an error if `lr` is not finite or `lr <= 0`.
    pub fn new(lr: f32) -> Result<Self> {
        if !(lr.is_finite() && lr > 0.0) {
            return Err(Error::InvalidConfig(format!(
                "learning rate must be finite and > 0, got {lr}"
            )));
        }
        Ok(Self { lr })
    }

    #[inline]
    /// Returns the learning rate.
    pub fn lr(&self) -> f32 {
        self.lr
    }

    #[inline]
    /// Apply one optimizer step: `param -= lr * d_param` on every layer.
    pub fn step(&self, model: &mut Mlp) -> Result<()> {
        model.sgd_step(self.lr)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use crate::Matrix;

    #[test]
    fn sgd_requires_positive_finite_lr() {
        assert!(Sgd::new(0.0).is_err());
        assert!(Sgd::new(-1.0).is_err());
        assert!(Sgd::new(f32::NAN).is_err());
        assert!(Sgd::new(f32::INFINITY).is_err());
        assert_eq!(Sgd::new(0.5).unwrap().lr(), 0.5);
    }

    #[test]
    fn step_moves_parameters_against_the_gradient() {
        let mut mlp = Mlp::new_with_seed(2, 2, 2, 1, 0).unwrap();
        let x = Matrix::from_vec(2, 1, vec![1.0, 1.0]).unwrap();
        let y = Matrix::from_vec(1, 1, vec![1.0]).unwrap();

        mlp.compute_gradients(&x, &y).unwrap();
        let b_before = mlp.layer(2).unwrap().biases()[(0, 0)];
        let grad = mlp.layer(2).unwrap().d_biases()[(0, 0)];
        // Prediction ~0.5 against label 1: the output bias gradient is negative.
        assert!(grad < 0.0);

        Sgd::new(0.1).unwrap().step(&mut mlp).unwrap();
        let b_after = mlp.layer(2).unwrap().biases()[(0, 0)];
        assert!((b_after - (b_before - 0.1 * grad)).abs() < 1e-7);
    }
}
