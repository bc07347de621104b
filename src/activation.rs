//! Activation units.
//!
//! An [`ActivationUnit`] applies an element-wise nonlinearity to a `(dim, batch)`
//! matrix. In training mode it remembers exactly the quantity its derivative
//! needs:
//!
//! - ReLU caches its *input* (the pre-activation); `f'(z) = 1[z > 0]`.
//! - Sigmoid caches its *output* `a`; `f'(z) = a * (1 - a)`.

use crate::{Error, Matrix, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
/// Element-wise activation function.
pub enum Activation {
    ReLU,
    Sigmoid,
}

impl Activation {
    #[inline]
    pub(crate) fn forward(self, x: f32) -> f32 {
        match self {
            Activation::ReLU => x.max(0.0),
            Activation::Sigmoid => sigmoid(x),
        }
    }

    /// Local derivative evaluated from the cached quantity (see module docs).
    #[inline]
    pub(crate) fn grad_from_cache(self, cached: f32) -> f32 {
        match self {
            Activation::ReLU => {
                if cached > 0.0 {
                    1.0
                } else {
                    0.0
                }
            }
            Activation::Sigmoid => cached * (1.0 - cached),
        }
    }
}

/// Smallest and largest `f32` strictly inside `(0, 1)`.
const SIGMOID_MIN: f32 = f32::MIN_POSITIVE;
const SIGMOID_MAX: f32 = 1.0 - f32::EPSILON / 2.0;

#[inline]
pub(crate) fn sigmoid(x: f32) -> f32 {
    // Numerically stable sigmoid.
    let y = if x >= 0.0 {
        let z = (-x).exp();
        1.0 / (1.0 + z)
    } else {
        let z = x.exp();
        z / (1.0 + z)
    };
    // f32 rounds to exactly 1.0 above ~17 and underflows to 0.0 below ~-104.
    y.clamp(SIGMOID_MIN, SIGMOID_MAX)
}

#[derive(Debug, Clone)]
pub struct ActivationUnit {
    activation: Activation,
    dim: usize,
    /// `(dim, batch)`; zero columns until the first training-mode forward.
    cache: Matrix,
}

impl ActivationUnit {
    pub fn new(activation: Activation, dim: usize, max_batch: usize) -> Result<Self> {
        if dim == 0 || max_batch == 0 {
            return Err(Error::InvalidConfig(format!(
                "activation unit needs dim > 0 and max_batch > 0, got dim={dim} max_batch={max_batch}"
            )));
        }
        let mut cache = Matrix::zeros(dim, max_batch)?;
        cache.set_cols(0)?;
        Ok(Self {
            activation,
            dim,
            cache,
        })
    }

    #[inline]
    pub fn relu(dim: usize, max_batch: usize) -> Result<Self> {
        Self::new(Activation::ReLU, dim, max_batch)
    }

    #[inline]
    pub fn sigmoid(dim: usize, max_batch: usize) -> Result<Self> {
        Self::new(Activation::Sigmoid, dim, max_batch)
    }

    #[inline]
    pub fn activation(&self) -> Activation {
        self.activation
    }

    #[inline]
    pub fn dim(&self) -> usize {
        self.dim
    }

    #[inline]
    pub fn max_batch(&self) -> usize {
        self.cache.max_cols()
    }

    /// `output = f(input)`, element-wise.
    ///
    /// With `training` set, the derivative cache is overwritten for the
    /// following [`ActivationUnit::backward`].
    pub fn forward(&mut self, input: &Matrix, output: &mut Matrix, training: bool) -> Result<()> {
        if input.rows() != self.dim || input.cols() > self.max_batch() {
            return Err(Error::ShapeMismatch(format!(
                "{:?} forward: input is {}x{}, unit accepts {}x(<= {})",
                self.activation,
                input.rows(),
                input.cols(),
                self.dim,
                self.max_batch()
            )));
        }
        if output.shape() != input.shape() {
            return Err(Error::ShapeMismatch(format!(
                "{:?} forward: output is {}x{}, input is {}x{}",
                self.activation,
                output.rows(),
                output.cols(),
                input.rows(),
                input.cols()
            )));
        }

        let act = self.activation;
        for (y, &x) in output.as_mut_slice().iter_mut().zip(input.as_slice()) {
            *y = act.forward(x);
        }

        if training {
            self.cache.set_cols(input.cols())?;
            match act {
                Activation::ReLU => self.cache.copy_from(input)?,
                Activation::Sigmoid => self.cache.copy_from(output)?,
            }
        }
        Ok(())
    }

    /// `d_input = d_output ⊙ f'(cache)`.
    ///
    /// Requires a preceding training-mode forward on a batch of the same width.
    pub fn backward(&self, d_output: &Matrix, d_input: &mut Matrix) -> Result<()> {
        if d_output.shape() != self.cache.shape() || d_input.shape() != self.cache.shape() {
            return Err(Error::ShapeMismatch(format!(
                "{:?} backward: d_output is {}x{}, d_input is {}x{}, cache is {}x{}",
                self.activation,
                d_output.rows(),
                d_output.cols(),
                d_input.rows(),
                d_input.cols(),
                self.cache.rows(),
                self.cache.cols()
            )));
        }

        let act = self.activation;
        let cached = self.cache.as_slice();
        for ((dx, &dy), &c) in d_input
            .as_mut_slice()
            .iter_mut()
            .zip(d_output.as_slice())
            .zip(cached)
        {
            *dx = dy * act.grad_from_cache(c);
        }
        Ok(())
    }
}
