use rand::Rng;

use crate::matrix::{matmul, matmul_nt, matmul_tn, sum_columns};
use crate::{Error, Matrix, Result};

/// Weight initialization scheme for a dense layer.
///
/// All schemes draw from a symmetric uniform distribution; biases always start at zero.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(tag = "kind", rename_all = "snake_case"))]
pub enum Init {
    /// `U(-limit, limit)`.
    Uniform { limit: f32 },
    /// Xavier/Glorot: `U(-sqrt(6 / (in + out)), +sqrt(6 / (in + out)))`.
    Xavier,
    /// He/Kaiming: `U(-sqrt(6 / in), +sqrt(6 / in))`.
    He,
}

impl Default for Init {
    fn default() -> Self {
        Init::Uniform { limit: 0.01 }
    }
}

impl Init {
    pub fn validate(self) -> Result<()> {
        if let Init::Uniform { limit } = self {
            if !(limit.is_finite() && limit > 0.0) {
                return Err(Error::InvalidConfig(format!(
                    "uniform init limit must be finite and > 0, got {limit}"
                )));
            }
        }
        Ok(())
    }

    fn limit(self, in_dim: usize, out_dim: usize) -> f32 {
        match self {
            Init::Uniform { limit } => limit,
            Init::Xavier => (6.0 / (in_dim + out_dim) as f32).sqrt(),
            Init::He => (6.0 / in_dim as f32).sqrt(),
        }
    }
}

/// Fully connected layer: `z = W * x + b` over a batch of column samples.
#[derive(Debug, Clone)]
pub struct Dense {
    in_dim: usize,
    out_dim: usize,
    /// `(out_dim, in_dim)`.
    weights: Matrix,
    /// `(out_dim, 1)`.
    biases: Matrix,
    d_weights: Matrix,
    d_biases: Matrix,
    /// `(in_dim, batch)`; zero columns until the first training-mode forward.
    input_cache: Matrix,
    /// `(out_dim, batch)`.
    output_cache: Matrix,
}

impl Dense {
    pub fn new_with_rng<R: Rng + ?Sized>(
        in_dim: usize,
        out_dim: usize,
        max_batch: usize,
        init: Init,
        rng: &mut R,
    ) -> Result<Self> {
        init.validate()?;
        let mut layer = Self::zeroed(in_dim, out_dim, max_batch)?;
        let limit = init.limit(in_dim, out_dim);
        layer.weights.fill_uniform(rng, -limit, limit)?;
        Ok(layer)
    }

    /// Build a layer from existing parameters (row-major `(out_dim, in_dim)` weights).
    pub fn from_parts(
        in_dim: usize,
        out_dim: usize,
        max_batch: usize,
        weights: Vec<f32>,
        biases: Vec<f32>,
    ) -> Result<Self> {
        let mut layer = Self::zeroed(in_dim, out_dim, max_batch)?;
        if weights.iter().chain(&biases).any(|v| !v.is_finite()) {
            return Err(Error::InvalidData(
                "layer parameters must be finite".to_owned(),
            ));
        }
        layer.weights = Matrix::from_vec(out_dim, in_dim, weights)?;
        layer.biases = Matrix::from_vec(out_dim, 1, biases)?;
        Ok(layer)
    }

    fn zeroed(in_dim: usize, out_dim: usize, max_batch: usize) -> Result<Self> {
        if in_dim == 0 || out_dim == 0 || max_batch == 0 {
            return Err(Error::InvalidConfig(format!(
                "dense layer dims must be > 0, got in_dim={in_dim} out_dim={out_dim} max_batch={max_batch}"
            )));
        }

        let mut input_cache = Matrix::zeros(in_dim, max_batch)?;
        input_cache.set_cols(0)?;
        let mut output_cache = Matrix::zeros(out_dim, max_batch)?;
        output_cache.set_cols(0)?;

        Ok(Self {
            in_dim,
            out_dim,
            weights: Matrix::zeros(out_dim, in_dim)?,
            biases: Matrix::zeros(out_dim, 1)?,
            d_weights: Matrix::zeros(out_dim, in_dim)?,
            d_biases: Matrix::zeros(out_dim, 1)?,
            input_cache,
            output_cache,
        })
    }

    #[inline]
    pub fn in_dim(&self) -> usize {
        self.in_dim
    }

    #[inline]
    pub fn out_dim(&self) -> usize {
        self.out_dim
    }

    #[inline]
    pub fn max_batch(&self) -> usize {
        self.input_cache.max_cols()
    }

    #[inline]
    pub fn weights(&self) -> &Matrix {
        &self.weights
    }

    #[inline]
    pub fn weights_mut(&mut self) -> &mut Matrix {
        &mut self.weights
    }

    #[inline]
    pub fn biases(&self) -> &Matrix {
        &self.biases
    }

    #[inline]
    pub fn biases_mut(&mut self) -> &mut Matrix {
        &mut self.biases
    }

    #[inline]
    pub fn d_weights(&self) -> &Matrix {
        &self.d_weights
    }

    #[inline]
    pub fn d_biases(&self) -> &Matrix {
        &self.d_biases
    }

    /// Pre-activation output cached by the last training-mode forward.
    #[inline]
    pub fn pre_activation(&self) -> &Matrix {
        &self.output_cache
    }

    /// Forward pass over a batch.
    ///
    /// Computes `output = W * input + b`, broadcasting `b` over columns.
    ///
    /// Shape contract:
    /// - `input` is `(in_dim, batch)` with `batch <= max_batch`
    /// - `output` is `(out_dim, batch)`
    pub fn forward(&mut self, input: &Matrix, output: &mut Matrix, training: bool) -> Result<()> {
        if input.rows() != self.in_dim || input.cols() > self.max_batch() {
            return Err(Error::ShapeMismatch(format!(
                "dense forward: input is {}x{}, layer accepts {}x(<= {})",
                input.rows(),
                input.cols(),
                self.in_dim,
                self.max_batch()
            )));
        }

        matmul(output, &self.weights, input)?;
        output.add_column_broadcast(&self.biases)?;

        if training {
            self.input_cache.set_cols(input.cols())?;
            self.input_cache.copy_from(input)?;
            self.output_cache.set_cols(input.cols())?;
            self.output_cache.copy_from(output)?;
        }
        Ok(())
    }

    /// Backward pass over the batch seen by the last training-mode forward.
    ///
    /// Overwrite semantics, averaged over the batch:
    /// - `d_weights = d_output * inputᵗ / batch`
    /// - `d_biases = row sums of d_output / batch`
    /// - `d_input = Wᵗ * d_output` when requested (unscaled)
    ///
    /// Pass `None` for `d_input` on the first layer of a chain.
    pub fn backward(&mut self, d_output: &Matrix, d_input: Option<&mut Matrix>) -> Result<()> {
        if d_output.shape() != self.output_cache.shape() {
            return Err(Error::ShapeMismatch(format!(
                "dense backward: d_output is {}x{}, cached batch is {}x{}",
                d_output.rows(),
                d_output.cols(),
                self.output_cache.rows(),
                self.output_cache.cols()
            )));
        }

        let batch = d_output.cols() as f32;

        matmul_nt(&mut self.d_weights, d_output, &self.input_cache)?;
        sum_columns(&mut self.d_biases, d_output)?;
        self.d_weights.div_scalar(batch)?;
        self.d_biases.div_scalar(batch)?;

        if let Some(d_input) = d_input {
            matmul_tn(d_input, &self.weights, d_output)?;
        }
        Ok(())
    }

    pub fn zero_gradients(&mut self) {
        self.d_weights.zero();
        self.d_biases.zero();
    }

    /// `W -= lr * dW`, `b -= lr * dB`.
    ///
    /// The gradient accumulators are scaled in place; zero them afterwards.
    pub fn sgd_step(&mut self, lr: f32) -> Result<()> {
        self.d_weights.scale(lr);
        self.weights.sub_assign(&self.d_weights)?;
        self.d_biases.scale(lr);
        self.biases.sub_assign(&self.d_biases)?;
        Ok(())
    }
}
