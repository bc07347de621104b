use rand::Rng;

use crate::activation::ActivationUnit;
use crate::loss::{bce, bce_sigmoid_backward};
use crate::{Dense, Error, Init, Matrix, MlpBuilder, Result, Sgd};

/// Fixed-topology binary classifier:
/// `Dense -> ReLU -> Dense -> ReLU -> Dense -> Sigmoid`, trained with BCE.
///
/// Every intermediate and gradient buffer is allocated once, sized for
/// `max_batch` columns, and reused by every step.
#[derive(Debug, Clone)]
pub struct Mlp {
    fc1: Dense,
    relu1: ActivationUnit,
    fc2: Dense,
    relu2: ActivationUnit,
    fc3: Dense,
    sigmoid: ActivationUnit,
    scratch: Scratch,
}

/// Forward activations and backward gradients for one batch.
///
/// Naming follows the chain: `z*` are dense outputs, `a*` activation outputs.
#[derive(Debug, Clone)]
struct Scratch {
    z1: Matrix,
    a1: Matrix,
    z2: Matrix,
    a2: Matrix,
    z3: Matrix,
    a3: Matrix,
    d_z3: Matrix,
    d_a2: Matrix,
    d_z2: Matrix,
    d_a1: Matrix,
    d_z1: Matrix,
}

impl Scratch {
    fn new(hidden1: usize, hidden2: usize, max_batch: usize) -> Result<Self> {
        Ok(Self {
            z1: Matrix::zeros(hidden1, max_batch)?,
            a1: Matrix::zeros(hidden1, max_batch)?,
            z2: Matrix::zeros(hidden2, max_batch)?,
            a2: Matrix::zeros(hidden2, max_batch)?,
            z3: Matrix::zeros(1, max_batch)?,
            a3: Matrix::zeros(1, max_batch)?,
            d_z3: Matrix::zeros(1, max_batch)?,
            d_a2: Matrix::zeros(hidden2, max_batch)?,
            d_z2: Matrix::zeros(hidden2, max_batch)?,
            d_a1: Matrix::zeros(hidden1, max_batch)?,
            d_z1: Matrix::zeros(hidden1, max_batch)?,
        })
    }

    fn set_batch(&mut self, batch: usize) -> Result<()> {
        for m in [
            &mut self.z1,
            &mut self.a1,
            &mut self.z2,
            &mut self.a2,
            &mut self.z3,
            &mut self.a3,
            &mut self.d_z3,
            &mut self.d_a2,
            &mut self.d_z2,
            &mut self.d_a1,
            &mut self.d_z1,
        ] {
            m.set_cols(batch)?;
        }
        Ok(())
    }
}

impl Mlp {
    /// Build a network with the default small-uniform initialization.
    pub fn new_with_seed(
        input_dim: usize,
        hidden1: usize,
        hidden2: usize,
        max_batch: usize,
        seed: u64,
    ) -> Result<Self> {
        MlpBuilder::new(input_dim)?
            .hidden(hidden1, hidden2)?
            .max_batch(max_batch)?
            .build_with_seed(seed)
    }

    pub fn new_with_rng<R: Rng + ?Sized>(
        input_dim: usize,
        hidden1: usize,
        hidden2: usize,
        max_batch: usize,
        init: Init,
        rng: &mut R,
    ) -> Result<Self> {
        let fc1 = Dense::new_with_rng(input_dim, hidden1, max_batch, init, rng)?;
        let fc2 = Dense::new_with_rng(hidden1, hidden2, max_batch, init, rng)?;
        let fc3 = Dense::new_with_rng(hidden2, 1, max_batch, init, rng)?;
        Self::from_layers(fc1, fc2, fc3)
    }

    /// Assemble a network from three dense layers that chain into a single output.
    pub fn from_layers(fc1: Dense, fc2: Dense, fc3: Dense) -> Result<Self> {
        if fc1.out_dim() != fc2.in_dim() || fc2.out_dim() != fc3.in_dim() {
            return Err(Error::InvalidConfig(format!(
                "layers do not chain: {}->{}, {}->{}, {}->{}",
                fc1.in_dim(),
                fc1.out_dim(),
                fc2.in_dim(),
                fc2.out_dim(),
                fc3.in_dim(),
                fc3.out_dim()
            )));
        }
        if fc3.out_dim() != 1 {
            return Err(Error::InvalidConfig(format!(
                "output layer must have a single unit, got {}",
                fc3.out_dim()
            )));
        }
        let max_batch = fc1.max_batch();
        if fc2.max_batch() != max_batch || fc3.max_batch() != max_batch {
            return Err(Error::InvalidConfig(format!(
                "layers disagree on max_batch: {}, {}, {}",
                max_batch,
                fc2.max_batch(),
                fc3.max_batch()
            )));
        }

        let hidden1 = fc1.out_dim();
        let hidden2 = fc2.out_dim();
        log::debug!(
            "mlp {}-{hidden1}-{hidden2}-1 with max_batch {max_batch}",
            fc1.in_dim()
        );

        Ok(Self {
            relu1: ActivationUnit::relu(hidden1, max_batch)?,
            relu2: ActivationUnit::relu(hidden2, max_batch)?,
            sigmoid: ActivationUnit::sigmoid(1, max_batch)?,
            scratch: Scratch::new(hidden1, hidden2, max_batch)?,
            fc1,
            fc2,
            fc3,
        })
    }

    #[inline]
    pub fn input_dim(&self) -> usize {
        self.fc1.in_dim()
    }

    #[inline]
    pub fn hidden_dims(&self) -> (usize, usize) {
        (self.fc1.out_dim(), self.fc2.out_dim())
    }

    #[inline]
    pub fn max_batch(&self) -> usize {
        self.fc1.max_batch()
    }

    #[inline]
    pub fn num_layers(&self) -> usize {
        3
    }

    pub fn layer(&self, idx: usize) -> Option<&Dense> {
        match idx {
            0 => Some(&self.fc1),
            1 => Some(&self.fc2),
            2 => Some(&self.fc3),
            _ => None,
        }
    }

    pub fn layer_mut(&mut self, idx: usize) -> Option<&mut Dense> {
        match idx {
            0 => Some(&mut self.fc1),
            1 => Some(&mut self.fc2),
            2 => Some(&mut self.fc3),
            _ => None,
        }
    }

    /// Forward pass over a `(input_dim, batch)` feature matrix.
    ///
    /// Returns the `(1, batch)` sigmoid output. With `training` set every unit
    /// refreshes its derivative cache.
    pub fn forward(&mut self, features: &Matrix, training: bool) -> Result<&Matrix> {
        let batch = features.cols();
        if features.rows() != self.input_dim() {
            return Err(Error::ShapeMismatch(format!(
                "features have {} rows, model input_dim is {}",
                features.rows(),
                self.input_dim()
            )));
        }
        if batch == 0 || batch > self.max_batch() {
            return Err(Error::ShapeMismatch(format!(
                "batch of {batch} samples, model accepts 1..={}",
                self.max_batch()
            )));
        }

        let s = &mut self.scratch;
        s.set_batch(batch)?;

        self.fc1.forward(features, &mut s.z1, training)?;
        self.relu1.forward(&s.z1, &mut s.a1, training)?;
        self.fc2.forward(&s.a1, &mut s.z2, training)?;
        self.relu2.forward(&s.z2, &mut s.a2, training)?;
        self.fc3.forward(&s.a2, &mut s.z3, training)?;
        self.sigmoid.forward(&s.z3, &mut s.a3, training)?;

        Ok(&s.a3)
    }

    /// Output row of the most recent forward pass.
    #[inline]
    pub fn output(&self) -> &Matrix {
        &self.scratch.a3
    }

    /// Inference-mode forward pass; caches are left untouched.
    #[inline]
    pub fn predict(&mut self, features: &Matrix) -> Result<&Matrix> {
        self.forward(features, false)
    }

    /// Inference-mode BCE of the current parameters on one batch.
    pub fn loss(&mut self, features: &Matrix, labels: &Matrix) -> Result<f32> {
        check_labels(features, labels)?;
        self.forward(features, false)?;
        bce(&self.scratch.a3, labels)
    }

    /// Forward, loss and backward for one batch; leaves the mean-batch gradients
    /// in each layer's accumulators and returns the loss.
    ///
    /// The output gradient is the fused sigmoid+BCE form `a3 - y`, handed
    /// straight to the last dense layer. The sigmoid unit's own backward is
    /// never applied on this path.
    pub fn compute_gradients(&mut self, features: &Matrix, labels: &Matrix) -> Result<f32> {
        check_labels(features, labels)?;
        self.forward(features, true)?;

        let s = &mut self.scratch;
        let loss = bce(&s.a3, labels)?;
        bce_sigmoid_backward(&s.a3, labels, &mut s.d_z3)?;

        self.fc3.backward(&s.d_z3, Some(&mut s.d_a2))?;
        self.relu2.backward(&s.d_a2, &mut s.d_z2)?;
        self.fc2.backward(&s.d_z2, Some(&mut s.d_a1))?;
        self.relu1.backward(&s.d_a1, &mut s.d_z1)?;
        self.fc1.backward(&s.d_z1, None)?;

        Ok(loss)
    }

    /// One full training step: gradients, plain SGD update, gradient reset.
    ///
    /// Allocation-free once the model is built.
    pub fn train_step(&mut self, features: &Matrix, labels: &Matrix, lr: f32) -> Result<f32> {
        let opt = Sgd::new(lr)?;
        let loss = self.compute_gradients(features, labels)?;
        opt.step(self)?;
        self.zero_gradients();
        Ok(loss)
    }

    /// Applies `param -= lr * grad` to every dense layer.
    pub fn sgd_step(&mut self, lr: f32) -> Result<()> {
        self.fc1.sgd_step(lr)?;
        self.fc2.sgd_step(lr)?;
        self.fc3.sgd_step(lr)?;
        Ok(())
    }

    pub fn zero_gradients(&mut self) {
        self.fc1.zero_gradients();
        self.fc2.zero_gradients();
        self.fc3.zero_gradients();
    }
}

fn check_labels(features: &Matrix, labels: &Matrix) -> Result<()> {
    if labels.rows() != 1 {
        return Err(Error::ShapeMismatch(format!(
            "labels must be a single row, got {}x{}",
            labels.rows(),
            labels.cols()
        )));
    }
    if labels.cols() != features.cols() {
        return Err(Error::DatasetIntegrity(format!(
            "features hold {} samples but labels hold {}",
            features.cols(),
            labels.cols()
        )));
    }
    Ok(())
}
