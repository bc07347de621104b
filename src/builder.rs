//! Model builder.
//!
//! `MlpBuilder` is the recommended way to configure a network. The topology is
//! fixed (two ReLU hidden layers and a single sigmoid output); the builder
//! collects the widths, the batch capacity, and the weight initializer, and
//! validates each as it is set.
//!
//! The default initializer is [`Init::Uniform`] with `limit = 0.01`. Deeper or
//! narrower ReLU stacks usually train faster with [`Init::He`].

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::{Error, Init, Mlp, Result};

#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
/// Builder for an `Mlp`.
///
/// Example:
///
/// ```rust
/// use simple_nn::{Init, MlpBuilder};
///
/// # fn main() -> simple_nn::Result<()> {
/// let mlp = MlpBuilder::new(2)?
///     .hidden(4, 4)?
///     .max_batch(4)?
///     .init(Init::He)?
///     .build_with_seed(0)?;
/// assert_eq!(mlp.hidden_dims(), (4, 4));
/// # Ok(())
/// # }
/// ```
pub struct MlpBuilder {
    input_dim: usize,
    hidden: Option<(usize, usize)>,
    max_batch: Option<usize>,
    init: Init,
}

impl MlpBuilder {
    /// Start building an MLP that accepts `input_dim` features per sample.
    pub fn new(input_dim: usize) -> Result<Self> {
        if input_dim == 0 {
            return Err(Error::InvalidConfig("input_dim must be > 0".to_owned()));
        }
        Ok(Self {
            input_dim,
            hidden: None,
            max_batch: None,
            init: Init::default(),
        })
    }

    /// Widths of the two hidden layers.
    pub fn hidden(mut self, hidden1: usize, hidden2: usize) -> Result<Self> {
        if hidden1 == 0 || hidden2 == 0 {
            return Err(Error::InvalidConfig(format!(
                "hidden widths must be > 0, got {hidden1} and {hidden2}"
            )));
        }
        self.hidden = Some((hidden1, hidden2));
        Ok(self)
    }

    /// Widest batch the network will ever see. All buffers are sized to it.
    pub fn max_batch(mut self, max_batch: usize) -> Result<Self> {
        if max_batch == 0 {
            return Err(Error::InvalidConfig("max_batch must be > 0".to_owned()));
        }
        self.max_batch = Some(max_batch);
        Ok(self)
    }

    pub fn init(mut self, init: Init) -> Result<Self> {
        init.validate()?;
        self.init = init;
        Ok(self)
    }

    /// Build using a deterministic seed.
    pub fn build_with_seed(self, seed: u64) -> Result<Mlp> {
        let mut rng = StdRng::seed_from_u64(seed);
        self.build_with_rng(&mut rng)
    }

    /// Build using the provided RNG.
    pub fn build_with_rng<R: Rng + ?Sized>(self, rng: &mut R) -> Result<Mlp> {
        let (hidden1, hidden2) = self.hidden.ok_or_else(|| {
            Error::InvalidConfig("hidden layer widths must be set".to_owned())
        })?;
        let max_batch = self
            .max_batch
            .ok_or_else(|| Error::InvalidConfig("max_batch must be set".to_owned()))?;

        Mlp::new_with_rng(self.input_dim, hidden1, hidden2, max_batch, self.init, rng)
    }
}
