//! A small feed-forward binary classifier trained by hand-written backprop.
//!
//! `simple-nn` pairs a minimal dense-matrix kernel ([`Matrix`]) with a fixed
//! network topology:
//!
//! ```text
//! Dense -> ReLU -> Dense -> ReLU -> Dense -> Sigmoid -> BCE
//! ```
//!
//! There is no autodiff. Each unit caches exactly what its derivative needs
//! (dense layers their input, ReLU its pre-activation, sigmoid its output) and
//! the [`Mlp`] walks the chain backwards by hand.
//!
//! # Design goals
//!
//! - Predictable memory: every buffer is allocated once, sized for a maximum batch
//!   width, and reused. [`Mlp::train_step`] does not allocate.
//! - Clear contracts: every shape precondition returns [`Error::ShapeMismatch`]
//!   instead of silently doing nothing.
//! - Correctness over speed: plain triple loops, no SIMD, no BLAS.
//!
//! # Data layout and shapes
//!
//! - Scalars are `f32`.
//! - [`Matrix`] is row-major: element `(r, c)` is at `r * cols + c`.
//! - Samples are columns. Features are `(input_dim, batch)`, labels `(1, batch)`.
//! - Dense weights are `(out_dim, in_dim)`, biases `(out_dim, 1)`.
//!
//! # Sigmoid + BCE
//!
//! The output gradient handed to the last dense layer is the fused form
//! `prediction - label`, which already includes the sigmoid derivative. The
//! sigmoid unit's own backward is therefore never called by [`Mlp`].
//!
//! # Quick start
//!
//! ```rust
//! use simple_nn::{Dataset, FitConfig, Init, MlpBuilder};
//!
//! # fn main() -> simple_nn::Result<()> {
//! let xs = vec![
//!     vec![0.0, 0.0],
//!     vec![0.0, 1.0],
//!     vec![1.0, 0.0],
//!     vec![1.0, 1.0],
//! ];
//! let train = Dataset::from_rows(&xs, &[0.0, 1.0, 1.0, 0.0], 4)?;
//!
//! let mut mlp = MlpBuilder::new(2)?
//!     .hidden(8, 8)?
//!     .max_batch(4)?
//!     .init(Init::He)?
//!     .build_with_seed(0)?;
//!
//! let report = mlp.train_epochs(&train, FitConfig { epochs: 100, lr: 0.1 })?;
//! assert_eq!(report.epochs.len(), 100);
//! # Ok(())
//! # }
//! ```
//!
//! # Driving steps yourself
//!
//! ```rust
//! use simple_nn::{Matrix, Mlp};
//!
//! # fn main() -> simple_nn::Result<()> {
//! let mut mlp = Mlp::new_with_seed(3, 8, 4, 2, 0)?;
//!
//! // Two samples, one per column.
//! let x = Matrix::from_vec(3, 2, vec![0.1, 0.9, -0.2, 0.4, 0.3, 0.0])?;
//! let y = Matrix::from_vec(1, 2, vec![1.0, 0.0])?;
//!
//! let loss = mlp.train_step(&x, &y, 0.05)?;
//! assert!(loss.is_finite());
//! # Ok(())
//! # }
//! ```

pub mod activation;
pub mod builder;
pub mod data;
pub mod error;
pub mod layer;
pub mod loss;
pub(crate) mod matmul;
pub mod matrix;
pub mod metrics;
pub mod mlp;
pub mod optim;
pub mod train;

#[cfg(feature = "serde")]
pub mod serde_model;

pub use activation::{Activation, ActivationUnit};
pub use builder::MlpBuilder;
pub use data::{Batch, Dataset};
pub use error::{Error, Result};
pub use layer::{Dense, Init};
pub use matrix::Matrix;
pub use mlp::Mlp;
pub use optim::Sgd;
pub use train::{EpochReport, EvalReport, FitConfig, FitReport};
