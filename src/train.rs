use crate::metrics::binary_correct;
use crate::{Dataset, Error, Mlp, Result, Sgd};

#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct FitConfig {
    pub epochs: usize,
    pub lr: f32,
}

impl Default for FitConfig {
    fn default() -> Self {
        Self {
            epochs: 10,
            lr: 1e-2,
        }
    }
}

impl FitConfig {
    pub fn validate(&self) -> Result<()> {
        if self.epochs == 0 {
            return Err(Error::InvalidConfig("epochs must be > 0".to_owned()));
        }
        Sgd::new(self.lr)?;
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EpochReport {
    /// Zero-based epoch index.
    pub epoch: usize,
    /// Mean of the per-batch training losses.
    pub mean_loss: f32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FitReport {
    pub epochs: Vec<EpochReport>,
}

impl FitReport {
    /// Mean loss of the last epoch.
    pub fn final_loss(&self) -> f32 {
        self.epochs.last().map(|e| e.mean_loss).unwrap_or(f32::NAN)
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EvalReport {
    /// Mean of the per-batch losses.
    pub loss: f32,
    /// Fraction of samples classified correctly at threshold 0.5.
    pub accuracy: f32,
}

impl Mlp {
    /// Train for `cfg.epochs` passes over `train` with plain SGD.
    ///
    /// Batches are visited in dataset order every epoch; nothing is shuffled.
    /// Each epoch's mean loss is logged at `debug` level, the final one at `info`.
    pub fn train_epochs(&mut self, train: &Dataset, cfg: FitConfig) -> Result<FitReport> {
        self.train_epochs_with(train, cfg, |_| {})
    }

    /// Like [`Mlp::train_epochs`], calling `on_epoch` after every epoch.
    pub fn train_epochs_with<F>(
        &mut self,
        train: &Dataset,
        cfg: FitConfig,
        mut on_epoch: F,
    ) -> Result<FitReport>
    where
        F: FnMut(&EpochReport),
    {
        cfg.validate()?;
        self.check_dataset(train)?;

        let mut epochs = Vec::with_capacity(cfg.epochs);
        for epoch in 0..cfg.epochs {
            let mut total = 0.0_f32;
            for batch in train {
                total += self.train_step(batch.features(), batch.labels(), cfg.lr)?;
            }

            let report = EpochReport {
                epoch,
                mean_loss: total / train.len() as f32,
            };
            log::debug!(
                "epoch {}/{}: mean loss {:.6}",
                epoch + 1,
                cfg.epochs,
                report.mean_loss
            );
            on_epoch(&report);
            epochs.push(report);
        }

        let report = FitReport { epochs };
        log::info!(
            "trained {} epochs, final mean loss {:.6}",
            cfg.epochs,
            report.final_loss()
        );
        Ok(report)
    }

    /// Mean BCE and binary accuracy over a dataset, in inference mode.
    pub fn evaluate(&mut self, data: &Dataset) -> Result<EvalReport> {
        self.check_dataset(data)?;

        let mut total_loss = 0.0_f32;
        let mut correct = 0_usize;
        for batch in data {
            total_loss += self.loss(batch.features(), batch.labels())?;
            correct += binary_correct(self.output(), batch.labels())?;
        }

        Ok(EvalReport {
            loss: total_loss / data.len() as f32,
            accuracy: correct as f32 / data.num_samples() as f32,
        })
    }

    /// Reject a dataset up front so a bad batch never leaves training half done.
    fn check_dataset(&self, data: &Dataset) -> Result<()> {
        if data.is_empty() {
            return Err(Error::InvalidData("dataset must not be empty".to_owned()));
        }
        if data.input_dim() != self.input_dim() {
            return Err(Error::ShapeMismatch(format!(
                "dataset input_dim {} does not match model input_dim {}",
                data.input_dim(),
                self.input_dim()
            )));
        }
        if data.max_batch_len() > self.max_batch() {
            return Err(Error::ShapeMismatch(format!(
                "dataset has a batch of {} samples, model max_batch is {}",
                data.max_batch_len(),
                self.max_batch()
            )));
        }
        Ok(())
    }
}
