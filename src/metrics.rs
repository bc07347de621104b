//! Metrics.
//!
//! Evaluation helpers; they do not participate in backprop.

use crate::{Error, Matrix, Result};

/// Decision threshold for turning a sigmoid output into a class.
pub const BINARY_THRESHOLD: f32 = 0.5;

/// Number of columns where `prediction >= 0.5` agrees with `label == 1`.
pub fn binary_correct(predictions: &Matrix, labels: &Matrix) -> Result<usize> {
    if predictions.shape() != labels.shape() {
        return Err(Error::ShapeMismatch(format!(
            "accuracy: predictions are {}x{}, labels are {}x{}",
            predictions.rows(),
            predictions.cols(),
            labels.rows(),
            labels.cols()
        )));
    }

    Ok(predictions
        .as_slice()
        .iter()
        .zip(labels.as_slice())
        .filter(|&(&p, &y)| (p >= BINARY_THRESHOLD) == (y >= BINARY_THRESHOLD))
        .count())
}

/// Fraction of correctly classified samples, in `[0, 1]`.
pub fn binary_accuracy(predictions: &Matrix, labels: &Matrix) -> Result<f32> {
    let correct = binary_correct(predictions, labels)?;
    if predictions.is_empty() {
        return Ok(0.0);
    }
    Ok(correct as f32 / predictions.len() as f32)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counts_threshold_agreement() {
        let preds = Matrix::from_vec(1, 4, vec![0.9, 0.2, 0.5, 0.49]).unwrap();
        let labels = Matrix::from_vec(1, 4, vec![1.0, 0.0, 0.0, 1.0]).unwrap();
        assert_eq!(binary_correct(&preds, &labels).unwrap(), 2);
        assert_eq!(binary_accuracy(&preds, &labels).unwrap(), 0.5);

        let short = Matrix::zeros(1, 3).unwrap();
        assert!(binary_accuracy(&preds, &short).is_err());
    }
}
