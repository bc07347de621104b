//! Binary cross-entropy.
//!
//! The network ends in a sigmoid, so the loss is evaluated on probabilities and the
//! gradient is taken with respect to the *logits* feeding that sigmoid. The
//! sigmoid derivative is folded into [`bce_sigmoid_backward`]; callers must not
//! also route the gradient through a sigmoid unit's backward.

use crate::{Error, Matrix, Result};

/// Added inside both logarithms so `a = 0` and `a = 1` stay finite.
pub const BCE_EPSILON: f32 = 1e-8;

/// Mean binary cross-entropy over the batch.
///
/// `mean(-(y * ln(a + eps) + (1 - y) * ln(1 - a + eps)))`
///
/// Shape contract: `predictions` and `labels` are both `(1, batch)`.
pub fn bce(predictions: &Matrix, labels: &Matrix) -> Result<f32> {
    check_shapes("bce", predictions, labels)?;

    if predictions.is_empty() {
        return Ok(0.0);
    }

    let mut sum = 0.0_f32;
    for (&a, &y) in predictions.as_slice().iter().zip(labels.as_slice()) {
        sum += y * (a + BCE_EPSILON).ln() + (1.0 - y) * (1.0 - a + BCE_EPSILON).ln();
    }
    Ok(-sum / predictions.len() as f32)
}

/// Gradient of BCE-after-sigmoid w.r.t. the logits: `out = predictions - labels`.
///
/// Not divided by the batch size; the dense layer averages its parameter
/// gradients itself.
pub fn bce_sigmoid_backward(predictions: &Matrix, labels: &Matrix, out: &mut Matrix) -> Result<()> {
    check_shapes("bce_sigmoid_backward", predictions, labels)?;
    if out.shape() != predictions.shape() {
        return Err(Error::ShapeMismatch(format!(
            "bce_sigmoid_backward: out is {}x{}, predictions are {}x{}",
            out.rows(),
            out.cols(),
            predictions.rows(),
            predictions.cols()
        )));
    }

    for ((d, &a), &y) in out
        .as_mut_slice()
        .iter_mut()
        .zip(predictions.as_slice())
        .zip(labels.as_slice())
    {
        *d = a - y;
    }
    Ok(())
}

fn check_shapes(op: &str, predictions: &Matrix, labels: &Matrix) -> Result<()> {
    if predictions.rows() != 1 || predictions.shape() != labels.shape() {
        return Err(Error::ShapeMismatch(format!(
            "{op}: predictions are {}x{}, labels are {}x{}, expected matching 1xN",
            predictions.rows(),
            predictions.cols(),
            labels.rows(),
            labels.cols()
        )));
    }
    Ok(())
}
