//! Batch containers.
//!
//! The network consumes data already shaped the way the kernel wants it:
//! features as `(input_dim, batch)` and labels as `(1, batch)`, one sample per
//! column. [`Batch`] enforces that pairing; [`Dataset`] is an ordered list of
//! batches that training walks front to back every epoch.

use crate::{Error, Matrix, Result};

/// One `(features, labels)` pair.
#[derive(Debug, Clone)]
pub struct Batch {
    features: Matrix,
    labels: Matrix,
}

impl Batch {
    /// Pair a `(input_dim, n)` feature matrix with a `(1, n)` label row.
    ///
    /// Labels must be exactly `0.0` or `1.0`.
    pub fn new(features: Matrix, labels: Matrix) -> Result<Self> {
        if labels.rows() != 1 {
            return Err(Error::ShapeMismatch(format!(
                "labels must be a single row, got {}x{}",
                labels.rows(),
                labels.cols()
            )));
        }
        if features.cols() != labels.cols() {
            return Err(Error::DatasetIntegrity(format!(
                "features hold {} samples but labels hold {}",
                features.cols(),
                labels.cols()
            )));
        }
        if features.cols() == 0 || features.rows() == 0 {
            return Err(Error::DatasetIntegrity(format!(
                "batch must hold at least one sample with at least one feature, got {}x{}",
                features.rows(),
                features.cols()
            )));
        }
        if let Some(bad) = labels.as_slice().iter().find(|&&y| y != 0.0 && y != 1.0) {
            return Err(Error::DatasetIntegrity(format!(
                "labels must be 0 or 1, found {bad}"
            )));
        }

        Ok(Self { features, labels })
    }

    #[inline]
    pub fn features(&self) -> &Matrix {
        &self.features
    }

    #[inline]
    pub fn labels(&self) -> &Matrix {
        &self.labels
    }

    /// Number of samples (columns).
    #[inline]
    pub fn len(&self) -> usize {
        self.features.cols()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    #[inline]
    pub fn input_dim(&self) -> usize {
        self.features.rows()
    }
}

/// An ordered sequence of batches sharing one input dimension.
#[derive(Debug, Clone)]
pub struct Dataset {
    batches: Vec<Batch>,
}

impl Dataset {
    pub fn from_batches(batches: Vec<Batch>) -> Result<Self> {
        let Some(first) = batches.first() else {
            return Err(Error::InvalidData("dataset must not be empty".to_owned()));
        };

        let input_dim = first.input_dim();
        for (i, batch) in batches.iter().enumerate() {
            if batch.input_dim() != input_dim {
                return Err(Error::DatasetIntegrity(format!(
                    "batch {i} has input_dim {}, expected {input_dim}",
                    batch.input_dim()
                )));
            }
        }

        Ok(Self { batches })
    }

    /// Pack per-sample rows into column-major batches of `batch_size` samples.
    ///
    /// The final batch holds the remainder and may be narrower.
    pub fn from_rows(inputs: &[Vec<f32>], labels: &[f32], batch_size: usize) -> Result<Self> {
        if batch_size == 0 {
            return Err(Error::InvalidConfig("batch_size must be > 0".to_owned()));
        }
        if inputs.len() != labels.len() {
            return Err(Error::DatasetIntegrity(format!(
                "inputs/labels length mismatch: {} vs {}",
                inputs.len(),
                labels.len()
            )));
        }

        let input_dim = inputs.first().map(|x| x.len()).unwrap_or(0);
        for (i, row) in inputs.iter().enumerate() {
            if row.len() != input_dim {
                return Err(Error::DatasetIntegrity(format!(
                    "input row {i} has len {}, expected {input_dim}",
                    row.len()
                )));
            }
        }

        let mut batches = Vec::with_capacity(inputs.len().div_ceil(batch_size));
        for (rows, ys) in inputs.chunks(batch_size).zip(labels.chunks(batch_size)) {
            let n = rows.len();
            let mut features = Matrix::zeros(input_dim, n)?;
            for (c, row) in rows.iter().enumerate() {
                for (r, &x) in row.iter().enumerate() {
                    features[(r, c)] = x;
                }
            }
            let labels = Matrix::from_vec(1, n, ys.to_vec())?;
            batches.push(Batch::new(features, labels)?);
        }

        Self::from_batches(batches)
    }

    /// Number of batches.
    #[inline]
    pub fn len(&self) -> usize {
        self.batches.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.batches.is_empty()
    }

    #[inline]
    pub fn num_samples(&self) -> usize {
        self.batches.iter().map(Batch::len).sum()
    }

    #[inline]
    pub fn input_dim(&self) -> usize {
        self.batches.first().map(Batch::input_dim).unwrap_or(0)
    }

    /// Widest batch in the dataset.
    #[inline]
    pub fn max_batch_len(&self) -> usize {
        self.batches.iter().map(Batch::len).max().unwrap_or(0)
    }

    #[inline]
    pub fn batches(&self) -> &[Batch] {
        &self.batches
    }

    #[inline]
    pub fn iter(&self) -> std::slice::Iter<'_, Batch> {
        self.batches.iter()
    }
}

impl<'a> IntoIterator for &'a Dataset {
    type Item = &'a Batch;
    type IntoIter = std::slice::Iter<'a, Batch>;

    fn into_iter(self) -> Self::IntoIter {
        self.batches.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn batch_rejects_sample_count_mismatch() {
        let features = Matrix::zeros(2, 3).unwrap();
        let labels = Matrix::zeros(1, 2).unwrap();
        let err = Batch::new(features, labels).unwrap_err();
        assert!(matches!(err, Error::DatasetIntegrity(_)));
    }

    #[test]
    fn batch_rejects_non_binary_labels() {
        let features = Matrix::zeros(2, 2).unwrap();
        let labels = Matrix::from_vec(1, 2, vec![0.0, 0.5]).unwrap();
        assert!(matches!(
            Batch::new(features, labels),
            Err(Error::DatasetIntegrity(_))
        ));
    }

    #[test]
    fn from_rows_packs_samples_into_columns() {
        let xs = vec![
            vec![0.0, 0.0],
            vec![0.0, 1.0],
            vec![1.0, 0.0],
            vec![1.0, 1.0],
            vec![0.5, 0.5],
        ];
        let ys = [0.0, 1.0, 1.0, 0.0, 1.0];
        let data = Dataset::from_rows(&xs, &ys, 2).unwrap();

        assert_eq!(data.len(), 3);
        assert_eq!(data.num_samples(), 5);
        assert_eq!(data.input_dim(), 2);
        assert_eq!(data.max_batch_len(), 2);

        let second = &data.batches()[1];
        // Columns are samples (1, 0) and (1, 1).
        assert_eq!(second.features().as_slice(), &[1.0, 1.0, 0.0, 1.0]);
        assert_eq!(second.labels().as_slice(), &[1.0, 0.0]);
        assert_eq!(data.batches()[2].len(), 1);
    }

    #[test]
    fn from_rows_validates_inputs() {
        assert!(Dataset::from_rows(&[vec![0.0]], &[0.0, 1.0], 1).is_err());
        assert!(Dataset::from_rows(&[vec![0.0], vec![0.0, 1.0]], &[0.0, 1.0], 1).is_err());
        assert!(Dataset::from_rows(&[vec![0.0]], &[0.0], 0).is_err());
        assert!(Dataset::from_rows(&[], &[], 1).is_err());
    }
}
