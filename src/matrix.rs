//! Dense `f32` matrix kernel.
//!
//! Layout is row-major everywhere: element `(r, c)` lives at `data[r * cols + c]`.
//! Networks in this crate store samples along columns, so a batch of `n` samples
//! with `d` features is a `(d, n)` matrix.
//!
//! A matrix is allocated once with a maximum column count. [`Matrix::set_cols`]
//! narrows or widens the logical width within that capacity without touching the
//! allocator, which is what lets the training hot path run allocation-free on
//! batches narrower than the configured maximum.
//!
//! Every binary operation checks its shape preconditions and returns
//! [`Error::ShapeMismatch`] instead of writing anything.

use std::ops::{Index, IndexMut};

use rand::Rng;
use rand::distributions::{Distribution, Uniform};

use crate::matmul::gemm_f32;
use crate::{Error, Result};

/// Row-major `(rows, cols)` `f32` matrix whose buffer is reserved for up to
/// `max_cols` columns.
#[derive(Debug)]
pub struct Matrix {
    rows: usize,
    cols: usize,
    max_cols: usize,
    data: Vec<f32>,
}

impl Matrix {
    /// Allocate a zero-filled `(rows, cols)` matrix.
    ///
    /// `cols` is also the column capacity for later [`Matrix::set_cols`] calls.
    pub fn zeros(rows: usize, cols: usize) -> Result<Self> {
        let len = rows.checked_mul(cols).ok_or_else(|| {
            Error::Allocation(format!("{rows}x{cols} element count overflows usize"))
        })?;

        let mut data = Vec::new();
        data.try_reserve_exact(len)
            .map_err(|e| Error::Allocation(format!("{rows}x{cols} matrix: {e}")))?;
        data.resize(len, 0.0);

        Ok(Self {
            rows,
            cols,
            max_cols: cols,
            data,
        })
    }

    /// Wrap an existing row-major buffer.
    pub fn from_vec(rows: usize, cols: usize, data: Vec<f32>) -> Result<Self> {
        let expected = rows.checked_mul(cols).ok_or_else(|| {
            Error::Allocation(format!("{rows}x{cols} element count overflows usize"))
        })?;
        if data.len() != expected {
            return Err(Error::ShapeMismatch(format!(
                "buffer has {} elements, {rows}x{cols} needs {expected}",
                data.len()
            )));
        }

        Ok(Self {
            rows,
            cols,
            max_cols: cols,
            data,
        })
    }

    #[inline]
    pub fn rows(&self) -> usize {
        self.rows
    }

    #[inline]
    pub fn cols(&self) -> usize {
        self.cols
    }

    /// Column capacity this matrix was allocated with.
    #[inline]
    pub fn max_cols(&self) -> usize {
        self.max_cols
    }

    #[inline]
    pub fn shape(&self) -> (usize, usize) {
        (self.rows, self.cols)
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.data.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    #[inline]
    pub fn as_slice(&self) -> &[f32] {
        &self.data
    }

    #[inline]
    pub fn as_mut_slice(&mut self) -> &mut [f32] {
        &mut self.data
    }

    /// Change the logical column count without reallocating.
    ///
    /// Element values after the call are unspecified; callers overwrite them.
    pub fn set_cols(&mut self, cols: usize) -> Result<()> {
        if cols > self.max_cols {
            return Err(Error::ShapeMismatch(format!(
                "{cols} columns requested, matrix capacity is {}",
                self.max_cols
            )));
        }
        if cols != self.cols {
            // Stays within the reserved capacity.
            self.data.resize(self.rows * cols, 0.0);
            self.cols = cols;
        }
        Ok(())
    }

    pub fn zero(&mut self) {
        self.fill(0.0);
    }

    pub fn fill(&mut self, value: f32) {
        self.data.fill(value);
    }

    /// Elementwise copy of `src` into `self`. Shapes must match exactly.
    pub fn copy_from(&mut self, src: &Matrix) -> Result<()> {
        check_same_shape("copy", self, src)?;
        self.data.copy_from_slice(&src.data);
        Ok(())
    }

    /// `self -= other`, elementwise.
    pub fn sub_assign(&mut self, other: &Matrix) -> Result<()> {
        check_same_shape("sub_assign", self, other)?;
        for (x, &y) in self.data.iter_mut().zip(&other.data) {
            *x -= y;
        }
        Ok(())
    }

    /// `self *= scalar`, elementwise.
    pub fn scale(&mut self, scalar: f32) {
        for x in &mut self.data {
            *x *= scalar;
        }
    }

    /// `self /= scalar`, elementwise. Fails on an exactly-zero divisor.
    pub fn div_scalar(&mut self, scalar: f32) -> Result<()> {
        if scalar == 0.0 {
            return Err(Error::DivideByZero);
        }
        for x in &mut self.data {
            *x /= scalar;
        }
        Ok(())
    }

    /// Add the `(rows, 1)` column `col` to every column of `self`.
    pub fn add_column_broadcast(&mut self, col: &Matrix) -> Result<()> {
        if col.rows != self.rows || col.cols != 1 {
            return Err(Error::ShapeMismatch(format!(
                "broadcast: column is {}x{}, expected {}x1",
                col.rows, col.cols, self.rows
            )));
        }
        for (r, row) in self.data.chunks_exact_mut(self.cols.max(1)).enumerate() {
            let b = col.data[r];
            for x in row {
                *x += b;
            }
        }
        Ok(())
    }

    /// Fill every element independently from `Uniform[min, max)`.
    pub fn fill_uniform<R: Rng + ?Sized>(&mut self, rng: &mut R, min: f32, max: f32) -> Result<()> {
        if !(min.is_finite() && max.is_finite() && min < max) {
            return Err(Error::InvalidConfig(format!(
                "uniform range must be finite with min < max, got [{min}, {max})"
            )));
        }
        let dist = Uniform::new(min, max);
        for x in &mut self.data {
            *x = dist.sample(rng);
        }
        Ok(())
    }
}

/// The clone reserves the full `max_cols` capacity, so it can be widened again
/// without allocating.
impl Clone for Matrix {
    fn clone(&self) -> Self {
        // `rows * max_cols` was checked when the original was allocated.
        let mut data = Vec::with_capacity(self.rows * self.max_cols);
        data.extend_from_slice(&self.data);
        Self {
            rows: self.rows,
            cols: self.cols,
            max_cols: self.max_cols,
            data,
        }
    }
}

/// Equal shape and elements; column capacity is not compared.
impl PartialEq for Matrix {
    fn eq(&self, other: &Self) -> bool {
        self.shape() == other.shape() && self.data == other.data
    }
}

impl Index<(usize, usize)> for Matrix {
    type Output = f32;

    #[inline]
    fn index(&self, (r, c): (usize, usize)) -> &f32 {
        assert!(
            r < self.rows && c < self.cols,
            "index ({r}, {c}) out of bounds for {}x{}",
            self.rows,
            self.cols
        );
        &self.data[r * self.cols + c]
    }
}

impl IndexMut<(usize, usize)> for Matrix {
    #[inline]
    fn index_mut(&mut self, (r, c): (usize, usize)) -> &mut f32 {
        assert!(
            r < self.rows && c < self.cols,
            "index ({r}, {c}) out of bounds for {}x{}",
            self.rows,
            self.cols
        );
        &mut self.data[r * self.cols + c]
    }
}

/// `out = a * b`.
///
/// Requires `a.cols == b.rows` and `out.shape == (a.rows, b.cols)`.
pub fn matmul(out: &mut Matrix, a: &Matrix, b: &Matrix) -> Result<()> {
    if a.cols != b.rows {
        return Err(mismatch("matmul", "a.cols != b.rows", a, b));
    }
    check_out_shape("matmul", out, a.rows, b.cols)?;

    gemm_f32(
        a.rows,
        b.cols,
        a.cols,
        &a.data,
        a.cols,
        1,
        &b.data,
        b.cols,
        1,
        &mut out.data,
        out.cols,
        1,
    );
    Ok(())
}

/// `out = aᵗ * b`, transposing the first operand.
///
/// Requires `a.rows == b.rows` and `out.shape == (a.cols, b.cols)`.
pub fn matmul_tn(out: &mut Matrix, a: &Matrix, b: &Matrix) -> Result<()> {
    if a.rows != b.rows {
        return Err(mismatch("matmul_tn", "a.rows != b.rows", a, b));
    }
    check_out_shape("matmul_tn", out, a.cols, b.cols)?;

    gemm_f32(
        a.cols,
        b.cols,
        a.rows,
        &a.data,
        1,
        a.cols,
        &b.data,
        b.cols,
        1,
        &mut out.data,
        out.cols,
        1,
    );
    Ok(())
}

/// `out = a * bᵗ`, transposing the second operand.
///
/// Requires `a.cols == b.cols` and `out.shape == (a.rows, b.rows)`.
pub fn matmul_nt(out: &mut Matrix, a: &Matrix, b: &Matrix) -> Result<()> {
    if a.cols != b.cols {
        return Err(mismatch("matmul_nt", "a.cols != b.cols", a, b));
    }
    check_out_shape("matmul_nt", out, a.rows, b.rows)?;

    gemm_f32(
        a.rows,
        b.rows,
        a.cols,
        &a.data,
        a.cols,
        1,
        &b.data,
        1,
        b.cols,
        &mut out.data,
        out.cols,
        1,
    );
    Ok(())
}

/// `out = a + b`, elementwise. All three shapes must be identical.
pub fn add(out: &mut Matrix, a: &Matrix, b: &Matrix) -> Result<()> {
    check_same_shape("add", a, b)?;
    check_out_shape("add", out, a.rows, a.cols)?;
    for ((o, &x), &y) in out.data.iter_mut().zip(&a.data).zip(&b.data) {
        *o = x + y;
    }
    Ok(())
}

/// Reduce `(rows, cols)` to `(rows, 1)` by summing each row.
pub fn sum_columns(dst: &mut Matrix, src: &Matrix) -> Result<()> {
    check_out_shape("sum_columns", dst, src.rows, 1)?;
    for r in 0..src.rows {
        let row = &src.data[r * src.cols..(r + 1) * src.cols];
        let mut acc = 0.0_f32;
        for &x in row {
            acc += x;
        }
        dst.data[r] = acc;
    }
    Ok(())
}

/// `dst = srcᵗ`.
pub fn transpose_into(dst: &mut Matrix, src: &Matrix) -> Result<()> {
    check_out_shape("transpose", dst, src.cols, src.rows)?;
    for r in 0..src.rows {
        for c in 0..src.cols {
            dst.data[c * dst.cols + r] = src.data[r * src.cols + c];
        }
    }
    Ok(())
}

fn check_same_shape(op: &str, a: &Matrix, b: &Matrix) -> Result<()> {
    if a.shape() != b.shape() {
        return Err(mismatch(op, "shapes differ", a, b));
    }
    Ok(())
}

fn check_out_shape(op: &str, out: &Matrix, rows: usize, cols: usize) -> Result<()> {
    if out.shape() != (rows, cols) {
        return Err(Error::ShapeMismatch(format!(
            "{op}: output is {}x{}, expected {rows}x{cols}",
            out.rows, out.cols
        )));
    }
    Ok(())
}

fn mismatch(op: &str, what: &str, a: &Matrix, b: &Matrix) -> Error {
    Error::ShapeMismatch(format!(
        "{op}: {what} ({}x{} vs {}x{})",
        a.rows, a.cols, b.rows, b.cols
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    use rand::SeedableRng;
    use rand::rngs::StdRng;

    fn random(rows: usize, cols: usize, rng: &mut StdRng) -> Matrix {
        let mut m = Matrix::zeros(rows, cols).unwrap();
        m.fill_uniform(rng, -1.0, 1.0).unwrap();
        m
    }

    fn assert_all_close(a: &Matrix, b: &Matrix, rel_tol: f32) {
        assert_eq!(a.shape(), b.shape());
        for (&x, &y) in a.as_slice().iter().zip(b.as_slice()) {
            let scale = x.abs().max(y.abs()).max(1.0);
            assert!((x - y).abs() / scale <= rel_tol, "{x} vs {y}");
        }
    }

    #[test]
    fn zeros_rejects_overflowing_shapes() {
        let err = Matrix::zeros(usize::MAX, 2).unwrap_err();
        assert!(matches!(err, Error::Allocation(_)));
    }

    #[test]
    fn row_major_addressing() {
        let m = Matrix::from_vec(2, 3, vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0]).unwrap();
        assert_eq!(m[(0, 2)], 3.0);
        assert_eq!(m[(1, 0)], 4.0);
        assert!(Matrix::from_vec(2, 2, vec![0.0; 3]).is_err());
    }

    #[test]
    fn matmul_small_known_product() {
        let a = Matrix::from_vec(2, 3, vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0]).unwrap();
        let b = Matrix::from_vec(3, 2, vec![7.0, 8.0, 9.0, 10.0, 11.0, 12.0]).unwrap();
        let mut out = Matrix::zeros(2, 2).unwrap();
        matmul(&mut out, &a, &b).unwrap();
        assert_eq!(out.as_slice(), &[58.0, 64.0, 139.0, 154.0]);
    }

    #[test]
    fn matmul_is_bit_exact_with_reference_loop_order() {
        let mut rng = StdRng::seed_from_u64(7);
        let a = random(5, 7, &mut rng);
        let b = random(7, 3, &mut rng);
        let mut out = Matrix::zeros(5, 3).unwrap();
        matmul(&mut out, &a, &b).unwrap();

        for i in 0..5 {
            for j in 0..3 {
                let mut acc = 0.0_f32;
                for p in 0..7 {
                    acc += a[(i, p)] * b[(p, j)];
                }
                assert_eq!(out[(i, j)].to_bits(), acc.to_bits());
            }
        }
    }

    #[test]
    fn transpose_variants_reproduce_product_transpose() {
        let mut rng = StdRng::seed_from_u64(1);
        let (m, n, p) = (4, 6, 3);
        let a = random(m, n, &mut rng);
        let b = random(n, p, &mut rng);

        let mut ab = Matrix::zeros(m, p).unwrap();
        matmul(&mut ab, &a, &b).unwrap();
        let mut ab_t = Matrix::zeros(p, m).unwrap();
        transpose_into(&mut ab_t, &ab).unwrap();

        let mut a_t = Matrix::zeros(n, m).unwrap();
        transpose_into(&mut a_t, &a).unwrap();
        let mut b_t = Matrix::zeros(p, n).unwrap();
        transpose_into(&mut b_t, &b).unwrap();

        // Bᵗ·Aᵗ with B transposed by the kernel.
        let mut via_tn = Matrix::zeros(p, m).unwrap();
        matmul_tn(&mut via_tn, &b, &a_t).unwrap();
        assert_all_close(&via_tn, &ab_t, 1e-5);

        // Bᵗ·Aᵗ with Aᵗ formed by the kernel.
        let mut via_nt = Matrix::zeros(p, m).unwrap();
        matmul_nt(&mut via_nt, &b_t, &a).unwrap();
        assert_all_close(&via_nt, &ab_t, 1e-5);
    }

    #[test]
    fn multiply_variants_check_shapes() {
        let a = Matrix::zeros(2, 3).unwrap();
        let b = Matrix::zeros(2, 4).unwrap();
        let mut out = Matrix::zeros(3, 4).unwrap();

        assert!(matches!(
            matmul(&mut out, &a, &b),
            Err(Error::ShapeMismatch(_))
        ));
        assert!(matmul_tn(&mut out, &a, &b).is_ok());

        let mut wrong = Matrix::zeros(4, 3).unwrap();
        assert!(matmul_tn(&mut wrong, &a, &b).is_err());
        assert!(matmul_nt(&mut out, &a, &b).is_err());
    }

    #[test]
    fn sum_columns_of_constant() {
        let mut src = Matrix::zeros(3, 5).unwrap();
        src.fill(0.5);
        let mut dst = Matrix::zeros(3, 1).unwrap();
        sum_columns(&mut dst, &src).unwrap();
        assert_eq!(dst.as_slice(), &[2.5, 2.5, 2.5]);
    }

    #[test]
    fn elementwise_ops() {
        let a = Matrix::from_vec(1, 3, vec![1.0, 2.0, 3.0]).unwrap();
        let b = Matrix::from_vec(1, 3, vec![0.5, 0.5, 0.5]).unwrap();
        let mut out = Matrix::zeros(1, 3).unwrap();
        add(&mut out, &a, &b).unwrap();
        assert_eq!(out.as_slice(), &[1.5, 2.5, 3.5]);

        out.sub_assign(&b).unwrap();
        assert_eq!(out, a);

        out.scale(2.0);
        assert_eq!(out.as_slice(), &[2.0, 4.0, 6.0]);
        out.div_scalar(4.0).unwrap();
        assert_eq!(out.as_slice(), &[0.5, 1.0, 1.5]);

        assert_eq!(out.div_scalar(0.0), Err(Error::DivideByZero));
        assert_eq!(out.as_slice(), &[0.5, 1.0, 1.5]);

        let mut bad = Matrix::zeros(3, 1).unwrap();
        assert!(add(&mut bad, &a, &b).is_err());
        assert!(bad.copy_from(&a).is_err());
    }

    #[test]
    fn set_cols_stays_within_capacity() {
        let mut m = Matrix::zeros(2, 4).unwrap();
        let ptr = m.as_slice().as_ptr();

        m.set_cols(1).unwrap();
        assert_eq!(m.shape(), (2, 1));
        assert_eq!(m.len(), 2);
        m.set_cols(4).unwrap();
        assert_eq!(m.len(), 8);
        assert_eq!(m.as_slice().as_ptr(), ptr);

        assert!(m.set_cols(5).is_err());
    }

    #[test]
    fn clone_keeps_column_capacity() {
        let mut m = Matrix::zeros(3, 6).unwrap();
        m.set_cols(0).unwrap();

        let mut copy = m.clone();
        assert_eq!(copy, m);
        assert_eq!(copy.max_cols(), 6);

        let ptr = copy.as_slice().as_ptr();
        copy.set_cols(6).unwrap();
        assert_eq!(copy.len(), 18);
        assert_eq!(copy.as_slice().as_ptr(), ptr);
    }

    #[test]
    fn broadcast_adds_bias_to_every_column() {
        let mut m = Matrix::zeros(2, 3).unwrap();
        let bias = Matrix::from_vec(2, 1, vec![1.0, -1.0]).unwrap();
        m.add_column_broadcast(&bias).unwrap();
        assert_eq!(m.as_slice(), &[1.0, 1.0, 1.0, -1.0, -1.0, -1.0]);
    }

    #[test]
    fn uniform_fill_respects_range() {
        let mut rng = StdRng::seed_from_u64(0);
        let mut m = Matrix::zeros(10, 10).unwrap();
        m.fill_uniform(&mut rng, -0.01, 0.01).unwrap();
        assert!(m.as_slice().iter().all(|&x| (-0.01..0.01).contains(&x)));
        assert!(m.fill_uniform(&mut rng, 1.0, 1.0).is_err());
    }
}
