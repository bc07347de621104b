//! Strided triple-loop GEMM shared by the three multiply variants.
//!
//! Every operand is addressed through a (row stride, column stride) pair, so a
//! transposed operand is just a swapped stride pair over the same row-major
//! buffer. No packing, no blocking, no SIMD.

/// Computes `c = a * b` where `a` is logically `(m, k)`, `b` is `(k, n)` and
/// `c` is `(m, n)`.
///
/// Each output element is accumulated as `acc += a[i, p] * b[p, j]` for
/// `p = 0..k` in increasing order, starting from `0.0`. Callers rely on this
/// order for bit-exact reproducibility.
#[allow(clippy::too_many_arguments)]
#[inline]
pub(crate) fn gemm_f32(
    m: usize,
    n: usize,
    k: usize,
    a: &[f32],
    rsa: usize,
    csa: usize,
    b: &[f32],
    rsb: usize,
    csb: usize,
    c: &mut [f32],
    rsc: usize,
    csc: usize,
) {
    // Bounds are validated by the shape-checked wrappers in `matrix`. A zero
    // stride only ever accompanies a zero extent, so the loops never read it.
    for i in 0..m {
        let a0 = i * rsa;
        for j in 0..n {
            let b0 = j * csb;
            let mut acc = 0.0_f32;
            for p in 0..k {
                acc += a[a0 + p * csa] * b[p * rsb + b0];
            }
            c[i * rsc + j * csc] = acc;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transposed_strides_read_the_same_buffer() {
        // a = [[1, 2], [3, 4]] row-major.
        let a = [1.0_f32, 2.0, 3.0, 4.0];
        let id = [1.0_f32, 0.0, 0.0, 1.0];
        let mut c = [0.0_f32; 4];

        // a^T * I with a read column-major.
        gemm_f32(2, 2, 2, &a, 1, 2, &id, 2, 1, &mut c, 2, 1);
        assert_eq!(c, [1.0, 3.0, 2.0, 4.0]);
    }

    #[test]
    fn empty_contraction_writes_zeros() {
        let mut c = [7.0_f32; 2];
        gemm_f32(1, 2, 0, &[], 0, 0, &[], 0, 1, &mut c, 2, 1);
        assert_eq!(c, [0.0, 0.0]);
    }
}
