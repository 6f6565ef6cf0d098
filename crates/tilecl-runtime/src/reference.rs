//! CPU references and device result validation.

use rayon::prelude::*;

use crate::error::{Position, ValidationError};

/// Absolute tolerance of the GEMM result.
pub const GEMM_TOLERANCE: f32 = 0.05;
/// Absolute tolerance of the scan result.
pub const SCAN_TOLERANCE: f32 = 1e-3;

/// Shape used to report the position of a mismatch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ElementLayout {
    /// A plain vector.
    Vector,
    /// A row-major matrix with the given number of columns.
    Matrix {
        /// Number of columns.
        cols: usize,
    },
}

impl ElementLayout {
    /// Position of the element at `index`.
    pub fn position(&self, index: usize) -> Position {
        match self {
            ElementLayout::Vector => Position::Linear(index),
            ElementLayout::Matrix { cols } => Position::Matrix {
                row: index / cols,
                col: index % cols,
            },
        }
    }
}

/// Row-major `C = A × B` with `A` of size n×m and `B` of size m×k.
///
/// Output rows are computed on the rayon thread pool.
///
/// # Panics
///
/// If the operands don't have the given shapes.
pub fn gemm_reference(a: &[f32], b: &[f32], n: usize, m: usize, k: usize) -> Vec<f32> {
    assert_eq!(a.len(), n * m, "lhs must be n×m");
    assert_eq!(b.len(), m * k, "rhs must be m×k");

    let mut c = vec![0.0; n * k];

    c.par_chunks_mut(k).enumerate().for_each(|(i, row)| {
        let lhs = &a[i * m..(i + 1) * m];

        for (j, lhs) in lhs.iter().enumerate() {
            let rhs = &b[j * k..(j + 1) * k];

            for (out, rhs) in row.iter_mut().zip(rhs) {
                *out += lhs * rhs;
            }
        }
    });

    c
}

/// Inclusive prefix sum.
pub fn scan_reference(input: &[f32]) -> Vec<f32> {
    input
        .iter()
        .scan(0.0, |acc, value| {
            *acc += value;
            Some(*acc)
        })
        .collect()
}

/// Check every element of `actual` against `expected` within an absolute tolerance.
///
/// The first mismatch is reported. NaN never compares within tolerance.
pub fn assert_equals_approx(
    actual: &[f32],
    expected: &[f32],
    epsilon: f32,
    layout: ElementLayout,
) -> Result<(), ValidationError> {
    if actual.len() != expected.len() {
        return Err(ValidationError::Length {
            expected: expected.len(),
            actual: actual.len(),
        });
    }

    for (i, (a, e)) in actual.iter().zip(expected).enumerate() {
        // Written so that a NaN on either side fails.
        if !((a - e).abs() <= epsilon) {
            return Err(ValidationError::Mismatch {
                position: layout.position(i),
                expected: *e,
                actual: *a,
                epsilon,
            });
        }
    }

    Ok(())
}
