use ahash::AHashMap;
use nalgebra::{DMatrix, DVector};

use crate::error::{Result, SegmentError};

/// Computes Savitzky-Golay weights for a window of sample offsets.
///
/// A polynomial of degree `poly_order` is fitted by least squares to the
/// samples at `offsets` (relative to the evaluated sample, unit spacing) and
/// the returned weights evaluate its `derivative`-th derivative at offset 0:
/// `estimate = sum(weights[i] * data[center + offsets[i]])`.
///
/// Offsets are rescaled to `[-1, 1]` before the normal equations are built
/// so that wide windows stay well conditioned.
pub fn compute_coefficients(
    offsets: &[isize],
    poly_order: usize,
    derivative: usize,
) -> Result<Vec<f64>> {
    let window_size = offsets.len();
    if window_size == 0 || poly_order >= window_size {
        return Err(SegmentError::InvalidFilter {
            window: window_size,
            poly_order,
        });
    }
    if derivative > poly_order {
        return Ok(vec![0.0; window_size]);
    }

    let scale = offsets
        .iter()
        .map(|o| o.unsigned_abs())
        .max()
        .unwrap_or(1)
        .max(1) as f64;

    let mut vandermonde = DMatrix::<f64>::zeros(window_size, poly_order + 1);
    for (i, &offset) in offsets.iter().enumerate() {
        let u = offset as f64 / scale;
        for j in 0..=poly_order {
            vandermonde[(i, j)] = u.powi(j as i32);
        }
    }

    // d^k/dx^k of sum(a_j u^j) at 0 is k! a_k / scale^k
    let factorial = (1..=derivative).fold(1.0, |acc, k| acc * k as f64);
    let mut rhs = DVector::<f64>::zeros(poly_order + 1);
    rhs[derivative] = factorial / scale.powi(derivative as i32);

    let normal = vandermonde.transpose() * &vandermonde;
    let solution = normal.lu().solve(&rhs).ok_or_else(|| {
        SegmentError::Computation(format!(
            "singular least-squares system for {window_size} samples at order {poly_order}"
        ))
    })?;

    Ok((&vandermonde * solution).iter().copied().collect())
}

/// Offsets of a centred window of odd length.
pub fn centered_offsets(window_size: usize) -> Vec<isize> {
    let half = (window_size / 2) as isize;
    (-half..=half).collect()
}

/// Memoizes coefficient sets by `(first offset, window, order, derivative)`.
///
/// Windows are always contiguous, so the first offset identifies the
/// shifted edge windows as well as the centred one.
#[derive(Default)]
pub struct CoefficientCache {
    sets: AHashMap<(isize, usize, usize, usize), Vec<f64>>,
}

impl CoefficientCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Gets the weights for the contiguous window `[first, first + window_size)`
    pub fn get(
        &mut self,
        first: isize,
        window_size: usize,
        poly_order: usize,
        derivative: usize,
    ) -> Result<&[f64]> {
        let key = (first, window_size, poly_order, derivative);
        if !self.sets.contains_key(&key) {
            let offsets: Vec<isize> = (first..first + window_size as isize).collect();
            let weights = compute_coefficients(&offsets, poly_order, derivative)?;
            self.sets.insert(key, weights);
        }
        Ok(&self.sets[&key])
    }

    #[cfg(test)]
    fn len(&self) -> usize {
        self.sets.len()
    }
}
