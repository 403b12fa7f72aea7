use crate::coefficients::CoefficientCache;
use crate::error::{Result, SegmentError};

/// Highest derivative the strategies request from the filter.
pub const MAX_DERIVATIVE_ORDER: usize = 2;

/// Configuration for the Savitzky-Golay filter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FilterConfig {
    /// Size of the filter window (must be odd)
    pub window_size: usize,
    /// Order of the polynomial to fit
    pub poly_order: usize,
}

impl FilterConfig {
    /// Creates a new filter configuration with validation
    ///
    /// # Arguments
    /// * `window_size` - Odd number of samples per local fit
    /// * `poly_order` - Degree of the fitted polynomial, below `window_size`
    ///
    /// # Returns
    /// `InvalidFilter` when the shape cannot be fitted regardless of data
    pub fn new(window_size: usize, poly_order: usize) -> Result<Self> {
        if !Self::is_valid_shape(window_size, poly_order) {
            return Err(SegmentError::InvalidFilter {
                window: window_size,
                poly_order,
            });
        }
        Ok(Self {
            window_size,
            poly_order,
        })
    }

    fn is_valid_shape(window_size: usize, poly_order: usize) -> bool {
        window_size % 2 == 1 && poly_order < window_size
    }
}

/// A Savitzky-Golay filter for signal smoothing and differentiation.
///
/// Samples closer than half a window to either end are estimated from the
/// polynomial fitted to the first (or last) full window, so the output has
/// the same length as the input and no padding values are invented.
pub struct SavitzkyGolayFilter {
    config: FilterConfig,
    cache: CoefficientCache,
}

impl SavitzkyGolayFilter {
    /// Creates a new Savitzky-Golay filter.
    ///
    /// # Example
    ///
    /// ```rust
    /// use tensile_cutoff::SavitzkyGolayFilter;
    ///
    /// let mut filter = SavitzkyGolayFilter::new(5, 2).expect("valid parameters");
    /// let smoothed = filter.apply(&[1.0, 2.0, 3.0, 4.0, 5.0, 4.0, 3.0]).expect("long enough");
    /// assert_eq!(smoothed.len(), 7);
    /// ```
    pub fn new(window_size: usize, poly_order: usize) -> Result<Self> {
        Ok(Self::with_config(FilterConfig::new(window_size, poly_order)?))
    }

    pub fn with_config(config: FilterConfig) -> Self {
        Self {
            config,
            cache: CoefficientCache::new(),
        }
    }

    /// Smooths `data`.
    pub fn apply(&mut self, data: &[f64]) -> Result<Vec<f64>> {
        self.apply_derivative(data, 0)
    }

    /// Estimates the `derivative_order`-th derivative of `data` per sample
    /// index. Order 0 is plain smoothing.
    pub fn apply_derivative(&mut self, data: &[f64], derivative_order: usize) -> Result<Vec<f64>> {
        let FilterConfig {
            window_size,
            poly_order,
        } = self.config;
        let n = data.len();
        if window_size > n {
            return Err(SegmentError::InvalidWindow {
                window: window_size,
                poly_order,
                len: n,
            });
        }

        let half = window_size / 2;
        let mut result = Vec::with_capacity(n);
        for center in 0..n {
            // Shift the window into bounds near either edge
            let start = center.saturating_sub(half).min(n - window_size);
            let first = start as isize - center as isize;
            let weights = self.cache.get(first, window_size, poly_order, derivative_order)?;
            let value: f64 = weights
                .iter()
                .zip(&data[start..start + window_size])
                .map(|(w, y)| w * y)
                .sum();
            result.push(value);
        }
        Ok(result)
    }

    /// Returns the filter configuration
    pub fn config(&self) -> &FilterConfig {
        &self.config
    }
}

/// Savitzky-Golay smoothing (`derivative_order == 0`) or differentiation of
/// a stress series.
///
/// Fails fast when the window is even, not larger than `polynomial_order`,
/// or longer than the series. Callers that want oversize windows shrunk go
/// through [`crate::window::fit_window`] first.
pub fn smooth_derivative(
    stress: &[f64],
    window_length: usize,
    polynomial_order: usize,
    derivative_order: usize,
) -> Result<Vec<f64>> {
    if derivative_order > MAX_DERIVATIVE_ORDER {
        return Err(SegmentError::InvalidParameter(format!(
            "derivative order {derivative_order} exceeds {MAX_DERIVATIVE_ORDER}"
        )));
    }
    if !FilterConfig::is_valid_shape(window_length, polynomial_order) {
        return Err(SegmentError::InvalidWindow {
            window: window_length,
            poly_order: polynomial_order,
            len: stress.len(),
        });
    }
    let mut filter = SavitzkyGolayFilter::new(window_length, polynomial_order)?;
    filter.apply_derivative(stress, derivative_order)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn test_basic_smoothing() {
        let mut filter = SavitzkyGolayFilter::new(5, 2).unwrap();
        let data = vec![1.0, 2.0, 3.0, 4.0, 5.0, 4.0, 3.0, 2.0, 1.0];
        let smoothed = filter.apply(&data).unwrap();

        assert_eq!(smoothed.len(), data.len());
        assert!(smoothed[4] > smoothed[0]);
        assert!(smoothed[4] > smoothed[8]);
    }

    #[test]
    fn test_polynomial_preservation_including_edges() {
        let mut filter = SavitzkyGolayFilter::new(5, 2).unwrap();
        let data: Vec<f64> = (0..20).map(|x| (x as f64).powi(2)).collect();
        let smoothed = filter.apply(&data).unwrap();

        for (original, smoothed) in data.iter().zip(&smoothed) {
            assert_abs_diff_eq!(original, smoothed, epsilon = 1e-8);
        }
    }

    #[test]
    fn test_derivatives_of_cubic() {
        let data: Vec<f64> = (0..20).map(|x| (x as f64).powi(3)).collect();
        let first = smooth_derivative(&data, 7, 3, 1).unwrap();
        let second = smooth_derivative(&data, 7, 3, 2).unwrap();

        for i in 0..20 {
            let x = i as f64;
            assert_abs_diff_eq!(first[i], 3.0 * x * x, epsilon = 1e-6);
            assert_abs_diff_eq!(second[i], 6.0 * x, epsilon = 1e-6);
        }
    }

    #[test]
    fn test_window_equal_to_length() {
        let data = vec![0.0, 1.0, 4.0, 9.0, 16.0];
        let result = smooth_derivative(&data, 5, 3, 0).unwrap();
        for (original, smoothed) in data.iter().zip(&result) {
            assert_abs_diff_eq!(original, smoothed, epsilon = 1e-9);
        }
    }

    #[test]
    fn test_invalid_windows_fail_fast() {
        let data = vec![1.0; 10];
        assert!(matches!(
            smooth_derivative(&data, 4, 2, 0),
            Err(SegmentError::InvalidWindow { window: 4, len: 10, .. })
        ));
        assert!(matches!(
            smooth_derivative(&data, 0, 0, 0),
            Err(SegmentError::InvalidWindow { .. })
        ));
        assert!(matches!(
            smooth_derivative(&data, 5, 5, 0),
            Err(SegmentError::InvalidWindow { .. })
        ));
        assert!(matches!(
            smooth_derivative(&data, 11, 3, 0),
            Err(SegmentError::InvalidWindow { len: 10, .. })
        ));
        assert!(matches!(
            smooth_derivative(&data, 5, 3, 3),
            Err(SegmentError::InvalidParameter(_))
        ));
    }

    #[test]
    fn test_even_window_reports_data_length() {
        let data = vec![1.0; 5];
        let err = smooth_derivative(&data, 4, 3, 0).unwrap_err();
        assert!(matches!(
            err,
            SegmentError::InvalidWindow {
                window: 4,
                poly_order: 3,
                len: 5
            }
        ));
        assert!(err.to_string().ends_with("over 5 samples"));
    }

    #[test]
    fn test_filter_config_rejects_shape_without_data() {
        assert!(matches!(
            FilterConfig::new(4, 3),
            Err(SegmentError::InvalidFilter {
                window: 4,
                poly_order: 3
            })
        ));
        assert!(FilterConfig::new(5, 3).is_ok());
    }
}
