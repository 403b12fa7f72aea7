//! # Tensile cutoff
//!
//! Detection of the valid extension range of tensile-test stress-strain
//! curves.
//!
//! A curve recorded on a tensile machine starts with a slack toe region and
//! may end with tearing, grip slippage or plain unloading. The strategies in
//! this crate find the extension above which the data is usable (the
//! *begin* cutoff) and the extension below which it still describes the
//! material (the *end* cutoff), using Savitzky-Golay smoothing and
//! differentiation, drop detection and stress thresholds.
//!
//! ## Features
//!
//! - Savitzky-Golay smoothing and differentiation with polynomial edge fits
//! - Prominence-based and sliding-window stress drop detection
//! - Interchangeable begin and end strategies selected by configuration
//! - Automatic, reported shrinking of smoothing windows on short curves
//! - CSV helpers for the files exchanged with the rest of the pipeline
//!
//! ## Example
//!
//! ```rust
//! use tensile_cutoff::{
//!     BeginStrategy, CurveSegmenter, Curve, EndStrategy, FirstDerivativeMaxEnd,
//!     SampleContext, SampleId, SegmenterConfig, ShrinkRule, ThresholdBegin,
//! };
//!
//! let curve = Curve::from_pairs(
//!     SampleId(1),
//!     (0..100).map(|i| {
//!         let x = i as f64 / 100.0;
//!         (1.0 + x, 100.0 * x * x)
//!     }),
//! )
//! .expect("finite samples");
//!
//! let segmenter = CurveSegmenter::new(SegmenterConfig {
//!     polynomial_order: 3,
//!     begin: BeginStrategy::Threshold(ThresholdBegin { threshold_fraction: 0.05 }),
//!     end: EndStrategy::FirstDerivativeMax(FirstDerivativeMaxEnd {
//!         window: 11,
//!         shrink: ShrinkRule::Half,
//!     }),
//! });
//! let segmentation = segmenter
//!     .segment(&curve, &SampleContext::default())
//!     .expect("enough samples");
//! assert!(segmentation.is_consistent());
//! ```

mod begin;
mod coefficients;
mod curve;
mod end;
mod error;
mod filter;
mod peaks;
mod segmenter;
mod window;

pub mod csv_utils;

pub use begin::{
    SecondDerivativeBegin, SecondDerivativeOnsetBegin, ThresholdBegin,
    UltimateStrengthThresholdBegin, DEFAULT_NOISE_BAND,
};
pub use coefficients::{centered_offsets, compute_coefficients};
pub use curve::{Curve, SampleId};
pub use end::{CrossingRule, DropAwareEnd, EndRule, FirstDerivativeMaxEnd, ZeroCrossingEnd};
pub use error::{Result, SegmentError};
pub use filter::{smooth_derivative, FilterConfig, SavitzkyGolayFilter};
pub use peaks::{find_stress_drops, find_window_drop, DropDetector};
pub use segmenter::{
    BeginStrategy, Cutoff, CutoffBound, CurveSegmenter, EndStrategy, Evaluation, SampleContext,
    Segmentation, SegmenterConfig, DEFAULT_POLYNOMIAL_ORDER,
};
pub use window::{fit_window, FittedWindow, ShrinkRule, WindowAdjustment};

/// Smooths a stress series with a 5-point quadratic Savitzky-Golay filter.
///
/// Series shorter than the window are returned unchanged.
///
/// ```rust
/// use tensile_cutoff::smooth;
///
/// let smoothed = smooth(&[1.0, 2.0, 3.0, 4.0, 5.0, 4.0, 3.0, 2.0, 1.0]).expect("valid input");
/// assert_eq!(smoothed.len(), 9);
/// ```
pub fn smooth(data: &[f64]) -> Result<Vec<f64>> {
    if data.len() < 5 {
        return Ok(data.to_vec());
    }
    smooth_derivative(data, 5, 2, 0)
}
