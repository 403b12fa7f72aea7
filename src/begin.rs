//! Begin-cutoff strategies: the minimum extension above which a curve is
//! considered valid.

use serde::{Deserialize, Serialize};

use crate::curve::{argmax, Curve};
use crate::error::Result;
use crate::filter::smooth_derivative;
use crate::peaks::DropDetector;
use crate::segmenter::{
    check_fraction, numerical_zero, require_samples, Evaluation, SampleContext,
};
use crate::window::{fit_window, ShrinkRule};

/// Share of the stress amplitude, above the minimum, inside which the
/// second-derivative begin search is kept.
pub const DEFAULT_NOISE_BAND: f64 = 0.15;

fn default_noise_band() -> f64 {
    DEFAULT_NOISE_BAND
}

/// First extension whose stress exceeds `threshold`, else the last one.
fn first_above(curve: &Curve, threshold: f64) -> Option<f64> {
    curve
        .stress()
        .iter()
        .position(|&s| s > threshold)
        .map(|i| curve.extension()[i])
        .or_else(|| curve.max_extension())
}

/// Stress threshold relative to the amplitude of the loading segment.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ThresholdBegin {
    /// Fraction in `[0, 1]`, not a percentage
    pub threshold_fraction: f64,
}

impl ThresholdBegin {
    /// First extension of the loading segment above the threshold, else its
    /// largest extension.
    pub fn evaluate(&self, curve: &Curve) -> Result<Evaluation> {
        check_fraction("threshold_fraction", self.threshold_fraction)?;
        let loading = curve.loading_segment();
        require_samples(&loading, 2)?;

        let threshold = self.threshold_fraction * loading.stress_amplitude();
        let begin = first_above(&loading, threshold).unwrap_or_default();
        Ok(Evaluation::exact(begin))
    }
}

/// Stress threshold relative to the ultimate strength, over the whole curve.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct UltimateStrengthThresholdBegin {
    pub threshold_fraction: f64,
}

impl UltimateStrengthThresholdBegin {
    /// Falls back to the curve's own maximum when `context` carries no
    /// ultimate strength.
    pub fn evaluate(&self, curve: &Curve, context: &SampleContext) -> Result<Evaluation> {
        check_fraction("threshold_fraction", self.threshold_fraction)?;
        require_samples(curve, 2)?;

        let threshold = self.threshold_fraction * context.ultimate_strength_for(curve)?;
        let begin = first_above(curve, threshold).unwrap_or_default();
        Ok(Evaluation::exact(begin))
    }
}

/// Last extension of the toe region where the curvature is still below a
/// fraction of its peak.
///
/// The loading segment is optionally cut at the first stress drop, its
/// second derivative computed, and only the samples within `noise_band` of
/// the amplitude above the minimum stress are searched, up to the maximum
/// of the second derivative. The band is applied sample by sample, so low
/// stress after an unguarded drop is searched too; set `drop` to exclude it.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SecondDerivativeBegin {
    /// Requested smoothing window, shrunk on short curves
    pub window: usize,
    /// Share of the peak curvature below which the toe still extends
    pub threshold_fraction: f64,
    /// Cuts the loading segment at its first drop when set
    #[serde(default)]
    pub drop: Option<DropDetector>,
    #[serde(default = "default_noise_band")]
    pub noise_band: f64,
    #[serde(default)]
    pub shrink: ShrinkRule,
}

impl SecondDerivativeBegin {
    pub fn evaluate(
        &self,
        curve: &Curve,
        context: &SampleContext,
        poly_order: usize,
    ) -> Result<Evaluation> {
        check_fraction("threshold_fraction", self.threshold_fraction)?;
        check_fraction("noise_band", self.noise_band)?;
        let mut region = curve.loading_segment();
        require_samples(&region, 2)?;

        if let Some(detector) = self.drop {
            let ultimate_strength = context.ultimate_strength_for(&region)?;
            if let Some(peak) = detector.locate(region.stress(), ultimate_strength)? {
                region = region.slice(0..peak + 1);
            }
        }

        let fitted = fit_window(curve.sample(), self.window, region.len(), poly_order, self.shrink)?;
        let second = smooth_derivative(region.stress(), fitted.length, poly_order, 2)?;

        let floor = region.stress().iter().copied().fold(f64::INFINITY, f64::min);
        let ceiling = floor + self.noise_band * region.stress_amplitude();
        let band: Vec<(f64, f64)> = region
            .extension()
            .iter()
            .zip(region.stress())
            .zip(&second)
            .filter(|&((_, &s), _)| s <= ceiling)
            .map(|((&e, _), &d)| (e, d))
            .collect();

        let fallback = band
            .iter()
            .map(|&(e, _)| e)
            .reduce(f64::min)
            .or_else(|| region.min_extension())
            .unwrap_or_default();

        let curvature: Vec<f64> = band.iter().map(|&(_, d)| d).collect();
        let Some(peak) = argmax(&curvature) else {
            return Ok(Evaluation {
                extension: fallback,
                adjustment: fitted.adjustment,
            });
        };
        let peak_curvature = curvature[peak];
        if peak_curvature <= numerical_zero(&region) {
            return Ok(Evaluation {
                extension: fallback,
                adjustment: fitted.adjustment,
            });
        }

        let threshold = self.threshold_fraction * peak_curvature;
        let begin = band[..=peak]
            .iter()
            .filter(|&&(_, d)| d < threshold)
            .map(|&(e, _)| e)
            .reduce(f64::max)
            .unwrap_or(fallback);
        Ok(Evaluation {
            extension: begin,
            adjustment: fitted.adjustment,
        })
    }
}

/// First extension whose second derivative exceeds a fraction of its
/// maximum over the loading segment.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SecondDerivativeOnsetBegin {
    pub window: usize,
    pub threshold_fraction: f64,
    #[serde(default)]
    pub shrink: ShrinkRule,
}

impl SecondDerivativeOnsetBegin {
    pub fn evaluate(&self, curve: &Curve, poly_order: usize) -> Result<Evaluation> {
        check_fraction("threshold_fraction", self.threshold_fraction)?;
        let loading = curve.loading_segment();
        require_samples(&loading, 2)?;

        let fitted = fit_window(curve.sample(), self.window, loading.len(), poly_order, self.shrink)?;
        let second = smooth_derivative(loading.stress(), fitted.length, poly_order, 2)?;
        let peak_curvature = second.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        let threshold = self.threshold_fraction * peak_curvature;

        let begin = second
            .iter()
            .position(|&d| d > threshold)
            .map(|i| loading.extension()[i])
            .or_else(|| loading.min_extension())
            .unwrap_or_default();
        Ok(Evaluation {
            extension: begin,
            adjustment: fitted.adjustment,
        })
    }
}
