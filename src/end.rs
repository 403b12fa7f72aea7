//! End-cutoff strategies: the maximum extension below which a curve is
//! considered valid.

use serde::{Deserialize, Serialize};

use crate::curve::{argmax, argmin, Curve};
use crate::error::Result;
use crate::filter::smooth_derivative;
use crate::peaks::DropDetector;
use crate::segmenter::{numerical_zero, require_samples, Evaluation, SampleContext};
use crate::window::{fit_window, ShrinkRule};

/// How the concavity change is picked out of the second derivative.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CrossingRule {
    /// First sample whose successor turns negative from a non-negative value
    #[default]
    FirstNegativeGoing,
    /// First sample where the sign falls the most (positive straight to
    /// negative is preferred over positive to zero)
    SteepestSignDrop,
}

fn sign(value: f64, zero: f64) -> i8 {
    if value > zero {
        1
    } else if value < -zero {
        -1
    } else {
        0
    }
}

/// Index of the concavity change in `second`, values within `zero` of 0
/// counting as zero.
pub(crate) fn crossing_index(second: &[f64], rule: CrossingRule, zero: f64) -> Option<usize> {
    let signs: Vec<i8> = second.iter().map(|&v| sign(v, zero)).collect();
    match rule {
        CrossingRule::FirstNegativeGoing => signs.windows(2).position(|w| w[0] >= 0 && w[1] < 0),
        CrossingRule::SteepestSignDrop => {
            let steps: Vec<f64> = signs.windows(2).map(|w| f64::from(w[1] - w[0])).collect();
            argmin(&steps).filter(|&i| steps[i] < 0.0)
        }
    }
}

/// Extension where the second derivative of stress first changes from
/// non-negative to negative, else the largest extension.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ZeroCrossingEnd {
    pub window: usize,
    #[serde(default)]
    pub crossing: CrossingRule,
    #[serde(default)]
    pub shrink: ShrinkRule,
}

impl ZeroCrossingEnd {
    /// # Returns
    /// The crossing extension, or the largest extension of a curve that
    /// never turns concave
    pub fn evaluate(&self, curve: &Curve, poly_order: usize) -> Result<Evaluation> {
        require_samples(curve, 2)?;
        let fitted = fit_window(curve.sample(), self.window, curve.len(), poly_order, self.shrink)?;
        let second = smooth_derivative(curve.stress(), fitted.length, poly_order, 2)?;

        let end = crossing_index(&second, self.crossing, numerical_zero(curve))
            .map(|i| curve.extension()[i])
            .or_else(|| curve.max_extension())
            .unwrap_or_default();
        Ok(Evaluation {
            extension: end,
            adjustment: fitted.adjustment,
        })
    }
}

fn half() -> ShrinkRule {
    ShrinkRule::Half
}

/// Extension of the steepest stress rise.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FirstDerivativeMaxEnd {
    pub window: usize,
    #[serde(default = "half")]
    pub shrink: ShrinkRule,
}

impl FirstDerivativeMaxEnd {
    pub fn evaluate(&self, curve: &Curve, poly_order: usize) -> Result<Evaluation> {
        require_samples(curve, 2)?;
        let fitted = fit_window(curve.sample(), self.window, curve.len(), poly_order, self.shrink)?;
        let first = smooth_derivative(curve.stress(), fitted.length, poly_order, 1)?;

        let end = argmax(&first)
            .map(|i| curve.extension()[i])
            .or_else(|| curve.max_extension())
            .unwrap_or_default();
        Ok(Evaluation {
            extension: end,
            adjustment: fitted.adjustment,
        })
    }
}

/// Rule applied once the curve is cut at its first drop.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "rule", rename_all = "snake_case")]
pub enum EndRule {
    ZeroCrossing(ZeroCrossingEnd),
    FirstDerivativeMax(FirstDerivativeMaxEnd),
}

/// Cuts the curve at the first stress drop, then applies `rule`.
///
/// Drop thresholds scale with the ultimate strength from the context, or
/// with the curve's own maximum stress when none is supplied.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DropAwareEnd {
    pub detector: DropDetector,
    pub rule: EndRule,
}

impl DropAwareEnd {
    /// The curve up to and including the peak preceding the first drop, or
    /// the whole curve when none is found.
    pub fn truncate(&self, curve: &Curve, context: &SampleContext) -> Result<Curve> {
        require_samples(curve, 2)?;
        let ultimate_strength = context.ultimate_strength_for(curve)?;
        Ok(match self.detector.locate(curve.stress(), ultimate_strength)? {
            Some(peak) => curve.slice(0..peak + 1),
            None => curve.clone(),
        })
    }

    pub fn evaluate(
        &self,
        curve: &Curve,
        context: &SampleContext,
        poly_order: usize,
    ) -> Result<Evaluation> {
        let truncated = self.truncate(curve, context)?;
        match &self.rule {
            EndRule::ZeroCrossing(rule) => rule.evaluate(&truncated, poly_order),
            EndRule::FirstDerivativeMax(rule) => rule.evaluate(&truncated, poly_order),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::curve::SampleId;
    use crate::error::SegmentError;
    use approx::assert_abs_diff_eq;

    fn logistic() -> Curve {
        Curve::from_pairs(
            SampleId(3),
            (0..200).map(|i| {
                let x = i as f64;
                (1.0 + x * 0.005, 100.0 / (1.0 + (-(x - 100.0) / 15.0).exp()))
            }),
        )
        .unwrap()
    }

    fn convex() -> Curve {
        Curve::from_pairs(
            SampleId(4),
            (0..60).map(|i| {
                let x = i as f64;
                (1.0 + x * 0.01, 0.05 * x * x)
            }),
        )
        .unwrap()
    }

    #[test]
    fn test_crossing_rules() {
        let second = [1.0, 0.0, 0.0, -1.0];
        assert_eq!(crossing_index(&second, CrossingRule::FirstNegativeGoing, 1e-9), Some(2));
        assert_eq!(crossing_index(&second, CrossingRule::SteepestSignDrop, 1e-9), Some(0));

        let second = [1.0, 2.0, -1.0, 3.0, -4.0];
        assert_eq!(crossing_index(&second, CrossingRule::FirstNegativeGoing, 1e-9), Some(1));
        assert_eq!(crossing_index(&second, CrossingRule::SteepestSignDrop, 1e-9), Some(1));

        let second = [0.5, 1.0, 0.0, 1e-12];
        assert_eq!(crossing_index(&second, CrossingRule::FirstNegativeGoing, 1e-9), None);
        assert_eq!(crossing_index(&second, CrossingRule::SteepestSignDrop, 1e-9), Some(1));
        assert_eq!(crossing_index(&[], CrossingRule::SteepestSignDrop, 1e-9), None);
    }

    #[test]
    fn test_zero_crossing_at_inflection() {
        let end = ZeroCrossingEnd {
            window: 21,
            crossing: CrossingRule::FirstNegativeGoing,
            shrink: ShrinkRule::Tenth,
        }
        .evaluate(&logistic(), 3)
        .unwrap();
        assert_abs_diff_eq!(end.extension, 1.5, epsilon = 0.01);
    }

    #[test]
    fn test_zero_crossing_without_inflection_returns_max() {
        let end = ZeroCrossingEnd {
            window: 11,
            crossing: CrossingRule::FirstNegativeGoing,
            shrink: ShrinkRule::Tenth,
        }
        .evaluate(&convex(), 3)
        .unwrap();
        assert_eq!(end.extension, convex().max_extension().unwrap());
    }

    #[test]
    fn test_first_derivative_max_at_steepest_rise() {
        let end = FirstDerivativeMaxEnd {
            window: 21,
            shrink: ShrinkRule::Half,
        }
        .evaluate(&logistic(), 3)
        .unwrap();
        assert_abs_diff_eq!(end.extension, 1.5, epsilon = 0.01);
    }

    #[test]
    fn test_too_few_samples() {
        let curve = Curve::from_pairs(SampleId(5), [(1.0, 0.0), (1.1, 1.0), (1.2, 3.0)]).unwrap();
        let err = FirstDerivativeMaxEnd {
            window: 11,
            shrink: ShrinkRule::Half,
        }
        .evaluate(&curve, 3)
        .unwrap_err();
        assert!(matches!(err, SegmentError::InsufficientData { available: 3, .. }));
    }

    #[test]
    fn test_drop_aware_truncates_before_the_drop() {
        let curve = Curve::from_pairs(
            SampleId(6),
            [
                (1.0, 0.0),
                (1.1, 5.0),
                (1.2, 40.0),
                (1.3, 95.0),
                (1.4, 98.0),
                (1.5, 40.0),
                (1.6, 38.0),
            ],
        )
        .unwrap();
        let strategy = DropAwareEnd {
            detector: DropDetector::Window {
                window: 3,
                drop_fraction: 0.5,
            },
            rule: EndRule::ZeroCrossing(ZeroCrossingEnd {
                window: 11,
                crossing: CrossingRule::FirstNegativeGoing,
                shrink: ShrinkRule::Tenth,
            }),
        };
        let context = SampleContext::default().with_ultimate_strength(98.0);

        let truncated = strategy.truncate(&curve, &context).unwrap();
        assert_eq!(truncated.max_extension(), Some(1.4));
        assert_eq!(truncated.len(), 5);

        // Cubic fit over the five remaining samples is concave from 1.3 on
        let end = strategy.evaluate(&curve, &context, 3).unwrap();
        assert_abs_diff_eq!(end.extension, 1.2);
        assert_eq!(end.adjustment.map(|a| a.adjusted), Some(5));
    }

    #[test]
    fn test_drop_aware_without_drop_uses_whole_curve() {
        let strategy = DropAwareEnd {
            detector: DropDetector::Peaks {
                prominence_fraction: 0.05,
                max_width: 10,
            },
            rule: EndRule::FirstDerivativeMax(FirstDerivativeMaxEnd {
                window: 21,
                shrink: ShrinkRule::Half,
            }),
        };
        let context = SampleContext::default();
        assert_eq!(strategy.truncate(&logistic(), &context).unwrap(), logistic());
        let end = strategy.evaluate(&logistic(), &context, 3).unwrap();
        assert_abs_diff_eq!(end.extension, 1.5, epsilon = 0.01);
    }
}
