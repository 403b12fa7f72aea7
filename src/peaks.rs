//! Detection of sudden stress drops.
//!
//! A drop marks a local failure (tearing, slippage in the grips) after which
//! the curve no longer describes the material. Two detectors exist: one
//! based on peak prominence within a limited width, and a sliding window
//! comparing the window start against its minimum. Both report nothing for
//! a clean monotonic curve.

use serde::{Deserialize, Serialize};

use crate::curve::{argmax, argmin};
use crate::error::{Result, SegmentError};

/// Indices of interior local maxima of `stress` followed, within
/// `max_width` samples, by a descent of at least `prominence_floor`.
///
/// The descent is followed until the stress rises again or `max_width`
/// samples have been walked, and measured down to the lowest value reached.
/// A flat top counts as one maximum, reported at its first sample.
pub fn find_stress_drops(
    stress: &[f64],
    prominence_floor: f64,
    max_width: usize,
) -> Result<Vec<usize>> {
    if max_width == 0 {
        return Err(SegmentError::InvalidParameter(
            "peak width limit must be at least one sample".to_string(),
        ));
    }
    if !prominence_floor.is_finite() {
        return Err(SegmentError::InvalidParameter(format!(
            "prominence floor must be finite, got {prominence_floor}"
        )));
    }

    let n = stress.len();
    let mut drops = Vec::new();
    let mut i = 1;
    while i + 1 < n {
        if stress[i] <= stress[i - 1] {
            i += 1;
            continue;
        }
        // Walk over a plateau
        let mut top_end = i;
        while top_end + 1 < n && stress[top_end + 1] == stress[i] {
            top_end += 1;
        }
        if top_end + 1 >= n || stress[top_end + 1] > stress[i] {
            i = top_end + 1;
            continue;
        }

        let limit = (i + max_width).min(n - 1);
        let mut bottom = top_end + 1;
        while bottom < limit && stress[bottom + 1] <= stress[bottom] {
            bottom += 1;
        }
        let descent = stress[i] - stress[bottom];
        if bottom <= limit && descent >= prominence_floor {
            tracing::debug!(peak = i, bottom, descent, "stress drop found");
            drops.push(i);
        }
        i = top_end + 1;
    }
    Ok(drops)
}

/// Slides a window of `window` samples over `stress` and stops at the first
/// one whose first value exceeds its minimum by more than `drop_threshold`.
///
/// Returns the absolute indices of the maximum preceding the window minimum
/// and of that minimum. Ties resolve to the earliest sample.
pub fn find_window_drop(
    stress: &[f64],
    window: usize,
    drop_threshold: f64,
) -> Result<Option<(usize, usize)>> {
    if window < 2 {
        return Err(SegmentError::InvalidParameter(format!(
            "drop window must span at least two samples, got {window}"
        )));
    }
    if !drop_threshold.is_finite() {
        return Err(SegmentError::InvalidParameter(format!(
            "drop threshold must be finite, got {drop_threshold}"
        )));
    }

    for (start, values) in stress.windows(window).enumerate() {
        let Some(min_rel) = argmin(values) else {
            continue;
        };
        if min_rel == 0 || values[0] - values[min_rel] <= drop_threshold {
            continue;
        }
        let max_rel = argmax(&values[..min_rel]).unwrap_or(0);
        tracing::debug!(
            start,
            max_index = start + max_rel,
            min_index = start + min_rel,
            "windowed stress drop found"
        );
        return Ok(Some((start + max_rel, start + min_rel)));
    }
    Ok(None)
}

/// Drop detector selected by configuration.
///
/// Thresholds are fractions of the sample's ultimate strength.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DropDetector {
    /// Sliding window, see [`find_window_drop`]
    Window { window: usize, drop_fraction: f64 },
    /// Prominence within a width limit, see [`find_stress_drops`]
    Peaks {
        prominence_fraction: f64,
        max_width: usize,
    },
}

impl DropDetector {
    /// Index of the last sample before the first detected drop, i.e. the
    /// peak the stress collapses from.
    pub fn locate(&self, stress: &[f64], ultimate_strength: f64) -> Result<Option<usize>> {
        match *self {
            DropDetector::Window {
                window,
                drop_fraction,
            } => Ok(find_window_drop(stress, window, drop_fraction * ultimate_strength)?
                .map(|(max_index, _)| max_index)),
            DropDetector::Peaks {
                prominence_fraction,
                max_width,
            } => Ok(find_stress_drops(stress, prominence_fraction * ultimate_strength, max_width)?
                .first()
                .copied()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_no_drop_on_monotonic_curve() {
        let stress: Vec<f64> = (0..50).map(|i| i as f64 * 2.0).collect();
        assert!(find_stress_drops(&stress, 1.0, 5).unwrap().is_empty());
        assert_eq!(find_window_drop(&stress, 5, 1.0).unwrap(), None);
    }

    #[test]
    fn test_prominent_drop_is_reported() {
        let stress = [0.0, 10.0, 20.0, 30.0, 12.0, 8.0, 9.0, 15.0, 40.0, 38.0];
        assert_eq!(find_stress_drops(&stress, 20.0, 4).unwrap(), vec![3]);
        // The last peak only falls by two
        assert_eq!(find_stress_drops(&stress, 3.0, 4).unwrap(), vec![3]);
        assert_eq!(find_stress_drops(&stress, 1.0, 4).unwrap(), vec![3, 8]);
        assert!(find_stress_drops(&stress, 25.0, 4).unwrap().is_empty());
    }

    #[test]
    fn test_width_limits_the_descent() {
        let stress = [0.0, 10.0, 9.0, 8.0, 7.0, 6.0, 5.0, 4.0, 3.0];
        assert!(find_stress_drops(&stress, 5.0, 2).unwrap().is_empty());
        assert_eq!(find_stress_drops(&stress, 5.0, 7).unwrap(), vec![1]);
    }

    #[test]
    fn test_plateau_peak() {
        let stress = [0.0, 5.0, 5.0, 5.0, 0.0, 1.0];
        assert_eq!(find_stress_drops(&stress, 4.0, 5).unwrap(), vec![1]);
    }

    #[test]
    fn test_window_drop_indices() {
        let stress = [0.0, 5.0, 40.0, 95.0, 98.0, 40.0, 38.0];
        assert_eq!(find_window_drop(&stress, 3, 49.0).unwrap(), Some((4, 5)));
    }

    #[test]
    fn test_window_drop_reports_earliest() {
        let stress = [0.0, 10.0, 20.0, 5.0, 30.0, 40.0, 50.0, 0.0, 60.0];
        assert_eq!(find_window_drop(&stress, 3, 10.0).unwrap(), Some((2, 3)));
    }

    #[test]
    fn test_invalid_parameters() {
        assert!(find_window_drop(&[1.0, 2.0], 1, 0.5).is_err());
        assert!(find_window_drop(&[1.0, 2.0], 2, f64::NAN).is_err());
        assert!(find_stress_drops(&[1.0, 2.0], 0.5, 0).is_err());
    }

    #[test]
    fn test_detector_scales_by_ultimate_strength() {
        let stress = [0.0, 5.0, 40.0, 95.0, 98.0, 40.0, 38.0];
        let window = DropDetector::Window {
            window: 3,
            drop_fraction: 0.5,
        };
        assert_eq!(window.locate(&stress, 98.0).unwrap(), Some(4));
        assert_eq!(window.locate(&stress, 200.0).unwrap(), None);

        let peaks = DropDetector::Peaks {
            prominence_fraction: 0.5,
            max_width: 3,
        };
        assert_eq!(peaks.locate(&stress, 98.0).unwrap(), Some(4));
    }
}
