//! Stress-strain curves and the read-only restrictions the strategies use.

use std::fmt;
use std::ops::Range;

use serde::{Deserialize, Serialize};

use crate::error::{Result, SegmentError};

/// Positive integer identifying a test sample.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SampleId(pub u32);

impl fmt::Display for SampleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Ordered `(extension, stress)` samples of one tensile test.
///
/// Extension is the dimensionless strain ratio and stress is in kPa. The
/// samples are expected sorted by extension; that ordering is the loader's
/// responsibility. Restrictions always return a new curve.
#[derive(Debug, Clone, PartialEq)]
pub struct Curve {
    sample: SampleId,
    extension: Vec<f64>,
    stress: Vec<f64>,
}

impl Curve {
    /// Builds a curve from two equally long columns of finite values.
    pub fn new(sample: SampleId, extension: Vec<f64>, stress: Vec<f64>) -> Result<Self> {
        if extension.len() != stress.len() {
            return Err(SegmentError::MalformedCurve(format!(
                "sample {sample} has {} extensions but {} stresses",
                extension.len(),
                stress.len()
            )));
        }
        if let Some(i) = extension
            .iter()
            .zip(&stress)
            .position(|(e, s)| !e.is_finite() || !s.is_finite())
        {
            return Err(SegmentError::MalformedCurve(format!(
                "sample {sample} has a non-finite value at row {i}"
            )));
        }
        Ok(Self {
            sample,
            extension,
            stress,
        })
    }

    /// Builds a curve from `(extension, stress)` pairs.
    ///
    /// # Arguments
    /// * `sample` - Identifier of the tested sample
    /// * `pairs` - Samples in acquisition order
    ///
    /// # Returns
    /// `MalformedCurve` when any value is not finite
    pub fn from_pairs<I>(sample: SampleId, pairs: I) -> Result<Self>
    where
        I: IntoIterator<Item = (f64, f64)>,
    {
        let (extension, stress) = pairs.into_iter().unzip();
        Self::new(sample, extension, stress)
    }

    /// Sample the curve was recorded on
    pub fn sample(&self) -> SampleId {
        self.sample
    }

    /// Number of samples
    pub fn len(&self) -> usize {
        self.stress.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stress.is_empty()
    }

    /// Extension column (mm/mm)
    pub fn extension(&self) -> &[f64] {
        &self.extension
    }

    /// Stress column (kPa)
    pub fn stress(&self) -> &[f64] {
        &self.stress
    }

    /// Smallest extension, `None` for an empty curve
    pub fn min_extension(&self) -> Option<f64> {
        self.extension.iter().copied().reduce(f64::min)
    }

    /// Largest extension, `None` for an empty curve
    pub fn max_extension(&self) -> Option<f64> {
        self.extension.iter().copied().reduce(f64::max)
    }

    /// Index of the first occurrence of the maximum stress
    pub fn peak_index(&self) -> Option<usize> {
        argmax(&self.stress)
    }

    /// Maximum stress reached during the test
    pub fn ultimate_strength(&self) -> Option<f64> {
        self.peak_index().map(|i| self.stress[i])
    }

    /// Extension at which the ultimate strength is reached
    pub fn extensibility(&self) -> Option<f64> {
        self.peak_index().map(|i| self.extension[i])
    }

    /// `max(stress) - min(stress)`, zero for an empty curve
    pub fn stress_amplitude(&self) -> f64 {
        match (argmax(&self.stress), argmin(&self.stress)) {
            (Some(hi), Some(lo)) => self.stress[hi] - self.stress[lo],
            _ => 0.0,
        }
    }

    /// Contiguous sub-curve over sample indices.
    pub fn slice(&self, range: Range<usize>) -> Curve {
        Curve {
            sample: self.sample,
            extension: self.extension[range.clone()].to_vec(),
            stress: self.stress[range].to_vec(),
        }
    }

    /// Keeps the samples for which `keep(extension, stress)` holds.
    pub fn filter<F>(&self, mut keep: F) -> Curve
    where
        F: FnMut(f64, f64) -> bool,
    {
        let (extension, stress) = self
            .extension
            .iter()
            .zip(&self.stress)
            .filter(|&(&e, &s)| keep(e, s))
            .map(|(&e, &s)| (e, s))
            .unzip();
        Curve {
            sample: self.sample,
            extension,
            stress,
        }
    }

    /// The loading portion: from the minimum preceding the global stress
    /// maximum up to and including that maximum.
    pub fn loading_segment(&self) -> Curve {
        match self.peak_index() {
            Some(peak) => {
                let start = argmin(&self.stress[..=peak]).unwrap_or(0);
                self.slice(start..peak + 1)
            }
            None => self.clone(),
        }
    }

    /// Keeps `begin <= extension <= end` for whichever bounds are given.
    pub fn restricted(&self, begin: Option<f64>, end: Option<f64>) -> Curve {
        if begin.is_none() && end.is_none() {
            return self.clone();
        }
        let lo = begin.unwrap_or(f64::NEG_INFINITY);
        let hi = end.unwrap_or(f64::INFINITY);
        self.filter(|e, _| e >= lo && e <= hi)
    }

    /// Drops the data below `begin` and re-normalizes the remainder so that
    /// it starts at unit extension and zero stress.
    pub fn trim_begin(&self, begin: f64) -> Result<Curve> {
        let kept = self.filter(|e, _| e >= begin);
        let (Some(&e0), Some(&s0)) = (kept.extension.first(), kept.stress.first()) else {
            return Err(SegmentError::InsufficientData {
                available: 0,
                required: 1,
            });
        };
        if e0 == 0.0 {
            return Err(SegmentError::MalformedCurve(format!(
                "sample {} starts at zero extension and cannot be normalized",
                self.sample
            )));
        }
        Ok(Curve {
            sample: self.sample,
            extension: kept.extension.iter().map(|e| e / e0).collect(),
            stress: kept.stress.iter().map(|s| s - s0).collect(),
        })
    }

    /// Drops the data above `end`.
    pub fn trim_end(&self, end: f64) -> Curve {
        self.filter(|e, _| e <= end)
    }
}

/// Index of the first maximum, ignoring NaN.
pub(crate) fn argmax(values: &[f64]) -> Option<usize> {
    values
        .iter()
        .enumerate()
        .filter(|(_, v)| !v.is_nan())
        .fold(None, |best: Option<(usize, f64)>, (i, &v)| match best {
            Some((_, b)) if b >= v => best,
            _ => Some((i, v)),
        })
        .map(|(i, _)| i)
}

/// Index of the first minimum, ignoring NaN.
pub(crate) fn argmin(values: &[f64]) -> Option<usize> {
    values
        .iter()
        .enumerate()
        .filter(|(_, v)| !v.is_nan())
        .fold(None, |best: Option<(usize, f64)>, (i, &v)| match best {
            Some((_, b)) if b <= v => best,
            _ => Some((i, v)),
        })
        .map(|(i, _)| i)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    fn curve(pairs: &[(f64, f64)]) -> Curve {
        Curve::from_pairs(SampleId(1), pairs.iter().copied()).unwrap()
    }

    #[test]
    fn test_rejects_mismatched_columns() {
        let err = Curve::new(SampleId(1), vec![1.0, 2.0], vec![0.0]).unwrap_err();
        assert!(matches!(err, SegmentError::MalformedCurve(_)));
        let err = Curve::new(SampleId(1), vec![1.0], vec![f64::NAN]).unwrap_err();
        assert!(matches!(err, SegmentError::MalformedCurve(_)));
    }

    #[test]
    fn test_scalars() {
        let c = curve(&[(1.0, 3.0), (1.1, 1.0), (1.2, 9.0), (1.3, 9.0), (1.4, 2.0)]);
        assert_eq!(c.peak_index(), Some(2));
        assert_eq!(c.ultimate_strength(), Some(9.0));
        assert_eq!(c.extensibility(), Some(1.2));
        assert_abs_diff_eq!(c.stress_amplitude(), 8.0);
    }

    #[test]
    fn test_loading_segment() {
        let c = curve(&[(1.0, 3.0), (1.1, 1.0), (1.2, 4.0), (1.3, 9.0), (1.4, 2.0)]);
        let loading = c.loading_segment();
        assert_eq!(loading.extension(), &[1.1, 1.2, 1.3]);
        assert_eq!(loading.stress(), &[1.0, 4.0, 9.0]);
    }

    #[test]
    fn test_restricted() {
        let c = curve(&[(1.0, 0.0), (1.1, 1.0), (1.2, 2.0), (1.3, 3.0)]);
        assert_eq!(c.restricted(Some(1.1), Some(1.2)).len(), 2);
        assert_eq!(c.restricted(None, Some(1.2)).len(), 3);
        assert_eq!(c.restricted(None, None), c);
    }

    #[test]
    fn test_trim_begin_normalizes() {
        let c = curve(&[(1.0, 0.0), (1.25, 1.0), (1.5, 3.0), (2.0, 7.0)]);
        let trimmed = c.trim_begin(1.25).unwrap();
        assert_abs_diff_eq!(trimmed.extension()[0], 1.0);
        assert_abs_diff_eq!(trimmed.extension()[2], 1.6);
        assert_eq!(trimmed.stress(), &[0.0, 2.0, 6.0]);
        assert!(c.trim_begin(3.0).is_err());
    }

    #[test]
    fn test_trim_end() {
        let c = curve(&[(1.0, 0.0), (1.25, 1.0), (1.5, 3.0)]);
        assert_eq!(c.trim_end(1.25).stress(), &[0.0, 1.0]);
    }

    #[test]
    fn test_arg_extrema_take_first_occurrence() {
        assert_eq!(argmax(&[1.0, 5.0, 5.0]), Some(1));
        assert_eq!(argmin(&[2.0, 0.0, 0.0]), Some(1));
        assert_eq!(argmax(&[]), None);
    }
}
