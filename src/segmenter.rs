//! Strategy selection and the per-sample entry points.

use serde::{Deserialize, Serialize};

use crate::begin::{
    SecondDerivativeBegin, SecondDerivativeOnsetBegin, ThresholdBegin,
    UltimateStrengthThresholdBegin,
};
use crate::curve::{Curve, SampleId};
use crate::end::{DropAwareEnd, FirstDerivativeMaxEnd, ZeroCrossingEnd};
use crate::error::{Result, SegmentError};
use crate::window::WindowAdjustment;

/// Polynomial order used by every smoothing step unless configured
pub const DEFAULT_POLYNOMIAL_ORDER: usize = 3;

/// Which side of the valid range a cutoff bounds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CutoffBound {
    Begin,
    End,
}

/// A begin or end extension computed for one sample.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Cutoff {
    pub sample: SampleId,
    pub bound: CutoffBound,
    pub extension: f64,
    /// Set when the smoothing window had to be shrunk for this sample
    pub window_adjustment: Option<WindowAdjustment>,
}

/// Outcome of one strategy before it is tagged with its sample.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Evaluation {
    pub extension: f64,
    pub adjustment: Option<WindowAdjustment>,
}

impl Evaluation {
    pub(crate) fn exact(extension: f64) -> Self {
        Self {
            extension,
            adjustment: None,
        }
    }
}

/// Scalars the loader supplies next to a curve.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct SampleContext {
    pub ultimate_strength: Option<f64>,
    pub extensibility: Option<f64>,
    pub begin: Option<f64>,
}

impl SampleContext {
    /// Sets the externally measured ultimate strength (kPa)
    pub fn with_ultimate_strength(mut self, value: f64) -> Self {
        self.ultimate_strength = Some(value);
        self
    }

    /// Sets the extension at ultimate strength, bounding the end search
    pub fn with_extensibility(mut self, value: f64) -> Self {
        self.extensibility = Some(value);
        self
    }

    /// Sets a begin cutoff computed earlier
    pub fn with_begin(mut self, value: f64) -> Self {
        self.begin = Some(value);
        self
    }

    /// Ultimate strength from the context, else the curve's own maximum.
    pub(crate) fn ultimate_strength_for(&self, curve: &Curve) -> Result<f64> {
        self.ultimate_strength
            .or_else(|| curve.ultimate_strength())
            .ok_or(SegmentError::InsufficientData {
                available: curve.len(),
                required: 1,
            })
    }
}

/// Begin-cutoff strategy, selected in configuration by its `strategy` tag.
///
/// ```rust
/// use tensile_cutoff::BeginStrategy;
///
/// let strategy: BeginStrategy =
///     serde_json::from_str(r#"{"strategy": "threshold", "threshold_fraction": 0.05}"#)
///         .expect("valid strategy");
/// assert!(matches!(strategy, BeginStrategy::Threshold(_)));
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "strategy", rename_all = "snake_case")]
pub enum BeginStrategy {
    Threshold(ThresholdBegin),
    UltimateStrengthThreshold(UltimateStrengthThresholdBegin),
    SecondDerivative(SecondDerivativeBegin),
    SecondDerivativeOnset(SecondDerivativeOnsetBegin),
}

impl BeginStrategy {
    /// Computes the begin extension of `curve`.
    ///
    /// # Arguments
    /// * `curve` - Full curve of the sample
    /// * `context` - Loader-supplied scalars; only the ultimate strength is read
    /// * `poly_order` - Polynomial order of the smoothing steps
    ///
    /// # Returns
    /// The begin extension, with the window adjustment if one was needed
    pub fn evaluate(
        &self,
        curve: &Curve,
        context: &SampleContext,
        poly_order: usize,
    ) -> Result<Evaluation> {
        match self {
            BeginStrategy::Threshold(s) => s.evaluate(curve),
            BeginStrategy::UltimateStrengthThreshold(s) => s.evaluate(curve, context),
            BeginStrategy::SecondDerivative(s) => s.evaluate(curve, context, poly_order),
            BeginStrategy::SecondDerivativeOnset(s) => s.evaluate(curve, poly_order),
        }
    }
}

/// End-cutoff strategy, selected in configuration by its `strategy` tag.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "strategy", rename_all = "snake_case")]
pub enum EndStrategy {
    ZeroCrossing(ZeroCrossingEnd),
    FirstDerivativeMax(FirstDerivativeMaxEnd),
    DropAware(DropAwareEnd),
}

impl EndStrategy {
    /// Computes the end extension of an already restricted `curve`.
    ///
    /// [`CurveSegmenter::end_cutoff`] applies the begin and extensibility
    /// bounds before calling this.
    pub fn evaluate(
        &self,
        curve: &Curve,
        context: &SampleContext,
        poly_order: usize,
    ) -> Result<Evaluation> {
        match self {
            EndStrategy::ZeroCrossing(s) => s.evaluate(curve, poly_order),
            EndStrategy::FirstDerivativeMax(s) => s.evaluate(curve, poly_order),
            EndStrategy::DropAware(s) => s.evaluate(curve, context, poly_order),
        }
    }
}

fn default_polynomial_order() -> usize {
    DEFAULT_POLYNOMIAL_ORDER
}

/// Strategy selection for a batch of samples.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SegmenterConfig {
    #[serde(default = "default_polynomial_order")]
    pub polynomial_order: usize,
    pub begin: BeginStrategy,
    pub end: EndStrategy,
}

impl SegmenterConfig {
    /// Parses a JSON configuration document.
    ///
    /// ```rust
    /// use tensile_cutoff::SegmenterConfig;
    ///
    /// let config = SegmenterConfig::from_json_str(r#"{
    ///     "begin": { "strategy": "threshold", "threshold_fraction": 0.1 },
    ///     "end": { "strategy": "zero_crossing", "window": 51 }
    /// }"#).expect("valid configuration");
    /// assert_eq!(config.polynomial_order, 3);
    /// ```
    pub fn from_json_str(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }
}

/// Computes begin and end cutoffs of stress-strain curves.
///
/// Each call is independent of the others; the segmenter holds only its
/// configuration.
#[derive(Debug, Clone)]
pub struct CurveSegmenter {
    config: SegmenterConfig,
}

impl CurveSegmenter {
    pub fn new(config: SegmenterConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &SegmenterConfig {
        &self.config
    }

    /// Minimum valid extension of `curve`.
    pub fn begin_cutoff(&self, curve: &Curve, context: &SampleContext) -> Result<Cutoff> {
        let evaluation = self
            .config
            .begin
            .evaluate(curve, context, self.config.polynomial_order)?;
        Ok(tag(curve.sample(), CutoffBound::Begin, evaluation))
    }

    /// Maximum valid extension of `curve`, searched within the begin cutoff
    /// and extensibility given by `context` when present.
    pub fn end_cutoff(&self, curve: &Curve, context: &SampleContext) -> Result<Cutoff> {
        let valid = curve.restricted(context.begin, context.extensibility);
        let evaluation = self
            .config
            .end
            .evaluate(&valid, context, self.config.polynomial_order)?;
        Ok(tag(curve.sample(), CutoffBound::End, evaluation))
    }

    /// Both cutoffs of one sample, the end searched above the begin.
    pub fn segment(&self, curve: &Curve, context: &SampleContext) -> Result<Segmentation> {
        let begin = self.begin_cutoff(curve, context)?;
        let end_context = SampleContext {
            begin: Some(context.begin.unwrap_or(begin.extension)),
            ..*context
        };
        let end = self.end_cutoff(curve, &end_context)?;
        let segmentation = Segmentation { begin, end };
        if !segmentation.is_consistent() {
            tracing::warn!(
                sample = %curve.sample(),
                begin = begin.extension,
                end = end.extension,
                "begin cutoff is not below end cutoff"
            );
        }
        Ok(segmentation)
    }
}

fn tag(sample: SampleId, bound: CutoffBound, evaluation: Evaluation) -> Cutoff {
    tracing::debug!(
        sample = %sample,
        bound = ?bound,
        extension = evaluation.extension,
        "cutoff computed"
    );
    Cutoff {
        sample,
        bound,
        extension: evaluation.extension,
        window_adjustment: evaluation.adjustment,
    }
}

/// Begin and end cutoffs of one sample.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Segmentation {
    pub begin: Cutoff,
    pub end: Cutoff,
}

impl Segmentation {
    /// Whether `begin < end`. Not enforced; callers decide what to do with
    /// an inverted pair.
    pub fn is_consistent(&self) -> bool {
        self.begin.extension < self.end.extension
    }
}

/// Rejects fractions outside `[0, 1]`.
pub(crate) fn check_fraction(name: &str, value: f64) -> Result<()> {
    if (0.0..=1.0).contains(&value) {
        Ok(())
    } else {
        Err(SegmentError::InvalidParameter(format!(
            "{name} must be a fraction in [0, 1], got {value}"
        )))
    }
}

/// Magnitude below which a derivative of `curve` is treated as zero.
pub(crate) fn numerical_zero(curve: &Curve) -> f64 {
    let scale = curve.stress().iter().fold(0.0_f64, |m, s| m.max(s.abs()));
    scale.max(1.0) * 1e-9
}

/// Fails with `InsufficientData` below `required` samples.
pub(crate) fn require_samples(curve: &Curve, required: usize) -> Result<()> {
    if curve.len() < required {
        return Err(SegmentError::InsufficientData {
            available: curve.len(),
            required,
        });
    }
    Ok(())
}
