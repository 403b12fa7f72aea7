//! Fitting a configured smoothing window to the samples actually available.

use serde::{Deserialize, Serialize};

use crate::curve::SampleId;
use crate::error::{Result, SegmentError};

/// How an oversize smoothing window is reduced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ShrinkRule {
    /// A tenth of the sample count
    #[default]
    Tenth,
    /// Half of the sample count
    Half,
}

impl ShrinkRule {
    fn target(self, len: usize) -> usize {
        match self {
            ShrinkRule::Tenth => len / 10,
            ShrinkRule::Half => len / 2,
        }
    }
}

/// Record of a window that had to be shrunk for one sample.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct WindowAdjustment {
    pub sample: SampleId,
    pub requested: usize,
    pub adjusted: usize,
}

/// Window chosen for a series, with the shrink report when one happened.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FittedWindow {
    pub length: usize,
    pub adjustment: Option<WindowAdjustment>,
}

/// Returns a window no longer than `len` samples.
///
/// A window that already fits is returned unchanged, so parity and order
/// errors still surface from the filter. An oversize one is reduced with
/// `rule`, raised to the smallest odd length above `poly_order`, and
/// reported through a `warn!` event and the returned adjustment.
pub fn fit_window(
    sample: SampleId,
    requested: usize,
    len: usize,
    poly_order: usize,
    rule: ShrinkRule,
) -> Result<FittedWindow> {
    if requested <= len {
        return Ok(FittedWindow {
            length: requested,
            adjustment: None,
        });
    }

    let mut adjusted = rule.target(len).max(poly_order + 1);
    if adjusted % 2 == 0 {
        adjusted += 1;
    }
    if adjusted > len {
        // Fall back to the longest odd window that still fits
        adjusted = if len % 2 == 0 { len.saturating_sub(1) } else { len };
    }
    if adjusted <= poly_order {
        return Err(SegmentError::InsufficientData {
            available: len,
            required: (poly_order + 1) | 1,
        });
    }

    tracing::warn!(
        sample = %sample,
        requested,
        adjusted,
        "reduced smoothing window to fit the available samples"
    );
    Ok(FittedWindow {
        length: adjusted,
        adjustment: Some(WindowAdjustment {
            sample,
            requested,
            adjusted,
        }),
    })
}
