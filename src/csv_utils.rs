//! CSV loading and persisting at the edge of the pipeline.
//!
//! Headers follow the files produced by the upstream conversion steps:
//! stress-strain files carry [`EXTENSION_FIELD`] and [`STRESS_FIELD`],
//! per-sample result files are keyed by [`IDENTIFIER_FIELD`].

use std::collections::BTreeMap;
use std::path::Path;

use csv::StringRecord;

use crate::curve::{Curve, SampleId};
use crate::error::{Result, SegmentError};
use crate::segmenter::Cutoff;

pub const IDENTIFIER_FIELD: &str = "Number";
pub const EXTENSION_FIELD: &str = "Extension (mm/mm)";
pub const STRESS_FIELD: &str = "Stress (kPa)";
pub const BEGIN_FIELD: &str = "Begin extension (mm/mm)";
pub const END_FIELD: &str = "End extension (mm/mm)";
pub const END_FIT_FIELD: &str = "End extension fit (mm/mm)";
pub const EXTENSIBILITY_FIELD: &str = "Extensibility (mm/mm)";
pub const ULTIMATE_STRENGTH_FIELD: &str = "Ultimate strength (kPa)";

fn column_index(headers: &StringRecord, column: &str) -> Result<usize> {
    headers
        .iter()
        .position(|h| h.trim() == column)
        .ok_or_else(|| SegmentError::MissingField(column.to_string()))
}

fn parse_field(record: &StringRecord, index: usize) -> Option<f64> {
    record.get(index).and_then(|field| field.trim().parse::<f64>().ok())
}

/// Reads a column of f64 values by header name, skipping invalid/missing values.
pub fn read_csv_column<P: AsRef<Path>>(path: P, column: &str) -> Result<Vec<f64>> {
    let mut rdr = csv::Reader::from_path(path)?;
    let index = column_index(rdr.headers()?, column)?;

    let mut values = Vec::new();
    for result in rdr.records() {
        if let Some(value) = parse_field(&result?, index) {
            values.push(value);
        }
    }
    Ok(values)
}

/// Reads the stress-strain curve of one sample.
///
/// Rows where either value is missing or unparsable are skipped as a whole
/// so the two columns stay aligned.
pub fn read_curve<P: AsRef<Path>>(path: P, sample: SampleId) -> Result<Curve> {
    let mut rdr = csv::Reader::from_path(path)?;
    let headers = rdr.headers()?.clone();
    let extension_index = column_index(&headers, EXTENSION_FIELD)?;
    let stress_index = column_index(&headers, STRESS_FIELD)?;

    let mut pairs = Vec::new();
    for result in rdr.records() {
        let record = result?;
        if let (Some(e), Some(s)) = (
            parse_field(&record, extension_index),
            parse_field(&record, stress_index),
        ) {
            pairs.push((e, s));
        }
    }
    Curve::from_pairs(sample, pairs)
}

/// Reads a per-sample scalar such as the ultimate strength, keyed by sample.
pub fn read_context_column<P: AsRef<Path>>(
    path: P,
    column: &str,
) -> Result<BTreeMap<SampleId, f64>> {
    let mut rdr = csv::Reader::from_path(path)?;
    let headers = rdr.headers()?.clone();
    let id_index = column_index(&headers, IDENTIFIER_FIELD)?;
    let value_index = column_index(&headers, column)?;

    let mut values = BTreeMap::new();
    for result in rdr.records() {
        let record = result?;
        let id = record
            .get(id_index)
            .and_then(|field| field.trim().parse::<u32>().ok());
        if let (Some(id), Some(value)) = (id, parse_field(&record, value_index)) {
            values.insert(SampleId(id), value);
        }
    }
    Ok(values)
}

/// Writes one `Number,<field>` row per cutoff, ordered by sample.
pub fn write_cutoffs<P: AsRef<Path>>(path: P, field: &str, cutoffs: &[Cutoff]) -> Result<()> {
    let mut sorted = cutoffs.to_vec();
    sorted.sort_by_key(|c| c.sample);

    let mut wtr = csv::Writer::from_path(path)?;
    wtr.write_record([IDENTIFIER_FIELD, field])?;
    for cutoff in &sorted {
        wtr.write_record([cutoff.sample.to_string(), cutoff.extension.to_string()])?;
    }
    wtr.flush()?;
    Ok(())
}

/// Writes a curve with the stress-strain headers.
pub fn write_curve<P: AsRef<Path>>(path: P, curve: &Curve) -> Result<()> {
    let mut wtr = csv::Writer::from_path(path)?;
    wtr.write_record([EXTENSION_FIELD, STRESS_FIELD])?;
    for (e, s) in curve.extension().iter().zip(curve.stress()) {
        wtr.write_record([e.to_string(), s.to_string()])?;
    }
    wtr.flush()?;
    Ok(())
}
