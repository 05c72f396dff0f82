//! Sample-rate conversion using rubato
//!
//! Speech clips arrive at whatever rate the synthesis backend produced
//! (typically 24 kHz) and are converted once, in full, to the output
//! device's rate before streaming begins.

use crate::error::{Error, Result};
use rubato::{FastFixedIn, PolynomialDegree, Resampler};
use tracing::debug;

/// Resample a mono clip to `output_rate`.
///
/// Returns a copy untouched when the rates already match.
pub fn to_rate(input: &[f32], input_rate: u32, output_rate: u32) -> Result<Vec<f32>> {
    if input_rate == output_rate || input.is_empty() {
        return Ok(input.to_vec());
    }
    if input_rate == 0 {
        return Err(Error::AudioOutput("clip sample rate is zero".to_string()));
    }

    debug!(
        "Resampling clip from {}Hz to {}Hz ({} samples)",
        input_rate,
        output_rate,
        input.len()
    );

    // One chunk covering the whole clip; these are short utterances, not
    // streams.
    let mut resampler = FastFixedIn::<f32>::new(
        output_rate as f64 / input_rate as f64,
        1.0,
        PolynomialDegree::Septic,
        input.len(),
        1,
    )
    .map_err(|e| Error::AudioOutput(format!("failed to create resampler: {}", e)))?;

    let mut output = resampler
        .process(&[input.to_vec()], None)
        .map_err(|e| Error::AudioOutput(format!("resampling failed: {}", e)))?;

    Ok(output.pop().unwrap_or_default())
}
