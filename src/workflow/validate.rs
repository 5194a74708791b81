// src/workflow/validate.rs
// Shape validation of a successful classifier body

use crate::config::ConfidenceScale;
use crate::failure::FailureRecord;
use crate::workflow::result::{BreedPrediction, ClassificationResult};
use serde::Deserialize;
use serde_json::Value;

/// Slack for float rounding in sums and the upper bound (the service normalizes to 100)
const SCALE_TOLERANCE: f64 = 1e-6;

/// Wire form of one prediction
#[derive(Debug, Deserialize)]
struct WirePrediction {
    breed: String,
    confidence: f64,
}

/// Turn a 2xx body into a `ClassificationResult` or a `response-malformed` record.
///
/// Accepts `{"results": [...]}` or a bare array. Order is preserved as rank order.
/// Confidence values are converted to the percent scale according to `scale`.
pub fn validate_response(
    body: Value,
    scale: ConfidenceScale,
) -> Result<ClassificationResult, FailureRecord> {
    let items = match body {
        Value::Array(items) => items,
        Value::Object(mut map) => match map.remove("results") {
            Some(Value::Array(items)) => items,
            Some(_) => return Err(malformed("'results' is not a list")),
            None => return Err(malformed("response has no 'results' list")),
        },
        _ => return Err(malformed("response is not an object or list")),
    };

    if items.is_empty() {
        return Err(malformed("No dog breeds detected"));
    }

    let mut parsed = Vec::with_capacity(items.len());
    for (rank, item) in items.into_iter().enumerate() {
        let wire: WirePrediction = serde_json::from_value(item)
            .map_err(|e| malformed(format!("prediction {}: {}", rank, e)))?;
        if wire.breed.trim().is_empty() {
            return Err(malformed(format!("prediction {}: empty breed label", rank)));
        }
        if !wire.confidence.is_finite() {
            return Err(malformed(format!("prediction {}: confidence is not finite", rank)));
        }
        parsed.push(wire);
    }

    let factor = scale_factor(&parsed, scale);
    let mut predictions = Vec::with_capacity(parsed.len());
    for (rank, wire) in parsed.into_iter().enumerate() {
        let confidence = wire.confidence * factor;
        if !(0.0..=100.0 + SCALE_TOLERANCE).contains(&confidence) {
            return Err(malformed(format!(
                "prediction {}: confidence {} out of range",
                rank, wire.confidence
            )));
        }
        predictions.push(BreedPrediction {
            breed: wire.breed,
            confidence: confidence.min(100.0),
        });
    }

    ClassificationResult::from_validated(predictions)
        .ok_or_else(|| malformed("No dog breeds detected"))
}

/// Multiplier that brings the raw values onto the percent scale
fn scale_factor(parsed: &[WirePrediction], scale: ConfidenceScale) -> f64 {
    match scale {
        ConfidenceScale::Percent => 1.0,
        ConfidenceScale::Fraction => 100.0,
        ConfidenceScale::Auto => {
            let all_unit = parsed
                .iter()
                .all(|p| (0.0..=1.0).contains(&p.confidence));
            let sum: f64 = parsed.iter().map(|p| p.confidence).sum();
            if all_unit && sum <= 1.0 + SCALE_TOLERANCE {
                100.0
            } else {
                1.0
            }
        }
    }
}

fn malformed(detail: impl Into<String>) -> FailureRecord {
    FailureRecord::malformed_shape(format!("Invalid breed prediction format: {}", detail.into()))
}
