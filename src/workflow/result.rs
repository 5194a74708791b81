// src/workflow/result.rs
// Validated classification output

use serde::Serialize;

/// One ranked prediction. `confidence` is always on the 0-100 percent scale.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BreedPrediction {
    pub breed: String,
    pub confidence: f64,
}

/// Ranked, non-empty list of predictions in the order the service returned them.
///
/// Only produced by [`validate_response`](crate::workflow::validate::validate_response),
/// so an instance always holds at least one well-formed prediction.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(transparent)]
pub struct ClassificationResult {
    predictions: Vec<BreedPrediction>,
}

impl ClassificationResult {
    pub(crate) fn from_validated(predictions: Vec<BreedPrediction>) -> Option<Self> {
        if predictions.is_empty() {
            None
        } else {
            Some(Self { predictions })
        }
    }

    /// Best match (rank 0)
    pub fn top(&self) -> &BreedPrediction {
        &self.predictions[0]
    }

    pub fn predictions(&self) -> &[BreedPrediction] {
        &self.predictions
    }

    pub fn len(&self) -> usize {
        self.predictions.len()
    }

    /// Always false; kept alongside `len` for API symmetry
    pub fn is_empty(&self) -> bool {
        self.predictions.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, BreedPrediction> {
        self.predictions.iter()
    }
}

impl<'a> IntoIterator for &'a ClassificationResult {
    type Item = &'a BreedPrediction;
    type IntoIter = std::slice::Iter<'a, BreedPrediction>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}
