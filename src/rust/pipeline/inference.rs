use serde::{Deserialize, Serialize};

use super::error::PipelineError;
use super::forest::RandomForest;
use super::preprocess::PreparedVector;

/// Outcome of scoring one prepared vector.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PredictionResult {
    /// 1 when the government is predicted to receive a WTP opinion
    pub label: u8,
    /// Probability of class 1 (WTP)
    pub probability_positive: f64,
    /// Probability of class 0, always `1 - probability_positive`
    pub probability_negative: f64,
}

impl PredictionResult {
    pub fn is_wtp(&self) -> bool {
        self.label == 1
    }

    /// Probability of the predicted label
    pub fn confidence(&self) -> f64 {
        if self.is_wtp() {
            self.probability_positive
        } else {
            self.probability_negative
        }
    }
}

/// Applies the forest to a prepared vector.
///
/// The label comes from the forest's own decision rule on the same
/// probability vector that is reported, so the two always agree.
///
/// # Errors
/// - `ValidationError` if the vector width differs from the forest's
pub fn infer(model: &RandomForest, prepared: &PreparedVector) -> Result<PredictionResult, PipelineError> {
    if prepared.len() != model.n_features() {
        return Err(PipelineError::ValidationError(format!(
            "Prepared vector has {} values but the forest expects {}",
            prepared.len(), model.n_features()
        )));
    }
    let proba = model.predict_proba(prepared.view());
    let label = model.decide(&proba);
    let probability_positive = proba[1];
    Ok(PredictionResult {
        label,
        probability_positive,
        probability_negative: 1.0 - probability_positive,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::preprocess::prepare;
    use crate::pipeline::test_support::{sample_bundle, sample_record};

    #[test]
    fn test_probabilities_sum_to_one() {
        let bundle = sample_bundle();
        for (kemandirian, solvabilitas) in [(0.75, 1.5), (0.25, 0.5), (0.75, 0.5), (0.25, 1.5), (0.5, 1.0)] {
            let prepared = prepare(&bundle, &sample_record(kemandirian, solvabilitas)).unwrap();
            let result = infer(bundle.model(), &prepared).unwrap();
            assert!((result.probability_positive + result.probability_negative - 1.0).abs() < 1e-9);
            assert!((0.0..=1.0).contains(&result.probability_positive));
            let expected = if result.probability_positive > result.probability_negative { 1 } else { 0 };
            assert_eq!(result.label, expected);
        }
    }

    #[test]
    fn test_strong_and_weak_profiles() {
        let bundle = sample_bundle();
        let strong = infer(bundle.model(), &prepare(&bundle, &sample_record(0.75, 1.5)).unwrap()).unwrap();
        assert!(strong.is_wtp());
        assert!((strong.probability_positive - 2.2 / 3.0).abs() < 1e-9);
        assert_eq!(strong.confidence(), strong.probability_positive);

        let weak = infer(bundle.model(), &prepare(&bundle, &sample_record(0.25, 0.5)).unwrap()).unwrap();
        assert!(!weak.is_wtp());
        assert!((weak.probability_positive - 1.1 / 3.0).abs() < 1e-9);
        assert_eq!(weak.confidence(), weak.probability_negative);
    }

    #[test]
    fn test_bit_identical_reruns() {
        let bundle = sample_bundle();
        let record = sample_record(0.61, 1.2);
        let first = infer(bundle.model(), &prepare(&bundle, &record).unwrap()).unwrap();
        let second = infer(bundle.model(), &prepare(&bundle, &record).unwrap()).unwrap();
        assert_eq!(first.probability_positive.to_bits(), second.probability_positive.to_bits());
        assert_eq!(first.label, second.label);
    }

    #[test]
    fn test_width_mismatch_rejected() {
        let bundle = sample_bundle();
        let short = PreparedVector::from(vec![0.0; 3]);
        assert!(matches!(infer(bundle.model(), &short), Err(PipelineError::ValidationError(_))));
    }
}
