use serde::{Deserialize, Serialize};

/// Direction in which a feature pushes the predicted outcome.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Influence {
    Positive,
    Negative,
}

impl Influence {
    /// Positive for a strictly positive coefficient, negative otherwise
    pub fn from_coefficient(coefficient: f64) -> Self {
        if coefficient > 0.0 {
            Influence::Positive
        } else {
            Influence::Negative
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Influence::Positive => "positif",
            Influence::Negative => "negatif",
        }
    }
}

/// Source of per-feature influence signs.
///
/// Diagnostics ask this for every ranked feature. A bundle without a linear
/// model answers through [`NoDirection`].
pub trait DirectionProvider: Send + Sync {
    /// Returns the influence of the feature at `feature_index`, if known
    fn influence(&self, feature_index: usize) -> Option<Influence>;

    /// Whether this provider can report any direction at all
    fn is_available(&self) -> bool;
}

/// Stand-in used when the bundle carries no linear model.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoDirection;

impl DirectionProvider for NoDirection {
    fn influence(&self, _feature_index: usize) -> Option<Influence> {
        None
    }

    fn is_available(&self) -> bool {
        false
    }
}

/// The coefficients of a fitted linear classifier; only their signs are read.
///
/// Exports may carry other fields of the fitted model, such as `intercept`;
/// they are ignored when decoding.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LinearClassifier {
    coefficients: Vec<f64>,
}

impl LinearClassifier {
    pub fn new(coefficients: Vec<f64>) -> Self {
        Self { coefficients }
    }

    pub fn coefficients(&self) -> &[f64] {
        &self.coefficients
    }

    pub(crate) fn validate(&self, n_features: usize) -> Result<(), String> {
        if self.coefficients.len() != n_features {
            return Err(format!(
                "Linear model has {} coefficients but the bundle has {} features",
                self.coefficients.len(), n_features
            ));
        }
        if self.coefficients.iter().any(|c| c.is_nan()) {
            return Err("Linear model coefficients must not be NaN".into());
        }
        Ok(())
    }
}

impl DirectionProvider for LinearClassifier {
    fn influence(&self, feature_index: usize) -> Option<Influence> {
        self.coefficients.get(feature_index).copied().map(Influence::from_coefficient)
    }

    fn is_available(&self) -> bool {
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_coefficient_sign() {
        let linear = LinearClassifier::new(vec![0.8, -0.2, 0.0]);
        assert_eq!(linear.influence(0), Some(Influence::Positive));
        assert_eq!(linear.influence(1), Some(Influence::Negative));
        // zero is not "> 0"
        assert_eq!(linear.influence(2), Some(Influence::Negative));
        assert_eq!(linear.influence(3), None);
        assert!(linear.is_available());
    }

    #[test]
    fn test_absent_provider() {
        assert_eq!(NoDirection.influence(0), None);
        assert!(!NoDirection.is_available());
    }

    #[test]
    fn test_width_validation() {
        assert!(LinearClassifier::new(vec![1.0, 2.0]).validate(2).is_ok());
        assert!(LinearClassifier::new(vec![1.0]).validate(2).is_err());
    }

    #[test]
    fn test_export_extras_ignored() {
        let linear: LinearClassifier =
            serde_json::from_str(r#"{ "coefficients": [0.5, -0.5], "intercept": 0.3 }"#).unwrap();
        assert_eq!(linear, LinearClassifier::new(vec![0.5, -0.5]));
        assert_eq!(serde_json::to_string(&linear).unwrap(), r#"{"coefficients":[0.5,-0.5]}"#);
    }
}
