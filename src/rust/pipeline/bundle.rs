use std::collections::HashSet;
use serde::{Deserialize, Serialize};

use super::direction::{DirectionProvider, LinearClassifier, NoDirection};
use super::forest::{RandomForest, RawForest};
use super::preprocess::{SimpleImputer, StandardScaler};

/// The pre-trained artifacts the pipeline scores with.
///
/// A bundle is immutable once constructed. Every width (imputer, scaler,
/// importances, coefficients, benchmark) matches the number of feature
/// names, and the benchmark follows feature order. Deserialization runs the
/// same checks as [`ArtifactBundle::new`].
///
/// The on-disk form is the JSON encoding of this struct:
///
/// ```json
/// {
///   "features": ["Rasio Kemandirian Keuangan", "..."],
///   "model": {
///     "classes": [0, 1],
///     "trees": [{ "nodes": [
///       { "type": "split", "feature": 0, "threshold": 0.0, "left": 1, "right": 2 },
///       { "type": "leaf", "value": [8.0, 2.0] },
///       { "type": "leaf", "value": [1.0, 9.0] }
///     ]}],
///     "feature_importances": [0.3, "..."]
///   },
///   "linear_model": { "coefficients": [0.8, "..."] },
///   "imputer": { "strategy": "mean", "statistics": [0.5, "..."] },
///   "scaler": { "mean": [0.5, "..."], "scale": [0.25, "..."] },
///   "benchmark": [0.5, "..."]
/// }
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawBundle")]
pub struct ArtifactBundle {
    features: Vec<String>,
    model: RandomForest,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    linear_model: Option<LinearClassifier>,
    imputer: SimpleImputer,
    scaler: StandardScaler,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    benchmark: Option<Vec<f64>>,
}

/// Wire form of [`ArtifactBundle`] before any invariant is checked.
#[derive(Debug, Clone, Deserialize)]
pub struct RawBundle {
    features: Vec<String>,
    model: RawForest,
    #[serde(default)]
    linear_model: Option<LinearClassifier>,
    imputer: SimpleImputer,
    scaler: StandardScaler,
    #[serde(default)]
    benchmark: Option<Vec<f64>>,
}

impl TryFrom<RawBundle> for ArtifactBundle {
    type Error = String;

    fn try_from(raw: RawBundle) -> Result<Self, Self::Error> {
        let bundle = Self {
            features: raw.features,
            model: RandomForest::try_from(raw.model)?,
            linear_model: raw.linear_model,
            imputer: raw.imputer,
            scaler: raw.scaler,
            benchmark: raw.benchmark,
        };
        bundle.validate()?;
        Ok(bundle)
    }
}

impl ArtifactBundle {
    /// Assembles and validates a bundle without the optional parts
    pub fn new(
        features: Vec<String>,
        model: RandomForest,
        imputer: SimpleImputer,
        scaler: StandardScaler,
    ) -> Result<Self, String> {
        let bundle = Self {
            features,
            model,
            linear_model: None,
            imputer,
            scaler,
            benchmark: None,
        };
        bundle.validate()?;
        Ok(bundle)
    }

    pub fn with_linear_model(mut self, linear_model: LinearClassifier) -> Result<Self, String> {
        self.linear_model = Some(linear_model);
        self.validate()?;
        Ok(self)
    }

    pub fn with_benchmark(mut self, benchmark: Vec<f64>) -> Result<Self, String> {
        self.benchmark = Some(benchmark);
        self.validate()?;
        Ok(self)
    }

    /// Checks every cross-field invariant of the bundle
    pub fn validate(&self) -> Result<(), String> {
        let width = self.features.len();
        if width == 0 {
            return Err("Bundle has no features".into());
        }
        if let Some(pos) = self.features.iter().position(|f| f.trim().is_empty()) {
            return Err(format!("Feature name {} is empty", pos));
        }
        let mut seen = HashSet::new();
        if let Some(dup) = self.features.iter().find(|f| !seen.insert(f.as_str())) {
            return Err(format!("Feature '{}' appears more than once", dup));
        }
        if self.imputer.width() != width {
            return Err(format!(
                "Imputer expects {} features but the bundle names {}",
                self.imputer.width(), width
            ));
        }
        self.imputer.validate()?;
        if self.scaler.width() != width {
            return Err(format!(
                "Scaler expects {} features but the bundle names {}",
                self.scaler.width(), width
            ));
        }
        self.scaler.validate()?;
        if self.model.n_features() != width {
            return Err(format!(
                "Forest has {} feature importances but the bundle names {} features",
                self.model.n_features(), width
            ));
        }
        if let Some(linear) = &self.linear_model {
            linear.validate(width)?;
        }
        if let Some(benchmark) = &self.benchmark {
            if benchmark.len() != width {
                return Err(format!(
                    "Benchmark has {} values but the bundle names {} features",
                    benchmark.len(), width
                ));
            }
        }
        Ok(())
    }

    pub fn features(&self) -> &[String] {
        &self.features
    }

    pub fn n_features(&self) -> usize {
        self.features.len()
    }

    pub fn model(&self) -> &RandomForest {
        &self.model
    }

    pub fn linear_model(&self) -> Option<&LinearClassifier> {
        self.linear_model.as_ref()
    }

    pub fn imputer(&self) -> &SimpleImputer {
        &self.imputer
    }

    pub fn scaler(&self) -> &StandardScaler {
        &self.scaler
    }

    pub fn benchmark(&self) -> Option<&[f64]> {
        self.benchmark.as_deref()
    }

    /// The influence-sign source for this bundle
    pub fn direction(&self) -> &dyn DirectionProvider {
        match &self.linear_model {
            Some(linear) => linear as &dyn DirectionProvider,
            None => &NoDirection,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::preprocess::ImputeStrategy;
    use crate::pipeline::test_support::{sample_bundle, FEATURES};

    #[test]
    fn test_sample_bundle_is_valid() {
        let bundle = sample_bundle();
        assert_eq!(bundle.n_features(), 11);
        assert_eq!(bundle.features()[0], FEATURES[0]);
        assert!(bundle.direction().is_available());
        assert!(bundle.benchmark().is_some());
    }

    #[test]
    fn test_benchmark_width_mismatch() {
        let bundle = sample_bundle();
        assert!(bundle.with_benchmark(vec![1.0; 10]).is_err());
    }

    #[test]
    fn test_duplicate_feature_names() {
        let bundle = sample_bundle();
        let mut features = bundle.features().to_vec();
        features[1] = features[0].clone();
        let result = ArtifactBundle::new(
            features,
            bundle.model().clone(),
            bundle.imputer().clone(),
            bundle.scaler().clone(),
        );
        assert!(result.unwrap_err().contains("more than once"));
    }

    #[test]
    fn test_imputer_width_mismatch() {
        let bundle = sample_bundle();
        let result = ArtifactBundle::new(
            bundle.features().to_vec(),
            bundle.model().clone(),
            SimpleImputer::new(ImputeStrategy::Median, vec![0.0; 3]),
            bundle.scaler().clone(),
        );
        assert!(result.is_err());
    }

    #[test]
    fn test_absent_linear_model_has_no_direction() {
        let bundle = sample_bundle();
        let bare = ArtifactBundle::new(
            bundle.features().to_vec(),
            bundle.model().clone(),
            bundle.imputer().clone(),
            bundle.scaler().clone(),
        ).unwrap();
        assert!(!bare.direction().is_available());
        assert_eq!(bare.direction().influence(0), None);
    }

    #[test]
    fn test_deserialize_rejects_out_of_range_split() {
        let mut raw = serde_json::to_value(sample_bundle()).unwrap();
        raw["model"]["trees"][0]["nodes"][0]["feature"] = serde_json::json!(99);
        let err = serde_json::from_str::<ArtifactBundle>(&raw.to_string()).unwrap_err();
        assert!(err.to_string().contains("splits on feature 99"));

        let mut raw = serde_json::to_value(sample_bundle()).unwrap();
        raw["model"]["trees"] = serde_json::json!([]);
        let err = serde_json::from_str::<ArtifactBundle>(&raw.to_string()).unwrap_err();
        assert!(err.to_string().contains("Forest has no trees"));
    }

    #[test]
    fn test_deserialize_rejects_width_mismatch() {
        let mut raw = serde_json::to_value(sample_bundle()).unwrap();
        raw["model"]["feature_importances"] = serde_json::json!([1.0]);
        assert!(serde_json::from_value::<ArtifactBundle>(raw).is_err());

        let mut raw = serde_json::to_value(sample_bundle()).unwrap();
        raw["scaler"]["scale"][0] = serde_json::json!(0.0);
        assert!(serde_json::from_value::<ArtifactBundle>(raw).is_err());
    }

    #[test]
    fn test_json_round_trip_keeps_optional_parts() {
        let bundle = sample_bundle();
        let encoded = serde_json::to_string(&bundle).unwrap();
        let decoded: ArtifactBundle = serde_json::from_str(&encoded).unwrap();
        assert_eq!(decoded, bundle);
    }
}
