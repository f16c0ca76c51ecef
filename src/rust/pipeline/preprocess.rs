use std::collections::BTreeMap;
use ndarray::Array1;
use serde::{Deserialize, Serialize};
use log::debug;

use super::bundle::ArtifactBundle;
use super::error::PipelineError;

/// A numeric feature vector in bundle order, imputed and scaled, ready for inference.
pub type PreparedVector = Array1<f64>;

/// Indicator values supplied for one regional government.
///
/// Keys are feature names as they appear in the artifact bundle. Keys the
/// bundle does not know about are ignored. A `NaN` value marks the
/// indicator as missing so the imputer fills it; in JSON this is written as
/// `null`.
///
/// # Example
/// ```
/// use wtp_predictor::InputRecord;
///
/// let record = InputRecord::new()
///     .with_value("Rasio Kemandirian Keuangan", 0.42)
///     .with_value("Rasio Efektifitas PAD", f64::NAN);
/// assert_eq!(record.get("Rasio Kemandirian Keuangan"), Some(0.42));
/// assert!(record.get("Rasio Efektifitas PAD").unwrap().is_nan());
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(from = "BTreeMap<String, Option<f64>>", into = "BTreeMap<String, Option<f64>>")]
pub struct InputRecord {
    values: BTreeMap<String, f64>,
}

impl InputRecord {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a value, replacing any previous value for the same feature
    pub fn with_value(mut self, name: impl Into<String>, value: f64) -> Self {
        self.values.insert(name.into(), value);
        self
    }

    pub fn insert(&mut self, name: impl Into<String>, value: f64) -> Option<f64> {
        self.values.insert(name.into(), value)
    }

    pub fn get(&self, name: &str) -> Option<f64> {
        self.values.get(name).copied()
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, f64)> {
        self.values.iter().map(|(name, value)| (name.as_str(), *value))
    }
}

impl<K: Into<String>> FromIterator<(K, f64)> for InputRecord {
    fn from_iter<I: IntoIterator<Item = (K, f64)>>(iter: I) -> Self {
        Self {
            values: iter.into_iter().map(|(k, v)| (k.into(), v)).collect(),
        }
    }
}

impl From<BTreeMap<String, Option<f64>>> for InputRecord {
    fn from(raw: BTreeMap<String, Option<f64>>) -> Self {
        raw.into_iter()
            .map(|(name, value)| (name, value.unwrap_or(f64::NAN)))
            .collect()
    }
}

impl From<InputRecord> for BTreeMap<String, Option<f64>> {
    fn from(record: InputRecord) -> Self {
        record.values
            .into_iter()
            .map(|(name, value)| (name, if value.is_nan() { None } else { Some(value) }))
            .collect()
    }
}

/// How the imputer's per-feature statistics were learned.
///
/// The strategy is informational; inference only ever uses the stored statistics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ImputeStrategy {
    Mean,
    Median,
    MostFrequent,
    Constant,
}

/// Replaces missing values with a pre-learned per-feature statistic.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimpleImputer {
    strategy: ImputeStrategy,
    statistics: Vec<f64>,
}

impl SimpleImputer {
    pub fn new(strategy: ImputeStrategy, statistics: Vec<f64>) -> Self {
        Self { strategy, statistics }
    }

    pub fn strategy(&self) -> ImputeStrategy {
        self.strategy
    }

    pub fn statistics(&self) -> &[f64] {
        &self.statistics
    }

    pub fn width(&self) -> usize {
        self.statistics.len()
    }

    pub(crate) fn validate(&self) -> Result<(), String> {
        if let Some(pos) = self.statistics.iter().position(|s| !s.is_finite()) {
            return Err(format!("Imputer statistic {} is not finite", pos));
        }
        Ok(())
    }

    /// Fills every `NaN` in `values` from the stored statistics
    pub fn transform(&self, values: &mut Array1<f64>) {
        for (value, fill) in values.iter_mut().zip(&self.statistics) {
            if value.is_nan() {
                *value = *fill;
            }
        }
    }
}

/// Applies the stored z-score transform `(x - mean) / scale` per feature.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StandardScaler {
    mean: Vec<f64>,
    scale: Vec<f64>,
}

impl StandardScaler {
    pub fn new(mean: Vec<f64>, scale: Vec<f64>) -> Self {
        Self { mean, scale }
    }

    pub fn mean(&self) -> &[f64] {
        &self.mean
    }

    pub fn scale(&self) -> &[f64] {
        &self.scale
    }

    pub fn width(&self) -> usize {
        self.mean.len()
    }

    pub(crate) fn validate(&self) -> Result<(), String> {
        if self.mean.len() != self.scale.len() {
            return Err(format!(
                "Scaler mean has {} entries but scale has {}",
                self.mean.len(), self.scale.len()
            ));
        }
        if let Some(pos) = self.mean.iter().position(|m| !m.is_finite()) {
            return Err(format!("Scaler mean {} is not finite", pos));
        }
        // zero-variance features are exported with scale 1.0
        if let Some(pos) = self.scale.iter().position(|s| !s.is_finite() || *s == 0.0) {
            return Err(format!("Scaler scale {} must be finite and non-zero", pos));
        }
        Ok(())
    }

    pub fn transform(&self, values: &mut Array1<f64>) {
        for ((value, mean), scale) in values.iter_mut().zip(&self.mean).zip(&self.scale) {
            *value = (*value - mean) / scale;
        }
    }
}

/// Reads the record's values in bundle feature order.
///
/// # Errors
/// - `MissingFeatureError` if a bundle feature is absent from the record
/// - `ValidationError` if a value is infinite
pub(crate) fn project(record: &InputRecord, features: &[String]) -> Result<Array1<f64>, PipelineError> {
    features.iter()
        .map(|name| {
            let value = record.get(name)
                .ok_or_else(|| PipelineError::MissingFeatureError(name.clone()))?;
            if value.is_infinite() {
                return Err(PipelineError::ValidationError(
                    format!("Value for '{}' must be finite", name)
                ));
            }
            Ok(value)
        })
        .collect::<Result<Vec<_>, _>>()
        .map(Array1::from)
}

/// Imputes and scales a vector already laid out in bundle feature order
pub(crate) fn prepare_projected(bundle: &ArtifactBundle, mut values: Array1<f64>) -> PreparedVector {
    bundle.imputer().transform(&mut values);
    bundle.scaler().transform(&mut values);
    values
}

/// Runs the full preprocessing stage: projection, imputation, then scaling.
pub fn prepare(bundle: &ArtifactBundle, record: &InputRecord) -> Result<PreparedVector, PipelineError> {
    let projected = project(record, bundle.features())?;
    let missing = projected.iter().filter(|v| v.is_nan()).count();
    if missing > 0 {
        debug!("Imputing {} missing indicator value(s)", missing);
    }
    Ok(prepare_projected(bundle, projected))
}
