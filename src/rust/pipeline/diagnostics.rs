use serde::{Deserialize, Serialize};
use log::{debug, warn};

use super::bundle::ArtifactBundle;
use super::direction::Influence;
use super::preprocess::InputRecord;

/// Default number of drivers reported per assessment
pub const DEFAULT_MAX_DRIVERS: usize = 7;

/// One feature's contribution to the forest's decisions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DriverRow {
    pub feature: String,
    /// Forest importance of the feature, as stored in the bundle
    pub importance: f64,
    /// `None` when the bundle has no linear model
    pub influence: Option<Influence>,
    /// Raw, unscaled input value; only set when the bundle has a benchmark
    pub input: Option<f64>,
    pub benchmark: Option<f64>,
}

/// Side-by-side view of an input and the benchmark for one feature.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BenchmarkComparison {
    pub feature: String,
    pub input: f64,
    pub benchmark: f64,
    /// `input - benchmark`
    pub difference: f64,
}

/// Ranks features by importance, most influential first.
///
/// Ties keep bundle feature order. The ranking depends only on the bundle;
/// the record only contributes the raw values shown next to the benchmark.
pub fn rank_drivers(bundle: &ArtifactBundle, record: &InputRecord, max_drivers: usize) -> Vec<DriverRow> {
    let importances = bundle.model().feature_importances();
    let direction = bundle.direction();
    if !direction.is_available() {
        warn!("Bundle has no linear model; driver directions are unavailable");
    }

    let mut order: Vec<usize> = (0..bundle.n_features()).collect();
    // sort_by is stable, so equal importances stay in feature order
    order.sort_by(|&a, &b| importances[b].total_cmp(&importances[a]));
    order.truncate(max_drivers);

    let rows: Vec<DriverRow> = order.into_iter()
        .map(|idx| {
            let feature = &bundle.features()[idx];
            let benchmark = bundle.benchmark().map(|values| values[idx]);
            DriverRow {
                feature: feature.clone(),
                importance: importances[idx],
                influence: direction.influence(idx),
                input: benchmark.and_then(|_| record.get(feature)),
                benchmark,
            }
        })
        .collect();
    debug!("Ranked {} driver(s)", rows.len());
    rows
}

/// Compares every input value with the benchmark, in feature order.
///
/// Returns `None` when the bundle carries no benchmark. Features absent from
/// the record are reported as `NaN`.
pub fn compare_with_benchmark(bundle: &ArtifactBundle, record: &InputRecord) -> Option<Vec<BenchmarkComparison>> {
    let benchmark = bundle.benchmark()?;
    Some(
        bundle.features().iter()
            .zip(benchmark)
            .map(|(feature, &reference)| {
                let input = record.get(feature).unwrap_or(f64::NAN);
                BenchmarkComparison {
                    feature: feature.clone(),
                    input,
                    benchmark: reference,
                    difference: input - reference,
                }
            })
            .collect(),
    )
}
