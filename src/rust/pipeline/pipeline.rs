use std::sync::Arc;
use log::{debug, info};

use super::bulk::{self, BulkReport, BulkTable};
use super::bundle::ArtifactBundle;
use super::diagnostics::{self, BenchmarkComparison, DriverRow};
use super::error::PipelineError;
use super::inference::{self, PredictionResult};
use super::preprocess::{self, InputRecord, PreparedVector};
use super::recommendation::{self, Recommendations};
use super::{Assessment, PipelineInfo};
use crate::config::PipelineConfig;

/// A thread-safe scoring pipeline over one immutable artifact bundle.
///
/// The bundle is injected at build time and shared through an `Arc`, so a
/// pipeline can be cloned cheaply or wrapped in an `Arc` and used from many
/// threads at once. No call mutates any state.
///
/// ```no_run
/// # fn main() -> Result<(), Box<dyn std::error::Error>> {
/// use wtp_predictor::{InputRecord, Pipeline};
///
/// let pipeline = Pipeline::builder()
///     .with_artifact_file("artifacts_rf.json")?
///     .build()?;
///
/// let record: InputRecord = pipeline.bundle().features().iter()
///     .map(|name| (name.as_str(), 0.0))
///     .collect();
/// let assessment = pipeline.assess(&record)?;
/// println!("WTP: {} ({:.2}%)", assessment.prediction.is_wtp(),
///     assessment.prediction.probability_positive * 100.0);
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct Pipeline {
    artifact_path: Option<String>,
    bundle: Arc<ArtifactBundle>,
    config: PipelineConfig,
}

// Compile-time verification of thread-safety
const _: () = {
    fn assert_send_sync<T: Send + Sync>() {}
    fn verify_thread_safety() {
        assert_send_sync::<Pipeline>();
    }
};

impl Pipeline {
    /// Creates a new PipelineBuilder for fluent construction
    pub fn builder() -> super::builder::PipelineBuilder {
        super::builder::PipelineBuilder::new()
    }

    pub(crate) fn from_parts(artifact_path: Option<String>, bundle: Arc<ArtifactBundle>, config: PipelineConfig) -> Self {
        Self { artifact_path, bundle, config }
    }

    /// Returns information about the loaded artifacts and configuration
    pub fn info(&self) -> PipelineInfo {
        PipelineInfo {
            artifact_path: self.artifact_path.clone(),
            features: self.bundle.features().to_vec(),
            n_trees: self.bundle.model().n_trees(),
            decision_threshold: self.bundle.model().decision_threshold(),
            has_direction: self.bundle.direction().is_available(),
            has_benchmark: self.bundle.benchmark().is_some(),
            max_drivers: self.config.max_drivers,
        }
    }

    pub fn bundle(&self) -> &ArtifactBundle {
        &self.bundle
    }

    /// A shared handle to the bundle, for callers that outlive the pipeline
    pub fn shared_bundle(&self) -> Arc<ArtifactBundle> {
        Arc::clone(&self.bundle)
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Projects, imputes and scales the record into a vector ready for inference
    pub fn prepare(&self, record: &InputRecord) -> Result<PreparedVector, PipelineError> {
        preprocess::prepare(&self.bundle, record)
    }

    /// Predicts the opinion for one set of indicator values.
    ///
    /// # Errors
    /// - `MissingFeatureError` if the record lacks a bundle feature
    /// - `ValidationError` if a value is infinite
    pub fn predict(&self, record: &InputRecord) -> Result<PredictionResult, PipelineError> {
        let prepared = self.prepare(record)?;
        let result = inference::infer(self.bundle.model(), &prepared)?;
        debug!("Predicted label {} (P(WTP) = {:.4})", result.label, result.probability_positive);
        Ok(result)
    }

    /// Ranks the most influential features, up to the configured driver count
    pub fn diagnose(&self, record: &InputRecord) -> Vec<DriverRow> {
        diagnostics::rank_drivers(&self.bundle, record, self.config.max_drivers)
    }

    pub fn benchmark_comparison(&self, record: &InputRecord) -> Option<Vec<BenchmarkComparison>> {
        diagnostics::compare_with_benchmark(&self.bundle, record)
    }

    pub fn recommend(&self, drivers: &[DriverRow]) -> Recommendations {
        recommendation::recommend(drivers)
    }

    /// Runs every stage for one record
    pub fn assess(&self, record: &InputRecord) -> Result<Assessment, PipelineError> {
        let prediction = self.predict(record)?;
        let drivers = self.diagnose(record);
        let recommendations = self.recommend(&drivers);
        Ok(Assessment {
            input: record.clone(),
            prediction,
            benchmark: self.benchmark_comparison(record),
            drivers,
            recommendations,
        })
    }

    /// Scores a parsed labeled table with the configured format and worker count
    pub fn evaluate_table(&self, table: &BulkTable) -> Result<BulkReport, PipelineError> {
        info!("Evaluating {} row(s)", table.len());
        bulk::evaluate(&self.bundle, table, &self.config.table, self.config.workers)
    }

    /// Parses delimited text with the configured format and scores it
    pub fn evaluate_text(&self, raw: &str) -> Result<BulkReport, PipelineError> {
        let table = BulkTable::parse(raw, &self.config.table)?;
        self.evaluate_table(&table)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;
    use crate::pipeline::test_support::{bare_bundle, labeled_table_text, sample_bundle, sample_record};
    use crate::pipeline::Indicator;

    fn pipeline() -> Pipeline {
        Pipeline::builder()
            .with_bundle(sample_bundle())
            .unwrap()
            .build()
            .unwrap()
    }

    #[test]
    fn test_info() {
        let info = pipeline().info();
        assert_eq!(info.features.len(), 11);
        assert_eq!(info.n_trees, 3);
        assert!(info.has_direction);
        assert!(info.has_benchmark);
        assert_eq!(info.max_drivers, 7);
        assert!(info.artifact_path.is_none());
    }

    #[test]
    fn test_assess_weak_profile() {
        let assessment = pipeline().assess(&sample_record(0.25, 0.5)).unwrap();
        assert!(!assessment.prediction.is_wtp());
        assert_eq!(assessment.drivers.len(), 7);
        assert_eq!(assessment.benchmark.as_ref().map(Vec::len), Some(11));
        match assessment.recommendations {
            Recommendations::Advisories(items) => {
                let indicators: Vec<Indicator> = items.iter().map(|r| r.indicator).collect();
                assert_eq!(indicators, vec![
                    Indicator::SolvabilitasAnggaran,
                    Indicator::SolvabilitasJangkaPanjang,
                    Indicator::Efektivitas,
                ]);
            }
            other => panic!("expected advisories, got {:?}", other),
        }
    }

    #[test]
    fn test_assess_without_direction() {
        let pipeline = Pipeline::builder().with_bundle(bare_bundle()).unwrap().build().unwrap();
        let assessment = pipeline.assess(&sample_record(0.75, 1.5)).unwrap();
        assert!(assessment.prediction.is_wtp());
        assert_eq!(assessment.recommendations, Recommendations::Unavailable);
        assert!(assessment.benchmark.is_none());
    }

    #[test]
    fn test_evaluate_text_uses_configured_format() {
        let mut config = PipelineConfig::default();
        config.table.delimiter = ';';
        config.table.decimal_separator = ',';
        let pipeline = Pipeline::builder()
            .with_config(config.clone())
            .with_bundle(sample_bundle())
            .unwrap()
            .build()
            .unwrap();
        let report = pipeline.evaluate_text(&labeled_table_text(&config.table)).unwrap();
        assert_eq!(report.correct, 7);
    }

    #[test]
    fn test_thread_safety() {
        let pipeline = Arc::new(pipeline());
        let expected = pipeline.predict(&sample_record(0.75, 1.5)).unwrap();
        let mut handles = vec![];

        for _ in 0..3 {
            let pipeline = Arc::clone(&pipeline);
            handles.push(thread::spawn(move || {
                pipeline.predict(&sample_record(0.75, 1.5)).unwrap()
            }));
        }

        for handle in handles {
            assert_eq!(handle.join().unwrap(), expected);
        }
    }
}
