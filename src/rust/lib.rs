//! Inference and diagnostics pipeline that predicts whether a regional
//! government will receive an unqualified (*Wajar Tanpa Pengecualian*, WTP)
//! audit opinion from its financial indicators.
//!
//! A pre-trained [`ArtifactBundle`] (random forest, optional linear model,
//! imputer, scaler, feature names and benchmark) is loaded once and injected
//! into a [`Pipeline`]. Each call then runs preprocessing, inference,
//! driver ranking and rule-based recommendations.
//!
//! # Basic Usage
//!
//! ```no_run
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! use wtp_predictor::{ArtifactStore, InputRecord, Pipeline};
//!
//! let bundle = ArtifactStore::new_default().load_bundle()?;
//! let pipeline = Pipeline::builder()
//!     .with_bundle(bundle)?
//!     .build()?;
//!
//! let record: InputRecord = pipeline.bundle().features().iter()
//!     .map(|name| (name.as_str(), 0.5))
//!     .collect();
//! let assessment = pipeline.assess(&record)?;
//! println!("Predicted label: {}", assessment.prediction.label);
//! for message in assessment.recommendations.messages() {
//!     println!("- {}", message);
//! }
//! # Ok(())
//! # }
//! ```
//!
//! # Bulk Evaluation
//!
//! ```no_run
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! use wtp_predictor::{Pipeline, PipelineConfig, TableFormat};
//!
//! let config = PipelineConfig {
//!     table: TableFormat { delimiter: ';', decimal_separator: ',', ..TableFormat::default() },
//!     ..PipelineConfig::default()
//! };
//! let pipeline = Pipeline::builder()
//!     .with_config(config)
//!     .with_artifact_file("artifacts_rf.json")?
//!     .build()?;
//!
//! let report = pipeline.evaluate_text(&std::fs::read_to_string("data_uji.csv")?)?;
//! println!("Accuracy: {:.2}%", report.accuracy * 100.0);
//! # Ok(())
//! # }
//! ```

pub mod pipeline;
pub mod config;
pub mod artifact_store;

pub use pipeline::{
    ArtifactBundle, Assessment, BenchmarkComparison, BulkReport, BulkTable, DecisionTree,
    DirectionProvider, DriverRow, FormInput, ImputeStrategy, Indicator, Influence, InputRecord,
    LinearClassifier, NoDirection, Pipeline, PipelineBuilder, PipelineError, PipelineInfo,
    PredictionResult, RandomForest, Recommendation, Recommendations, ScoredRow, SimpleImputer,
    StandardScaler, TableFormat, TreeNode,
};
pub use config::PipelineConfig;
pub use artifact_store::{ArtifactError, ArtifactStore};

pub fn init_logger() {
    env_logger::init();
}
