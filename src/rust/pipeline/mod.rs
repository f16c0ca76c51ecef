use serde::{Deserialize, Serialize};

mod error;
mod utils;
mod bundle;
mod forest;
mod direction;
mod preprocess;
mod inference;
mod diagnostics;
mod recommendation;
mod bulk;
mod form;
mod pipeline;
pub mod builder;

pub use error::PipelineError;
pub use bundle::ArtifactBundle;
pub(crate) use bundle::RawBundle;
pub use forest::{DecisionTree, RandomForest, TreeNode};
pub use direction::{DirectionProvider, Influence, LinearClassifier, NoDirection};
pub use preprocess::{prepare, ImputeStrategy, InputRecord, PreparedVector, SimpleImputer, StandardScaler};
pub use inference::{infer, PredictionResult};
pub use diagnostics::{compare_with_benchmark, rank_drivers, BenchmarkComparison, DriverRow, DEFAULT_MAX_DRIVERS};
pub use recommendation::{recommend, Indicator, Recommendation, Recommendations, AFFIRMATION_MESSAGE};
pub use bulk::{evaluate, BulkReport, BulkTable, ScoredRow, TableFormat, CORRECT_COLUMN, PREDICTION_COLUMN, PROBABILITY_COLUMN};
pub use form::FormInput;
pub use pipeline::Pipeline;
pub use builder::PipelineBuilder;

/// Information about the loaded artifacts and pipeline configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineInfo {
    /// Where the bundle was loaded from, if it came from a file
    pub artifact_path: Option<String>,
    /// Feature names in bundle order
    pub features: Vec<String>,
    /// Number of trees in the forest
    pub n_trees: usize,
    /// Operating threshold pinned by the artifact, if any
    pub decision_threshold: Option<f64>,
    /// Whether driver directions can be reported
    pub has_direction: bool,
    /// Whether a benchmark vector is available
    pub has_benchmark: bool,
    /// Number of drivers reported per assessment
    pub max_drivers: usize,
}

/// Everything produced for one set of indicator values
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Assessment {
    pub input: InputRecord,
    pub prediction: PredictionResult,
    pub drivers: Vec<DriverRow>,
    /// `None` when the bundle has no benchmark
    pub benchmark: Option<Vec<BenchmarkComparison>>,
    pub recommendations: Recommendations,
}
