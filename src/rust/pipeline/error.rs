use crate::artifact_store::ArtifactError;

/// Represents the different types of errors that can occur while scoring indicators.
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    /// The artifact bundle could not be loaded, decoded or validated
    #[error("Artifact load error: {0}")]
    ArtifactLoadError(String),
    /// An input record does not carry a feature the bundle requires
    #[error("Missing feature: {0}")]
    MissingFeatureError(String),
    /// A bulk table header lacks one or more required columns
    #[error("Schema mismatch: missing column(s) {}", .0.join(", "))]
    SchemaMismatchError(Vec<String>),
    /// A bulk table cell could not be read as a number or label
    #[error("Malformed data at row {row}, column '{column}': '{value}'")]
    MalformedDataError {
        row: usize,
        column: String,
        value: String,
    },
    /// A batch contained no rows to score
    #[error("Empty input: {0}")]
    EmptyInputError(String),
    /// A scoring worker thread failed
    #[error("Worker error: {0}")]
    WorkerError(String),
    /// Error occurred due to invalid input parameters
    #[error("Validation error: {0}")]
    ValidationError(String),
}

impl From<ArtifactError> for PipelineError {
    fn from(err: ArtifactError) -> Self {
        PipelineError::ArtifactLoadError(err.to_string())
    }
}
