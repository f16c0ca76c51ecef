use std::path::Path;
use std::sync::Arc;
use log::{error, info};

use super::bundle::ArtifactBundle;
use super::error::PipelineError;
use super::pipeline::Pipeline;
use crate::artifact_store::ArtifactStore;
use crate::config::PipelineConfig;

/// A builder for constructing a Pipeline with a fluent interface.
#[derive(Default, Debug)]
pub struct PipelineBuilder {
    artifact_path: Option<String>,
    bundle: Option<Arc<ArtifactBundle>>,
    config: PipelineConfig,
}

impl PipelineBuilder {
    /// Creates a new empty PipelineBuilder instance with default configuration
    ///
    /// # Example
    /// ```
    /// use wtp_predictor::PipelineBuilder;
    ///
    /// let builder = PipelineBuilder::new();
    /// ```
    pub fn new() -> Self {
        Self {
            artifact_path: None,
            bundle: None,
            config: PipelineConfig::default(),
        }
    }

    /// Sets the pipeline configuration
    ///
    /// # Example
    /// ```
    /// use wtp_predictor::{PipelineBuilder, PipelineConfig};
    ///
    /// let config = PipelineConfig { max_drivers: 5, ..PipelineConfig::default() };
    /// let builder = PipelineBuilder::new().with_config(config);
    /// ```
    pub fn with_config(mut self, config: PipelineConfig) -> Self {
        self.config = config;
        self
    }

    /// Uses an already-loaded bundle
    ///
    /// # Returns
    /// * `Result<Self, PipelineError>` - The builder instance if successful, or an error if:
    ///   - A bundle is already set
    ///   - The bundle violates one of its invariants
    pub fn with_bundle(mut self, bundle: impl Into<Arc<ArtifactBundle>>) -> Result<Self, PipelineError> {
        if self.bundle.is_some() {
            return Err(PipelineError::ValidationError("Artifact bundle already set".into()));
        }
        let bundle = bundle.into();
        bundle.validate().map_err(|e| {
            error!("Rejected artifact bundle: {}", e);
            PipelineError::ArtifactLoadError(e)
        })?;
        self.bundle = Some(bundle);
        Ok(self)
    }

    /// Loads the bundle from a JSON artifact file
    ///
    /// # Returns
    /// * `Result<Self, PipelineError>` - The builder instance if successful, or an error if:
    ///   - A bundle is already set
    ///   - The file does not exist or cannot be read
    ///   - The file is not a valid bundle
    ///
    /// # Example
    /// ```no_run
    /// use wtp_predictor::PipelineBuilder;
    ///
    /// let builder = PipelineBuilder::new()
    ///     .with_artifact_file("artifacts_rf.json");
    /// ```
    pub fn with_artifact_file(mut self, path: impl AsRef<Path>) -> Result<Self, PipelineError> {
        if self.bundle.is_some() {
            return Err(PipelineError::ValidationError("Artifact bundle already set".into()));
        }
        let path = path.as_ref();
        let bundle = ArtifactStore::new(path).load_bundle()?;
        info!("Artifact bundle loaded from {:?}", path);
        self.artifact_path = Some(path.to_string_lossy().to_string());
        self.bundle = Some(Arc::new(bundle));
        Ok(self)
    }

    /// Builds and returns the final Pipeline instance
    ///
    /// # Returns
    /// * `Result<Pipeline, PipelineError>` - The constructed Pipeline if successful, or an error if:
    ///   - No bundle has been set
    ///   - The configuration is invalid
    pub fn build(self) -> Result<Pipeline, PipelineError> {
        let bundle = self.bundle
            .ok_or_else(|| PipelineError::ArtifactLoadError("No artifact bundle loaded".into()))?;
        self.config.validate()?;
        info!(
            "Pipeline ready: {} features, {} trees, direction {}",
            bundle.n_features(),
            bundle.model().n_trees(),
            if bundle.direction().is_available() { "available" } else { "unavailable" }
        );
        Ok(Pipeline::from_parts(self.artifact_path, bundle, self.config))
    }
}
