use std::path::{Path, PathBuf};
use std::fs;
use std::io;
use std::env;
use sha2::{Sha256, Digest};

use crate::pipeline::{ArtifactBundle, RawBundle};

/// File name the training notebook exports the bundle under
pub const DEFAULT_ARTIFACT_FILE: &str = "artifacts_rf.json";

/// Environment variable that overrides the bundle location
pub const ARTIFACT_ENV_VAR: &str = "WTP_ARTIFACTS";

#[derive(Debug, thiserror::Error)]
pub enum ArtifactError {
    #[error("Artifact not found: {0}")]
    NotFound(String),
    #[error("IO error: {0}")]
    IoError(#[from] io::Error),
    #[error("Decode error: {0}")]
    DecodeError(#[from] serde_json::Error),
    #[error("Invalid bundle: {0}")]
    InvalidBundle(String),
    #[error("Hash mismatch: expected {expected}, got {actual}")]
    HashMismatch {
        expected: String,
        actual: String,
    },
}

/// Locates, verifies and decodes the artifact bundle file.
#[derive(Debug, Clone)]
pub struct ArtifactStore {
    path: PathBuf,
}

impl ArtifactStore {
    /// Creates a store for the default bundle location
    pub fn new_default() -> Self {
        Self::new(Self::get_default_artifact_path())
    }

    /// Returns the default bundle path
    pub fn get_default_artifact_path() -> PathBuf {
        // 1. Check environment variable
        if let Ok(path) = env::var(ARTIFACT_ENV_VAR) {
            return PathBuf::from(path);
        }

        // 2. Bundle next to the working directory, where the notebook drops it
        let local = PathBuf::from(DEFAULT_ARTIFACT_FILE);
        if local.exists() {
            return local;
        }

        // 3. Use platform-specific data directory
        if let Some(data_dir) = dirs::data_dir() {
            return data_dir.join("wtp-predictor").join(DEFAULT_ARTIFACT_FILE);
        }

        // 4. If all else fails, use system temp directory (platform agnostic)
        env::temp_dir().join("wtp-predictor").join(DEFAULT_ARTIFACT_FILE)
    }

    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn exists(&self) -> bool {
        self.path.exists()
    }

    fn ensure_exists(&self) -> Result<(), ArtifactError> {
        if !self.exists() {
            log::error!("Artifact bundle not found at {:?}", self.path);
            return Err(ArtifactError::NotFound(self.path.to_string_lossy().to_string()));
        }
        Ok(())
    }

    /// Decodes and validates bundle bytes
    pub fn decode(bytes: &[u8]) -> Result<ArtifactBundle, ArtifactError> {
        let raw: RawBundle = serde_json::from_slice(bytes)?;
        let bundle = ArtifactBundle::try_from(raw).map_err(ArtifactError::InvalidBundle)?;
        log::info!(
            "Decoded artifact bundle: {} features, {} trees",
            bundle.n_features(),
            bundle.model().n_trees()
        );
        Ok(bundle)
    }

    fn hash_bytes(bytes: &[u8]) -> String {
        let mut hasher = Sha256::new();
        hasher.update(bytes);
        format!("{:x}", hasher.finalize())
    }

    fn check_hash(bytes: &[u8], expected_hash: &str) -> Result<(), ArtifactError> {
        let actual = Self::hash_bytes(bytes);
        log::info!("Calculated hash: {}", actual);
        log::info!("Expected hash:   {}", expected_hash);
        if !actual.eq_ignore_ascii_case(expected_hash) {
            log::error!("Artifact hash mismatch: expected {}, got {}", expected_hash, actual);
            return Err(ArtifactError::HashMismatch {
                expected: expected_hash.to_string(),
                actual,
            });
        }
        Ok(())
    }

    /// SHA-256 hex digest of the bundle file
    pub fn digest(&self) -> Result<String, ArtifactError> {
        self.ensure_exists()?;
        let bytes = fs::read(&self.path)?;
        Ok(Self::hash_bytes(&bytes))
    }

    /// Checks the bundle file against an expected SHA-256 hex digest
    pub fn verify(&self, expected_hash: &str) -> Result<bool, ArtifactError> {
        log::info!("Verifying artifact bundle: {:?}", self.path);
        Ok(self.digest()?.eq_ignore_ascii_case(expected_hash))
    }

    /// Reads, decodes and validates the bundle
    pub fn load_bundle(&self) -> Result<ArtifactBundle, ArtifactError> {
        self.ensure_exists()?;
        log::info!("Loading artifact bundle from {:?}", self.path);
        let bytes = fs::read(&self.path)?;
        Self::decode(&bytes)
    }

    /// Like [`load_bundle`](Self::load_bundle), but refuses a file whose digest differs
    pub fn load_verified(&self, expected_hash: &str) -> Result<ArtifactBundle, ArtifactError> {
        self.ensure_exists()?;
        let bytes = fs::read(&self.path)?;
        Self::check_hash(&bytes, expected_hash)?;
        Self::decode(&bytes)
    }

    /// Reads the bundle without blocking the async runtime, optionally checking its digest
    pub async fn load_bundle_async(&self, expected_hash: Option<&str>) -> Result<ArtifactBundle, ArtifactError> {
        self.ensure_exists()?;
        log::info!("Loading artifact bundle from {:?}", self.path);
        let bytes = tokio::fs::read(&self.path).await?;
        log::info!("Read {} bytes", bytes.len());
        if let Some(expected) = expected_hash {
            Self::check_hash(&bytes, expected)?;
        }
        Self::decode(&bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::test_support::sample_bundle;

    fn write_sample(name: &str) -> PathBuf {
        let dir = env::temp_dir().join("wtp-predictor-tests");
        fs::create_dir_all(&dir).unwrap();
        let path = dir.join(name);
        fs::write(&path, serde_json::to_vec(&sample_bundle()).unwrap()).unwrap();
        path
    }

    #[test]
    fn test_load_round_trip() {
        let store = ArtifactStore::new(write_sample("store_round_trip.json"));
        assert_eq!(store.load_bundle().unwrap(), sample_bundle());
    }

    #[test]
    fn test_missing_file() {
        let store = ArtifactStore::new("/nonexistent/wtp/artifacts_rf.json");
        assert!(!store.exists());
        assert!(matches!(store.load_bundle(), Err(ArtifactError::NotFound(_))));
    }

    #[test]
    fn test_digest_verification() -> Result<(), ArtifactError> {
        let store = ArtifactStore::new(write_sample("store_digest.json"));
        let digest = store.digest()?;
        assert_eq!(digest.len(), 64);
        assert!(store.verify(&digest)?);
        assert!(!store.verify(&"0".repeat(64))?);
        assert!(store.load_verified(&digest).is_ok());
        assert!(matches!(
            store.load_verified(&"0".repeat(64)),
            Err(ArtifactError::HashMismatch { .. })
        ));
        Ok(())
    }

    #[test]
    fn test_invalid_bundle_rejected() {
        let bundle = sample_bundle();
        let mut value = serde_json::to_value(&bundle).unwrap();
        value["benchmark"] = serde_json::json!([1.0, 2.0]);
        let err = ArtifactStore::decode(&serde_json::to_vec(&value).unwrap()).unwrap_err();
        assert!(matches!(err, ArtifactError::InvalidBundle(_)));

        let mut raw = serde_json::to_value(&bundle).unwrap();
        raw["model"]["trees"][0]["nodes"][0]["feature"] = serde_json::json!(99);
        let err = ArtifactStore::decode(&serde_json::to_vec(&raw).unwrap()).unwrap_err();
        assert!(matches!(err, ArtifactError::InvalidBundle(_)));

        let err = ArtifactStore::decode(b"{ not json").unwrap_err();
        assert!(matches!(err, ArtifactError::DecodeError(_)));
    }

    #[tokio::test]
    async fn test_async_load() -> Result<(), ArtifactError> {
        let store = ArtifactStore::new(write_sample("store_async.json"));
        let digest = store.digest()?;
        let bundle = store.load_bundle_async(Some(&digest)).await?;
        assert_eq!(bundle.n_features(), 11);
        Ok(())
    }

    #[test]
    fn test_default_artifact_path() {
        // Test with environment variable
        env::set_var(ARTIFACT_ENV_VAR, "/tmp/test-wtp/bundle.json");
        let path = ArtifactStore::get_default_artifact_path();
        assert_eq!(path, PathBuf::from("/tmp/test-wtp/bundle.json"));
        env::remove_var(ARTIFACT_ENV_VAR);

        // Test without environment variable
        let path = ArtifactStore::get_default_artifact_path();
        assert!(path.to_str().unwrap().ends_with(DEFAULT_ARTIFACT_FILE));
    }
}
