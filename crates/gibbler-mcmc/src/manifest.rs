use std::fs;
use std::path::{Path, PathBuf};

use gibbler_core::{ErrorInfo, FeatureVector, GibblerError};
use serde::{Deserialize, Serialize};

use crate::config::SamplerConfig;

/// Structured manifest describing a completed run.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RunManifest {
    /// Configuration used for the run.
    pub config: SamplerConfig,
    /// Master seed used to derive operator streams.
    pub master_seed: u64,
    /// Chain index under the master seed.
    pub chain: u64,
    /// Optional seed label captured from the configuration.
    pub seed_label: Option<String>,
    /// Names of the extra feature functions attached to the sample.
    pub feature_functions: Vec<String>,
    /// Canonical hash of the final derivation.
    pub final_hash: String,
    /// Final translation.
    pub final_translation: String,
    /// Final feature values.
    pub final_features: FeatureVector,
    /// Metrics file produced during the run (relative to run directory).
    pub metrics_file: Option<PathBuf>,
}

impl RunManifest {
    /// Writes the manifest to a JSON file.
    pub fn write(&self, path: &Path) -> Result<(), GibblerError> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .map_err(|err| GibblerError::io("manifest-mkdir", &err, parent))?;
        }
        let json = serde_json::to_string_pretty(self).map_err(|err| {
            GibblerError::Serde(
                ErrorInfo::new("manifest-serialize", err.to_string())
                    .with_context("path", path.display()),
            )
        })?;
        fs::write(path, json).map_err(|err| GibblerError::io("manifest-write", &err, path))
    }

    /// Loads a manifest from disk.
    pub fn load(path: &Path) -> Result<Self, GibblerError> {
        let contents =
            fs::read_to_string(path).map_err(|err| GibblerError::io("manifest-read", &err, path))?;
        serde_json::from_str(&contents).map_err(|err| {
            GibblerError::Serde(
                ErrorInfo::new("manifest-parse", err.to_string())
                    .with_context("path", path.display()),
            )
        })
    }
}
