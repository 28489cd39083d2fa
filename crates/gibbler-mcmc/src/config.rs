use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use gibbler_core::{ErrorInfo, FeatureVector, GibblerError};
use serde::{Deserialize, Serialize};

/// YAML-configurable parameters of one sampling run.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SamplerConfig {
    /// Number of rounds; every operator runs once per round.
    #[serde(default = "default_iterations")]
    pub iterations: usize,
    /// Rounds discarded before collectors start seeing the sample. Required.
    pub burn_in: usize,
    /// Temperature dividing every log-linear score in operator draws.
    #[serde(default = "default_temperature")]
    pub temperature: f64,
    /// Feature name to model weight. Missing features weigh zero.
    #[serde(default)]
    pub weights: BTreeMap<String, f64>,
    /// Operators in proposal order.
    #[serde(default = "default_operators")]
    pub operators: Vec<OperatorSpec>,
    /// Master seed and chain index.
    #[serde(default)]
    pub seed_policy: SeedPolicy,
    /// Output directory configuration.
    #[serde(default)]
    pub output: OutputConfig,
}

fn default_iterations() -> usize {
    10
}

fn default_temperature() -> f64 {
    1.0
}

fn default_operators() -> Vec<OperatorSpec> {
    vec![
        OperatorSpec::TranslationSwap,
        OperatorSpec::MergeSplit,
        OperatorSpec::Flip,
    ]
}

impl SamplerConfig {
    /// Configuration with the given burn-in and defaults everywhere else.
    pub fn with_burn_in(burn_in: usize) -> Self {
        Self {
            iterations: default_iterations(),
            burn_in,
            temperature: default_temperature(),
            weights: BTreeMap::new(),
            operators: default_operators(),
            seed_policy: SeedPolicy::default(),
            output: OutputConfig::default(),
        }
    }

    /// Parses and validates a YAML document.
    pub fn from_yaml_str(yaml: &str) -> Result<Self, GibblerError> {
        let config: Self = serde_yaml::from_str(yaml).map_err(|err| {
            GibblerError::Config(ErrorInfo::new("config-parse", err.to_string()))
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Reads, parses and validates a YAML file.
    pub fn load(path: &Path) -> Result<Self, GibblerError> {
        let contents =
            fs::read_to_string(path).map_err(|err| GibblerError::io("config-read", &err, path))?;
        Self::from_yaml_str(&contents).map_err(|err| match err {
            GibblerError::Config(info) => {
                GibblerError::Config(info.with_context("path", path.display()))
            }
            other => other,
        })
    }

    /// Checks cross-field constraints serde cannot express.
    pub fn validate(&self) -> Result<(), GibblerError> {
        if self.burn_in > self.iterations {
            return Err(GibblerError::Config(
                ErrorInfo::new("burn-in-exceeds-iterations", "burn-in is longer than the run")
                    .with_context("burn_in", self.burn_in)
                    .with_context("iterations", self.iterations),
            ));
        }
        if !self.temperature.is_finite() || self.temperature <= 0.0 {
            return Err(GibblerError::Config(
                ErrorInfo::new("invalid-temperature", "temperature must be finite and positive")
                    .with_context("temperature", self.temperature),
            ));
        }
        if let Some((name, value)) = self.weights.iter().find(|(_, value)| !value.is_finite()) {
            return Err(GibblerError::Config(
                ErrorInfo::new("invalid-weight", "feature weights must be finite")
                    .with_context("feature", name)
                    .with_context("weight", value),
            ));
        }
        Ok(())
    }

    /// Weights as a feature vector for inner products.
    pub fn weight_vector(&self) -> FeatureVector {
        self.weights
            .iter()
            .map(|(name, value)| (name.as_str(), *value))
            .collect()
    }
}

/// Operator kinds constructible from configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum OperatorSpec {
    /// Re-translate the span of one node.
    TranslationSwap,
    /// Merge or split at a source boundary.
    MergeSplit,
    /// Swap two nodes in target order.
    Flip,
}

/// Deterministic seeding configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SeedPolicy {
    /// Master seed used for the run.
    #[serde(default = "default_master_seed")]
    pub master_seed: u64,
    /// Chain index; independent chains sharing a master seed use distinct values.
    #[serde(default)]
    pub chain: u64,
    /// Optional label recorded in manifests.
    #[serde(default)]
    pub label: Option<String>,
}

fn default_master_seed() -> u64 {
    0x61BB_5EED_0000_0001_u64
}

impl Default for SeedPolicy {
    fn default() -> Self {
        Self {
            master_seed: default_master_seed(),
            chain: 0,
            label: None,
        }
    }
}

/// Output directory layout configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct OutputConfig {
    /// Root directory for run artefacts. Created if it does not exist.
    #[serde(default)]
    pub run_directory: Option<PathBuf>,
    /// Metrics filename relative to `run_directory`.
    #[serde(default = "default_metrics_filename")]
    pub metrics_file: PathBuf,
    /// Manifest filename relative to `run_directory`.
    #[serde(default = "default_manifest_filename")]
    pub manifest_file: PathBuf,
}

fn default_metrics_filename() -> PathBuf {
    PathBuf::from("metrics.csv")
}

fn default_manifest_filename() -> PathBuf {
    PathBuf::from("manifest.json")
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            run_directory: None,
            metrics_file: default_metrics_filename(),
            manifest_file: default_manifest_filename(),
        }
    }
}
