use std::fs::File;
use std::io::Write;
use std::path::Path;

use gibbler_core::{FeatureVector, GibblerError};
use gibbler_graph::{canonical_hash, translation_hash, Sample};
use indexmap::IndexSet;
use serde::{Deserialize, Serialize};

use crate::collectors::SampleCollector;

/// Per-draw metrics stored for CSV export.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MetricSample {
    /// Index of the draw among collected samples.
    pub draw: usize,
    /// Model score `weights · feature_values`.
    pub model_score: f64,
    /// Number of target words.
    pub words: usize,
    /// Number of derivation nodes.
    pub hypotheses: usize,
    /// Canonical hash of the derivation.
    pub state_hash: String,
    /// Hash of the target string alone.
    pub translation_hash: String,
}

/// Aggregate coverage metrics summarising the exploration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CoverageMetrics {
    /// Distinct derivations encountered.
    pub unique_state_hashes: usize,
    /// Distinct target strings encountered.
    pub unique_translations: usize,
    /// Mean model score over the recorded samples.
    pub mean_score: f64,
    /// Variance of the recorded model scores.
    pub score_variance: f64,
}

impl CoverageMetrics {
    /// Returns an empty coverage descriptor.
    pub fn empty() -> Self {
        Self {
            unique_state_hashes: 0,
            unique_translations: 0,
            mean_score: 0.0,
            score_variance: 0.0,
        }
    }
}

/// Collector recording a [`MetricSample`] per draw.
#[derive(Debug, Default)]
pub struct MetricsRecorder {
    weights: FeatureVector,
    samples: Vec<MetricSample>,
    unique_states: IndexSet<String>,
    unique_translations: IndexSet<String>,
}

impl MetricsRecorder {
    /// Creates a recorder scoring samples with `weights`.
    pub fn new(weights: FeatureVector) -> Self {
        Self {
            weights,
            ..Self::default()
        }
    }

    /// Returns an immutable view over the recorded samples.
    pub fn samples(&self) -> &[MetricSample] {
        &self.samples
    }

    /// Computes coverage metrics from the recorded data.
    pub fn coverage(&self) -> CoverageMetrics {
        if self.samples.is_empty() {
            return CoverageMetrics::empty();
        }
        // Welford's one-pass update.
        let mut mean_score = 0.0;
        let mut squares = 0.0;
        for (seen, sample) in self.samples.iter().enumerate() {
            let deviation = sample.model_score - mean_score;
            mean_score += deviation / (seen + 1) as f64;
            squares += deviation * (sample.model_score - mean_score);
        }
        CoverageMetrics {
            unique_state_hashes: self.unique_states.len(),
            unique_translations: self.unique_translations.len(),
            mean_score,
            score_variance: squares / self.samples.len() as f64,
        }
    }

    /// Writes the recorded metrics to a CSV file.
    pub fn write_csv<P: AsRef<Path>>(&self, path: P) -> Result<(), GibblerError> {
        let path = path.as_ref();
        let to_error = |err: std::io::Error| GibblerError::io("metrics-write", &err, path);
        let mut file = File::create(path).map_err(to_error)?;
        writeln!(file, "draw,model_score,words,hypotheses,state_hash,translation_hash")
            .map_err(to_error)?;
        for sample in &self.samples {
            writeln!(
                file,
                "{},{:.6},{},{},{},{}",
                sample.draw,
                sample.model_score,
                sample.words,
                sample.hypotheses,
                sample.state_hash,
                sample.translation_hash
            )
            .map_err(to_error)?;
        }
        Ok(())
    }
}

impl SampleCollector for MetricsRecorder {
    fn collect(&mut self, sample: &Sample) -> Result<(), GibblerError> {
        let state_hash = canonical_hash(sample);
        let translation_hash = translation_hash(sample);
        self.unique_states.insert(state_hash.clone());
        self.unique_translations.insert(translation_hash.clone());
        self.samples.push(MetricSample {
            draw: self.samples.len(),
            model_score: sample.feature_values().inner_product(&self.weights),
            words: sample.target_words().len(),
            hypotheses: sample.num_hypotheses(),
            state_hash,
            translation_hash,
        });
        Ok(())
    }
}
