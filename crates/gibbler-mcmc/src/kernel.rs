use std::collections::BTreeMap;
use std::fs;
use std::path::PathBuf;
use std::sync::Arc;

use gibbler_core::{Derivation, FeatureFunction, FeatureVector, GibblerError, OptionSource, RngHandle, Word};
use gibbler_graph::{canonical_hash, Sample};
use serde::{Deserialize, Serialize};

use crate::collectors::TranslationCounter;
use crate::config::{OperatorSpec, SamplerConfig};
use crate::determinism;
use crate::manifest::RunManifest;
use crate::metrics::{CoverageMetrics, MetricSample, MetricsRecorder};
use crate::moves::{GibbsOperator, OperatorStats, ScoreModel};
use crate::moves_flip::FlipOperator;
use crate::moves_merge_split::MergeSplitOperator;
use crate::moves_translation::TranslationSwapOperator;
use crate::sampler::Sampler;

/// Summary returned to callers after a run completes.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RunSummary {
    /// Fraction of proposals that moved the sample, per operator name.
    pub move_rates: BTreeMap<String, f64>,
    /// Raw counters per operator name.
    pub operator_stats: BTreeMap<String, OperatorStats>,
    /// Coverage metrics over the collected samples.
    pub coverage: CoverageMetrics,
    /// Most frequent collected translation with its count.
    pub most_frequent: Option<(String, usize)>,
    /// Number of distinct collected translations.
    pub distinct_translations: usize,
    /// Canonical hash of the final derivation.
    pub final_hash: String,
    /// Final translation.
    pub final_translation: String,
    /// Final feature values.
    pub final_features: FeatureVector,
    /// Metrics CSV written during the run.
    pub metrics_path: Option<PathBuf>,
    /// Manifest path, if emitted.
    pub manifest_path: Option<PathBuf>,
    /// Metrics samples collected.
    pub samples: Vec<MetricSample>,
}

/// Builds the operators named in `config`, each with its own seed.
pub fn build_operators(config: &SamplerConfig) -> Vec<Box<dyn GibbsOperator>> {
    let model = ScoreModel::new(config.weight_vector(), config.temperature);
    let policy = &config.seed_policy;
    config
        .operators
        .iter()
        .enumerate()
        .map(|(index, spec)| {
            let rng = RngHandle::from_seed(determinism::operator_seed(
                policy.master_seed,
                policy.chain,
                index,
            ));
            let operator: Box<dyn GibbsOperator> = match spec {
                OperatorSpec::TranslationSwap => {
                    Box::new(TranslationSwapOperator::new(model.clone(), rng))
                }
                OperatorSpec::MergeSplit => Box::new(MergeSplitOperator::new(model.clone(), rng)),
                OperatorSpec::Flip => Box::new(FlipOperator::new(model.clone(), rng)),
            };
            operator
        })
        .collect()
}

/// Runs one configured chain from `start`.
///
/// Metrics and translation counts are always collected. When
/// `config.output.run_directory` is set, the metrics CSV and a JSON manifest
/// are written there.
pub fn run(
    config: &SamplerConfig,
    start: &Derivation,
    options: &dyn OptionSource,
    features: Vec<Arc<dyn FeatureFunction>>,
) -> Result<RunSummary, GibblerError> {
    config.validate()?;
    let mut recorder = MetricsRecorder::new(config.weight_vector());
    let mut counter = TranslationCounter::new();
    let feature_names: Vec<String> = features.iter().map(|f| f.name().to_string()).collect();

    let (sample, operator_stats) = {
        let mut sampler = Sampler::new(config.burn_in);
        sampler.set_iterations(config.iterations);
        for feature in features {
            sampler.add_feature_function(feature);
        }
        for operator in build_operators(config) {
            sampler.add_operator(operator);
        }
        sampler.add_collector(&mut recorder);
        sampler.add_collector(&mut counter);
        let sample = sampler.run(start, options)?;
        (sample, aggregate_stats(sampler.operators()))
    };

    let final_hash = canonical_hash(&sample);
    let final_translation = translation(&sample);
    let output = &config.output;
    let (metrics_path, manifest_path) = match &output.run_directory {
        Some(run_dir) => {
            fs::create_dir_all(run_dir)
                .map_err(|err| GibblerError::io("run-dir-create", &err, run_dir))?;
            let metrics_path = run_dir.join(&output.metrics_file);
            recorder.write_csv(&metrics_path)?;
            let manifest_path = run_dir.join(&output.manifest_file);
            RunManifest {
                config: config.clone(),
                master_seed: config.seed_policy.master_seed,
                chain: config.seed_policy.chain,
                seed_label: config.seed_policy.label.clone(),
                feature_functions: feature_names,
                final_hash: final_hash.clone(),
                final_translation: final_translation.clone(),
                final_features: sample.feature_values().clone(),
                metrics_file: Some(output.metrics_file.clone()),
            }
            .write(&manifest_path)?;
            (Some(metrics_path), Some(manifest_path))
        }
        None => (None, None),
    };

    let move_rates = operator_stats
        .iter()
        .map(|(name, stats)| (name.clone(), stats.move_rate()))
        .collect();
    log::info!(
        "run finished: {} draws, {} distinct translations",
        recorder.samples().len(),
        counter.distinct()
    );

    Ok(RunSummary {
        move_rates,
        operator_stats,
        coverage: recorder.coverage(),
        most_frequent: counter
            .most_frequent()
            .map(|(translation, count)| (translation.to_string(), count)),
        distinct_translations: counter.distinct(),
        final_hash,
        final_translation,
        final_features: sample.feature_values().clone(),
        metrics_path,
        manifest_path,
        samples: recorder.samples().to_vec(),
    })
}

fn aggregate_stats(operators: &[Box<dyn GibbsOperator>]) -> BTreeMap<String, OperatorStats> {
    let mut totals = BTreeMap::<String, OperatorStats>::new();
    for operator in operators {
        let stats = operator.stats();
        let entry = totals.entry(operator.name().to_string()).or_default();
        entry.proposals += stats.proposals;
        entry.moves += stats.moves;
        entry.empty += stats.empty;
    }
    totals
}

fn translation(sample: &Sample) -> String {
    sample
        .target_words()
        .iter()
        .map(Word::as_str)
        .collect::<Vec<_>>()
        .join(" ")
}
