use std::fs;
use std::sync::Arc;

use gibbler_core::{
    words, Derivation, FeatureFunction, FeatureVector, OptionSource, Span, TranslationOption,
    TranslationOptionCollection,
};
use gibbler_mcmc::{run, DistortionPenalty, RunManifest, SamplerConfig, WordPenalty};

fn catalogue() -> TranslationOptionCollection {
    let mut options = TranslationOptionCollection::new(3);
    for (start, end, phrase, tm) in [
        (0, 0, "das", -0.5),
        (0, 0, "the", -0.25),
        (1, 1, "haus", -0.5),
        (1, 1, "house", -0.25),
        (2, 2, "klein", -0.75),
        (2, 2, "small", -0.5),
        (0, 1, "the house", -0.25),
        (1, 2, "small house", -1.0),
    ] {
        options
            .insert(TranslationOption::new(
                Span::new(start, end),
                words(phrase),
                FeatureVector::new().with("tm", tm),
            ))
            .unwrap();
    }
    options
}

fn start(options: &TranslationOptionCollection) -> Derivation {
    let chosen = (0..3)
        .map(|i| Arc::clone(&options.options_for(Span::single(i))[0]))
        .collect();
    Derivation::monotone(3, chosen).unwrap()
}

fn features() -> Vec<Arc<dyn FeatureFunction>> {
    vec![Arc::new(WordPenalty), Arc::new(DistortionPenalty)]
}

fn config() -> SamplerConfig {
    SamplerConfig::from_yaml_str(
        r#"
iterations: 40
burn_in: 10
weights:
  tm: 1.0
  word_penalty: 0.5
  distortion: 0.3
seed_policy:
  master_seed: 2024
"#,
    )
    .unwrap()
}

#[test]
fn run_collects_post_burn_in_draws() {
    let options = catalogue();
    let summary = run(&config(), &start(&options), &options, features()).unwrap();

    assert_eq!(summary.samples.len(), 30);
    assert_eq!(summary.samples[0].draw, 0);
    assert_eq!(summary.samples[29].draw, 29);
    assert!(summary.distinct_translations >= 1);
    let (_, count) = summary.most_frequent.clone().unwrap();
    assert!((1..=30).contains(&count));
    assert!(summary.coverage.unique_state_hashes >= summary.coverage.unique_translations);
    for name in ["translation-swap", "merge-split", "flip"] {
        assert_eq!(summary.operator_stats[name].proposals, 40);
        assert!(summary.move_rates[name] >= 0.0 && summary.move_rates[name] <= 1.0);
    }
    assert!(summary.metrics_path.is_none());
    assert!(summary.manifest_path.is_none());
}

#[test]
fn identical_configs_give_identical_summaries() {
    let options = catalogue();
    let first = run(&config(), &start(&options), &options, features()).unwrap();
    let second = run(&config(), &start(&options), &options, features()).unwrap();
    assert_eq!(first, second);
}

#[test]
fn run_directory_receives_metrics_and_manifest() {
    let options = catalogue();
    let dir = tempfile::tempdir().unwrap();
    let mut config = config();
    config.output.run_directory = Some(dir.path().join("chain-0"));

    let summary = run(&config, &start(&options), &options, features()).unwrap();
    let metrics_path = summary.metrics_path.clone().unwrap();
    let csv = fs::read_to_string(&metrics_path).unwrap();
    let mut lines = csv.lines();
    assert_eq!(
        lines.next(),
        Some("draw,model_score,words,hypotheses,state_hash,translation_hash")
    );
    assert_eq!(lines.count(), 30);

    let manifest = RunManifest::load(&summary.manifest_path.clone().unwrap()).unwrap();
    assert_eq!(manifest.config, config);
    assert_eq!(manifest.master_seed, 2024);
    assert_eq!(manifest.final_hash, summary.final_hash);
    assert_eq!(manifest.final_translation, summary.final_translation);
    assert_eq!(manifest.feature_functions, vec!["word_penalty", "distortion"]);
    assert_eq!(manifest.metrics_file, Some(config.output.metrics_file.clone()));
}

#[test]
fn invalid_config_fails_before_sampling() {
    let options = catalogue();
    let mut config = config();
    config.burn_in = 100;
    let err = run(&config, &start(&options), &options, features()).unwrap_err();
    assert_eq!(err.info().code, "burn-in-exceeds-iterations");
}
