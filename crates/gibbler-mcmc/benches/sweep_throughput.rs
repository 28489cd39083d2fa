use std::sync::Arc;

use criterion::{criterion_group, criterion_main, Criterion};
use gibbler_core::{
    Derivation, FeatureFunction, FeatureVector, OptionSource, Span, TranslationOption,
    TranslationOptionCollection, Word,
};
use gibbler_mcmc::{run, DistortionPenalty, SamplerConfig, WordPenalty};

fn sample_options(size: usize) -> TranslationOptionCollection {
    let mut options = TranslationOptionCollection::new(size);
    for start in 0..size {
        for end in start..(start + 2).min(size) {
            for variant in 0..3 {
                let words = vec![Word::new(format!("w{start}.{end}.{variant}"))];
                let scores = FeatureVector::new().with("tm", -0.1 * (variant + 1) as f64);
                options
                    .insert(TranslationOption::new(Span::new(start, end), words, scores))
                    .unwrap();
            }
        }
    }
    options
}

fn bench_sweep(c: &mut Criterion) {
    let options = sample_options(20);
    let start = Derivation::new(
        20,
        (0..20)
            .map(|i| Arc::clone(&options.options_for(Span::single(i))[0]))
            .collect(),
    )
    .unwrap();
    let features: Vec<Arc<dyn FeatureFunction>> =
        vec![Arc::new(WordPenalty), Arc::new(DistortionPenalty)];
    let mut config = SamplerConfig::with_burn_in(5);
    config.iterations = 50;
    config.weights.insert("tm".to_string(), 1.0);
    config.weights.insert("distortion".to_string(), 0.5);

    c.bench_function("gibbs_sweep_20_tokens", |b| {
        b.iter(|| {
            let _ = run(&config, &start, &options, features.clone()).unwrap();
        })
    });
}

criterion_group!(benches, bench_sweep);
criterion_main!(benches);
