use std::sync::Arc;

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use gibbler_core::{Derivation, FeatureVector, Span, TranslationOption, Word};
use gibbler_graph::Sample;

fn option(start: usize, end: usize, surface: &str) -> Arc<TranslationOption> {
    Arc::new(TranslationOption::new(
        Span::new(start, end),
        vec![Word::new(surface)],
        FeatureVector::new().with("tm", -1.0),
    ))
}

fn long_sentence(size: usize) -> Sample {
    let options = (0..size).map(|i| option(i, i, &format!("t{i}"))).collect();
    let derivation = Derivation::new(size, options).unwrap();
    Sample::new(&derivation, Vec::new())
}

fn surgery_bench(c: &mut Criterion) {
    let zero = FeatureVector::new();
    c.bench_function("flip_and_read_200", |b| {
        let mut sample = long_sentence(200);
        let mut step = 0usize;
        b.iter(|| {
            let x = step % 200;
            let y = (step * 7 + 3) % 200;
            if x != y {
                sample.flip_nodes(x, y, &zero);
            }
            step += 1;
            black_box(sample.target_words().len());
        });
    });

    c.bench_function("merge_split_200", |b| {
        let mut sample = long_sentence(200);
        let merged = option(100, 101, "t100t101");
        let left = option(100, 100, "t100");
        let right = option(101, 101, "t101");
        b.iter(|| {
            sample.merge_target(&merged, &zero);
            sample.split_target(&left, &right, &zero);
            black_box(sample.num_hypotheses());
        });
    });
}

criterion_group!(benches, surgery_bench);
criterion_main!(benches);
