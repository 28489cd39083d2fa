use std::sync::Arc;

use gibbler_core::rng::RngHandle;
use gibbler_core::{
    Derivation, FeatureFunction, FeatureVector, OptionSource, Segment, Span, TranslationOption,
    TranslationOptionCollection, Word,
};
use gibbler_graph::{canonical_hash, sample_to_bytes, snapshot_from_bytes, Sample};
use proptest::prelude::*;

#[derive(Debug)]
struct WordCount;

impl FeatureFunction for WordCount {
    fn name(&self) -> &str {
        "word-count"
    }

    fn score(&self, segments: &[Segment<'_>]) -> FeatureVector {
        let count: usize = segments.iter().map(|segment| segment.words.len()).sum();
        FeatureVector::new().with("words", count as f64)
    }
}

fn features() -> Vec<Arc<dyn FeatureFunction>> {
    vec![Arc::new(WordCount)]
}

fn catalogue(source_size: usize) -> TranslationOptionCollection {
    let mut options = TranslationOptionCollection::new(source_size);
    for start in 0..source_size {
        for end in start..(start + 3).min(source_size) {
            for variant in 0..2 {
                let len = end - start + 1;
                let words: Vec<Word> = (0..len + variant)
                    .map(|k| Word::new(format!("w{start}_{end}_{variant}_{k}")))
                    .collect();
                let scores = FeatureVector::new().with("tm", -0.25 * (len + variant) as f64);
                options
                    .insert(TranslationOption::new(Span::new(start, end), words, scores))
                    .unwrap();
            }
        }
    }
    options
}

fn word_delta(added: &[&Arc<TranslationOption>], removed: &[&Arc<TranslationOption>]) -> FeatureVector {
    let mut delta = FeatureVector::new();
    for option in added {
        delta += option.scores();
        delta.accumulate("words", option.words().len() as f64);
    }
    for option in removed {
        delta -= option.scores();
        delta.accumulate("words", -(option.words().len() as f64));
    }
    delta
}

fn pick<'a>(
    rng: &mut RngHandle,
    options: &'a TranslationOptionCollection,
    span: Span,
) -> &'a Arc<TranslationOption> {
    let candidates = options.options_for(span);
    &candidates[rng.index(candidates.len())]
}

fn random_move(sample: &mut Sample, options: &TranslationOptionCollection, rng: &mut RngHandle) {
    let size = sample.source_size();
    match rng.index(5) {
        0 => {
            let id = sample.hyp_at_source_index(rng.index(size));
            let old = Arc::clone(sample.hypothesis(id).option());
            let new = pick(rng, options, old.span());
            sample.change_target(new, &word_delta(&[new], &[&old]));
        }
        1 if size > 1 => {
            let boundary = 1 + rng.index(size - 1);
            let left = sample.hyp_at_source_index(boundary - 1);
            let right = sample.hyp_at_source_index(boundary);
            if left == right {
                return;
            }
            let (l, r) = (sample.hypothesis(left), sample.hypothesis(right));
            let adjacent = l.tgt_next() == Some(right) || r.tgt_next() == Some(left);
            let Some(joined) = l.span().join(&r.span()) else {
                return;
            };
            if !adjacent || joined.len() > 3 {
                return;
            }
            let (old_left, old_right) = (Arc::clone(l.option()), Arc::clone(r.option()));
            let merged = pick(rng, options, joined);
            sample.merge_target(merged, &word_delta(&[merged], &[&old_left, &old_right]));
        }
        2 => {
            let id = sample.hyp_at_source_index(rng.index(size));
            let old = Arc::clone(sample.hypothesis(id).option());
            let span = old.span();
            if span.len() < 2 {
                return;
            }
            let at = span.start() + 1 + rng.index(span.len() - 1);
            let Some((left_span, right_span)) = span.split_at(at) else {
                return;
            };
            let left = pick(rng, options, left_span);
            let right = pick(rng, options, right_span);
            sample.split_target(left, right, &word_delta(&[left, right], &[&old]));
        }
        3 => {
            let (x, y) = (rng.index(size), rng.index(size));
            if x == y || sample.hyp_at_source_index(x) == sample.hyp_at_source_index(y) {
                return;
            }
            sample.flip_nodes(x, y, &FeatureVector::new());
        }
        _ => {
            let first = sample.hyp_at_source_index(rng.index(size));
            let Some(second) = sample.hypothesis(first).tgt_next() else {
                return;
            };
            let prev = sample.hypothesis(first).tgt_prev();
            let next = sample.hypothesis(second).tgt_next();
            let old_first = Arc::clone(sample.hypothesis(first).option());
            let old_second = Arc::clone(sample.hypothesis(second).option());
            let left = pick(rng, options, old_second.span());
            let right = pick(rng, options, old_first.span());
            sample.flip_nodes_with_options(
                left,
                right,
                prev,
                next,
                &word_delta(&[left, right], &[&old_first, &old_second]),
            );
        }
    }
}

proptest! {
    #[test]
    fn random_moves_preserve_structure_and_scores(
        seed in any::<u64>(),
        source_size in 1usize..9,
        steps in 1usize..60,
    ) {
        let mut rng = RngHandle::from_seed(seed);
        let options = catalogue(source_size);
        let start: Vec<_> = (0..source_size)
            .map(|position| Arc::clone(&options.options_for(Span::single(position))[0]))
            .collect();
        let derivation = Derivation::new(source_size, start).unwrap();
        let mut sample = Sample::new(&derivation, features());

        for _ in 0..steps {
            random_move(&mut sample, &options, &mut rng);
            prop_assert!(sample.validate().is_ok(), "{:?}", sample.validate());
            let recomputed = sample.recompute_feature_values();
            prop_assert!(
                sample.feature_values().approx_eq(&recomputed, 1e-9),
                "running {} vs recomputed {}",
                sample.feature_values(),
                recomputed
            );
            let words: usize = sample.segments().iter().map(|segment| segment.words.len()).sum();
            prop_assert_eq!(sample.target_words().len(), words);
        }

        let snapshot = snapshot_from_bytes(&sample_to_bytes(&sample).unwrap()).unwrap();
        let rebuilt = Sample::new(&snapshot.to_derivation().unwrap(), features());
        prop_assert_eq!(canonical_hash(&sample), canonical_hash(&rebuilt));
    }
}
