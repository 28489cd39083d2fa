use std::sync::Arc;

use gibbler_core::{words, Derivation, FeatureVector, HypId, Span, TranslationOption};
use gibbler_graph::Sample;

fn opt(start: usize, end: usize, phrase: &str, tm: f64) -> Arc<TranslationOption> {
    Arc::new(TranslationOption::new(
        Span::new(start, end),
        words(phrase),
        FeatureVector::new().with("tm", tm),
    ))
}

fn spans_in_target_order(sample: &Sample) -> Vec<Span> {
    sample
        .target_order()
        .map(|id| sample.hypothesis(id).span())
        .collect()
}

fn spans_in_source_order(sample: &Sample) -> Vec<Span> {
    sample
        .source_order()
        .map(|id| sample.hypothesis(id).span())
        .collect()
}

fn text(sample: &Sample) -> String {
    sample
        .target_words()
        .iter()
        .map(|w| w.as_str())
        .collect::<Vec<_>>()
        .join(" ")
}

fn three_segment_sample() -> (Sample, Vec<Arc<TranslationOption>>) {
    let options = vec![opt(0, 0, "a", -1.0), opt(1, 1, "b", -2.0), opt(2, 2, "c", -3.0)];
    let derivation = Derivation::new(3, options.clone()).unwrap();
    (Sample::new(&derivation, Vec::new()), options)
}

#[test]
fn merge_then_split_restores_partition() {
    let a = opt(0, 1, "a b", -1.0);
    let b = opt(2, 2, "c", -0.5);
    let derivation = Derivation::new(3, vec![Arc::clone(&a), Arc::clone(&b)]).unwrap();
    let mut sample = Sample::new(&derivation, Vec::new());
    let before = sample.feature_values().clone();

    let merged_option = opt(0, 2, "abc", -1.2);
    let delta = merged_option.scores() - &(a.scores() + b.scores());
    let merged = sample.merge_target(&merged_option, &delta);

    for index in 0..3 {
        assert_eq!(sample.hyp_at_source_index(index), merged);
    }
    assert_eq!(sample.sample_hypothesis(), merged);
    assert_eq!(sample.target_tail(), merged);
    assert_eq!(sample.source_head(), merged);
    assert_eq!(sample.source_tail(), merged);
    assert_eq!(sample.num_hypotheses(), 1);
    assert!(sample
        .feature_values()
        .approx_eq(&(&before + &delta), 1e-12));
    sample.validate().unwrap();

    let (left, right) = sample.split_target(&a, &b, &-&delta);
    assert_eq!(spans_in_source_order(&sample), vec![Span::new(0, 1), Span::single(2)]);
    assert_eq!(spans_in_target_order(&sample), vec![Span::new(0, 1), Span::single(2)]);
    assert_eq!(sample.hyp_at_source_index(0), left);
    assert_eq!(sample.hyp_at_source_index(1), left);
    assert_eq!(sample.hyp_at_source_index(2), right);
    assert!(sample.try_hypothesis(merged).is_none());
    assert!(sample.feature_values().approx_eq(&before, 1e-12));
    assert_eq!(text(&sample), "a b c");
    sample.validate().unwrap();
}

#[test]
fn change_target_replaces_node_in_place() {
    let (mut sample, options) = three_segment_sample();
    assert_eq!(text(&sample), "a b c");
    let old = sample.hyp_at_source_index(1);

    let replacement = opt(1, 1, "beta gamma", -1.5);
    let delta = replacement.scores() - options[1].scores();
    let new = sample.change_target(&replacement, &delta);

    assert!(sample.try_hypothesis(old).is_none());
    assert_eq!(sample.hyp_at_source_index(1), new);
    assert_eq!(text(&sample), "a beta gamma c");
    assert_eq!(sample.target_hyps()[1], new);
    assert_eq!(sample.feature_values().get("tm"), -5.5);
    assert!(sample
        .feature_values()
        .approx_eq(&sample.recompute_feature_values(), 1e-12));
    sample.validate().unwrap();
}

#[test]
fn change_target_at_sentence_edges_updates_heads_and_tails() {
    let (mut sample, options) = three_segment_sample();
    let first = opt(0, 0, "x", -1.0);
    let last = opt(2, 2, "z", -3.0);
    let head = sample.change_target(&first, &(first.scores() - options[0].scores()));
    let tail = sample.change_target(&last, &(last.scores() - options[2].scores()));

    assert_eq!(sample.sample_hypothesis(), head);
    assert_eq!(sample.source_head(), head);
    assert_eq!(sample.target_tail(), tail);
    assert_eq!(sample.source_tail(), tail);
    assert_eq!(text(&sample), "x b z");
    sample.validate().unwrap();
}

#[test]
fn flip_adjacent_and_distant_nodes() {
    let (mut sample, _) = three_segment_sample();
    let zero = FeatureVector::new();
    let before = sample.feature_values().clone();

    sample.flip_nodes(0, 1, &zero);
    assert_eq!(text(&sample), "b a c");
    sample.validate().unwrap();

    sample.flip_nodes(2, 1, &zero);
    assert_eq!(text(&sample), "c a b");
    assert_eq!(
        spans_in_source_order(&sample),
        vec![Span::single(0), Span::single(1), Span::single(2)]
    );
    sample.validate().unwrap();

    sample.flip_nodes(1, 0, &zero);
    assert_eq!(text(&sample), "c b a");
    assert_eq!(sample.feature_values(), &before);
    sample.validate().unwrap();
}

#[test]
fn flip_applies_delta() {
    let (mut sample, _) = three_segment_sample();
    let delta = FeatureVector::new().with("distortion", -2.0);
    sample.flip_nodes(0, 2, &delta);
    assert_eq!(text(&sample), "c b a");
    assert_eq!(sample.feature_values().get("distortion"), -2.0);
    assert_eq!(sample.feature_values().get("tm"), -6.0);
}

#[test]
fn flip_with_options_relinks_both_orders() {
    let (mut sample, options) = three_segment_sample();
    let first = sample.hyp_at_source_index(0);
    let second = sample.hyp_at_source_index(1);
    let next = sample.hypothesis(second).tgt_next();

    let (left, right) = sample.flip_nodes_with_options(
        &options[1],
        &options[0],
        None,
        next,
        &FeatureVector::new(),
    );
    assert!(sample.try_hypothesis(first).is_none());
    assert!(sample.try_hypothesis(second).is_none());
    assert_eq!(sample.sample_hypothesis(), left);
    assert_eq!(sample.hyp_at_source_index(1), left);
    assert_eq!(sample.hyp_at_source_index(0), right);
    assert_eq!(text(&sample), "b a c");
    assert_eq!(sample.source_head(), right);
    sample.validate().unwrap();
}

#[test]
fn flip_with_new_options_for_both_sides() {
    let (mut sample, options) = three_segment_sample();
    let prev = Some(sample.hyp_at_source_index(0));
    let new_c = opt(2, 2, "gamma", -0.5);
    let new_b = opt(1, 1, "beta", -0.5);
    let delta = &(new_c.scores() + new_b.scores()) - &(options[1].scores() + options[2].scores());

    sample.flip_nodes_with_options(&new_c, &new_b, prev, None, &delta);
    assert_eq!(text(&sample), "a gamma beta");
    assert!(sample
        .feature_values()
        .approx_eq(&sample.recompute_feature_values(), 1e-12));
    sample.validate().unwrap();
}

#[test]
fn merge_of_target_swapped_pair_takes_pair_position() {
    let (mut sample, options) = three_segment_sample();
    sample.flip_nodes(1, 2, &FeatureVector::new());
    assert_eq!(text(&sample), "a c b");

    let merged = opt(1, 2, "bc", -4.0);
    let delta = merged.scores() - &(options[1].scores() + options[2].scores());
    let id = sample.merge_target(&merged, &delta);
    assert_eq!(sample.target_tail(), id);
    assert_eq!(text(&sample), "a bc");
    sample.validate().unwrap();
}

#[test]
fn target_cache_is_rebuilt_after_mutation() {
    let (mut sample, _) = three_segment_sample();
    let before: Vec<HypId> = sample.target_hyps().to_vec();
    sample.flip_nodes(0, 2, &FeatureVector::new());
    let after = sample.target_hyps().to_vec();
    assert_eq!(after, vec![before[2], before[1], before[0]]);
    sample.validate().unwrap();
}

#[test]
#[should_panic(expected = "outside sentence")]
fn out_of_range_index_panics() {
    let (sample, _) = three_segment_sample();
    sample.hyp_at_source_index(3);
}

#[test]
#[should_panic(expected = "same hypothesis")]
fn flip_within_one_node_panics() {
    let derivation = Derivation::new(2, vec![opt(0, 1, "ab", -1.0)]).unwrap();
    let mut sample = Sample::new(&derivation, Vec::new());
    sample.flip_nodes(0, 1, &FeatureVector::new());
}

#[test]
#[should_panic(expected = "exactly two hypotheses")]
fn merge_across_three_nodes_panics() {
    let (mut sample, _) = three_segment_sample();
    sample.merge_target(&opt(0, 2, "abc", 0.0), &FeatureVector::new());
}

#[test]
#[should_panic(expected = "not contiguous in target order")]
fn merge_of_target_separated_pair_panics() {
    let (mut sample, _) = three_segment_sample();
    sample.flip_nodes(1, 2, &FeatureVector::new());
    // target order is now a, c, b
    sample.merge_target(&opt(0, 1, "ab", 0.0), &FeatureVector::new());
}

#[test]
#[should_panic(expected = "not contiguous")]
fn split_with_gap_panics() {
    let derivation = Derivation::new(3, vec![opt(0, 2, "abc", -1.0)]).unwrap();
    let mut sample = Sample::new(&derivation, Vec::new());
    sample.split_target(&opt(0, 0, "a", 0.0), &opt(2, 2, "c", 0.0), &FeatureVector::new());
}

#[test]
#[should_panic(expected = "spans cover 1 positions but replace 2")]
fn change_target_with_misaligned_span_panics() {
    let derivation =
        Derivation::new(3, vec![opt(0, 1, "ab", -1.0), opt(2, 2, "c", -1.0)]).unwrap();
    let mut sample = Sample::new(&derivation, Vec::new());
    sample.change_target(&opt(1, 1, "b", 0.0), &FeatureVector::new());
}
