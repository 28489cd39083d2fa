use std::sync::Arc;

use gibbler_core::{OptionSource, RngHandle, Segment, Span, TranslationOption};
use gibbler_graph::Sample;

use crate::moves::{
    feature_scores, gibbs_draw, splice_segments, target_position, Candidate, GibbsOperator,
    OperatorStats, ProposalOutcome, ScoreModel,
};

#[derive(Debug)]
enum Change {
    Merge(Arc<TranslationOption>),
    Split(Arc<TranslationOption>, Arc<TranslationOption>),
}

/// Resamples the segmentation at one random source boundary.
///
/// A boundary inside a node offers every split of that node; a boundary
/// between two nodes that are also neighbours in target order offers every
/// merge of the pair. The current state is always a candidate.
#[derive(Debug)]
pub struct MergeSplitOperator {
    model: ScoreModel,
    rng: RngHandle,
    stats: OperatorStats,
}

impl MergeSplitOperator {
    /// Creates the operator with its own random stream.
    pub fn new(model: ScoreModel, rng: RngHandle) -> Self {
        Self {
            model,
            rng,
            stats: OperatorStats::default(),
        }
    }

    fn split_candidates(
        &self,
        sample: &Sample,
        options: &dyn OptionSource,
        boundary: usize,
    ) -> Vec<Candidate<Change>> {
        let mut candidates = vec![Candidate::stay()];
        let current = sample.hypothesis(sample.hyp_at_source_index(boundary));
        let Some((left_span, right_span)) = current.span().split_at(boundary) else {
            return candidates;
        };
        let lefts = options.options_for(left_span);
        let rights = options.options_for(right_span);
        if lefts.is_empty() || rights.is_empty() {
            log::warn!(
                "{}: no split options for {left_span} / {right_span}",
                self.name()
            );
            return candidates;
        }

        let segments = sample.segments();
        let slot = target_position(sample, boundary);
        let baseline = feature_scores(sample, &segments);
        for left in lefts {
            for right in rights {
                let replacement = [
                    Segment {
                        span: left_span,
                        words: left.words(),
                    },
                    Segment {
                        span: right_span,
                        words: right.words(),
                    },
                ];
                let proposed = splice_segments(&segments, slot..slot + 1, &replacement);
                let mut delta = left.scores() + right.scores();
                delta -= current.scores();
                delta += &feature_scores(sample, &proposed);
                delta -= &baseline;
                candidates.push(Candidate::to(
                    Change::Split(Arc::clone(left), Arc::clone(right)),
                    delta,
                ));
            }
        }
        candidates
    }

    fn merge_candidates(
        &self,
        sample: &Sample,
        options: &dyn OptionSource,
        boundary: usize,
    ) -> Vec<Candidate<Change>> {
        let mut candidates = vec![Candidate::stay()];
        let left_id = sample.hyp_at_source_index(boundary - 1);
        let right_id = sample.hyp_at_source_index(boundary);
        let left = sample.hypothesis(left_id);
        let right = sample.hypothesis(right_id);
        if left.tgt_next() != Some(right_id) && right.tgt_next() != Some(left_id) {
            log::trace!(
                "{}: {} and {} are not target neighbours",
                self.name(),
                left.span(),
                right.span()
            );
            return candidates;
        }
        let merged_span = Span::new(left.span().start(), right.span().end());
        let merges = options.options_for(merged_span);
        if merges.is_empty() {
            log::warn!("{}: no merge options for {merged_span}", self.name());
            return candidates;
        }

        let segments = sample.segments();
        let first = target_position(sample, boundary - 1).min(target_position(sample, boundary));
        let baseline = feature_scores(sample, &segments);
        let removed = left.scores() + right.scores();
        for option in merges {
            let replacement = [Segment {
                span: merged_span,
                words: option.words(),
            }];
            let proposed = splice_segments(&segments, first..first + 2, &replacement);
            let mut delta = option.scores() - &removed;
            delta += &feature_scores(sample, &proposed);
            delta -= &baseline;
            candidates.push(Candidate::to(Change::Merge(Arc::clone(option)), delta));
        }
        candidates
    }
}

impl GibbsOperator for MergeSplitOperator {
    fn name(&self) -> &'static str {
        "merge-split"
    }

    fn propose(&mut self, sample: &mut Sample, options: &dyn OptionSource) -> ProposalOutcome {
        if sample.source_size() < 2 {
            let outcome = ProposalOutcome::stayed(self.name(), 1);
            self.stats.record(&outcome);
            return outcome;
        }
        let boundary = 1 + self.rng.index(sample.source_size() - 1);
        let inside = sample.hyp_at_source_index(boundary - 1) == sample.hyp_at_source_index(boundary);
        let mut candidates = if inside {
            self.split_candidates(sample, options, boundary)
        } else {
            self.merge_candidates(sample, options, boundary)
        };

        let choice = gibbs_draw(&candidates, &self.model, &mut self.rng);
        log::trace!(
            "{}: boundary {boundary} ({}), {} candidates, chose {choice}",
            self.name(),
            if inside { "split" } else { "merge" },
            candidates.len()
        );
        let count = candidates.len();
        let Candidate { change, delta } = candidates.swap_remove(choice);
        let outcome = match change {
            Some(Change::Merge(option)) => {
                sample.merge_target(&option, &delta);
                ProposalOutcome {
                    operator: self.name().to_string(),
                    candidates: count,
                    moved: true,
                    delta,
                }
            }
            Some(Change::Split(left, right)) => {
                sample.split_target(&left, &right, &delta);
                ProposalOutcome {
                    operator: self.name().to_string(),
                    candidates: count,
                    moved: true,
                    delta,
                }
            }
            None => ProposalOutcome::stayed(self.name(), count),
        };
        self.stats.record(&outcome);
        outcome
    }

    fn stats(&self) -> &OperatorStats {
        &self.stats
    }
}
