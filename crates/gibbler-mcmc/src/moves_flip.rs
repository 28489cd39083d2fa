use std::sync::Arc;

use gibbler_core::{HypId, OptionSource, RngHandle, Segment, TranslationOption};
use gibbler_graph::Sample;

use crate::moves::{
    feature_scores, gibbs_draw, splice_segments, Candidate, GibbsOperator, OperatorStats,
    ProposalOutcome, ScoreModel,
};

#[derive(Debug)]
enum Change {
    Swap,
    Retranslate {
        left: Arc<TranslationOption>,
        right: Arc<TranslationOption>,
        prev: Option<HypId>,
        next: Option<HypId>,
    },
}

/// Reorders two randomly chosen nodes in target order.
///
/// Distant nodes simply trade places. Target neighbours are swapped and
/// re-translated together, choosing among every pair of options for their
/// spans.
#[derive(Debug)]
pub struct FlipOperator {
    model: ScoreModel,
    rng: RngHandle,
    stats: OperatorStats,
}

impl FlipOperator {
    /// Creates the operator with its own random stream.
    pub fn new(model: ScoreModel, rng: RngHandle) -> Self {
        Self {
            model,
            rng,
            stats: OperatorStats::default(),
        }
    }

    fn candidates(
        &self,
        sample: &Sample,
        options: &dyn OptionSource,
        x: usize,
        y: usize,
    ) -> Vec<Candidate<Change>> {
        let mut candidates = vec![Candidate::stay()];
        let a = sample.hyp_at_source_index(x);
        let b = sample.hyp_at_source_index(y);
        let order = sample.target_hyps();
        let (Some(pa), Some(pb)) = (
            order.iter().position(|id| *id == a),
            order.iter().position(|id| *id == b),
        ) else {
            return candidates;
        };
        let (lo, hi) = (pa.min(pb), pa.max(pb));
        let segments = sample.segments();
        let baseline = feature_scores(sample, &segments);

        if hi - lo > 1 {
            let mut proposed = segments.clone();
            proposed.swap(lo, hi);
            let mut delta = feature_scores(sample, &proposed);
            delta -= &baseline;
            candidates.push(Candidate::to(Change::Swap, delta));
            return candidates;
        }

        let first = sample.hypothesis(order[lo]);
        let second = sample.hypothesis(order[hi]);
        let lefts = options.options_for(second.span());
        let rights = options.options_for(first.span());
        if lefts.is_empty() || rights.is_empty() {
            log::warn!(
                "{}: no options to re-translate {} and {}, swapping as is",
                self.name(),
                second.span(),
                first.span()
            );
            let proposed = splice_segments(&segments, lo..hi + 1, &[segments[hi], segments[lo]]);
            let mut delta = feature_scores(sample, &proposed);
            delta -= &baseline;
            candidates.push(Candidate::to(Change::Swap, delta));
            return candidates;
        }
        let removed = first.scores() + second.scores();
        for left in lefts {
            for right in rights {
                let replacement = [
                    Segment {
                        span: second.span(),
                        words: left.words(),
                    },
                    Segment {
                        span: first.span(),
                        words: right.words(),
                    },
                ];
                let proposed = splice_segments(&segments, lo..hi + 1, &replacement);
                let mut delta = left.scores() + right.scores();
                delta -= &removed;
                delta += &feature_scores(sample, &proposed);
                delta -= &baseline;
                candidates.push(Candidate::to(
                    Change::Retranslate {
                        left: Arc::clone(left),
                        right: Arc::clone(right),
                        prev: first.tgt_prev(),
                        next: second.tgt_next(),
                    },
                    delta,
                ));
            }
        }
        candidates
    }
}

impl GibbsOperator for FlipOperator {
    fn name(&self) -> &'static str {
        "flip"
    }

    fn propose(&mut self, sample: &mut Sample, options: &dyn OptionSource) -> ProposalOutcome {
        let size = sample.source_size();
        let x = self.rng.index(size);
        let y = self.rng.index(size);
        if x == y || sample.hyp_at_source_index(x) == sample.hyp_at_source_index(y) {
            log::trace!("{}: positions {x} and {y} share a node", self.name());
            let outcome = ProposalOutcome::stayed(self.name(), 1);
            self.stats.record(&outcome);
            return outcome;
        }

        let mut candidates = self.candidates(sample, options, x, y);
        let choice = gibbs_draw(&candidates, &self.model, &mut self.rng);
        log::trace!(
            "{}: positions {x}, {y}, {} candidates, chose {choice}",
            self.name(),
            candidates.len()
        );
        let count = candidates.len();
        let Candidate { change, delta } = candidates.swap_remove(choice);
        let moved = match change {
            Some(Change::Swap) => {
                sample.flip_nodes(x, y, &delta);
                true
            }
            Some(Change::Retranslate {
                left,
                right,
                prev,
                next,
            }) => {
                sample.flip_nodes_with_options(&left, &right, prev, next, &delta);
                true
            }
            None => false,
        };
        let outcome = if moved {
            ProposalOutcome {
                operator: self.name().to_string(),
                candidates: count,
                moved,
                delta,
            }
        } else {
            ProposalOutcome::stayed(self.name(), count)
        };
        self.stats.record(&outcome);
        outcome
    }

    fn stats(&self) -> &OperatorStats {
        &self.stats
    }
}
