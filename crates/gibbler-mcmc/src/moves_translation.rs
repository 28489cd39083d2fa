use std::sync::Arc;

use gibbler_core::{OptionSource, RngHandle, Segment, TranslationOption};
use gibbler_graph::Sample;

use crate::moves::{
    feature_scores, gibbs_draw, splice_segments, target_position, Candidate, GibbsOperator,
    OperatorStats, ProposalOutcome, ScoreModel,
};

/// Re-translates the span of one randomly chosen node.
///
/// Candidates are every option for that exact span; the current option is
/// the "stay" candidate.
#[derive(Debug)]
pub struct TranslationSwapOperator {
    model: ScoreModel,
    rng: RngHandle,
    stats: OperatorStats,
}

impl TranslationSwapOperator {
    /// Creates the operator with its own random stream.
    pub fn new(model: ScoreModel, rng: RngHandle) -> Self {
        Self {
            model,
            rng,
            stats: OperatorStats::default(),
        }
    }
}

impl GibbsOperator for TranslationSwapOperator {
    fn name(&self) -> &'static str {
        "translation-swap"
    }

    fn propose(&mut self, sample: &mut Sample, options: &dyn OptionSource) -> ProposalOutcome {
        let position = self.rng.index(sample.source_size());
        let current = Arc::clone(sample.hypothesis(sample.hyp_at_source_index(position)).option());
        let span = current.span();
        let alternatives = options.options_for(span);
        if alternatives.is_empty() {
            log::warn!("{}: no translation options for span {span}", self.name());
        }

        let mut candidates: Vec<Candidate<Arc<TranslationOption>>> = vec![Candidate::stay()];
        {
            let segments = sample.segments();
            let slot = target_position(sample, position);
            let baseline = feature_scores(sample, &segments);
            for option in alternatives {
                if **option == *current {
                    continue;
                }
                let replacement = [Segment {
                    span,
                    words: option.words(),
                }];
                let proposed = splice_segments(&segments, slot..slot + 1, &replacement);
                let mut delta = option.scores() - current.scores();
                delta += &feature_scores(sample, &proposed);
                delta -= &baseline;
                candidates.push(Candidate::to(Arc::clone(option), delta));
            }
        }

        let choice = gibbs_draw(&candidates, &self.model, &mut self.rng);
        log::trace!(
            "{}: span {span}, {} candidates, chose {choice}",
            self.name(),
            candidates.len()
        );
        let count = candidates.len();
        let outcome = match candidates.swap_remove(choice) {
            Candidate {
                change: Some(option),
                delta,
            } => {
                sample.change_target(&option, &delta);
                ProposalOutcome {
                    operator: self.name().to_string(),
                    candidates: count,
                    moved: true,
                    delta,
                }
            }
            Candidate { change: None, .. } => ProposalOutcome::stayed(self.name(), count),
        };
        self.stats.record(&outcome);
        outcome
    }

    fn stats(&self) -> &OperatorStats {
        &self.stats
    }
}
