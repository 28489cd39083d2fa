use std::fmt;

use gibbler_core::{FeatureVector, OptionSource, RngHandle, Segment};
use gibbler_graph::Sample;
use serde::{Deserialize, Serialize};

/// A proposal mechanism that draws one successor state and applies it.
///
/// Implementations read the sample, compute candidate deltas, and perform at
/// most one surgery call with the delta of the chosen candidate.
pub trait GibbsOperator: fmt::Debug {
    /// Stable name used in logs and summaries.
    fn name(&self) -> &'static str;

    /// Draws and applies one move.
    fn propose(&mut self, sample: &mut Sample, options: &dyn OptionSource) -> ProposalOutcome;

    /// Counters accumulated over every call to [`GibbsOperator::propose`].
    fn stats(&self) -> &OperatorStats;
}

/// Result of one operator invocation.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ProposalOutcome {
    /// Operator that ran.
    pub operator: String,
    /// Number of states the draw chose between, the current state included.
    pub candidates: usize,
    /// Whether the sample left its current state.
    pub moved: bool,
    /// Delta applied to the feature vector, empty when the sample stayed.
    pub delta: FeatureVector,
}

impl ProposalOutcome {
    pub(crate) fn stayed(operator: &str, candidates: usize) -> Self {
        Self {
            operator: operator.to_string(),
            candidates,
            moved: false,
            delta: FeatureVector::new(),
        }
    }
}

/// Per-operator counters.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct OperatorStats {
    /// Number of `propose` calls.
    pub proposals: usize,
    /// Calls that changed the sample.
    pub moves: usize,
    /// Calls that found no candidate besides the current state.
    pub empty: usize,
}

impl OperatorStats {
    pub(crate) fn record(&mut self, outcome: &ProposalOutcome) {
        self.proposals += 1;
        if outcome.moved {
            self.moves += 1;
        }
        if outcome.candidates <= 1 {
            self.empty += 1;
        }
    }

    /// Fraction of calls that changed the sample.
    pub fn move_rate(&self) -> f64 {
        if self.proposals == 0 {
            0.0
        } else {
            self.moves as f64 / self.proposals as f64
        }
    }
}

/// Log-linear model used to weigh candidates: `weights · delta / temperature`.
#[derive(Debug, Clone, PartialEq)]
pub struct ScoreModel {
    weights: FeatureVector,
    temperature: f64,
}

impl ScoreModel {
    /// Creates a model; a non-positive temperature is clamped to a tiny value.
    pub fn new(weights: FeatureVector, temperature: f64) -> Self {
        Self {
            weights,
            temperature: temperature.max(1e-9),
        }
    }

    /// Model weights.
    pub fn weights(&self) -> &FeatureVector {
        &self.weights
    }

    /// Unnormalised log probability of moving by `delta`.
    pub fn log_weight(&self, delta: &FeatureVector) -> f64 {
        delta.inner_product(&self.weights) / self.temperature
    }
}

/// One reachable state, described by the delta that would reach it.
#[derive(Debug)]
pub(crate) struct Candidate<M> {
    pub(crate) change: Option<M>,
    pub(crate) delta: FeatureVector,
}

impl<M> Candidate<M> {
    pub(crate) fn stay() -> Self {
        Self {
            change: None,
            delta: FeatureVector::new(),
        }
    }

    pub(crate) fn to(change: M, delta: FeatureVector) -> Self {
        Self {
            change: Some(change),
            delta,
        }
    }
}

/// Samples one candidate index with probability proportional to
/// `exp(log_weight(delta))`.
///
/// A NaN log weight counts as impossible. Candidates at `+inf` take all the
/// mass and are drawn uniformly among themselves. When every candidate is
/// impossible the draw stays put (index 0).
pub(crate) fn gibbs_draw<M>(
    candidates: &[Candidate<M>],
    model: &ScoreModel,
    rng: &mut RngHandle,
) -> usize {
    let scores: Vec<f64> = candidates
        .iter()
        .map(|candidate| model.log_weight(&candidate.delta))
        .map(|score| if score.is_nan() { f64::NEG_INFINITY } else { score })
        .collect();
    let dominant: Vec<usize> = scores
        .iter()
        .enumerate()
        .filter(|(_, score)| **score == f64::INFINITY)
        .map(|(index, _)| index)
        .collect();
    if !dominant.is_empty() {
        return dominant[rng.index(dominant.len())];
    }
    let max = scores.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    if max == f64::NEG_INFINITY {
        return 0;
    }
    let weights: Vec<f64> = scores.iter().map(|score| (score - max).exp()).collect();
    let total: f64 = weights.iter().sum();
    let mut threshold = rng.uniform() * total;
    for (index, weight) in weights.iter().enumerate() {
        if threshold < *weight {
            return index;
        }
        threshold -= weight;
    }
    weights.iter().rposition(|weight| *weight > 0.0).unwrap_or(0)
}

/// Sum of every extra feature function over `segments`.
pub(crate) fn feature_scores(sample: &Sample, segments: &[Segment<'_>]) -> FeatureVector {
    let mut total = FeatureVector::new();
    for feature in sample.feature_functions() {
        total += &feature.score(segments);
    }
    total
}

/// Copy of `current` with `range` replaced by `replacement`.
pub(crate) fn splice_segments<'a>(
    current: &[Segment<'a>],
    range: std::ops::Range<usize>,
    replacement: &[Segment<'a>],
) -> Vec<Segment<'a>> {
    let mut out = Vec::with_capacity(current.len() + replacement.len());
    out.extend_from_slice(&current[..range.start]);
    out.extend_from_slice(replacement);
    out.extend_from_slice(&current[range.end..]);
    out
}

/// Target position of the node covering `source_index`.
pub(crate) fn target_position(sample: &Sample, source_index: usize) -> usize {
    let id = sample.hyp_at_source_index(source_index);
    sample
        .target_hyps()
        .iter()
        .position(|candidate| *candidate == id)
        .unwrap_or_else(|| panic!("live hypothesis {id} missing from target order"))
}
