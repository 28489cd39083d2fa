use std::cell::OnceCell;
use std::collections::BTreeSet;
use std::sync::Arc;

use gibbler_core::{
    Derivation, FeatureFunction, FeatureVector, HypId, Segment, Span, TranslationOption, Word,
};

use crate::arena::HypArena;
use crate::hypothesis::Hypothesis;

/// Snapshot of the target-order traversal, rebuilt lazily after mutations.
#[derive(Debug, Clone)]
struct TargetView {
    hyps: Vec<HypId>,
    words: Vec<Word>,
}

/// Traversal direction used by [`Walk`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Order {
    Source,
    Target,
}

/// One candidate translation: a node set linked in source order and in target
/// order, the source index and the running feature vector.
///
/// The graph-surgery methods are the only way to mutate a sample. Each takes
/// the score delta computed by the caller and applies it verbatim. Broken
/// preconditions (unknown index, non-adjacent merge, spans that do not
/// partition the replaced nodes) panic, because continuing would corrupt the
/// coverage and score bookkeeping every later move relies on.
#[derive(Debug, Clone)]
pub struct Sample {
    arena: HypArena,
    source_size: usize,
    source_index: Vec<HypId>,
    source_head: HypId,
    source_tail: HypId,
    target_head: HypId,
    target_tail: HypId,
    feature_values: FeatureVector,
    feature_functions: Vec<Arc<dyn FeatureFunction>>,
    target_view: OnceCell<TargetView>,
}

impl Sample {
    /// Builds a sample from a validated starting derivation.
    ///
    /// The initial feature vector is the sum of the option scores plus one
    /// full evaluation of every extra feature function. From here on it is
    /// only ever updated by deltas.
    pub fn new(derivation: &Derivation, feature_functions: Vec<Arc<dyn FeatureFunction>>) -> Self {
        let options = derivation.options();
        let source_size = derivation.source_size();
        let mut arena = HypArena::with_capacity(options.len() * 2);
        let ids: Vec<HypId> = options
            .iter()
            .map(|option| arena.insert(Hypothesis::new(Arc::clone(option))))
            .collect();

        let mut source_index = vec![ids[0]; source_size];
        for (id, option) in ids.iter().zip(options) {
            for position in option.span().positions() {
                source_index[position] = *id;
            }
        }

        let mut sample = Self {
            arena,
            source_size,
            source_head: source_index[0],
            source_tail: source_index[source_size - 1],
            target_head: ids[0],
            target_tail: ids[ids.len() - 1],
            source_index,
            feature_values: FeatureVector::new(),
            feature_functions,
            target_view: OnceCell::new(),
        };

        for pair in ids.windows(2) {
            sample.link_target(Some(pair[0]), Some(pair[1]));
        }
        let mut position = 0;
        while position < source_size {
            let current = sample.source_index[position];
            let next_position = sample.node(current).span().end() + 1;
            if next_position < source_size {
                let following = sample.source_index[next_position];
                sample.link_source(Some(current), Some(following));
            }
            position = next_position;
        }

        sample.feature_values = sample.recompute_feature_values();
        debug_assert!(sample.validate().is_ok(), "{:?}", sample.validate());
        log::debug!(
            "built sample over {} source tokens with {} hypotheses",
            source_size,
            ids.len()
        );
        sample
    }

    /// Number of source tokens covered by the sample.
    pub fn source_size(&self) -> usize {
        self.source_size
    }

    /// Number of live hypotheses.
    pub fn num_hypotheses(&self) -> usize {
        self.arena.live()
    }

    /// Running feature vector of the current translation.
    pub fn feature_values(&self) -> &FeatureVector {
        &self.feature_values
    }

    /// Extra feature functions associated with the sample.
    pub fn feature_functions(&self) -> &[Arc<dyn FeatureFunction>] {
        &self.feature_functions
    }

    /// First hypothesis in target order.
    pub fn sample_hypothesis(&self) -> HypId {
        self.target_head
    }

    /// Last hypothesis in target order.
    pub fn target_tail(&self) -> HypId {
        self.target_tail
    }

    /// First hypothesis in source order.
    pub fn source_head(&self) -> HypId {
        self.source_head
    }

    /// Last hypothesis in source order.
    pub fn source_tail(&self) -> HypId {
        self.source_tail
    }

    /// Hypothesis covering source position `index`.
    ///
    /// # Panics
    ///
    /// Panics when `index` is outside `[0, source_size)`.
    pub fn hyp_at_source_index(&self, index: usize) -> HypId {
        assert!(
            index < self.source_size,
            "source index {index} outside sentence of {} tokens",
            self.source_size
        );
        self.source_index[index]
    }

    /// Live hypothesis behind `id`.
    ///
    /// # Panics
    ///
    /// Panics when `id` refers to a retired hypothesis.
    pub fn hypothesis(&self, id: HypId) -> &Hypothesis {
        self.node(id)
    }

    /// Live hypothesis behind `id`, or `None` once it has been retired.
    pub fn try_hypothesis(&self, id: HypId) -> Option<&Hypothesis> {
        self.arena.get(id)
    }

    /// Target words of the current translation.
    pub fn target_words(&self) -> &[Word] {
        &self.view().words
    }

    /// Hypotheses in target order, from the cached snapshot.
    pub fn target_hyps(&self) -> &[HypId] {
        &self.view().hyps
    }

    /// Walks the target-order links from head to tail.
    pub fn target_order(&self) -> Walk<'_> {
        Walk {
            sample: self,
            next: Some(self.target_head),
            order: Order::Target,
            remaining: self.arena.live(),
        }
    }

    /// Walks the source-order links from head to tail.
    pub fn source_order(&self) -> Walk<'_> {
        Walk {
            sample: self,
            next: Some(self.source_head),
            order: Order::Source,
            remaining: self.arena.live(),
        }
    }

    /// Segments of the current translation in target order.
    pub fn segments(&self) -> Vec<Segment<'_>> {
        self.target_hyps()
            .iter()
            .map(|id| {
                let hyp = self.node(*id);
                Segment {
                    span: hyp.span(),
                    words: hyp.words(),
                }
            })
            .collect()
    }

    /// Recomputes the feature vector from scratch.
    ///
    /// Only used at construction and to audit the incremental bookkeeping.
    pub fn recompute_feature_values(&self) -> FeatureVector {
        let mut total = FeatureVector::new();
        for id in self.target_order() {
            total += self.node(id).scores();
        }
        if !self.feature_functions.is_empty() {
            let segments = self.segments();
            for feature in &self.feature_functions {
                total += &feature.score(&segments);
            }
        }
        total
    }

    /// Swaps the target positions of the hypotheses covering `x` and `y`.
    ///
    /// Source order and the source index are untouched.
    pub fn flip_nodes(&mut self, x: usize, y: usize, delta: &FeatureVector) {
        assert_ne!(x, y, "flip requires two distinct source positions");
        let a = self.hyp_at_source_index(x);
        let b = self.hyp_at_source_index(y);
        assert_ne!(
            a, b,
            "source positions {x} and {y} are covered by the same hypothesis"
        );

        let (a_prev, a_next) = self.target_links(a);
        let (b_prev, b_next) = self.target_links(b);
        if a_next == Some(b) {
            self.link_target(a_prev, Some(b));
            self.link_target(Some(b), Some(a));
            self.link_target(Some(a), b_next);
        } else if b_next == Some(a) {
            self.link_target(b_prev, Some(a));
            self.link_target(Some(a), Some(b));
            self.link_target(Some(b), a_next);
        } else {
            self.link_target(a_prev, Some(b));
            self.link_target(Some(b), a_next);
            self.link_target(b_prev, Some(a));
            self.link_target(Some(a), b_next);
        }

        log::debug!("flip {a} <-> {b} (source {x}, {y})");
        self.finish_move(delta);
    }

    /// Replaces two target-adjacent hypotheses with nodes built from `left` and
    /// `right`, emitted in that order between `prev` and `next`.
    ///
    /// `prev` and `next` are the target-order neighbours of the replaced pair
    /// (`None` at the sentence boundaries). The option spans must partition the
    /// source positions of the replaced pair.
    pub fn flip_nodes_with_options(
        &mut self,
        left: &Arc<TranslationOption>,
        right: &Arc<TranslationOption>,
        prev: Option<HypId>,
        next: Option<HypId>,
        delta: &FeatureVector,
    ) -> (HypId, HypId) {
        let retired = self.covering(&[left.span(), right.span()]);
        assert_eq!(
            retired.len(),
            2,
            "flip with options must replace exactly two hypotheses, found {}",
            retired.len()
        );
        let created = self.splice(
            "flip",
            &retired,
            &[Arc::clone(left), Arc::clone(right)],
            prev,
            next,
        );
        self.finish_move(delta);
        (created[0], created[1])
    }

    /// Re-translates the span of `option`, replacing the hypothesis covering it.
    ///
    /// The span must coincide with the hypotheses it overlaps, which must be
    /// contiguous in target order; normally this is a single hypothesis.
    pub fn change_target(&mut self, option: &Arc<TranslationOption>, delta: &FeatureVector) -> HypId {
        let retired = self.covering(&[option.span()]);
        let (prev, next) = self.target_bounds(&retired);
        let created = self.splice("change", &retired, &[Arc::clone(option)], prev, next);
        self.finish_move(delta);
        created[0]
    }

    /// Merges the two source-adjacent hypotheses covering `option`'s span into
    /// one hypothesis built from `option`.
    ///
    /// The pair must also be adjacent in target order (in either direction);
    /// the merged node takes the place of the pair.
    pub fn merge_target(&mut self, option: &Arc<TranslationOption>, delta: &FeatureVector) -> HypId {
        let retired = self.covering(&[option.span()]);
        assert_eq!(
            retired.len(),
            2,
            "merge over {} must combine exactly two hypotheses, found {}",
            option.span(),
            retired.len()
        );
        let first = self.node(retired[0]).span();
        let second = self.node(retired[1]).span();
        assert!(
            first.join(&second).is_some(),
            "merge requires source-adjacent spans, got {first} and {second}"
        );
        let (prev, next) = self.target_bounds(&retired);
        let created = self.splice("merge", &retired, &[Arc::clone(option)], prev, next);
        self.finish_move(delta);
        created[0]
    }

    /// Splits the hypothesis covering both option spans into two hypotheses,
    /// `left` followed by `right` in both orders.
    pub fn split_target(
        &mut self,
        left: &Arc<TranslationOption>,
        right: &Arc<TranslationOption>,
        delta: &FeatureVector,
    ) -> (HypId, HypId) {
        assert!(
            left.span().precedes(&right.span()),
            "split halves {} and {} are not contiguous",
            left.span(),
            right.span()
        );
        let retired = self.covering(&[left.span(), right.span()]);
        assert_eq!(
            retired.len(),
            1,
            "split must replace exactly one hypothesis, found {}",
            retired.len()
        );
        let (prev, next) = self.target_links(retired[0]);
        let created = self.splice(
            "split",
            &retired,
            &[Arc::clone(left), Arc::clone(right)],
            prev,
            next,
        );
        self.finish_move(delta);
        (created[0], created[1])
    }

    fn view(&self) -> &TargetView {
        self.target_view.get_or_init(|| {
            let hyps: Vec<HypId> = self.target_order().collect();
            let words = hyps
                .iter()
                .flat_map(|id| self.node(*id).words().iter().cloned())
                .collect();
            TargetView { hyps, words }
        })
    }

    fn finish_move(&mut self, delta: &FeatureVector) {
        self.feature_values += delta;
        self.target_view.take();
        debug_assert!(self.validate().is_ok(), "{:?}", self.validate());
    }

    /// Distinct hypotheses covering any position of `spans`, in source order.
    fn covering(&self, spans: &[Span]) -> Vec<HypId> {
        let mut seen = BTreeSet::new();
        let mut hyps = Vec::new();
        let mut positions: Vec<usize> = spans.iter().flat_map(|span| span.positions()).collect();
        positions.sort_unstable();
        for position in positions {
            let id = self.hyp_at_source_index(position);
            if seen.insert(id) {
                hyps.push(id);
            }
        }
        hyps
    }

    /// Outer target neighbours of a set of hypotheses that must be contiguous
    /// in target order.
    fn target_bounds(&self, hyps: &[HypId]) -> (Option<HypId>, Option<HypId>) {
        let members: BTreeSet<HypId> = hyps.iter().copied().collect();
        let first = hyps
            .iter()
            .copied()
            .find(|id| {
                self.node(*id)
                    .tgt_prev
                    .map_or(true, |prev| !members.contains(&prev))
            })
            .unwrap_or_else(|| panic!("hypotheses {hyps:?} form a target-order cycle"));
        let mut last = first;
        for _ in 1..hyps.len() {
            match self.node(last).tgt_next {
                Some(next) if members.contains(&next) => last = next,
                _ => panic!("hypotheses {hyps:?} are not contiguous in target order"),
            }
        }
        (self.node(first).tgt_prev, self.node(last).tgt_next)
    }

    /// Replaces `retired` by nodes built from `created`.
    ///
    /// `created` is given in target order and is linked between `prev` and
    /// `next`; source links are derived from the source index. Reindexing and
    /// retirement happen together so no lookup ever reaches a retired node.
    fn splice(
        &mut self,
        op: &'static str,
        retired: &[HypId],
        created: &[Arc<TranslationOption>],
        prev: Option<HypId>,
        next: Option<HypId>,
    ) -> Vec<HypId> {
        self.check_partition(op, retired, created);
        self.check_target_block(op, retired, prev, next);

        let ids: Vec<HypId> = created
            .iter()
            .map(|option| self.arena.insert(Hypothesis::new(Arc::clone(option))))
            .collect();
        for (id, option) in ids.iter().zip(created) {
            for position in option.span().positions() {
                self.source_index[position] = *id;
            }
        }
        for (id, option) in ids.iter().zip(created) {
            let span = option.span();
            let src_prev = span
                .start()
                .checked_sub(1)
                .map(|position| self.source_index[position]);
            let src_next = (span.end() + 1 < self.source_size)
                .then(|| self.source_index[span.end() + 1]);
            self.link_source(src_prev, Some(*id));
            self.link_source(Some(*id), src_next);
        }

        self.link_target(prev, Some(ids[0]));
        for pair in ids.windows(2) {
            self.link_target(Some(pair[0]), Some(pair[1]));
        }
        self.link_target(ids.last().copied(), next);

        for id in retired {
            self.arena.retire(*id);
        }
        log::debug!("{op}: retired {retired:?}, created {ids:?}");
        ids
    }

    fn check_partition(&self, op: &str, retired: &[HypId], created: &[Arc<TranslationOption>]) {
        assert!(!created.is_empty(), "{op} must create at least one hypothesis");
        let members: BTreeSet<HypId> = retired.iter().copied().collect();
        assert_eq!(members.len(), retired.len(), "{op} retires a hypothesis twice");
        let retired_len: usize = retired.iter().map(|id| self.node(*id).span().len()).sum();
        let mut spans: Vec<Span> = created.iter().map(|option| option.span()).collect();
        spans.sort();
        for pair in spans.windows(2) {
            assert!(
                pair[0].end() < pair[1].start(),
                "{op} creates overlapping spans {} and {}",
                pair[0],
                pair[1]
            );
        }
        let created_len: usize = spans.iter().map(Span::len).sum();
        assert_eq!(
            created_len, retired_len,
            "{op} spans cover {created_len} positions but replace {retired_len}"
        );
        for span in &spans {
            for position in span.positions() {
                assert!(
                    members.contains(&self.hyp_at_source_index(position)),
                    "{op} span {span} reaches position {position} outside the replaced hypotheses"
                );
            }
        }
    }

    fn check_target_block(
        &self,
        op: &str,
        retired: &[HypId],
        prev: Option<HypId>,
        next: Option<HypId>,
    ) {
        let members: BTreeSet<HypId> = retired.iter().copied().collect();
        for bound in [prev, next].into_iter().flatten() {
            assert!(
                self.arena.get(bound).is_some() && !members.contains(&bound),
                "{op} target neighbour {bound} is retired or being replaced"
            );
        }
        let mut cursor = match prev {
            Some(prev) => self.node(prev).tgt_next,
            None => Some(self.target_head),
        };
        for _ in 0..retired.len() {
            match cursor {
                Some(id) if members.contains(&id) => cursor = self.node(id).tgt_next,
                _ => panic!("{op} hypotheses {retired:?} do not directly follow {prev:?} in target order"),
            }
        }
        assert_eq!(
            cursor, next,
            "{op} hypotheses {retired:?} are not directly followed by {next:?} in target order"
        );
    }

    fn target_links(&self, id: HypId) -> (Option<HypId>, Option<HypId>) {
        let hyp = self.node(id);
        (hyp.tgt_prev, hyp.tgt_next)
    }

    fn link_target(&mut self, prev: Option<HypId>, next: Option<HypId>) {
        match prev {
            Some(prev) => self.node_mut(prev).tgt_next = next,
            None => {
                if let Some(next) = next {
                    self.target_head = next;
                }
            }
        }
        match next {
            Some(next) => self.node_mut(next).tgt_prev = prev,
            None => {
                if let Some(prev) = prev {
                    self.target_tail = prev;
                }
            }
        }
    }

    fn link_source(&mut self, prev: Option<HypId>, next: Option<HypId>) {
        match prev {
            Some(prev) => self.node_mut(prev).src_next = next,
            None => {
                if let Some(next) = next {
                    self.source_head = next;
                }
            }
        }
        match next {
            Some(next) => self.node_mut(next).src_prev = prev,
            None => {
                if let Some(prev) = prev {
                    self.source_tail = prev;
                }
            }
        }
    }

    pub(crate) fn node(&self, id: HypId) -> &Hypothesis {
        self.arena
            .get(id)
            .unwrap_or_else(|| panic!("hypothesis {id} is retired or unknown"))
    }

    fn node_mut(&mut self, id: HypId) -> &mut Hypothesis {
        self.arena
            .get_mut(id)
            .unwrap_or_else(|| panic!("hypothesis {id} is retired or unknown"))
    }

    pub(crate) fn source_index(&self) -> &[HypId] {
        &self.source_index
    }

    pub(crate) fn live_ids(&self) -> impl Iterator<Item = HypId> + '_ {
        self.arena.live_ids()
    }

    pub(crate) fn cached_target_hyps(&self) -> Option<&[HypId]> {
        self.target_view.get().map(|view| view.hyps.as_slice())
    }
}

/// Iterator over hypothesis handles following one traversal's links.
///
/// Stops after `num_hypotheses` steps so a corrupted chain cannot loop forever.
#[derive(Debug, Clone)]
pub struct Walk<'a> {
    sample: &'a Sample,
    next: Option<HypId>,
    order: Order,
    remaining: usize,
}

impl Iterator for Walk<'_> {
    type Item = HypId;

    fn next(&mut self) -> Option<HypId> {
        if self.remaining == 0 {
            return None;
        }
        let current = self.next?;
        let hyp = self.sample.arena.get(current)?;
        self.remaining -= 1;
        self.next = match self.order {
            Order::Source => hyp.src_next,
            Order::Target => hyp.tgt_next,
        };
        Some(current)
    }
}
