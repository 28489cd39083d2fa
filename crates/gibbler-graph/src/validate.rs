use std::collections::BTreeSet;

use gibbler_core::{ErrorInfo, GibblerError, HypId};

use crate::sample::Sample;

impl Sample {
    /// Checks every structural invariant of the sample.
    ///
    /// Verifies that the source index partitions `[0, source_size)`, that both
    /// traversals are well-formed chains over the same live node set, that the
    /// source traversal visits spans left to right, and that a present target
    /// snapshot matches the target links. Returns the first violation found.
    pub fn validate(&self) -> Result<(), GibblerError> {
        let index = self.source_index();
        if index.len() != self.source_size() {
            return Err(violation("index-size", "source index length differs from sentence")
                .with_context("index", index.len())
                .with_context("source_size", self.source_size()));
        }
        for (position, id) in index.iter().enumerate() {
            let Some(hyp) = self.try_hypothesis(*id) else {
                return Err(violation("dangling-index", "source index points at a retired node")
                    .with_context("position", position)
                    .with_context("hyp", id));
            };
            if !hyp.span().contains(position) {
                return Err(violation("index-mismatch", "indexed node does not cover position")
                    .with_context("position", position)
                    .with_context("span", hyp.span()));
            }
        }

        let live: BTreeSet<HypId> = self.live_ids().collect();

        let source = self.check_chain(
            "source",
            self.source_head(),
            self.source_tail(),
            |sample, id| sample.hypothesis(id).src_prev(),
            |sample, id| sample.hypothesis(id).src_next(),
        )?;
        let mut expected_start = 0;
        for id in &source {
            let span = self.hypothesis(*id).span();
            if span.start() != expected_start {
                return Err(violation("source-order", "source order does not tile the sentence")
                    .with_context("expected_start", expected_start)
                    .with_context("span", span));
            }
            expected_start = span.end() + 1;
        }
        if expected_start != self.source_size() {
            return Err(violation("coverage-gap", "source order stops before the sentence end")
                .with_context("covered", expected_start));
        }

        let target = self.check_chain(
            "target",
            self.sample_hypothesis(),
            self.target_tail(),
            |sample, id| sample.hypothesis(id).tgt_prev(),
            |sample, id| sample.hypothesis(id).tgt_next(),
        )?;

        let source_set: BTreeSet<HypId> = source.iter().copied().collect();
        let target_set: BTreeSet<HypId> = target.iter().copied().collect();
        if source_set != live || target_set != live {
            return Err(violation("node-set", "traversals disagree with the live node set")
                .with_context("live", live.len())
                .with_context("source", source_set.len())
                .with_context("target", target_set.len()));
        }

        if let Some(cached) = self.cached_target_hyps() {
            if cached != target.as_slice() {
                return Err(violation("stale-cache", "cached target view is out of date"));
            }
        }
        Ok(())
    }

    fn check_chain(
        &self,
        label: &str,
        head: HypId,
        tail: HypId,
        prev_of: impl Fn(&Sample, HypId) -> Option<HypId>,
        next_of: impl Fn(&Sample, HypId) -> Option<HypId>,
    ) -> Result<Vec<HypId>, GibblerError> {
        if self.try_hypothesis(head).is_none() || self.try_hypothesis(tail).is_none() {
            return Err(violation("dangling-end", "chain end is retired").with_context("chain", label));
        }
        if prev_of(self, head).is_some() || next_of(self, tail).is_some() {
            return Err(violation("open-end", "chain head or tail has an outer link")
                .with_context("chain", label));
        }
        let mut visited = Vec::new();
        let mut seen = BTreeSet::new();
        let mut previous = None;
        let mut cursor = Some(head);
        while let Some(id) = cursor {
            if self.try_hypothesis(id).is_none() {
                return Err(violation("dangling-link", "chain reaches a retired node")
                    .with_context("chain", label)
                    .with_context("hyp", id));
            }
            if !seen.insert(id) {
                return Err(violation("cycle", "chain revisits a node")
                    .with_context("chain", label)
                    .with_context("hyp", id));
            }
            if prev_of(self, id) != previous {
                return Err(violation("broken-back-link", "predecessor link disagrees with walk")
                    .with_context("chain", label)
                    .with_context("hyp", id));
            }
            visited.push(id);
            previous = Some(id);
            cursor = next_of(self, id);
        }
        if previous != Some(tail) {
            return Err(violation("tail-mismatch", "chain does not end at its tail")
                .with_context("chain", label));
        }
        Ok(visited)
    }
}

fn violation(code: &str, message: &str) -> GibblerError {
    GibblerError::Sample(ErrorInfo::new(code, message))
}

trait ContextExt {
    fn with_context(self, key: &str, value: impl ToString) -> GibblerError;
}

impl ContextExt for GibblerError {
    fn with_context(self, key: &str, value: impl ToString) -> GibblerError {
        match self {
            GibblerError::Sample(info) => GibblerError::Sample(info.with_context(key, value)),
            other => other,
        }
    }
}
