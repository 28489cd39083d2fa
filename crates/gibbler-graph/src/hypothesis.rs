use std::sync::Arc;

use gibbler_core::{FeatureVector, HypId, Span, TranslationOption, Word};

/// One derivation node: a translation option placed in both traversal orders.
#[derive(Debug, Clone)]
pub struct Hypothesis {
    option: Arc<TranslationOption>,
    pub(crate) src_prev: Option<HypId>,
    pub(crate) src_next: Option<HypId>,
    pub(crate) tgt_prev: Option<HypId>,
    pub(crate) tgt_next: Option<HypId>,
}

impl Hypothesis {
    pub(crate) fn new(option: Arc<TranslationOption>) -> Self {
        Self {
            option,
            src_prev: None,
            src_next: None,
            tgt_prev: None,
            tgt_next: None,
        }
    }

    /// Translation option the node was built from.
    pub fn option(&self) -> &Arc<TranslationOption> {
        &self.option
    }

    /// Source span covered by the node.
    pub fn span(&self) -> Span {
        self.option.span()
    }

    /// Target words emitted by the node.
    pub fn words(&self) -> &[Word] {
        self.option.words()
    }

    /// Score contribution of the node.
    pub fn scores(&self) -> &FeatureVector {
        self.option.scores()
    }

    /// Predecessor in source order.
    pub fn src_prev(&self) -> Option<HypId> {
        self.src_prev
    }

    /// Successor in source order.
    pub fn src_next(&self) -> Option<HypId> {
        self.src_next
    }

    /// Predecessor in target order.
    pub fn tgt_prev(&self) -> Option<HypId> {
        self.tgt_prev
    }

    /// Successor in target order.
    pub fn tgt_next(&self) -> Option<HypId> {
        self.tgt_next
    }
}
