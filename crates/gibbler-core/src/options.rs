//! Candidate substitution catalogue consumed by move operators.

use std::collections::BTreeMap;
use std::sync::Arc;

use crate::errors::{ErrorInfo, GibblerError};
use crate::types::{Span, TranslationOption};

/// Read-only provider of translation options per source span.
///
/// A span with no known translations yields an empty slice; operators treat
/// that as "no move available" rather than an error.
pub trait OptionSource: Send + Sync {
    /// Number of source tokens the catalogue was built for.
    fn source_size(&self) -> usize;

    /// Options translating exactly `span`.
    fn options_for(&self, span: Span) -> &[Arc<TranslationOption>];
}

/// In-memory catalogue keyed by span.
#[derive(Debug, Clone, Default)]
pub struct TranslationOptionCollection {
    source_size: usize,
    by_span: BTreeMap<Span, Vec<Arc<TranslationOption>>>,
}

impl TranslationOptionCollection {
    /// Creates an empty catalogue for a sentence of `source_size` tokens.
    pub fn new(source_size: usize) -> Self {
        Self {
            source_size,
            by_span: BTreeMap::new(),
        }
    }

    /// Registers an option and returns the shared handle stored in the catalogue.
    pub fn insert(
        &mut self,
        option: TranslationOption,
    ) -> Result<Arc<TranslationOption>, GibblerError> {
        let span = option.span();
        if span.end() >= self.source_size {
            return Err(GibblerError::Options(
                ErrorInfo::new("span-out-of-range", "option span exceeds the source sentence")
                    .with_context("span", span)
                    .with_context("source_size", self.source_size),
            ));
        }
        let option = Arc::new(option);
        self.by_span
            .entry(span)
            .or_default()
            .push(Arc::clone(&option));
        Ok(option)
    }

    /// Total number of stored options.
    pub fn len(&self) -> usize {
        self.by_span.values().map(Vec::len).sum()
    }

    /// Whether the catalogue holds no options.
    pub fn is_empty(&self) -> bool {
        self.by_span.is_empty()
    }
}

impl OptionSource for TranslationOptionCollection {
    fn source_size(&self) -> usize {
        self.source_size
    }

    fn options_for(&self, span: Span) -> &[Arc<TranslationOption>] {
        self.by_span.get(&span).map(Vec::as_slice).unwrap_or(&[])
    }
}
