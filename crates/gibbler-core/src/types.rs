use std::fmt;
use std::ops::RangeInclusive;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::errors::{ErrorInfo, GibblerError};
use crate::features::FeatureVector;

/// Target-language token.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Word(String);

impl Word {
    /// Creates a word from its surface form.
    pub fn new(surface: impl Into<String>) -> Self {
        Self(surface.into())
    }

    /// Returns the surface form.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for Word {
    fn from(surface: &str) -> Self {
        Self::new(surface)
    }
}

impl fmt::Display for Word {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Splits a whitespace separated phrase into words.
pub fn words(phrase: &str) -> Vec<Word> {
    phrase.split_whitespace().map(Word::from).collect()
}

/// Inclusive range of source token positions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Span {
    start: usize,
    end: usize,
}

impl Span {
    /// Creates the span `[start, end]`.
    ///
    /// # Panics
    ///
    /// Panics when `end < start`.
    pub fn new(start: usize, end: usize) -> Self {
        assert!(start <= end, "span end {end} precedes start {start}");
        Self { start, end }
    }

    /// Span covering a single position.
    pub fn single(position: usize) -> Self {
        Self::new(position, position)
    }

    /// First covered position.
    pub fn start(&self) -> usize {
        self.start
    }

    /// Last covered position.
    pub fn end(&self) -> usize {
        self.end
    }

    /// Number of covered positions.
    pub fn len(&self) -> usize {
        self.end - self.start + 1
    }

    /// Spans always cover at least one position.
    pub fn is_empty(&self) -> bool {
        false
    }

    /// Whether `position` lies inside the span.
    pub fn contains(&self, position: usize) -> bool {
        self.start <= position && position <= self.end
    }

    /// Covered positions in ascending order.
    pub fn positions(&self) -> RangeInclusive<usize> {
        self.start..=self.end
    }

    /// Whether `other` starts immediately after this span ends.
    pub fn precedes(&self, other: &Span) -> bool {
        self.end + 1 == other.start
    }

    /// Union of two spans when they are contiguous, in either order.
    pub fn join(&self, other: &Span) -> Option<Span> {
        if self.precedes(other) {
            Some(Span::new(self.start, other.end))
        } else if other.precedes(self) {
            Some(Span::new(other.start, self.end))
        } else {
            None
        }
    }

    /// Splits into `[start, at - 1]` and `[at, end]`; `at` must be an interior boundary.
    pub fn split_at(&self, at: usize) -> Option<(Span, Span)> {
        if at <= self.start || at > self.end {
            return None;
        }
        Some((Span::new(self.start, at - 1), Span::new(at, self.end)))
    }
}

impl fmt::Display for Span {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{},{}]", self.start, self.end)
    }
}

/// Candidate translation of a source span. Immutable once built.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TranslationOption {
    span: Span,
    words: Vec<Word>,
    scores: FeatureVector,
}

impl TranslationOption {
    /// Creates an option emitting `words` for `span` with its score contribution.
    pub fn new(span: Span, words: Vec<Word>, scores: FeatureVector) -> Self {
        Self {
            span,
            words,
            scores,
        }
    }

    /// Source span the option translates.
    pub fn span(&self) -> Span {
        self.span
    }

    /// Target words emitted by the option.
    pub fn words(&self) -> &[Word] {
        &self.words
    }

    /// Feature contribution of the option.
    pub fn scores(&self) -> &FeatureVector {
        &self.scores
    }
}

impl fmt::Display for TranslationOption {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ->", self.span)?;
        for word in &self.words {
            write!(f, " {word}")?;
        }
        Ok(())
    }
}

/// Complete starting derivation: options listed in target order.
///
/// Construction checks that the spans partition `[0, source_size)`, so every
/// `Derivation` can seed a sample without further validation.
#[derive(Debug, Clone)]
pub struct Derivation {
    source_size: usize,
    options: Vec<Arc<TranslationOption>>,
}

impl Derivation {
    /// Validates and wraps a target-ordered option list.
    pub fn new(
        source_size: usize,
        options: Vec<Arc<TranslationOption>>,
    ) -> Result<Self, GibblerError> {
        if source_size == 0 || options.is_empty() {
            return Err(GibblerError::Sample(
                ErrorInfo::new("empty-derivation", "a derivation must cover at least one token")
                    .with_context("source_size", source_size)
                    .with_context("options", options.len()),
            ));
        }
        let mut owner: Vec<Option<usize>> = vec![None; source_size];
        for (idx, option) in options.iter().enumerate() {
            let span = option.span();
            if span.end() >= source_size {
                return Err(GibblerError::Sample(
                    ErrorInfo::new("span-out-of-range", "option span exceeds the source sentence")
                        .with_context("span", span)
                        .with_context("source_size", source_size),
                ));
            }
            for position in span.positions() {
                if let Some(previous) = owner[position].replace(idx) {
                    return Err(GibblerError::Sample(
                        ErrorInfo::new("overlapping-spans", "source position covered twice")
                            .with_context("position", position)
                            .with_context("first", options[previous].span())
                            .with_context("second", span),
                    ));
                }
            }
        }
        if let Some(gap) = owner.iter().position(Option::is_none) {
            return Err(GibblerError::Sample(
                ErrorInfo::new("coverage-gap", "source position is not covered")
                    .with_context("position", gap)
                    .with_hint("every source token must be translated by exactly one option"),
            ));
        }
        Ok(Self {
            source_size,
            options,
        })
    }

    /// Derivation translating left to right in source order.
    pub fn monotone(
        source_size: usize,
        mut options: Vec<Arc<TranslationOption>>,
    ) -> Result<Self, GibblerError> {
        options.sort_by_key(|option| option.span());
        Self::new(source_size, options)
    }

    /// Number of source tokens.
    pub fn source_size(&self) -> usize {
        self.source_size
    }

    /// Options in target order.
    pub fn options(&self) -> &[Arc<TranslationOption>] {
        &self.options
    }
}
