use std::io::Write;

use gibbler_core::{ErrorInfo, GibblerError, Word};
use gibbler_graph::Sample;
use indexmap::IndexMap;

/// Observer of post-burn-in samples.
///
/// Collectors see the sample read-only, once per collecting round, in
/// registration order.
pub trait SampleCollector {
    /// Observes the current sample.
    fn collect(&mut self, sample: &Sample) -> Result<(), GibblerError>;
}

fn translation_of(words: &[Word]) -> String {
    words
        .iter()
        .map(Word::as_str)
        .collect::<Vec<_>>()
        .join(" ")
}

/// Writes one line per sample: the translation and its feature values.
#[derive(Debug)]
pub struct PrintSampleCollector<W: Write> {
    out: W,
}

impl<W: Write> PrintSampleCollector<W> {
    /// Wraps a writer.
    pub fn new(out: W) -> Self {
        Self { out }
    }

    /// Returns the underlying writer.
    pub fn into_inner(self) -> W {
        self.out
    }
}

impl<W: Write> SampleCollector for PrintSampleCollector<W> {
    fn collect(&mut self, sample: &Sample) -> Result<(), GibblerError> {
        writeln!(
            self.out,
            "{} ||| {}",
            translation_of(sample.target_words()),
            sample.feature_values()
        )
        .map_err(|err| GibblerError::Io(ErrorInfo::new("print-sample", err.to_string())))
    }
}

/// Counts how often each distinct translation string was seen.
#[derive(Debug, Default, Clone)]
pub struct TranslationCounter {
    counts: IndexMap<String, usize>,
    total: usize,
}

impl TranslationCounter {
    /// Creates an empty counter.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of samples observed.
    pub fn total(&self) -> usize {
        self.total
    }

    /// Number of distinct translations observed.
    pub fn distinct(&self) -> usize {
        self.counts.len()
    }

    /// Times `translation` was observed.
    pub fn count(&self, translation: &str) -> usize {
        self.counts.get(translation).copied().unwrap_or(0)
    }

    /// Most frequent translation; ties go to the one seen first.
    pub fn most_frequent(&self) -> Option<(&str, usize)> {
        let mut best: Option<(&str, usize)> = None;
        for (translation, count) in &self.counts {
            if best.map_or(true, |(_, top)| *count > top) {
                best = Some((translation.as_str(), *count));
            }
        }
        best
    }

    /// Translations with their counts, in first-seen order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, usize)> + '_ {
        self.counts
            .iter()
            .map(|(translation, count)| (translation.as_str(), *count))
    }
}

impl SampleCollector for TranslationCounter {
    fn collect(&mut self, sample: &Sample) -> Result<(), GibblerError> {
        *self
            .counts
            .entry(translation_of(sample.target_words()))
            .or_insert(0) += 1;
        self.total += 1;
        Ok(())
    }
}

/// Counts target n-grams of every order from 1 to `max_order`.
#[derive(Debug, Clone)]
pub struct NgramCollector {
    max_order: usize,
    counts: IndexMap<String, usize>,
}

impl NgramCollector {
    /// Creates a collector; `max_order` must be at least 1.
    pub fn new(max_order: usize) -> Result<Self, GibblerError> {
        if max_order == 0 {
            return Err(GibblerError::Config(
                ErrorInfo::new("ngram-order", "n-gram order must be at least 1")
                    .with_hint("use 1 to count unigrams only"),
            ));
        }
        Ok(Self {
            max_order,
            counts: IndexMap::new(),
        })
    }

    /// Highest n-gram order counted.
    pub fn max_order(&self) -> usize {
        self.max_order
    }

    /// Occurrences of the space-separated n-gram across all samples.
    pub fn count(&self, ngram: &str) -> usize {
        self.counts.get(ngram).copied().unwrap_or(0)
    }

    /// Distinct n-grams observed.
    pub fn len(&self) -> usize {
        self.counts.len()
    }

    /// Whether nothing has been counted yet.
    pub fn is_empty(&self) -> bool {
        self.counts.is_empty()
    }

    /// N-grams with their counts, in first-seen order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, usize)> + '_ {
        self.counts.iter().map(|(ngram, count)| (ngram.as_str(), *count))
    }
}

impl SampleCollector for NgramCollector {
    fn collect(&mut self, sample: &Sample) -> Result<(), GibblerError> {
        let words = sample.target_words();
        for order in 1..=self.max_order.min(words.len()) {
            for window in words.windows(order) {
                *self.counts.entry(translation_of(window)).or_insert(0) += 1;
            }
        }
        Ok(())
    }
}
