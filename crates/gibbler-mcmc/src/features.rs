use gibbler_core::{FeatureFunction, FeatureVector, Segment};

/// Feature name emitted by [`WordPenalty`].
pub const WORD_PENALTY: &str = "word_penalty";
/// Feature name emitted by [`DistortionPenalty`].
pub const DISTORTION: &str = "distortion";

/// Charges -1 for every target word.
#[derive(Debug, Clone, Copy, Default)]
pub struct WordPenalty;

impl FeatureFunction for WordPenalty {
    fn name(&self) -> &str {
        WORD_PENALTY
    }

    fn score(&self, segments: &[Segment<'_>]) -> FeatureVector {
        let words: usize = segments.iter().map(|segment| segment.words.len()).sum();
        FeatureVector::new().with(WORD_PENALTY, -(words as f64))
    }
}

/// Linear distortion cost of the target-order segmentation.
///
/// Each segment pays the distance between its source start and the position
/// right after the previous segment's source end; the first segment is
/// measured from position 0. A monotone translation scores zero.
#[derive(Debug, Clone, Copy, Default)]
pub struct DistortionPenalty;

impl FeatureFunction for DistortionPenalty {
    fn name(&self) -> &str {
        DISTORTION
    }

    fn score(&self, segments: &[Segment<'_>]) -> FeatureVector {
        let mut expected = 0i64;
        let mut cost = 0i64;
        for segment in segments {
            cost += (segment.span.start() as i64 - expected).abs();
            expected = segment.span.end() as i64 + 1;
        }
        FeatureVector::new().with(DISTORTION, -(cost as f64))
    }
}
