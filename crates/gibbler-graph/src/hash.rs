use sha2::{Digest, Sha256};

use crate::sample::Sample;

/// Computes the canonical hash of a sample's derivation.
///
/// Two samples hash equal when they have the same source size and the same
/// sequence of `(span, words)` segments in target order. Handles and feature
/// values do not take part, so independently built samples compare by content.
pub fn canonical_hash(sample: &Sample) -> String {
    let mut hasher = Sha256::new();
    hasher.update((sample.source_size() as u64).to_le_bytes());
    let segments = sample.segments();
    hasher.update((segments.len() as u64).to_le_bytes());
    for segment in segments {
        hasher.update((segment.span.start() as u64).to_le_bytes());
        hasher.update((segment.span.end() as u64).to_le_bytes());
        hasher.update((segment.words.len() as u64).to_le_bytes());
        for word in segment.words {
            let bytes = word.as_str().as_bytes();
            hasher.update((bytes.len() as u64).to_le_bytes());
            hasher.update(bytes);
        }
    }
    format!("{:x}", hasher.finalize())
}

/// Hash of the target string alone, ignoring segmentation.
pub fn translation_hash(sample: &Sample) -> String {
    let mut hasher = Sha256::new();
    for word in sample.target_words() {
        let bytes = word.as_str().as_bytes();
        hasher.update((bytes.len() as u64).to_le_bytes());
        hasher.update(bytes);
    }
    format!("{:x}", hasher.finalize())
}
