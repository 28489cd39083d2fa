use std::sync::Arc;

use gibbler_core::errors::{ErrorInfo, GibblerError};
use gibbler_core::{Derivation, FeatureVector, Span, TranslationOption, Word};
use serde::{Deserialize, Serialize};

use crate::sample::Sample;

/// Serializable picture of a sample: its segmentation in target order and
/// the running feature vector.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SampleSnapshot {
    /// Number of source tokens.
    pub source_size: usize,
    /// Segments in target order.
    pub segments: Vec<SnapshotSegment>,
    /// Feature vector at the time of the snapshot.
    pub feature_values: FeatureVector,
}

/// One segment of a [`SampleSnapshot`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SnapshotSegment {
    /// Source span.
    pub span: Span,
    /// Target words.
    pub words: Vec<Word>,
    /// Score contribution of the option behind the segment.
    pub scores: FeatureVector,
}

impl SampleSnapshot {
    /// Captures the current state of `sample`.
    pub fn capture(sample: &Sample) -> Self {
        let segments = sample
            .target_hyps()
            .iter()
            .map(|id| {
                let hyp = sample.hypothesis(*id);
                SnapshotSegment {
                    span: hyp.span(),
                    words: hyp.words().to_vec(),
                    scores: hyp.scores().clone(),
                }
            })
            .collect();
        Self {
            source_size: sample.source_size(),
            segments,
            feature_values: sample.feature_values().clone(),
        }
    }

    /// Rebuilds a starting derivation, for example to restart a chain.
    pub fn to_derivation(&self) -> Result<Derivation, GibblerError> {
        let options = self
            .segments
            .iter()
            .map(|segment| {
                Arc::new(TranslationOption::new(
                    segment.span,
                    segment.words.clone(),
                    segment.scores.clone(),
                ))
            })
            .collect();
        Derivation::new(self.source_size, options)
    }

    /// Target words joined with single spaces.
    pub fn translation(&self) -> String {
        self.segments
            .iter()
            .flat_map(|segment| segment.words.iter().map(Word::as_str))
            .collect::<Vec<_>>()
            .join(" ")
    }
}

/// Serializes a sample snapshot to a compact binary representation using `bincode`.
pub fn sample_to_bytes(sample: &Sample) -> Result<Vec<u8>, GibblerError> {
    bincode::serialize(&SampleSnapshot::capture(sample))
        .map_err(|err| GibblerError::Serde(ErrorInfo::new("serialize-bytes", err.to_string())))
}

/// Restores a snapshot from its binary representation.
pub fn snapshot_from_bytes(bytes: &[u8]) -> Result<SampleSnapshot, GibblerError> {
    bincode::deserialize(bytes)
        .map_err(|err| GibblerError::Serde(ErrorInfo::new("deserialize-bytes", err.to_string())))
}

/// Serializes a sample snapshot to a JSON string.
pub fn sample_to_json(sample: &Sample) -> Result<String, GibblerError> {
    serde_json::to_string_pretty(&SampleSnapshot::capture(sample))
        .map_err(|err| GibblerError::Serde(ErrorInfo::new("serialize-json", err.to_string())))
}

/// Restores a snapshot from a JSON string.
pub fn snapshot_from_json(json: &str) -> Result<SampleSnapshot, GibblerError> {
    serde_json::from_str(json)
        .map_err(|err| GibblerError::Serde(ErrorInfo::new("deserialize-json", err.to_string())))
}
