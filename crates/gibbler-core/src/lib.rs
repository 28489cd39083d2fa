#![deny(missing_docs)]
//! Core vocabulary shared by the gibbler crates: words, spans, translation
//! options, feature vectors, the option catalogue, errors and deterministic
//! randomness.

use std::fmt;

use serde::{Deserialize, Serialize};

pub mod errors;
pub mod features;
pub mod options;
pub mod rng;
mod types;

pub use errors::{ErrorInfo, GibblerError};
pub use features::{FeatureFunction, FeatureVector, Segment};
pub use options::{OptionSource, TranslationOptionCollection};
pub use rng::{derive_substream_seed, RngHandle};
pub use types::{words, Derivation, Span, TranslationOption, Word};

/// Handle to a hypothesis stored in a sample arena.
///
/// The slot index may be reused after the hypothesis is retired; the
/// generation distinguishes the old occupant from the new one, so a stale
/// handle never resolves to a live node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct HypId {
    index: u32,
    generation: u32,
}

impl HypId {
    /// Creates a handle from its raw parts.
    pub fn from_parts(index: u32, generation: u32) -> Self {
        Self { index, generation }
    }

    /// Slot index inside the arena.
    pub fn index(&self) -> usize {
        self.index as usize
    }

    /// Generation of the slot when the handle was issued.
    pub fn generation(&self) -> u32 {
        self.generation
    }
}

impl fmt::Display for HypId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "h{}v{}", self.index, self.generation)
    }
}
