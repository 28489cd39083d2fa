#![deny(missing_docs)]

//! Doubly indexed derivation graph for the gibbler sampler.
//!
//! A [`Sample`] stores every hypothesis in a generation-checked arena and
//! links them twice: once in source-coverage order and once in target-emission
//! order. Graph surgery (flip, change, merge, split) rewrites both chains and
//! the source index in one step and applies the caller's score delta.

mod arena;
mod hash;
mod hypothesis;
mod sample;
mod serialization;
mod validate;

pub use hash::{canonical_hash, translation_hash};
pub use hypothesis::Hypothesis;
pub use sample::{Sample, Walk};
pub use serialization::{
    sample_to_bytes, sample_to_json, snapshot_from_bytes, snapshot_from_json, SampleSnapshot,
    SnapshotSegment,
};
