#![deny(missing_docs)]

//! Gibbs sampling over translation derivations.
//!
//! A [`Sampler`] owns an ordered list of [`GibbsOperator`]s and borrows an
//! ordered list of [`SampleCollector`]s. Each round runs every operator once
//! against the chain's [`gibbler_graph::Sample`]; after burn-in, every
//! collector observes the result. [`run`] wires a complete chain from a YAML
//! [`SamplerConfig`].

/// Sample observers: printing, translation and n-gram counting.
pub mod collectors;
/// YAML configuration schema and defaults.
pub mod config;
/// Deterministic seed derivation helpers.
pub mod determinism;
/// Extra feature functions scored over whole segmentations.
pub mod features;
/// Configured `run` entry point.
pub mod kernel;
/// Run manifest serialization helpers.
pub mod manifest;
/// Metrics collection and coverage summaries.
pub mod metrics;
/// Operator contract and the shared Gibbs draw.
pub mod moves;
/// Target reordering operator.
pub mod moves_flip;
/// Segmentation operator.
pub mod moves_merge_split;
/// Re-translation operator.
pub mod moves_translation;
/// The round loop.
pub mod sampler;

pub use collectors::{NgramCollector, PrintSampleCollector, SampleCollector, TranslationCounter};
pub use config::{OperatorSpec, OutputConfig, SamplerConfig, SeedPolicy};
pub use features::{DistortionPenalty, WordPenalty};
pub use kernel::{build_operators, run, RunSummary};
pub use manifest::RunManifest;
pub use metrics::{CoverageMetrics, MetricSample, MetricsRecorder};
pub use moves::{GibbsOperator, OperatorStats, ProposalOutcome, ScoreModel};
pub use moves_flip::FlipOperator;
pub use moves_merge_split::MergeSplitOperator;
pub use moves_translation::TranslationSwapOperator;
pub use sampler::{Phase, Sampler};
