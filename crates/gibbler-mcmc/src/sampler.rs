use std::fmt;
use std::sync::Arc;

use gibbler_core::{Derivation, ErrorInfo, FeatureFunction, GibblerError, OptionSource};
use gibbler_graph::Sample;

use crate::collectors::SampleCollector;
use crate::moves::GibbsOperator;

/// Lifecycle of a [`Sampler`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// Not running.
    Idle,
    /// Rounds before `burn_in`; collectors are not called.
    BurnIn,
    /// Rounds from `burn_in` on; collectors see every sample.
    Collecting,
    /// The last round has finished.
    Done,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Phase::Idle => "idle",
            Phase::BurnIn => "burn-in",
            Phase::Collecting => "collecting",
            Phase::Done => "done",
        };
        f.write_str(name)
    }
}

/// Drives a chain: ordered operators, then ordered collectors, once per round.
///
/// Collectors are borrowed so their results stay with the caller after the
/// run. The sampler itself draws no random numbers.
pub struct Sampler<'c> {
    operators: Vec<Box<dyn GibbsOperator>>,
    collectors: Vec<&'c mut dyn SampleCollector>,
    feature_functions: Vec<Arc<dyn FeatureFunction>>,
    iterations: usize,
    burn_in: usize,
    phase: Phase,
}

impl<'c> Sampler<'c> {
    /// Creates a sampler with the mandatory burn-in and ten iterations.
    pub fn new(burn_in: usize) -> Self {
        Self {
            operators: Vec::new(),
            collectors: Vec::new(),
            feature_functions: Vec::new(),
            iterations: 10,
            burn_in,
            phase: Phase::Idle,
        }
    }

    /// Appends an operator; operators run in the order they were added.
    pub fn add_operator(&mut self, operator: Box<dyn GibbsOperator>) {
        self.operators.push(operator);
    }

    /// Appends a collector; collectors run in the order they were added.
    pub fn add_collector(&mut self, collector: &'c mut dyn SampleCollector) {
        self.collectors.push(collector);
    }

    /// Attaches an extra feature function to every sample this sampler builds.
    pub fn add_feature_function(&mut self, feature: Arc<dyn FeatureFunction>) {
        self.feature_functions.push(feature);
    }

    /// Sets the number of rounds.
    pub fn set_iterations(&mut self, iterations: usize) {
        self.iterations = iterations;
    }

    /// Sets the number of discarded rounds.
    pub fn set_burn_in(&mut self, burn_in: usize) {
        self.burn_in = burn_in;
    }

    /// Number of rounds.
    pub fn iterations(&self) -> usize {
        self.iterations
    }

    /// Number of discarded rounds.
    pub fn burn_in(&self) -> usize {
        self.burn_in
    }

    /// Current phase.
    pub fn phase(&self) -> Phase {
        self.phase
    }

    /// Registered operators, in proposal order.
    pub fn operators(&self) -> &[Box<dyn GibbsOperator>] {
        &self.operators
    }

    /// Runs one chain from `start` and returns the final sample.
    ///
    /// Round `r` runs every operator once; rounds `r >= burn_in` then hand
    /// the sample to every collector. A collector error aborts the run.
    pub fn run(
        &mut self,
        start: &Derivation,
        options: &dyn OptionSource,
    ) -> Result<Sample, GibblerError> {
        if self.burn_in > self.iterations {
            return Err(GibblerError::Config(
                ErrorInfo::new("burn-in-exceeds-iterations", "burn-in is longer than the run")
                    .with_context("burn_in", self.burn_in)
                    .with_context("iterations", self.iterations),
            ));
        }
        if options.source_size() != start.source_size() {
            return Err(GibblerError::Options(
                ErrorInfo::new("source-size-mismatch", "options and start disagree on sentence length")
                    .with_context("options", options.source_size())
                    .with_context("start", start.source_size()),
            ));
        }

        let mut sample = Sample::new(start, self.feature_functions.clone());
        log::info!(
            "sampling {} rounds ({} burn-in) with {} operators and {} collectors",
            self.iterations,
            self.burn_in,
            self.operators.len(),
            self.collectors.len()
        );
        self.enter(Phase::Idle);
        for round in 0..self.iterations {
            self.enter(if round < self.burn_in {
                Phase::BurnIn
            } else {
                Phase::Collecting
            });
            for operator in &mut self.operators {
                operator.propose(&mut sample, options);
            }
            if round >= self.burn_in {
                for collector in &mut self.collectors {
                    if let Err(err) = collector.collect(&sample) {
                        log::warn!("collector failed in round {round}: {err}");
                        self.phase = Phase::Idle;
                        return Err(err);
                    }
                }
            }
        }
        self.enter(Phase::Done);
        log::info!(
            "chain finished: {} hypotheses, features {}",
            sample.num_hypotheses(),
            sample.feature_values()
        );
        Ok(sample)
    }

    fn enter(&mut self, phase: Phase) {
        if self.phase != phase {
            log::info!("sampler phase {} -> {}", self.phase, phase);
            self.phase = phase;
        }
    }
}

impl fmt::Debug for Sampler<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Sampler")
            .field("operators", &self.operators)
            .field("collectors", &self.collectors.len())
            .field("feature_functions", &self.feature_functions)
            .field("iterations", &self.iterations)
            .field("burn_in", &self.burn_in)
            .field("phase", &self.phase)
            .finish()
    }
}
