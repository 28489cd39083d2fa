//! Sparse feature vectors and the feature-function contract.

use std::collections::BTreeMap;
use std::fmt;
use std::ops::{Add, AddAssign, Neg, Sub, SubAssign};

use serde::{Deserialize, Serialize};

use crate::types::{Span, Word};

/// Named, sparse, additively composable vector of feature scores.
///
/// Missing components read as zero. Arithmetic keeps the union of component
/// names so a delta that zeroes a component still leaves the name visible.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FeatureVector {
    values: BTreeMap<String, f64>,
}

impl FeatureVector {
    /// Creates an empty vector.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the value of a component, zero when absent.
    pub fn get(&self, name: &str) -> f64 {
        self.values.get(name).copied().unwrap_or(0.0)
    }

    /// Overwrites a component.
    pub fn set(&mut self, name: impl Into<String>, value: f64) {
        self.values.insert(name.into(), value);
    }

    /// Adds `value` to a component.
    pub fn accumulate(&mut self, name: impl Into<String>, value: f64) {
        *self.values.entry(name.into()).or_insert(0.0) += value;
    }

    /// Builder-style variant of [`FeatureVector::set`].
    pub fn with(mut self, name: impl Into<String>, value: f64) -> Self {
        self.set(name, value);
        self
    }

    /// Iterates over `(name, value)` pairs in name order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, f64)> + '_ {
        self.values.iter().map(|(name, value)| (name.as_str(), *value))
    }

    /// Number of stored components.
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Whether no component is stored.
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Whether every stored component is exactly zero.
    pub fn is_zero(&self) -> bool {
        self.values.values().all(|value| *value == 0.0)
    }

    /// Dot product with a weight vector.
    pub fn inner_product(&self, weights: &FeatureVector) -> f64 {
        self.values
            .iter()
            .map(|(name, value)| value * weights.get(name))
            .sum()
    }

    /// Component-wise comparison within an absolute tolerance.
    pub fn approx_eq(&self, other: &FeatureVector, tolerance: f64) -> bool {
        self.values
            .keys()
            .chain(other.values.keys())
            .all(|name| (self.get(name) - other.get(name)).abs() <= tolerance)
    }
}

impl FromIterator<(String, f64)> for FeatureVector {
    fn from_iter<I: IntoIterator<Item = (String, f64)>>(iter: I) -> Self {
        let mut vector = FeatureVector::new();
        for (name, value) in iter {
            vector.accumulate(name, value);
        }
        vector
    }
}

impl<'a> FromIterator<(&'a str, f64)> for FeatureVector {
    fn from_iter<I: IntoIterator<Item = (&'a str, f64)>>(iter: I) -> Self {
        iter.into_iter()
            .map(|(name, value)| (name.to_string(), value))
            .collect()
    }
}

impl AddAssign<&FeatureVector> for FeatureVector {
    fn add_assign(&mut self, rhs: &FeatureVector) {
        for (name, value) in &rhs.values {
            *self.values.entry(name.clone()).or_insert(0.0) += value;
        }
    }
}

impl SubAssign<&FeatureVector> for FeatureVector {
    fn sub_assign(&mut self, rhs: &FeatureVector) {
        for (name, value) in &rhs.values {
            *self.values.entry(name.clone()).or_insert(0.0) -= value;
        }
    }
}

impl Add<&FeatureVector> for &FeatureVector {
    type Output = FeatureVector;

    fn add(self, rhs: &FeatureVector) -> FeatureVector {
        let mut out = self.clone();
        out += rhs;
        out
    }
}

impl Sub<&FeatureVector> for &FeatureVector {
    type Output = FeatureVector;

    fn sub(self, rhs: &FeatureVector) -> FeatureVector {
        let mut out = self.clone();
        out -= rhs;
        out
    }
}

impl Neg for &FeatureVector {
    type Output = FeatureVector;

    fn neg(self) -> FeatureVector {
        FeatureVector {
            values: self
                .values
                .iter()
                .map(|(name, value)| (name.clone(), -value))
                .collect(),
        }
    }
}

impl fmt::Display for FeatureVector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (idx, (name, value)) in self.values.iter().enumerate() {
            if idx > 0 {
                write!(f, " ")?;
            }
            write!(f, "{name}={value:.4}")?;
        }
        Ok(())
    }
}

/// Borrowed view of one derivation node handed to feature functions.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Segment<'a> {
    /// Source span covered by the node.
    pub span: Span,
    /// Target words emitted by the node.
    pub words: &'a [Word],
}

/// Extra scoring component applied on top of the translation option scores.
///
/// Implementations score a complete segmentation listed in target order.
/// Operators compute move deltas by scoring the current and proposed
/// segmentations; the sample itself only calls `score` once, at construction.
pub trait FeatureFunction: Send + Sync + fmt::Debug {
    /// Stable name used in logs and manifests.
    fn name(&self) -> &str;

    /// Scores a target-ordered segmentation.
    fn score(&self, segments: &[Segment<'_>]) -> FeatureVector;
}
