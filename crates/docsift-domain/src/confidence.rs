//! Confidence score module

use serde::{Deserialize, Serialize};
use std::fmt;

/// Structural-quality estimate of a candidate value, always in [0.0, 1.0]
///
/// The constructor clamps instead of panicking: scores are computed from
/// additive bonuses and penalties, and an out-of-range intermediate must not
/// escape into a result. NaN becomes 0.0.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Default, Serialize, Deserialize)]
#[serde(from = "f64", into = "f64")]
pub struct Confidence(f64);

impl Confidence {
    /// No confidence at all (absent values)
    pub const ZERO: Confidence = Confidence(0.0);

    /// Create a confidence score, clamped into [0.0, 1.0]
    ///
    /// # Examples
    ///
    /// ```
    /// use docsift_domain::Confidence;
    ///
    /// assert_eq!(Confidence::new(0.95).value(), 0.95);
    /// assert_eq!(Confidence::new(1.7).value(), 1.0);
    /// assert_eq!(Confidence::new(-3.0).value(), 0.0);
    /// assert_eq!(Confidence::new(f64::NAN).value(), 0.0);
    /// ```
    pub fn new(value: f64) -> Self {
        if value.is_nan() {
            return Self::ZERO;
        }
        Self(value.clamp(0.0, 1.0))
    }

    /// Raw score
    pub fn value(&self) -> f64 {
        self.0
    }

    /// Whether the score reaches `threshold`
    pub fn meets(&self, threshold: f64) -> bool {
        self.0 >= threshold
    }
}

impl From<f64> for Confidence {
    fn from(value: f64) -> Self {
        Confidence::new(value)
    }
}

impl From<Confidence> for f64 {
    fn from(confidence: Confidence) -> Self {
        confidence.0
    }
}

impl fmt::Display for Confidence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.2}", self.0)
    }
}
