//! Confidence and probability scoring for mined patterns.
//!
//! Two separate scales:
//! - confidence: how sure we are about the predicted *dates*
//! - probability: how sure we are the window opens *at all*

use serde::{Deserialize, Serialize};

use super::Pattern;

/// Tunable scoring constants.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoringConfig {
    #[serde(default = "default_confidence_base")]
    pub confidence_base: u32,
    #[serde(default = "default_confidence_per_sample")]
    pub confidence_per_sample: u32,
    /// Samples beyond this count add no confidence.
    #[serde(default = "default_sample_cap")]
    pub sample_cap: u32,
    /// Bonus when every sample opened in the typical month.
    #[serde(default = "default_consistency_bonus")]
    pub consistency_bonus: u32,
    /// A single sample is trivially consistent; the bonus needs this many.
    #[serde(default = "default_min_consistency_samples")]
    pub min_consistency_samples: u32,
    #[serde(default = "default_cap")]
    pub confidence_cap: u32,
    #[serde(default = "default_probability_base")]
    pub probability_base: u32,
    #[serde(default = "default_probability_per_sample")]
    pub probability_per_sample: u32,
    #[serde(default = "default_cap")]
    pub probability_cap: u32,
}

fn default_confidence_base() -> u32 {
    40
}
fn default_confidence_per_sample() -> u32 {
    15
}
fn default_sample_cap() -> u32 {
    3
}
fn default_consistency_bonus() -> u32 {
    20
}
fn default_min_consistency_samples() -> u32 {
    2
}
fn default_cap() -> u32 {
    95
}
fn default_probability_base() -> u32 {
    60
}
fn default_probability_per_sample() -> u32 {
    10
}

impl Default for ScoringConfig {
    fn default() -> Self {
        Self {
            confidence_base: default_confidence_base(),
            confidence_per_sample: default_confidence_per_sample(),
            sample_cap: default_sample_cap(),
            consistency_bonus: default_consistency_bonus(),
            min_consistency_samples: default_min_consistency_samples(),
            confidence_cap: default_cap(),
            probability_base: default_probability_base(),
            probability_per_sample: default_probability_per_sample(),
            probability_cap: default_cap(),
        }
    }
}

/// Scores attached to a pattern.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PatternScore {
    pub confidence: u8,
    pub probability: u8,
}

/// Confidence scorer.
#[derive(Debug, Clone, Default)]
pub struct ConfidenceScorer {
    config: ScoringConfig,
}

impl ConfidenceScorer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: ScoringConfig) -> Self {
        Self { config }
    }

    pub fn score(&self, pattern: &Pattern) -> PatternScore {
        PatternScore {
            confidence: self.confidence(pattern),
            probability: self.probability(pattern.sample_count),
        }
    }

    /// `base + per_sample * min(n, cap) + bonus * consistency`, clamped to the cap.
    pub fn confidence(&self, pattern: &Pattern) -> u8 {
        let c = &self.config;
        let samples = (pattern.sample_count as u32).min(c.sample_cap) as f64;
        let mut raw = c.confidence_base as f64 + c.confidence_per_sample as f64 * samples;
        if pattern.sample_count as u32 >= c.min_consistency_samples {
            raw += c.consistency_bonus as f64 * pattern.month_consistency();
        }
        clamp_percent(raw, c.confidence_cap)
    }

    /// `min(cap, base + per_sample * n)`.
    pub fn probability(&self, sample_count: usize) -> u8 {
        let c = &self.config;
        let raw = c.probability_base as f64 + c.probability_per_sample as f64 * sample_count as f64;
        clamp_percent(raw, c.probability_cap)
    }
}

fn clamp_percent(raw: f64, cap: u32) -> u8 {
    let cap = cap.min(100) as f64;
    raw.round().clamp(0.0, cap) as u8
}
