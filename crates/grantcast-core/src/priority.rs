//! Program priority calculation.
//!
//! Calculates a recommendation score (0.0-1.0) per program from:
//! - Historical success rate (weighted)
//! - Award size tier
//! - Application difficulty (easier = higher)
//! - Preparation lead time (shorter = higher)
//!
//! The score ranks programs for display. It is not a probability.

use serde::{Deserialize, Serialize};

use crate::model::{Program, ProgramId};

/// Priority calculation weights
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PriorityWeights {
    /// Multiplier on the success rate (default 0.4)
    pub success_weight: f64,
    /// Added per difficulty step below 5 (default 0.1)
    pub difficulty_step: f64,
    /// Award above which the large tier applies (default 1000)
    pub large_award: u64,
    /// Award above which the medium tier applies (default 500)
    pub medium_award: u64,
}

impl Default for PriorityWeights {
    fn default() -> Self {
        Self {
            success_weight: 0.4,
            difficulty_step: 0.1,
            large_award: 1000,
            medium_award: 500,
        }
    }
}

/// A program with its computed score.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RankedProgram {
    pub program_id: ProgramId,
    pub name: String,
    pub score: f64,
}

/// Priority calculator for programs
#[derive(Debug, Clone, Default)]
pub struct PriorityScorer {
    weights: PriorityWeights,
}

impl PriorityScorer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_weights(weights: PriorityWeights) -> Self {
        Self { weights }
    }

    /// Calculate the priority score for a program (0.0-1.0)
    pub fn score(&self, program: &Program) -> f64 {
        let w = &self.weights;
        let difficulty = program.difficulty.clamp(1, 5) as f64;

        let score = w.success_weight * program.success_rate
            + self.budget_weight(program.max_amount)
            + w.difficulty_step * (5.0 - difficulty)
            + prep_time_bonus(program.prep_weeks);

        score.clamp(0.0, 1.0)
    }

    /// Rank programs by descending score; ties by program id.
    pub fn rank(&self, programs: &[Program]) -> Vec<RankedProgram> {
        let mut ranked: Vec<RankedProgram> = programs
            .iter()
            .map(|p| RankedProgram {
                program_id: p.id.clone(),
                name: p.name.clone(),
                score: self.score(p),
            })
            .collect();
        ranked.sort_by(|a, b| {
            b.score
                .total_cmp(&a.score)
                .then_with(|| a.program_id.cmp(&b.program_id))
        });
        ranked
    }

    /// - > large tier: 0.3
    /// - > medium tier: 0.2
    /// - otherwise: 0.1
    fn budget_weight(&self, max_amount: u64) -> f64 {
        if max_amount > self.weights.large_award {
            0.3
        } else if max_amount > self.weights.medium_award {
            0.2
        } else {
            0.1
        }
    }
}

fn prep_time_bonus(prep_weeks: u32) -> f64 {
    if prep_weeks <= 4 {
        0.2
    } else if prep_weeks <= 8 {
        0.1
    } else {
        0.0
    }
}
