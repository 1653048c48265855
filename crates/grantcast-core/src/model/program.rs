use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

/// Unique identifier for a program.
pub type ProgramId = String;

/// A grant or subsidy scheme being tracked.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Program {
    pub id: ProgramId,
    pub name: String,
    /// Typical preparation lead time before a window opens, in weeks.
    #[serde(default = "default_prep_weeks")]
    pub prep_weeks: u32,
    /// Historical acceptance rate (0.0-1.0).
    #[serde(default = "default_success_rate")]
    pub success_rate: f64,
    /// Application difficulty (1 = easy, 5 = hard).
    #[serde(default = "default_difficulty")]
    pub difficulty: u8,
    /// Maximum award, in the registry's currency unit.
    #[serde(default)]
    pub max_amount: u64,
}

fn default_prep_weeks() -> u32 {
    8
}
fn default_success_rate() -> f64 {
    0.25
}
fn default_difficulty() -> u8 {
    3
}

impl Program {
    /// Create a program with registry defaults for the scoring attributes.
    pub fn new(id: impl Into<ProgramId>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            prep_weeks: default_prep_weeks(),
            success_rate: default_success_rate(),
            difficulty: default_difficulty(),
            max_amount: 0,
        }
    }

    pub fn with_prep_weeks(mut self, weeks: u32) -> Self {
        self.prep_weeks = weeks;
        self
    }

    pub fn with_success_rate(mut self, rate: f64) -> Self {
        self.success_rate = rate;
        self
    }

    pub fn with_difficulty(mut self, difficulty: u8) -> Self {
        self.difficulty = difficulty;
        self
    }

    pub fn with_max_amount(mut self, amount: u64) -> Self {
        self.max_amount = amount;
        self
    }

    /// Check attribute ranges before the program enters the registry.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.id.trim().is_empty() {
            return Err(ValidationError::InvalidValue {
                field: "id".into(),
                message: "program id must not be empty".into(),
            });
        }
        if !(0.0..=1.0).contains(&self.success_rate) || self.success_rate.is_nan() {
            return Err(ValidationError::InvalidValue {
                field: "success_rate".into(),
                message: format!("{} is outside 0.0-1.0", self.success_rate),
            });
        }
        if !(1..=5).contains(&self.difficulty) {
            return Err(ValidationError::InvalidValue {
                field: "difficulty".into(),
                message: format!("{} is outside 1-5", self.difficulty),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_applied_when_fields_are_missing() {
        let program: Program = serde_json::from_str(r#"{"id":"it","name":"IT Adoption"}"#).unwrap();
        assert_eq!(program.prep_weeks, 8);
        assert_eq!(program.difficulty, 3);
        assert!((program.success_rate - 0.25).abs() < f64::EPSILON);
        assert!(program.validate().is_ok());
    }

    #[test]
    fn validate_rejects_out_of_range_attributes() {
        assert!(Program::new("a", "A").with_difficulty(0).validate().is_err());
        assert!(Program::new("a", "A").with_difficulty(6).validate().is_err());
        assert!(Program::new("a", "A").with_success_rate(1.5).validate().is_err());
        assert!(Program::new(" ", "blank").validate().is_err());
    }
}
