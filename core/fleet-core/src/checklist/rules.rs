//! Rotation policy construction and invariant checks.

use std::collections::HashSet;

use crate::error::RotationError;
use crate::types::RotationRules;

impl RotationRules {
    /// Builds a policy, rejecting combinations that can never be satisfied.
    pub fn new(
        max_questions_per_check: u32,
        required_categories: Vec<String>,
        critical_question_minimum: u32,
        standard_question_maximum: u32,
    ) -> Result<Self, RotationError> {
        let rules = Self {
            max_questions_per_check,
            required_categories,
            critical_question_minimum,
            standard_question_maximum,
        };
        rules.validate()?;
        Ok(rules)
    }

    /// Re-checks the invariants. Records arriving over FFI or from JSON bypass `new`.
    pub fn validate(&self) -> Result<(), RotationError> {
        let invalid = |reason: String| Err(RotationError::InvalidRules { reason });

        if self.max_questions_per_check == 0 {
            return invalid("max_questions_per_check must be at least 1".to_string());
        }

        let slots = self
            .critical_question_minimum
            .saturating_add(self.standard_question_maximum);
        if slots > self.max_questions_per_check {
            return invalid(format!(
                "critical minimum ({}) + standard maximum ({}) exceeds {} questions per check",
                self.critical_question_minimum,
                self.standard_question_maximum,
                self.max_questions_per_check
            ));
        }

        if self.required_categories.len() > self.max_questions_per_check as usize {
            return invalid(format!(
                "{} required categories cannot fit in {} questions per check",
                self.required_categories.len(),
                self.max_questions_per_check
            ));
        }

        let mut seen = HashSet::new();
        for category in &self.required_categories {
            if category.trim().is_empty() {
                return invalid("required category names cannot be blank".to_string());
            }
            if !seen.insert(category.as_str()) {
                return invalid(format!("required category {:?} listed twice", category));
            }
        }

        Ok(())
    }

    pub fn is_required_category(&self, category: &str) -> bool {
        self.required_categories.iter().any(|c| c == category)
    }
}
