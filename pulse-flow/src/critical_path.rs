//! Critical path templates
//!
//! A critical path is a named ordered template of expected steps, an expected
//! duration, and a success threshold. Raw step sequences are interpreted
//! against the path of their flow kind: completion ratio is steps observed
//! over path length, and a finished flow is "successful" when its completion
//! rate meets the threshold.

use serde::{Deserialize, Serialize};

/// Named ordered template for a flow kind
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CriticalPath {
    pub name: String,
    /// Expected step names, in order
    pub steps: Vec<String>,
    pub expected_duration_ms: i64,
    /// Completion rate a flow must reach to count as successful, in (0, 1]
    pub success_threshold: f64,
}

impl CriticalPath {
    pub fn new(
        name: impl Into<String>,
        steps: &[&str],
        expected_duration_ms: i64,
        success_threshold: f64,
    ) -> Self {
        Self {
            name: name.into(),
            steps: steps.iter().map(|s| s.to_string()).collect(),
            expected_duration_ms,
            success_threshold: success_threshold.clamp(f64::MIN_POSITIVE, 1.0),
        }
    }

    /// Built-in path for the study-creation flow
    pub fn study_creation() -> Self {
        Self::new(
            "study_creation",
            &[
                "template_selection",
                "study_setup",
                "block_configuration",
                "review",
                "launch",
            ],
            600_000,
            0.8,
        )
    }

    /// All built-in paths, registered at tracker construction
    pub fn defaults() -> Vec<Self> {
        vec![Self::study_creation()]
    }

    pub fn step_count(&self) -> usize {
        self.steps.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_study_creation_path_shape() {
        let path = CriticalPath::study_creation();
        assert_eq!(path.step_count(), 5);
        assert_eq!(path.steps[0], "template_selection");
        assert_eq!(path.steps[4], "launch");
        assert_eq!(path.expected_duration_ms, 600_000);
        assert_eq!(path.success_threshold, 0.8);
    }

    #[test]
    fn test_threshold_is_clamped() {
        let path = CriticalPath::new("k", &["a"], 1000, 1.5);
        assert_eq!(path.success_threshold, 1.0);
        let path = CriticalPath::new("k", &["a"], 1000, 0.0);
        assert!(path.success_threshold > 0.0);
    }
}
