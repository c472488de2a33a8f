//! Rule validator
//!
//! Front door for business-invariant validation: looks up the registered
//! rules for a category, applies each predicate, folds the outcomes, and
//! appends one history entry per `validate` call. Invalid or warning
//! outcomes are logged and broadcast fire-and-forget; they never become
//! errors for the caller.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use pulse_common::{BoundedLog, Clock, EngineConfig, EventBus, PulseEvent, Severity};

use crate::registry::{Rule, RuleRegistry};
use crate::types::{
    DataSnapshot, PointsTransaction, PricingRecord, RoleAction, RuleCategory, ValidationOutcome,
    ValidationPayload,
};

/// Number of history entries the statistics window covers
const STATS_WINDOW: usize = 100;

/// Number of critical failures reported by the statistics
const CRITICAL_FAILURE_LIMIT: usize = 10;

/// One validate call, as remembered by the rolling history
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidationHistoryEntry {
    pub timestamp: DateTime<Utc>,
    pub category: RuleCategory,
    /// Names of rules that produced errors
    pub failed_rules: Vec<String>,
    /// Names of rules that produced warnings only
    pub warned_rules: Vec<String>,
    /// Highest severity among rules with findings (None if all passed clean)
    pub max_severity: Option<Severity>,
    pub outcome: ValidationOutcome,
}

/// Per-category aggregates over the statistics window
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct CategoryStats {
    pub total: usize,
    pub errors: usize,
    pub warnings: usize,
}

/// Aggregated validation statistics
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidationStats {
    /// Entries currently held in the (bounded) history
    pub total_validations: usize,
    /// Entries in the recent window (at most [`STATS_WINDOW`])
    pub recent_count: usize,
    /// Fraction of recent validations with `is_valid = false`
    pub error_rate: f64,
    /// Per-category breakdown of the recent window
    pub by_category: HashMap<RuleCategory, CategoryStats>,
    /// Most recent critical-severity failures, newest first
    pub recent_critical_failures: Vec<ValidationHistoryEntry>,
    /// Derived advice for the operator
    pub recommendations: Vec<String>,
}

/// Rule-based business-invariant validator
pub struct RuleValidator {
    registry: RuleRegistry,
    history: BoundedLog<ValidationHistoryEntry>,
    clock: Arc<dyn Clock>,
    bus: EventBus,
}

impl RuleValidator {
    /// Validator with the built-in rule set
    pub fn new(config: &EngineConfig, clock: Arc<dyn Clock>, bus: EventBus) -> Self {
        Self::with_registry(RuleRegistry::with_defaults(), config, clock, bus)
    }

    /// Validator with a caller-supplied registry
    pub fn with_registry(
        registry: RuleRegistry,
        config: &EngineConfig,
        clock: Arc<dyn Clock>,
        bus: EventBus,
    ) -> Self {
        Self {
            registry,
            history: BoundedLog::new(config.validation_history_cap),
            clock,
            bus,
        }
    }

    /// Register an additional rule on top of the current set
    pub fn register_rule(&mut self, rule: Rule) {
        self.registry.register(rule);
    }

    /// Validate a payload against every rule registered for `category`
    ///
    /// All rules run regardless of individual failures; the returned outcome
    /// is the union of messages with `is_valid` ANDed across rules. Exactly
    /// one history entry is appended per call.
    pub fn validate(
        &mut self,
        category: RuleCategory,
        payload: &ValidationPayload,
    ) -> ValidationOutcome {
        let mut outcome = ValidationOutcome::valid();
        let mut failed_rules = Vec::new();
        let mut warned_rules = Vec::new();
        let mut max_severity: Option<Severity> = None;

        for rule in self.registry.rules_for(category) {
            let result = rule.evaluate(payload);
            if !result.is_valid {
                failed_rules.push(rule.name.clone());
                max_severity = Some(max_severity.map_or(rule.severity, |s| s.max(rule.severity)));
            } else if result.has_warnings() {
                warned_rules.push(rule.name.clone());
                max_severity = Some(max_severity.map_or(rule.severity, |s| s.max(rule.severity)));
            }
            outcome.merge(result);
        }

        let timestamp = self.clock.now();
        self.history.push(ValidationHistoryEntry {
            timestamp,
            category,
            failed_rules: failed_rules.clone(),
            warned_rules,
            max_severity,
            outcome: outcome.clone(),
        });

        if !outcome.is_valid || outcome.has_warnings() {
            warn!(
                category = %category,
                valid = outcome.is_valid,
                errors = outcome.errors.len(),
                warnings = outcome.warnings.len(),
                "validation produced findings"
            );
            self.bus.emit_lossy(PulseEvent::ValidationFailed {
                category: category.to_string(),
                failed_rules,
                severity: max_severity.unwrap_or(Severity::Low),
                errors: outcome.errors.clone(),
                warnings: outcome.warnings.clone(),
                timestamp,
            });
        } else {
            debug!(category = %category, "validation passed");
        }

        outcome
    }

    /// Validate a points transaction (points rules plus security screening)
    pub fn validate_points_transaction(&mut self, tx: &PointsTransaction) -> ValidationOutcome {
        let payload = ValidationPayload::Points(tx.clone());
        let mut outcome = self.validate(RuleCategory::Points, &payload);
        outcome.merge(self.validate(RuleCategory::Security, &payload));
        outcome
    }

    /// Validate a role-gated action (role rules plus security screening)
    pub fn validate_role_action(&mut self, action: &RoleAction) -> ValidationOutcome {
        let payload = ValidationPayload::Role(action.clone());
        let mut outcome = self.validate(RuleCategory::Roles, &payload);
        outcome.merge(self.validate(RuleCategory::Security, &payload));
        outcome
    }

    /// Validate a computed pricing record against the canonical pricing
    pub fn validate_study_pricing(&mut self, record: &PricingRecord) -> ValidationOutcome {
        let payload = ValidationPayload::Pricing(record.clone());
        self.validate(RuleCategory::Business, &payload)
    }

    /// Validate a dataset snapshot for internal consistency
    pub fn validate_data_consistency(&mut self, snapshot: &DataSnapshot) -> ValidationOutcome {
        let payload = ValidationPayload::Snapshot(snapshot.clone());
        self.validate(RuleCategory::Data, &payload)
    }

    /// Read-only access to the rolling history
    pub fn history(&self) -> &BoundedLog<ValidationHistoryEntry> {
        &self.history
    }

    /// Aggregate the recent history into operator-facing statistics
    pub fn get_validation_stats(&self) -> ValidationStats {
        let recent: Vec<&ValidationHistoryEntry> =
            self.history.iter_rev().take(STATS_WINDOW).collect();
        let recent_count = recent.len();

        let invalid_count = recent.iter().filter(|e| !e.outcome.is_valid).count();
        let error_rate = if recent_count > 0 {
            invalid_count as f64 / recent_count as f64
        } else {
            0.0
        };

        let mut by_category: HashMap<RuleCategory, CategoryStats> = HashMap::new();
        for entry in &recent {
            let stats = by_category.entry(entry.category).or_default();
            stats.total += 1;
            if !entry.outcome.is_valid {
                stats.errors += 1;
            }
            if entry.outcome.has_warnings() {
                stats.warnings += 1;
            }
        }

        let recent_critical_failures: Vec<ValidationHistoryEntry> = self
            .history
            .iter_rev()
            .filter(|e| !e.outcome.is_valid && e.max_severity == Some(Severity::Critical))
            .take(CRITICAL_FAILURE_LIMIT)
            .cloned()
            .collect();

        let mut recommendations = Vec::new();
        if error_rate > 0.10 {
            recommendations.push(
                "High validation error rate - review business rules and recent changes"
                    .to_string(),
            );
        }
        let points_errors = by_category
            .get(&RuleCategory::Points)
            .map(|s| s.errors)
            .unwrap_or(0);
        if points_errors > 5 {
            recommendations
                .push("Frequent points failures - review points calculation logic".to_string());
        }
        let security_findings = by_category
            .get(&RuleCategory::Security)
            .map(|s| s.errors + s.warnings)
            .unwrap_or(0);
        if security_findings > 0 {
            recommendations.push(
                "Security findings present - audit role permissions and large transactions"
                    .to_string(),
            );
        }

        ValidationStats {
            total_validations: self.history.len(),
            recent_count,
            error_rate,
            by_category,
            recent_critical_failures,
            recommendations,
        }
    }
}
