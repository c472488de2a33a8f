//! Rule registry
//!
//! Rules are registered per category at construction; evaluation walks the
//! ordered rule list for the requested category instead of branching on
//! category strings at call sites. Hosts may register additional rules on
//! top of the built-in set.

use std::collections::HashMap;

use pulse_common::Severity;

use crate::pricing;
use crate::types::{
    Role, RuleCategory, TransactionType, ValidationOutcome, ValidationPayload,
};

/// Predicate evaluated against a payload
///
/// Predicates are pure and must not panic; a rule that does not understand
/// the payload variant returns a neutral valid outcome.
pub type RulePredicate = Box<dyn Fn(&ValidationPayload) -> ValidationOutcome + Send + Sync>;

/// A named, categorized validation rule
pub struct Rule {
    pub name: String,
    pub category: RuleCategory,
    pub severity: Severity,
    predicate: RulePredicate,
}

impl Rule {
    pub fn new(
        name: impl Into<String>,
        category: RuleCategory,
        severity: Severity,
        predicate: impl Fn(&ValidationPayload) -> ValidationOutcome + Send + Sync + 'static,
    ) -> Self {
        Self {
            name: name.into(),
            category,
            severity,
            predicate: Box::new(predicate),
        }
    }

    /// Apply the rule's predicate to a payload
    pub fn evaluate(&self, payload: &ValidationPayload) -> ValidationOutcome {
        (self.predicate)(payload)
    }
}

impl std::fmt::Debug for Rule {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Rule")
            .field("name", &self.name)
            .field("category", &self.category)
            .field("severity", &self.severity)
            .finish()
    }
}

/// Static role → permitted-action table
///
/// This table is authoritative; the `allowed` flag on a submitted
/// [`RoleAction`](crate::types::RoleAction) is audit-only.
pub fn permitted_actions(role: Role) -> &'static [&'static str] {
    const RESEARCHER: &[&str] = &[
        "create_study",
        "edit_study",
        "publish_study",
        "view_results",
        "manage_blocks",
        "invite_participants",
    ];
    const PARTICIPANT: &[&str] = &[
        "join_study",
        "complete_block",
        "view_own_rewards",
        "withdraw_from_study",
    ];
    const ADMIN: &[&str] = &[
        "create_study",
        "edit_study",
        "publish_study",
        "view_results",
        "manage_blocks",
        "invite_participants",
        "join_study",
        "complete_block",
        "view_own_rewards",
        "withdraw_from_study",
        "manage_users",
        "adjust_points",
        "override_pricing",
    ];

    match role {
        Role::Researcher => RESEARCHER,
        Role::Participant => PARTICIPANT,
        Role::Admin => ADMIN,
    }
}

/// True when the static permission table allows `action` for `role`
pub fn is_permitted(role: Role, action: &str) -> bool {
    permitted_actions(role).contains(&action)
}

/// Registry mapping category → ordered list of rules
pub struct RuleRegistry {
    rules: HashMap<RuleCategory, Vec<Rule>>,
}

impl RuleRegistry {
    /// Registry with no rules (host populates everything)
    pub fn empty() -> Self {
        Self {
            rules: HashMap::new(),
        }
    }

    /// Registry populated with the built-in business rule set
    pub fn with_defaults() -> Self {
        let mut registry = Self::empty();
        for rule in default_rules() {
            registry.register(rule);
        }
        registry
    }

    /// Register a rule; evaluation order within a category is registration order
    pub fn register(&mut self, rule: Rule) {
        self.rules.entry(rule.category).or_default().push(rule);
    }

    /// Ordered rules for a category (empty slice if none registered)
    pub fn rules_for(&self, category: RuleCategory) -> &[Rule] {
        self.rules.get(&category).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Total number of registered rules across all categories
    pub fn rule_count(&self) -> usize {
        self.rules.values().map(Vec::len).sum()
    }
}

impl Default for RuleRegistry {
    fn default() -> Self {
        Self::with_defaults()
    }
}

// ========================================
// Built-in rules
// ========================================

fn default_rules() -> Vec<Rule> {
    vec![
        // --- points ---
        Rule::new(
            "points_amount_positive",
            RuleCategory::Points,
            Severity::High,
            |payload| {
                let ValidationPayload::Points(tx) = payload else {
                    return ValidationOutcome::valid();
                };
                if tx.amount > 0.0 {
                    ValidationOutcome::valid()
                } else {
                    ValidationOutcome::error(format!(
                        "points amount must be positive (got {})",
                        tx.amount
                    ))
                }
            },
        ),
        Rule::new(
            "points_party_references",
            RuleCategory::Points,
            Severity::Medium,
            |payload| {
                let ValidationPayload::Points(tx) = payload else {
                    return ValidationOutcome::valid();
                };
                match tx.transaction_type {
                    TransactionType::Spend | TransactionType::Transfer
                        if tx.participant_id.is_none() =>
                    {
                        ValidationOutcome::error(format!(
                            "{:?} transaction {} is missing a participant reference",
                            tx.transaction_type, tx.id
                        ))
                    }
                    _ => ValidationOutcome::valid(),
                }
            },
        ),
        Rule::new(
            "points_refund_study_reference",
            RuleCategory::Points,
            Severity::Low,
            |payload| {
                let ValidationPayload::Points(tx) = payload else {
                    return ValidationOutcome::valid();
                };
                if tx.transaction_type == TransactionType::Refund && tx.study_id.is_none() {
                    ValidationOutcome::warning(format!(
                        "refund transaction {} has no study reference",
                        tx.id
                    ))
                    .with_suggestion("link refunds to the study they reverse")
                } else {
                    ValidationOutcome::valid()
                }
            },
        ),
        // --- roles ---
        Rule::new(
            "role_permission_set",
            RuleCategory::Roles,
            Severity::Critical,
            |payload| {
                let ValidationPayload::Role(action) = payload else {
                    return ValidationOutcome::valid();
                };
                if is_permitted(action.role, &action.action) {
                    ValidationOutcome::valid()
                } else {
                    ValidationOutcome::error(format!(
                        "action '{}' is not permitted for role '{}'",
                        action.action, action.role
                    ))
                    .with_suggestion("check the role permission table before dispatching")
                }
            },
        ),
        Rule::new(
            "role_allowed_flag_consistency",
            RuleCategory::Roles,
            Severity::Medium,
            |payload| {
                let ValidationPayload::Role(action) = payload else {
                    return ValidationOutcome::valid();
                };
                let computed = is_permitted(action.role, &action.action);
                if action.allowed == computed {
                    ValidationOutcome::valid()
                } else {
                    ValidationOutcome::warning(format!(
                        "caller's allowed flag ({}) disagrees with the permission table ({})",
                        action.allowed, computed
                    ))
                }
            },
        ),
        // --- business (pricing) ---
        Rule::new(
            "pricing_blocks_count",
            RuleCategory::Business,
            Severity::Medium,
            |payload| {
                let ValidationPayload::Pricing(record) = payload else {
                    return ValidationOutcome::valid();
                };
                if record.blocks_count >= 1 {
                    ValidationOutcome::valid()
                } else {
                    ValidationOutcome::error("pricing requires at least one block")
                }
            },
        ),
        Rule::new(
            "pricing_participant_reward",
            RuleCategory::Business,
            Severity::High,
            |payload| {
                let ValidationPayload::Pricing(record) = payload else {
                    return ValidationOutcome::valid();
                };
                let expected = pricing::compute_pricing(record.study_type, record.blocks_count);
                if pricing::within_tolerance(record.participant_reward, expected.participant_reward)
                {
                    ValidationOutcome::valid()
                } else {
                    ValidationOutcome::error(format!(
                        "participant reward mismatch: expected {:.2}, got {:.2}",
                        expected.participant_reward, record.participant_reward
                    ))
                }
            },
        ),
        Rule::new(
            "pricing_researcher_cost",
            RuleCategory::Business,
            Severity::High,
            |payload| {
                let ValidationPayload::Pricing(record) = payload else {
                    return ValidationOutcome::valid();
                };
                let expected = pricing::compute_pricing(record.study_type, record.blocks_count);
                if pricing::within_tolerance(record.researcher_cost, expected.researcher_cost) {
                    ValidationOutcome::valid()
                } else {
                    ValidationOutcome::error(format!(
                        "researcher cost mismatch: expected {:.2}, got {:.2}",
                        expected.researcher_cost, record.researcher_cost
                    ))
                }
            },
        ),
        Rule::new(
            "pricing_platform_fee",
            RuleCategory::Business,
            Severity::High,
            |payload| {
                let ValidationPayload::Pricing(record) = payload else {
                    return ValidationOutcome::valid();
                };
                let expected = pricing::compute_pricing(record.study_type, record.blocks_count);
                if pricing::within_tolerance(record.platform_fee, expected.platform_fee) {
                    ValidationOutcome::valid()
                } else {
                    ValidationOutcome::error(format!(
                        "platform fee mismatch: expected {:.2}, got {:.2}",
                        expected.platform_fee, record.platform_fee
                    ))
                }
            },
        ),
        // --- data ---
        Rule::new(
            "data_completion_bounds",
            RuleCategory::Data,
            Severity::High,
            |payload| {
                let ValidationPayload::Snapshot(snapshot) = payload else {
                    return ValidationOutcome::valid();
                };
                if snapshot.participants_completed <= snapshot.participants_enrolled {
                    ValidationOutcome::valid()
                } else {
                    ValidationOutcome::error(format!(
                        "study {} reports {} completed participants but only {} enrolled",
                        snapshot.study_id,
                        snapshot.participants_completed,
                        snapshot.participants_enrolled
                    ))
                }
            },
        ),
        Rule::new(
            "data_orphaned_responses",
            RuleCategory::Data,
            Severity::Medium,
            |payload| {
                let ValidationPayload::Snapshot(snapshot) = payload else {
                    return ValidationOutcome::valid();
                };
                if snapshot.orphaned_responses == 0 {
                    ValidationOutcome::valid()
                } else {
                    ValidationOutcome::error(format!(
                        "study {} has {} orphaned responses",
                        snapshot.study_id, snapshot.orphaned_responses
                    ))
                    .with_suggestion("run the response reconciliation job")
                }
            },
        ),
        Rule::new(
            "data_response_volume",
            RuleCategory::Data,
            Severity::Low,
            |payload| {
                let ValidationPayload::Snapshot(snapshot) = payload else {
                    return ValidationOutcome::valid();
                };
                if snapshot.participants_completed > 0
                    && snapshot.total_responses < snapshot.participants_completed
                {
                    ValidationOutcome::warning(format!(
                        "study {} has fewer responses ({}) than completed participants ({})",
                        snapshot.study_id, snapshot.total_responses, snapshot.participants_completed
                    ))
                } else {
                    ValidationOutcome::valid()
                }
            },
        ),
        // --- security ---
        Rule::new(
            "security_large_earn",
            RuleCategory::Security,
            Severity::Medium,
            |payload| {
                let ValidationPayload::Points(tx) = payload else {
                    return ValidationOutcome::valid();
                };
                if tx.transaction_type == TransactionType::Earn && tx.amount > 1000.0 {
                    ValidationOutcome::warning(format!(
                        "unusually large earn of {} points in transaction {}",
                        tx.amount, tx.id
                    ))
                    .with_suggestion("review the transaction for fraud")
                } else {
                    ValidationOutcome::valid()
                }
            },
        ),
        Rule::new(
            "security_sensitive_admin_action",
            RuleCategory::Security,
            Severity::Medium,
            |payload| {
                let ValidationPayload::Role(action) = payload else {
                    return ValidationOutcome::valid();
                };
                if action.role == Role::Admin
                    && matches!(action.action.as_str(), "adjust_points" | "override_pricing")
                {
                    ValidationOutcome::warning(format!(
                        "sensitive admin action '{}' on {}",
                        action.action, action.resource
                    ))
                    .with_suggestion("confirm an audit trail entry exists")
                } else {
                    ValidationOutcome::valid()
                }
            },
        ),
    ]
}
