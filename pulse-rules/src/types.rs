//! Domain payload and outcome types for rule validation

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Rule category
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum RuleCategory {
    Points,
    Roles,
    Data,
    Security,
    Business,
}

impl std::fmt::Display for RuleCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RuleCategory::Points => write!(f, "points"),
            RuleCategory::Roles => write!(f, "roles"),
            RuleCategory::Data => write!(f, "data"),
            RuleCategory::Security => write!(f, "security"),
            RuleCategory::Business => write!(f, "business"),
        }
    }
}

impl RuleCategory {
    /// All categories, in stats-reporting order
    pub const ALL: [RuleCategory; 5] = [
        RuleCategory::Points,
        RuleCategory::Roles,
        RuleCategory::Data,
        RuleCategory::Security,
        RuleCategory::Business,
    ];
}

/// Result of validating a payload against one or more rules
///
/// Outcomes compose: validating against N rules yields the union of all
/// errors/warnings/suggestions with `is_valid` the AND of the rule results.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ValidationOutcome {
    pub is_valid: bool,
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
    pub suggestions: Vec<String>,
}

impl ValidationOutcome {
    /// Outcome with no findings
    pub fn valid() -> Self {
        Self {
            is_valid: true,
            errors: Vec::new(),
            warnings: Vec::new(),
            suggestions: Vec::new(),
        }
    }

    /// Invalid outcome with a single error message
    pub fn error(message: impl Into<String>) -> Self {
        Self {
            is_valid: false,
            errors: vec![message.into()],
            warnings: Vec::new(),
            suggestions: Vec::new(),
        }
    }

    /// Valid outcome carrying a warning
    pub fn warning(message: impl Into<String>) -> Self {
        Self {
            is_valid: true,
            errors: Vec::new(),
            warnings: vec![message.into()],
            suggestions: Vec::new(),
        }
    }

    /// Attach a suggestion to this outcome
    pub fn with_suggestion(mut self, suggestion: impl Into<String>) -> Self {
        self.suggestions.push(suggestion.into());
        self
    }

    /// Fold another outcome into this one (union of messages, AND of validity)
    pub fn merge(&mut self, other: ValidationOutcome) {
        self.is_valid = self.is_valid && other.is_valid;
        self.errors.extend(other.errors);
        self.warnings.extend(other.warnings);
        self.suggestions.extend(other.suggestions);
    }

    /// True if the outcome has any warning (valid or not)
    pub fn has_warnings(&self) -> bool {
        !self.warnings.is_empty()
    }
}

/// Point transaction type
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum TransactionType {
    Earn,
    Spend,
    Transfer,
    Refund,
}

/// A points ledger transaction submitted for validation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PointsTransaction {
    pub id: String,
    pub transaction_type: TransactionType,
    /// Points amount; must be positive for every transaction type
    pub amount: f64,
    pub participant_id: Option<String>,
    pub researcher_id: Option<String>,
    pub study_id: Option<String>,
    pub timestamp: DateTime<Utc>,
}

/// Platform role
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Researcher,
    Participant,
    Admin,
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Role::Researcher => write!(f, "researcher"),
            Role::Participant => write!(f, "participant"),
            Role::Admin => write!(f, "admin"),
        }
    }
}

/// A role-gated action submitted for validation
///
/// `allowed` is the caller's own authorization answer. It is audit-only:
/// validation consults the static permission table, not this flag.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoleAction {
    pub user_id: String,
    pub role: Role,
    pub action: String,
    pub resource: String,
    pub timestamp: DateTime<Utc>,
    pub allowed: bool,
}

/// Study moderation type, which selects the pricing table
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum StudyType {
    Unmoderated,
    Moderated,
}

/// A computed study pricing record submitted for validation
///
/// Each monetary field must match the deterministic pricing function of
/// `(study_type, blocks_count)` within a fixed tolerance.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PricingRecord {
    pub study_id: String,
    pub blocks_count: u32,
    pub study_type: StudyType,
    pub participant_reward: f64,
    pub researcher_cost: f64,
    pub platform_fee: f64,
}

/// A dataset snapshot submitted for consistency validation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DataSnapshot {
    pub study_id: String,
    pub participants_enrolled: u32,
    pub participants_completed: u32,
    pub blocks_count: u32,
    pub total_responses: u32,
    /// Responses referencing a participant or block that no longer exists
    pub orphaned_responses: u32,
}

/// Closed union of payloads a rule predicate can receive
///
/// Rules match on the variant they understand and return a neutral valid
/// outcome for the others, so a registry category may mix payload shapes.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ValidationPayload {
    Points(PointsTransaction),
    Role(RoleAction),
    Pricing(PricingRecord),
    Snapshot(DataSnapshot),
}
