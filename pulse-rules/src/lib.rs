//! # StudyPulse Rule Validator
//!
//! Evaluates domain events (point transactions, role-gated actions, computed
//! pricing, dataset snapshots) against a registry of categorized business
//! rules, returning pass/warn/fail outcomes and accumulating a rolling
//! validation history.
//!
//! Rules never throw: an invalid payload fails its rule and the remaining
//! rules in the batch still run. The caller decides whether an invalid
//! outcome blocks the underlying business operation.

pub mod pricing;
pub mod registry;
pub mod types;
pub mod validator;

pub use registry::{Rule, RuleRegistry};
pub use types::{
    DataSnapshot, PointsTransaction, PricingRecord, Role, RoleAction, RuleCategory, StudyType,
    TransactionType, ValidationOutcome, ValidationPayload,
};
pub use validator::{RuleValidator, ValidationHistoryEntry, ValidationStats};
