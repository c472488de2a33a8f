//! Deterministic study pricing
//!
//! Pricing is a pure function of `(study_type, blocks_count)`:
//!
//! ```text
//! participant_reward = min(base_reward + blocks × per_block_reward, max_reward)
//! base_cost_total    = base_cost + blocks × per_block_cost
//! platform_fee       = base_cost_total × FEE_RATE
//! researcher_cost    = base_cost_total + platform_fee
//! ```
//!
//! A submitted [`PricingRecord`](crate::types::PricingRecord) is valid only
//! when each monetary field is within [`PRICE_TOLERANCE`] of the computed
//! value. The tables below are the product source of truth; tests pin them.

use crate::types::StudyType;
use serde::{Deserialize, Serialize};

/// Platform fee rate applied to the total base cost (both study types)
pub const FEE_RATE: f64 = 0.15;

/// Maximum allowed deviation between a submitted and a computed amount
pub const PRICE_TOLERANCE: f64 = 0.01;

/// Per-study-type pricing table
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PricingTable {
    pub base_reward: f64,
    pub per_block_reward: f64,
    pub max_reward: f64,
    pub base_cost: f64,
    pub per_block_cost: f64,
}

const UNMODERATED: PricingTable = PricingTable {
    base_reward: 5.0,
    per_block_reward: 1.0,
    max_reward: 50.0,
    base_cost: 10.0,
    per_block_cost: 2.0,
};

const MODERATED: PricingTable = PricingTable {
    base_reward: 20.0,
    per_block_reward: 2.0,
    max_reward: 100.0,
    base_cost: 30.0,
    per_block_cost: 5.0,
};

/// Look up the pricing table for a study type
pub fn table_for(study_type: StudyType) -> PricingTable {
    match study_type {
        StudyType::Unmoderated => UNMODERATED,
        StudyType::Moderated => MODERATED,
    }
}

/// The three derived amounts for a study configuration
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct ComputedPricing {
    pub participant_reward: f64,
    pub base_cost: f64,
    pub platform_fee: f64,
    pub researcher_cost: f64,
}

/// Compute the canonical pricing for a study configuration
pub fn compute_pricing(study_type: StudyType, blocks_count: u32) -> ComputedPricing {
    let table = table_for(study_type);
    let blocks = blocks_count as f64;

    let participant_reward =
        (table.base_reward + blocks * table.per_block_reward).min(table.max_reward);
    let base_cost = table.base_cost + blocks * table.per_block_cost;
    let platform_fee = base_cost * FEE_RATE;
    let researcher_cost = base_cost + platform_fee;

    ComputedPricing {
        participant_reward,
        base_cost,
        platform_fee,
        researcher_cost,
    }
}

/// True when `submitted` matches `expected` within [`PRICE_TOLERANCE`]
pub fn within_tolerance(submitted: f64, expected: f64) -> bool {
    (submitted - expected).abs() <= PRICE_TOLERANCE
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unmoderated_pricing() {
        let pricing = compute_pricing(StudyType::Unmoderated, 5);
        assert_eq!(pricing.participant_reward, 10.0); // 5 + 5×1
        assert_eq!(pricing.base_cost, 20.0); // 10 + 5×2
        assert_eq!(pricing.platform_fee, 3.0); // 20 × 0.15
        assert_eq!(pricing.researcher_cost, 23.0); // 20 + 3
    }

    #[test]
    fn test_moderated_pricing() {
        let pricing = compute_pricing(StudyType::Moderated, 4);
        assert_eq!(pricing.participant_reward, 28.0); // 20 + 4×2
        assert_eq!(pricing.base_cost, 50.0); // 30 + 4×5
        assert_eq!(pricing.platform_fee, 7.5); // 50 × 0.15
        assert_eq!(pricing.researcher_cost, 57.5);
    }

    #[test]
    fn test_reward_is_capped() {
        // 5 + 60×1 = 65 exceeds the 50.0 unmoderated cap
        let pricing = compute_pricing(StudyType::Unmoderated, 60);
        assert_eq!(pricing.participant_reward, 50.0);

        // Cost fields are not capped
        assert_eq!(pricing.base_cost, 130.0);
    }

    #[test]
    fn test_researcher_cost_identity() {
        // researcher_cost = base_cost × (1 + FEE_RATE) for every configuration
        for blocks in 0..30 {
            for study_type in [StudyType::Unmoderated, StudyType::Moderated] {
                let pricing = compute_pricing(study_type, blocks);
                let expected = pricing.base_cost * (1.0 + FEE_RATE);
                assert!((pricing.researcher_cost - expected).abs() < 1e-9);
            }
        }
    }

    #[test]
    fn test_tolerance_boundaries() {
        assert!(within_tolerance(23.0, 23.0));
        assert!(within_tolerance(23.009, 23.0));
        assert!(within_tolerance(22.991, 23.0));
        assert!(!within_tolerance(23.02, 23.0));
        assert!(!within_tolerance(22.98, 23.0));
    }

    #[test]
    fn test_zero_blocks() {
        let pricing = compute_pricing(StudyType::Unmoderated, 0);
        assert_eq!(pricing.participant_reward, 5.0);
        assert_eq!(pricing.base_cost, 10.0);
        assert_eq!(pricing.platform_fee, 1.5);
        assert_eq!(pricing.researcher_cost, 11.5);
    }
}
