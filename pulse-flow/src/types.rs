//! Flow and journey instance types

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use uuid::Uuid;

/// Lifecycle state of a tracked flow
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum FlowStatus {
    /// Steps are still being recorded
    Active,
    /// Explicitly completed by the host
    Completed,
    /// A step failure marked the flow as dropped off
    Abandoned,
}

/// One recorded step of a flow
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FlowStep {
    pub name: String,
    pub timestamp: DateTime<Utc>,
    /// Elapsed time since the previous step (or flow start for the first step)
    pub duration_since_last_ms: i64,
    pub success: bool,
    pub data: Option<serde_json::Value>,
}

/// A researcher's tracked multi-step flow (e.g. study creation)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FlowInstance {
    pub id: Uuid,
    /// Flow kind; selects the critical path used for completion ratios
    pub kind: String,
    pub researcher_id: String,
    pub template_id: Option<String>,
    pub start_time: DateTime<Utc>,
    pub end_time: Option<DateTime<Utc>>,
    pub steps: Vec<FlowStep>,
    /// Steps observed / critical-path step count, capped at 1.0.
    /// Non-decreasing until completion; 1.0 once completed.
    pub completion_rate: f64,
    /// First failed step name; never cleared once set
    pub drop_off_point: Option<String>,
    /// Block count reported at completion
    pub blocks_count: Option<u32>,
    pub status: FlowStatus,
}

/// Heuristic signal classification
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum SignalKind {
    /// Block duration exceeded the long-block threshold
    LongTimeOnBlock,
    /// No interactions recorded on a non-passive block
    ZeroInteractions,
}

/// A heuristic observation attached to a journey (never fails the call)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JourneySignal {
    pub kind: SignalKind,
    pub block_index: usize,
    pub block_type: String,
    pub detail: String,
}

/// One recorded block of a participant journey
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JourneyStep {
    pub block_type: String,
    pub block_index: usize,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub duration_ms: i64,
    pub interactions: u32,
    pub success: bool,
    pub data: Option<serde_json::Value>,
}

/// Device/environment descriptor supplied by the UI layer at journey start
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeviceInfo {
    pub viewport_width: u32,
    pub viewport_height: u32,
    pub user_agent: String,
}

/// A participant's tracked journey through an ordered block sequence
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JourneyInstance {
    pub id: Uuid,
    pub participant_id: String,
    pub study_id: String,
    pub total_blocks: usize,
    pub start_time: DateTime<Utc>,
    pub end_time: Option<DateTime<Utc>>,
    /// Recorded blocks keyed by index; re-recording an index replaces it
    pub steps: BTreeMap<usize, JourneyStep>,
    /// Distinct blocks that have succeeded; never decremented
    pub blocks_completed: usize,
    /// blocks_completed / total_blocks
    pub completion_rate: f64,
    /// `block_{index}_{type}` of the first failed block; never cleared
    pub drop_off_point: Option<String>,
    pub device: Option<DeviceInfo>,
    pub signals: Vec<JourneySignal>,
}

impl JourneyInstance {
    /// True once the host has explicitly completed the journey
    pub fn is_completed(&self) -> bool {
        self.end_time.is_some()
    }
}
