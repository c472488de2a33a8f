//! Flow and journey tracking
//!
//! Shared in-memory instance maps mutated by synchronous ingestion calls and
//! read by the periodic analysis/sweep tasks. Drop-off detection, heuristic
//! signals, and completion events are all side effects of ingestion; none of
//! them can fail the ingesting call.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};
use uuid::Uuid;

use pulse_common::events::FlowEfficiency;
use pulse_common::{Clock, EngineConfig, EventBus, PulseEvent};

use crate::critical_path::CriticalPath;
use crate::types::{
    DeviceInfo, FlowInstance, FlowStatus, FlowStep, JourneyInstance, JourneySignal, JourneyStep,
    SignalKind,
};

/// Flow kind used by the study-creation convenience surface
pub const STUDY_CREATION_KIND: &str = "study_creation";

/// Block duration beyond which a journey block is flagged (ms)
const LONG_BLOCK_MS: i64 = 180_000;

/// Block type that legitimately receives zero interactions
const PASSIVE_BLOCK_TYPE: &str = "context_screen";

/// A drop-off point with its observed frequency
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DropOffCount {
    pub point: String,
    pub count: usize,
}

/// Cross-kind overview produced by the periodic trend analysis
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FlowAnalytics {
    pub active_flows: usize,
    pub completed_flows: usize,
    pub abandoned_flows: usize,
    pub active_journeys: usize,
    pub completed_journeys: usize,
    /// Mean completion rate per flow kind
    pub avg_completion_rate_by_kind: HashMap<String, f64>,
    /// Mean completion rate across all journeys
    pub avg_journey_completion: f64,
    /// Most frequent drop-off points across flows and journeys
    pub top_drop_off_points: Vec<DropOffCount>,
}

/// Critical-path conformance report for one flow kind
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FlowPerformance {
    pub kind: String,
    pub instances: usize,
    pub completed: usize,
    /// Mean wall-clock duration of completed instances (ms)
    pub avg_duration_ms: f64,
    /// Fraction of instances meeting the critical path's success threshold
    pub success_rate: f64,
    /// Top-5 drop-off points, frequency-ranked (ties by first occurrence)
    pub top_drop_offs: Vec<DropOffCount>,
}

/// Flow & journey tracker
pub struct FlowTracker {
    flows: HashMap<Uuid, FlowInstance>,
    journeys: HashMap<Uuid, JourneyInstance>,
    critical_paths: HashMap<String, CriticalPath>,
    retention: Duration,
    clock: Arc<dyn Clock>,
    bus: EventBus,
}

impl FlowTracker {
    pub fn new(config: &EngineConfig, clock: Arc<dyn Clock>, bus: EventBus) -> Self {
        let mut critical_paths = HashMap::new();
        for path in CriticalPath::defaults() {
            critical_paths.insert(path.name.clone(), path);
        }
        Self {
            flows: HashMap::new(),
            journeys: HashMap::new(),
            critical_paths,
            retention: Duration::hours(config.retention_hours),
            clock,
            bus,
        }
    }

    /// Register or replace a critical path for a flow kind
    pub fn register_critical_path(&mut self, path: CriticalPath) {
        self.critical_paths.insert(path.name.clone(), path);
    }

    // ========================================
    // Study-creation flows
    // ========================================

    /// Start tracking a study-creation flow; returns the flow id
    pub fn track_study_creation(
        &mut self,
        researcher_id: &str,
        template_id: Option<&str>,
    ) -> Uuid {
        let id = Uuid::new_v4();
        let now = self.clock.now();
        self.flows.insert(
            id,
            FlowInstance {
                id,
                kind: STUDY_CREATION_KIND.to_string(),
                researcher_id: researcher_id.to_string(),
                template_id: template_id.map(str::to_string),
                start_time: now,
                end_time: None,
                steps: Vec::new(),
                completion_rate: 0.0,
                drop_off_point: None,
                blocks_count: None,
                status: FlowStatus::Active,
            },
        );
        debug!(flow_id = %id, researcher_id, "study creation flow started");
        id
    }

    /// Record one step of a tracked flow
    ///
    /// Unknown flow ids are a silent no-op. A failed step sets the flow's
    /// drop-off point (first failure only) and marks it abandoned.
    pub fn track_study_step(
        &mut self,
        flow_id: Uuid,
        step_name: &str,
        data: Option<serde_json::Value>,
        success: bool,
    ) {
        let now = self.clock.now();
        let path_steps = self.path_step_count(STUDY_CREATION_KIND);

        let Some(flow) = self.flows.get_mut(&flow_id) else {
            debug!(%flow_id, step_name, "step for unknown flow ignored");
            return;
        };

        let last_at = flow
            .steps
            .last()
            .map(|s| s.timestamp)
            .unwrap_or(flow.start_time);
        flow.steps.push(FlowStep {
            name: step_name.to_string(),
            timestamp: now,
            duration_since_last_ms: (now - last_at).num_milliseconds(),
            success,
            data,
        });

        if path_steps > 0 && flow.status != FlowStatus::Completed {
            flow.completion_rate =
                (flow.steps.len() as f64 / path_steps as f64).min(1.0);
        }

        if !success && flow.drop_off_point.is_none() {
            flow.drop_off_point = Some(step_name.to_string());
            flow.status = FlowStatus::Abandoned;
            warn!(
                %flow_id,
                step_name,
                completion_rate = flow.completion_rate,
                "flow drop-off detected"
            );
            self.bus.emit_lossy(PulseEvent::FlowDropOff {
                flow_id,
                kind: flow.kind.clone(),
                step: step_name.to_string(),
                completion_rate: flow.completion_rate,
                timestamp: now,
            });
        }
    }

    /// Mark a flow as completed
    ///
    /// Stamps the end time, forces the completion rate to 1.0, and classifies
    /// efficiency against the critical path's expected duration.
    pub fn complete_study_creation(&mut self, flow_id: Uuid, blocks_count: u32) {
        let now = self.clock.now();
        let expected = self
            .critical_paths
            .get(STUDY_CREATION_KIND)
            .map(|p| p.expected_duration_ms)
            .unwrap_or(i64::MAX);

        let Some(flow) = self.flows.get_mut(&flow_id) else {
            debug!(%flow_id, "completion for unknown flow ignored");
            return;
        };

        flow.end_time = Some(now);
        flow.completion_rate = 1.0;
        flow.blocks_count = Some(blocks_count);
        flow.status = FlowStatus::Completed;

        let duration_ms = (now - flow.start_time).num_milliseconds();
        let efficiency = if duration_ms < expected {
            FlowEfficiency::High
        } else {
            FlowEfficiency::Low
        };

        info!(%flow_id, duration_ms, ?efficiency, "flow completed");
        self.bus.emit_lossy(PulseEvent::FlowCompleted {
            flow_id,
            kind: flow.kind.clone(),
            duration_ms,
            efficiency,
            timestamp: now,
        });
    }

    // ========================================
    // Participant journeys
    // ========================================

    /// Start tracking a participant journey; returns the journey id
    pub fn track_participant_journey(
        &mut self,
        participant_id: &str,
        study_id: &str,
        total_blocks: usize,
        device: Option<DeviceInfo>,
    ) -> Uuid {
        let id = Uuid::new_v4();
        let now = self.clock.now();
        self.journeys.insert(
            id,
            JourneyInstance {
                id,
                participant_id: participant_id.to_string(),
                study_id: study_id.to_string(),
                total_blocks,
                start_time: now,
                end_time: None,
                steps: Default::default(),
                blocks_completed: 0,
                completion_rate: 0.0,
                drop_off_point: None,
                device,
                signals: Vec::new(),
            },
        );
        debug!(journey_id = %id, participant_id, study_id, total_blocks, "journey started");
        id
    }

    /// Record one block of a tracked journey
    ///
    /// Supports out-of-order and repeated recording: the last write for a
    /// block index wins. `blocks_completed` only ever increases — a block
    /// counts once when it first succeeds and a later failure at the same
    /// index does not un-count it.
    #[allow(clippy::too_many_arguments)]
    pub fn track_participant_block(
        &mut self,
        journey_id: Uuid,
        block_type: &str,
        block_index: usize,
        start_time: DateTime<Utc>,
        interactions: u32,
        success: bool,
        data: Option<serde_json::Value>,
    ) {
        let now = self.clock.now();

        let Some(journey) = self.journeys.get_mut(&journey_id) else {
            debug!(%journey_id, block_index, "block for unknown journey ignored");
            return;
        };

        let duration_ms = (now - start_time).num_milliseconds();

        if duration_ms > LONG_BLOCK_MS {
            journey.signals.push(JourneySignal {
                kind: SignalKind::LongTimeOnBlock,
                block_index,
                block_type: block_type.to_string(),
                detail: format!("{} ms on block {}", duration_ms, block_index),
            });
            debug!(%journey_id, block_index, duration_ms, "long time on block");
        }
        if interactions == 0 && block_type != PASSIVE_BLOCK_TYPE {
            journey.signals.push(JourneySignal {
                kind: SignalKind::ZeroInteractions,
                block_index,
                block_type: block_type.to_string(),
                detail: format!("no interactions on {} block {}", block_type, block_index),
            });
            debug!(%journey_id, block_index, block_type, "zero interactions on block");
        }

        let previously_succeeded = journey
            .steps
            .get(&block_index)
            .map(|s| s.success)
            .unwrap_or(false);

        journey.steps.insert(
            block_index,
            JourneyStep {
                block_type: block_type.to_string(),
                block_index,
                start_time,
                end_time: now,
                duration_ms,
                interactions,
                success,
                data,
            },
        );

        if success && !previously_succeeded {
            journey.blocks_completed += 1;
            if journey.total_blocks > 0 {
                journey.completion_rate =
                    journey.blocks_completed as f64 / journey.total_blocks as f64;
            }
        }

        if !success && journey.drop_off_point.is_none() {
            let point = format!("block_{}_{}", block_index, block_type);
            journey.drop_off_point = Some(point.clone());
            warn!(
                %journey_id,
                drop_off_point = %point,
                blocks_completed = journey.blocks_completed,
                "journey drop-off detected"
            );
            self.bus.emit_lossy(PulseEvent::JourneyDropOff {
                journey_id,
                participant_id: journey.participant_id.clone(),
                study_id: journey.study_id.clone(),
                drop_off_point: point,
                blocks_completed: journey.blocks_completed,
                timestamp: now,
            });
        }
    }

    /// Mark a journey as completed (stamps the end time)
    pub fn complete_participant_journey(&mut self, journey_id: Uuid) {
        let now = self.clock.now();
        let Some(journey) = self.journeys.get_mut(&journey_id) else {
            debug!(%journey_id, "completion for unknown journey ignored");
            return;
        };
        journey.end_time = Some(now);
        info!(
            %journey_id,
            blocks_completed = journey.blocks_completed,
            completion_rate = journey.completion_rate,
            "journey completed"
        );
    }

    // ========================================
    // Analytics
    // ========================================

    /// Cross-kind overview of all tracked instances
    pub fn get_flow_analytics(&self) -> FlowAnalytics {
        let active_flows = self
            .flows
            .values()
            .filter(|f| f.status == FlowStatus::Active)
            .count();
        let completed_flows = self
            .flows
            .values()
            .filter(|f| f.status == FlowStatus::Completed)
            .count();
        let abandoned_flows = self
            .flows
            .values()
            .filter(|f| f.status == FlowStatus::Abandoned)
            .count();

        let active_journeys = self.journeys.values().filter(|j| !j.is_completed()).count();
        let completed_journeys = self.journeys.values().filter(|j| j.is_completed()).count();

        let mut rate_sums: HashMap<String, (f64, usize)> = HashMap::new();
        for flow in self.flows.values() {
            let entry = rate_sums.entry(flow.kind.clone()).or_insert((0.0, 0));
            entry.0 += flow.completion_rate;
            entry.1 += 1;
        }
        let avg_completion_rate_by_kind = rate_sums
            .into_iter()
            .map(|(kind, (sum, n))| (kind, sum / n as f64))
            .collect();

        let avg_journey_completion = if self.journeys.is_empty() {
            0.0
        } else {
            self.journeys
                .values()
                .map(|j| j.completion_rate)
                .sum::<f64>()
                / self.journeys.len() as f64
        };

        let flow_drop_offs = self
            .flows
            .values()
            .filter_map(|f| f.drop_off_point.clone().map(|p| (p, f.start_time)));
        let journey_drop_offs = self
            .journeys
            .values()
            .filter_map(|j| j.drop_off_point.clone().map(|p| (p, j.start_time)));
        let top_drop_off_points =
            rank_drop_offs(flow_drop_offs.chain(journey_drop_offs), 5);

        FlowAnalytics {
            active_flows,
            completed_flows,
            abandoned_flows,
            active_journeys,
            completed_journeys,
            avg_completion_rate_by_kind,
            avg_journey_completion,
            top_drop_off_points,
        }
    }

    /// Critical-path conformance for one flow kind
    pub fn get_flow_performance(&self, kind: &str) -> FlowPerformance {
        let instances: Vec<&FlowInstance> =
            self.flows.values().filter(|f| f.kind == kind).collect();
        let threshold = self
            .critical_paths
            .get(kind)
            .map(|p| p.success_threshold)
            .unwrap_or(1.0);

        let completed: Vec<&&FlowInstance> = instances
            .iter()
            .filter(|f| f.status == FlowStatus::Completed)
            .collect();
        let avg_duration_ms = if completed.is_empty() {
            0.0
        } else {
            completed
                .iter()
                .filter_map(|f| {
                    f.end_time
                        .map(|end| (end - f.start_time).num_milliseconds() as f64)
                })
                .sum::<f64>()
                / completed.len() as f64
        };

        let success_rate = if instances.is_empty() {
            0.0
        } else {
            instances
                .iter()
                .filter(|f| f.completion_rate >= threshold)
                .count() as f64
                / instances.len() as f64
        };

        let top_drop_offs = rank_drop_offs(
            instances
                .iter()
                .filter_map(|f| f.drop_off_point.clone().map(|p| (p, f.start_time))),
            5,
        );

        FlowPerformance {
            kind: kind.to_string(),
            instances: instances.len(),
            completed: completed.len(),
            avg_duration_ms,
            success_rate,
            top_drop_offs,
        }
    }

    // ========================================
    // Retention
    // ========================================

    /// Remove instances whose start time is older than the retention window
    ///
    /// Applies to every instance regardless of completion state. Returns the
    /// number of instances removed.
    pub fn sweep_expired(&mut self) -> usize {
        let cutoff = self.clock.now() - self.retention;
        let before = self.flows.len() + self.journeys.len();
        self.flows.retain(|_, f| f.start_time >= cutoff);
        self.journeys.retain(|_, j| j.start_time >= cutoff);
        let removed = before - (self.flows.len() + self.journeys.len());
        if removed > 0 {
            info!(removed, "retention sweep evicted expired instances");
        }
        removed
    }

    /// Look up a tracked flow
    pub fn flow(&self, id: Uuid) -> Option<&FlowInstance> {
        self.flows.get(&id)
    }

    /// Look up a tracked journey
    pub fn journey(&self, id: Uuid) -> Option<&JourneyInstance> {
        self.journeys.get(&id)
    }

    fn path_step_count(&self, kind: &str) -> usize {
        self.critical_paths
            .get(kind)
            .map(|p| p.step_count())
            .unwrap_or(0)
    }
}

/// Frequency-rank drop-off points; ties broken by earliest occurrence
fn rank_drop_offs(
    points: impl Iterator<Item = (String, DateTime<Utc>)>,
    limit: usize,
) -> Vec<DropOffCount> {
    let mut counts: HashMap<String, (usize, DateTime<Utc>)> = HashMap::new();
    for (point, seen_at) in points {
        counts
            .entry(point)
            .and_modify(|(count, first_seen)| {
                *count += 1;
                if seen_at < *first_seen {
                    *first_seen = seen_at;
                }
            })
            .or_insert((1, seen_at));
    }

    let mut ranked: Vec<(String, usize, DateTime<Utc>)> = counts
        .into_iter()
        .map(|(point, (count, first_seen))| (point, count, first_seen))
        .collect();
    ranked.sort_by(|a, b| b.1.cmp(&a.1).then(a.2.cmp(&b.2)));

    ranked
        .into_iter()
        .take(limit)
        .map(|(point, count, _)| DropOffCount { point, count })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pulse_common::ManualClock;

    fn test_tracker() -> (FlowTracker, Arc<ManualClock>) {
        let config = EngineConfig::default();
        let clock = Arc::new(ManualClock::from_system());
        let tracker = FlowTracker::new(&config, clock.clone(), EventBus::new(16));
        (tracker, clock)
    }

    #[test]
    fn test_flow_completion_rate_against_critical_path() {
        let (mut tracker, _clock) = test_tracker();
        let flow_id = tracker.track_study_creation("r1", None);

        tracker.track_study_step(flow_id, "template_selection", None, true);
        assert_eq!(tracker.flow(flow_id).unwrap().completion_rate, 0.2);

        tracker.track_study_step(flow_id, "study_setup", None, true);
        assert_eq!(tracker.flow(flow_id).unwrap().completion_rate, 0.4);
    }

    #[test]
    fn test_drop_off_scenario() {
        let (mut tracker, _clock) = test_tracker();
        let flow_id = tracker.track_study_creation("r1", None);

        tracker.track_study_step(flow_id, "template_selection", None, true);
        tracker.track_study_step(flow_id, "study_setup", None, false);

        let flow = tracker.flow(flow_id).unwrap();
        assert_eq!(flow.drop_off_point.as_deref(), Some("study_setup"));
        assert_eq!(flow.completion_rate, 0.4); // 2 of 5 critical-path steps
        assert_eq!(flow.status, FlowStatus::Abandoned);
    }

    #[test]
    fn test_drop_off_point_is_frozen() {
        let (mut tracker, _clock) = test_tracker();
        let flow_id = tracker.track_study_creation("r1", None);

        tracker.track_study_step(flow_id, "study_setup", None, false);
        tracker.track_study_step(flow_id, "review", None, false);

        let flow = tracker.flow(flow_id).unwrap();
        assert_eq!(flow.drop_off_point.as_deref(), Some("study_setup"));
    }

    #[test]
    fn test_completion_rate_monotonic() {
        let (mut tracker, _clock) = test_tracker();
        let flow_id = tracker.track_study_creation("r1", None);

        let mut last_rate = 0.0;
        for step in ["a", "b", "c", "d", "e", "f", "g"] {
            tracker.track_study_step(flow_id, step, None, true);
            let rate = tracker.flow(flow_id).unwrap().completion_rate;
            assert!(rate >= last_rate);
            assert!(rate <= 1.0);
            last_rate = rate;
        }
    }

    #[test]
    fn test_flow_completion_and_efficiency() {
        let (mut tracker, clock) = test_tracker();
        let mut rx = tracker.bus.subscribe();

        let flow_id = tracker.track_study_creation("r1", Some("t1"));
        // Finish well under the 600s expected duration
        clock.advance(Duration::milliseconds(120_000));
        tracker.complete_study_creation(flow_id, 7);

        let flow = tracker.flow(flow_id).unwrap();
        assert_eq!(flow.status, FlowStatus::Completed);
        assert_eq!(flow.completion_rate, 1.0);
        assert_eq!(flow.blocks_count, Some(7));

        match rx.try_recv().unwrap() {
            PulseEvent::FlowCompleted {
                efficiency,
                duration_ms,
                ..
            } => {
                assert_eq!(efficiency, FlowEfficiency::High);
                assert_eq!(duration_ms, 120_000);
            }
            other => panic!("wrong event: {}", other.event_type()),
        }
    }

    #[test]
    fn test_slow_flow_is_low_efficiency() {
        let (mut tracker, clock) = test_tracker();
        let mut rx = tracker.bus.subscribe();

        let flow_id = tracker.track_study_creation("r1", None);
        clock.advance(Duration::milliseconds(900_000));
        tracker.complete_study_creation(flow_id, 3);

        match rx.try_recv().unwrap() {
            PulseEvent::FlowCompleted { efficiency, .. } => {
                assert_eq!(efficiency, FlowEfficiency::Low);
            }
            other => panic!("wrong event: {}", other.event_type()),
        }
    }

    #[test]
    fn test_unknown_ids_are_no_ops() {
        let (mut tracker, _clock) = test_tracker();
        // None of these may panic or create instances
        tracker.track_study_step(Uuid::new_v4(), "x", None, true);
        tracker.complete_study_creation(Uuid::new_v4(), 1);
        tracker.track_participant_block(
            Uuid::new_v4(),
            "survey",
            0,
            Utc::now(),
            3,
            true,
            None,
        );
        tracker.complete_participant_journey(Uuid::new_v4());

        let analytics = tracker.get_flow_analytics();
        assert_eq!(analytics.active_flows, 0);
        assert_eq!(analytics.active_journeys, 0);
    }

    #[test]
    fn test_journey_full_completion() {
        let (mut tracker, clock) = test_tracker();
        let journey_id = tracker.track_participant_journey("p1", "s1", 5, None);

        for i in 0..5 {
            tracker.track_participant_block(
                journey_id,
                "survey",
                i,
                clock.now(),
                4,
                true,
                None,
            );
        }
        tracker.complete_participant_journey(journey_id);

        let journey = tracker.journey(journey_id).unwrap();
        assert_eq!(journey.blocks_completed, 5);
        assert_eq!(journey.completion_rate, 1.0);
        assert!(journey.is_completed());
        assert!(journey.drop_off_point.is_none());
    }

    #[test]
    fn test_journey_drop_off_freezes_count() {
        let (mut tracker, clock) = test_tracker();
        let journey_id = tracker.track_participant_journey("p1", "s1", 5, None);

        tracker.track_participant_block(journey_id, "survey", 0, clock.now(), 2, true, None);
        tracker.track_participant_block(journey_id, "survey", 1, clock.now(), 2, true, None);
        tracker.track_participant_block(journey_id, "open_question", 2, clock.now(), 1, false, None);

        let journey = tracker.journey(journey_id).unwrap();
        assert_eq!(
            journey.drop_off_point.as_deref(),
            Some("block_2_open_question")
        );
        assert_eq!(journey.blocks_completed, 2);
        assert_eq!(journey.completion_rate, 0.4);
    }

    #[test]
    fn test_journey_last_write_wins_without_double_count() {
        let (mut tracker, clock) = test_tracker();
        let journey_id = tracker.track_participant_journey("p1", "s1", 4, None);

        // Same index recorded twice as success counts once
        tracker.track_participant_block(journey_id, "survey", 0, clock.now(), 1, true, None);
        tracker.track_participant_block(journey_id, "survey", 0, clock.now(), 5, true, None);
        let journey = tracker.journey(journey_id).unwrap();
        assert_eq!(journey.blocks_completed, 1);
        assert_eq!(journey.steps.get(&0).unwrap().interactions, 5);

        // Out-of-order recording is accepted
        tracker.track_participant_block(journey_id, "survey", 3, clock.now(), 1, true, None);
        tracker.track_participant_block(journey_id, "survey", 1, clock.now(), 1, true, None);
        assert_eq!(tracker.journey(journey_id).unwrap().blocks_completed, 3);
    }

    #[test]
    fn test_long_block_signal() {
        let (mut tracker, clock) = test_tracker();
        let journey_id = tracker.track_participant_journey("p1", "s1", 3, None);

        let started = clock.now();
        clock.advance(Duration::milliseconds(200_000));
        tracker.track_participant_block(journey_id, "survey", 0, started, 2, true, None);

        let journey = tracker.journey(journey_id).unwrap();
        assert_eq!(journey.signals.len(), 1);
        assert_eq!(journey.signals[0].kind, SignalKind::LongTimeOnBlock);
    }

    #[test]
    fn test_zero_interactions_signal_skips_passive_blocks() {
        let (mut tracker, clock) = test_tracker();
        let journey_id = tracker.track_participant_journey("p1", "s1", 3, None);

        tracker.track_participant_block(journey_id, "context_screen", 0, clock.now(), 0, true, None);
        tracker.track_participant_block(journey_id, "survey", 1, clock.now(), 0, true, None);

        let journey = tracker.journey(journey_id).unwrap();
        assert_eq!(journey.signals.len(), 1);
        assert_eq!(journey.signals[0].kind, SignalKind::ZeroInteractions);
        assert_eq!(journey.signals[0].block_index, 1);
    }

    #[test]
    fn test_flow_performance_ranking() {
        let (mut tracker, clock) = test_tracker();

        // Three drop-offs at study_setup, one at review (seen first)
        let f0 = tracker.track_study_creation("r0", None);
        tracker.track_study_step(f0, "review", None, false);
        for r in ["r1", "r2", "r3"] {
            clock.advance(Duration::seconds(1));
            let id = tracker.track_study_creation(r, None);
            tracker.track_study_step(id, "study_setup", None, false);
        }
        // One flow completed
        let done = tracker.track_study_creation("r4", None);
        for step in [
            "template_selection",
            "study_setup",
            "block_configuration",
            "review",
            "launch",
        ] {
            tracker.track_study_step(done, step, None, true);
        }
        tracker.complete_study_creation(done, 5);

        let perf = tracker.get_flow_performance(STUDY_CREATION_KIND);
        assert_eq!(perf.instances, 5);
        assert_eq!(perf.completed, 1);
        assert_eq!(perf.top_drop_offs[0].point, "study_setup");
        assert_eq!(perf.top_drop_offs[0].count, 3);
        assert_eq!(perf.top_drop_offs[1].point, "review");
        // Only the completed flow reaches the 0.8 threshold
        assert!((perf.success_rate - 0.2).abs() < 1e-9);
    }

    #[test]
    fn test_retention_sweep() {
        let (mut tracker, clock) = test_tracker();

        let old_flow = tracker.track_study_creation("r1", None);
        let old_journey = tracker.track_participant_journey("p1", "s1", 3, None);
        clock.advance(Duration::hours(25));
        let fresh_flow = tracker.track_study_creation("r2", None);

        let removed = tracker.sweep_expired();
        assert_eq!(removed, 2);
        assert!(tracker.flow(old_flow).is_none());
        assert!(tracker.journey(old_journey).is_none());
        assert!(tracker.flow(fresh_flow).is_some());
    }

    #[test]
    fn test_flow_analytics_overview() {
        let (mut tracker, _clock) = test_tracker();

        let done = tracker.track_study_creation("r1", None);
        tracker.complete_study_creation(done, 2);

        let dropped = tracker.track_study_creation("r2", None);
        tracker.track_study_step(dropped, "study_setup", None, false);

        tracker.track_study_creation("r3", None);

        let j = tracker.track_participant_journey("p1", "s1", 2, None);
        tracker.complete_participant_journey(j);

        let analytics = tracker.get_flow_analytics();
        assert_eq!(analytics.active_flows, 1);
        assert_eq!(analytics.completed_flows, 1);
        assert_eq!(analytics.abandoned_flows, 1);
        assert_eq!(analytics.completed_journeys, 1);
        assert_eq!(analytics.top_drop_off_points.len(), 1);
        assert_eq!(analytics.top_drop_off_points[0].point, "study_setup");
    }
}
