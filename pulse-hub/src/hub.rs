//! Engine service object
//!
//! [`PulseHub`] constructs the three components once, wires them to one
//! shared [`EventBus`] and [`Clock`], and owns the periodic scheduler.
//! The host application builds a hub at startup, passes it to collaborators
//! by reference, and calls `init`/`dispose` around its lifetime. Every
//! ingestion and query call on the hub is synchronous and delegates to the
//! owning component under its lock.

use std::sync::{Arc, Mutex, MutexGuard};

use chrono::{DateTime, Utc};
use tracing::debug;
use uuid::Uuid;

use pulse_common::{Clock, EngineConfig, EventBus, PulseEvent, SystemClock};
use pulse_flow::{DeviceInfo, FlowAnalytics, FlowPerformance, FlowTracker};
use pulse_perf::{
    MetricUnit, PerformanceMonitor, PerformanceSummary, SlowOperation,
};
use pulse_rules::{
    DataSnapshot, PointsTransaction, PricingRecord, RoleAction, Rule, RuleValidator,
    ValidationOutcome, ValidationStats,
};

use crate::scheduler::{
    detailed_monitoring_task, retention_sweep_task, trend_analysis_task, Scheduler,
};

/// Lock a component, recovering the guard if a panicking thread poisoned it
///
/// The engine is observational; a poisoned lock must not cascade into the
/// calling UI code, so the inner state is used as-is.
pub(crate) fn lock<T>(component: &Mutex<T>) -> MutexGuard<'_, T> {
    component
        .lock()
        .unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// The engine's service/context object
pub struct PulseHub {
    config: EngineConfig,
    clock: Arc<dyn Clock>,
    bus: EventBus,
    validator: Arc<Mutex<RuleValidator>>,
    tracker: Arc<Mutex<FlowTracker>>,
    monitor: Arc<Mutex<PerformanceMonitor>>,
    scheduler: Scheduler,
}

impl PulseHub {
    /// Build a hub on the wall clock
    pub fn new(config: EngineConfig) -> Self {
        Self::with_clock(config, Arc::new(SystemClock))
    }

    /// Build a hub on an explicit clock (tests use `ManualClock`)
    pub fn with_clock(config: EngineConfig, clock: Arc<dyn Clock>) -> Self {
        let bus = EventBus::new(config.event_bus_capacity);
        let validator = Arc::new(Mutex::new(RuleValidator::new(
            &config,
            clock.clone(),
            bus.clone(),
        )));
        let tracker = Arc::new(Mutex::new(FlowTracker::new(
            &config,
            clock.clone(),
            bus.clone(),
        )));
        let monitor = Arc::new(Mutex::new(PerformanceMonitor::new(
            &config,
            clock.clone(),
            bus.clone(),
        )));

        Self {
            config,
            clock,
            bus,
            validator,
            tracker,
            monitor,
            scheduler: Scheduler::new(),
        }
    }

    /// Start the periodic tasks; must run inside a tokio runtime
    ///
    /// Idempotent: a hub that is already initialized keeps its running tasks.
    pub fn init(&mut self) {
        if self.scheduler.task_count() > 0 {
            debug!("hub already initialized");
            return;
        }

        self.scheduler.spawn(
            "trend_analysis",
            trend_analysis_task(
                self.validator.clone(),
                self.tracker.clone(),
                self.config.trend_interval_secs,
            ),
        );
        self.scheduler.spawn(
            "retention_sweep",
            retention_sweep_task(self.tracker.clone(), self.config.sweep_interval_secs),
        );
        if self.config.detailed_monitoring {
            self.scheduler.spawn(
                "detailed_monitoring",
                detailed_monitoring_task(
                    self.monitor.clone(),
                    self.config.detailed_interval_secs,
                ),
            );
        }
    }

    /// Stop all periodic tasks; ingestion and queries remain usable
    pub fn dispose(&mut self) {
        self.scheduler.dispose();
    }

    /// Names of the currently running periodic tasks
    pub fn running_tasks(&self) -> Vec<&'static str> {
        self.scheduler.task_names()
    }

    /// Subscribe to engine events
    pub fn subscribe(&self) -> tokio::sync::broadcast::Receiver<PulseEvent> {
        self.bus.subscribe()
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn clock(&self) -> &Arc<dyn Clock> {
        &self.clock
    }

    // --- Rule Validator surface ---

    pub fn validate_points_transaction(&self, tx: &PointsTransaction) -> ValidationOutcome {
        lock(&self.validator).validate_points_transaction(tx)
    }

    pub fn validate_role_action(&self, action: &RoleAction) -> ValidationOutcome {
        lock(&self.validator).validate_role_action(action)
    }

    pub fn validate_study_pricing(&self, record: &PricingRecord) -> ValidationOutcome {
        lock(&self.validator).validate_study_pricing(record)
    }

    pub fn validate_data_consistency(&self, snapshot: &DataSnapshot) -> ValidationOutcome {
        lock(&self.validator).validate_data_consistency(snapshot)
    }

    pub fn get_validation_stats(&self) -> ValidationStats {
        lock(&self.validator).get_validation_stats()
    }

    /// Register a host-defined rule alongside the built-in set
    pub fn register_rule(&self, rule: Rule) {
        lock(&self.validator).register_rule(rule);
    }

    // --- Flow & Journey Tracker surface ---

    pub fn track_study_creation(&self, researcher_id: &str, template_id: Option<&str>) -> Uuid {
        lock(&self.tracker).track_study_creation(researcher_id, template_id)
    }

    pub fn track_study_step(
        &self,
        flow_id: Uuid,
        step_name: &str,
        data: Option<serde_json::Value>,
        success: bool,
    ) {
        lock(&self.tracker).track_study_step(flow_id, step_name, data, success);
    }

    pub fn complete_study_creation(&self, flow_id: Uuid, blocks_count: u32) {
        lock(&self.tracker).complete_study_creation(flow_id, blocks_count);
    }

    pub fn track_participant_journey(
        &self,
        participant_id: &str,
        study_id: &str,
        total_blocks: usize,
        device: Option<DeviceInfo>,
    ) -> Uuid {
        lock(&self.tracker).track_participant_journey(participant_id, study_id, total_blocks, device)
    }

    #[allow(clippy::too_many_arguments)]
    pub fn track_participant_block(
        &self,
        journey_id: Uuid,
        block_type: &str,
        block_index: usize,
        start_time: DateTime<Utc>,
        interactions: u32,
        success: bool,
        data: Option<serde_json::Value>,
    ) {
        lock(&self.tracker).track_participant_block(
            journey_id,
            block_type,
            block_index,
            start_time,
            interactions,
            success,
            data,
        );
    }

    pub fn complete_participant_journey(&self, journey_id: Uuid) {
        lock(&self.tracker).complete_participant_journey(journey_id);
    }

    pub fn get_flow_analytics(&self) -> FlowAnalytics {
        lock(&self.tracker).get_flow_analytics()
    }

    pub fn get_flow_performance(&self, kind: &str) -> FlowPerformance {
        lock(&self.tracker).get_flow_performance(kind)
    }

    // --- Performance Monitor surface ---

    pub fn record_metric(
        &self,
        name: &str,
        value: f64,
        unit: MetricUnit,
        context: Option<serde_json::Value>,
    ) {
        lock(&self.monitor).record(name, value, unit, context);
    }

    pub fn track_api_performance(&self, endpoint: &str, duration_ms: f64) {
        lock(&self.monitor).track_api_performance(endpoint, duration_ms);
    }

    pub fn track_component_performance(&self, component: &str, duration_ms: f64) {
        lock(&self.monitor).track_component_performance(component, duration_ms);
    }

    pub fn track_study_builder_performance(&self, phase: &str, duration_ms: f64) {
        lock(&self.monitor).track_study_builder_performance(phase, duration_ms);
    }

    pub fn record_web_vital(&self, vital: &str, value: f64) {
        lock(&self.monitor).record_web_vital(vital, value);
    }

    pub fn get_performance_summary(&self) -> PerformanceSummary {
        lock(&self.monitor).get_performance_summary()
    }

    pub fn get_slow_operations_analysis(&self) -> Vec<SlowOperation> {
        lock(&self.monitor).get_slow_operations_analysis()
    }

    pub fn get_optimization_suggestions(&self) -> Vec<String> {
        lock(&self.monitor).get_optimization_suggestions()
    }
}
