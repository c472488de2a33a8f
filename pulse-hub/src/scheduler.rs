//! Background periodic tasks
//!
//! The hub owns a small set of interval-driven tasks: trend analysis over
//! validation stats and flow analytics, the retention sweep, and an optional
//! detailed-monitoring loop. Tasks hold each component's lock only for the
//! duration of a single read or sweep.

use std::future::Future;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time;
use tracing::{debug, info};

use pulse_flow::FlowTracker;
use pulse_perf::PerformanceMonitor;
use pulse_rules::RuleValidator;

use crate::hub::lock;

struct NamedTask {
    name: &'static str,
    handle: JoinHandle<()>,
}

/// Owner of the hub's periodic task handles
///
/// Tasks run until [`Scheduler::dispose`] aborts them; dropping the
/// scheduler disposes implicitly so an engine torn down without an explicit
/// `dispose()` call does not leak interval loops.
#[derive(Default)]
pub struct Scheduler {
    tasks: Vec<NamedTask>,
}

impl Scheduler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Spawn a named task onto the current tokio runtime
    pub fn spawn<F>(&mut self, name: &'static str, task: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        self.tasks.push(NamedTask {
            name,
            handle: tokio::spawn(task),
        });
        info!(task = name, "periodic task started");
    }

    pub fn task_count(&self) -> usize {
        self.tasks.len()
    }

    pub fn task_names(&self) -> Vec<&'static str> {
        self.tasks.iter().map(|t| t.name).collect()
    }

    /// Abort all running tasks
    pub fn dispose(&mut self) {
        for task in self.tasks.drain(..) {
            task.handle.abort();
            info!(task = task.name, "periodic task stopped");
        }
    }
}

impl Drop for Scheduler {
    fn drop(&mut self) {
        self.dispose();
    }
}

/// Trend analysis: log validation stats and flow analytics at a fixed cadence
pub(crate) async fn trend_analysis_task(
    validator: Arc<Mutex<RuleValidator>>,
    tracker: Arc<Mutex<FlowTracker>>,
    interval_secs: u64,
) {
    let mut interval = time::interval(Duration::from_secs(interval_secs));
    // The first tick fires immediately; consume it so analysis starts one
    // full interval after init.
    interval.tick().await;

    loop {
        interval.tick().await;

        let stats = lock(&validator).get_validation_stats();
        info!(
            total = stats.total_validations,
            recent = stats.recent_count,
            error_rate = stats.error_rate,
            critical_failures = stats.recent_critical_failures.len(),
            "validation trend"
        );
        for recommendation in &stats.recommendations {
            info!(recommendation, "validation recommendation");
        }

        let analytics = lock(&tracker).get_flow_analytics();
        info!(
            active_flows = analytics.active_flows,
            completed_flows = analytics.completed_flows,
            abandoned_flows = analytics.abandoned_flows,
            active_journeys = analytics.active_journeys,
            completed_journeys = analytics.completed_journeys,
            avg_journey_completion = analytics.avg_journey_completion,
            "flow trend"
        );
        if let Some(top) = analytics.top_drop_off_points.first() {
            info!(point = %top.point, count = top.count, "top drop-off point");
        }
    }
}

/// Retention sweep: evict flow/journey instances older than the window
pub(crate) async fn retention_sweep_task(tracker: Arc<Mutex<FlowTracker>>, interval_secs: u64) {
    let mut interval = time::interval(Duration::from_secs(interval_secs));
    interval.tick().await;

    loop {
        interval.tick().await;
        let removed = lock(&tracker).sweep_expired();
        debug!(removed, "retention sweep completed");
    }
}

/// Detailed monitoring: log the performance summary at a short cadence
pub(crate) async fn detailed_monitoring_task(
    monitor: Arc<Mutex<PerformanceMonitor>>,
    interval_secs: u64,
) {
    let mut interval = time::interval(Duration::from_secs(interval_secs));
    interval.tick().await;

    loop {
        interval.tick().await;

        let summary = lock(&monitor).get_performance_summary();
        debug!(
            families = summary.families.len(),
            active_alerts = summary.active_alerts.len(),
            lcp = ?summary.web_vitals.lcp,
            "detailed performance snapshot"
        );
        for alert in &summary.active_alerts {
            debug!(
                alert_type = %alert.alert_type,
                severity = %alert.severity,
                value = alert.actual_value,
                threshold = alert.threshold,
                "active alert"
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_spawn_and_dispose() {
        let mut scheduler = Scheduler::new();
        scheduler.spawn("noop", async {
            loop {
                time::sleep(Duration::from_secs(3600)).await;
            }
        });
        assert_eq!(scheduler.task_count(), 1);
        assert_eq!(scheduler.task_names(), vec!["noop"]);

        scheduler.dispose();
        assert_eq!(scheduler.task_count(), 0);
    }

    #[tokio::test]
    async fn test_dispose_is_idempotent() {
        let mut scheduler = Scheduler::new();
        scheduler.spawn("noop", async {});
        scheduler.dispose();
        scheduler.dispose();
        assert_eq!(scheduler.task_count(), 0);
    }
}
