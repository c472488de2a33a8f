//! Performance monitoring
//!
//! Per-name bounded sample logs feed a detection pipeline: classify the
//! metric name into a threshold family, compare against the configured
//! bound, and on breach append one severity-tagged alert to the global
//! bounded alert log (plus a lossy event broadcast).

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use chrono::Duration;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::{debug, warn};

use pulse_common::events::AlertType;
use pulse_common::{BoundedLog, Clock, EngineConfig, EventBus, PerfThresholds, PulseEvent, Severity};

use crate::types::{Alert, Metric, MetricFamily, MetricUnit};

/// Window within which an alert counts as "active" (ms)
const ACTIVE_ALERT_WINDOW_MS: i64 = 3_600_000;

/// Per-family aggregates for the summary
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq)]
pub struct FamilySummary {
    pub count: usize,
    pub mean: f64,
    pub breach_count: usize,
}

/// Last-observed Web Vitals triple
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq)]
pub struct WebVitalsSnapshot {
    pub lcp: Option<f64>,
    pub fid: Option<f64>,
    pub cls: Option<f64>,
}

/// Point-in-time performance overview
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PerformanceSummary {
    /// Aggregates per threshold family (keyed by family name)
    pub families: HashMap<String, FamilySummary>,
    pub web_vitals: WebVitalsSnapshot,
    /// Alerts raised within the last hour, oldest first
    pub active_alerts: Vec<Alert>,
    /// Advice derived purely from the alert types present in the active set
    pub recommendations: Vec<String>,
}

/// Per-metric-name breach analysis entry
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SlowOperation {
    pub name: String,
    pub samples: usize,
    pub mean: f64,
    pub max: f64,
    pub breach_count: usize,
    /// breach_count / samples
    pub breach_ratio: f64,
}

/// Threshold-based performance metrics monitor
pub struct PerformanceMonitor {
    metrics: HashMap<String, BoundedLog<Metric>>,
    alerts: BoundedLog<Alert>,
    thresholds: PerfThresholds,
    metric_cap: usize,
    web_vitals: WebVitalsSnapshot,
    clock: Arc<dyn Clock>,
    bus: EventBus,
}

impl PerformanceMonitor {
    pub fn new(config: &EngineConfig, clock: Arc<dyn Clock>, bus: EventBus) -> Self {
        Self {
            metrics: HashMap::new(),
            alerts: BoundedLog::new(config.alert_cap),
            thresholds: config.thresholds,
            metric_cap: config.metric_history_cap,
            web_vitals: WebVitalsSnapshot::default(),
            clock,
            bus,
        }
    }

    /// Record a metric observation; never fails
    ///
    /// The value is stored verbatim — no validation. A non-finite or negative
    /// value simply never exceeds a positive threshold, so it is recorded but
    /// cannot alert.
    pub fn record(
        &mut self,
        name: &str,
        value: f64,
        unit: MetricUnit,
        context: Option<serde_json::Value>,
    ) {
        let now = self.clock.now();
        if !value.is_finite() {
            debug!(name, value, "non-finite metric value recorded verbatim");
        }

        let cap = self.metric_cap;
        self.metrics
            .entry(name.to_string())
            .or_insert_with(|| BoundedLog::new(cap))
            .push(Metric {
                name: name.to_string(),
                value,
                unit,
                timestamp: now,
                context,
            });

        let family = MetricFamily::classify(name);
        match family {
            MetricFamily::Lcp => self.web_vitals.lcp = Some(value),
            MetricFamily::Fid => self.web_vitals.fid = Some(value),
            MetricFamily::Cls => self.web_vitals.cls = Some(value),
            _ => {}
        }

        let Some(threshold) = family.threshold(&self.thresholds) else {
            return;
        };
        if value > threshold {
            self.raise_alert(family, name, value, threshold);
        }
    }

    /// Record an API call latency
    pub fn track_api_performance(&mut self, endpoint: &str, duration_ms: f64) {
        self.record(
            "api_response_time",
            duration_ms,
            MetricUnit::Ms,
            Some(json!({ "endpoint": endpoint })),
        );
    }

    /// Record a component render duration
    pub fn track_component_performance(&mut self, component: &str, duration_ms: f64) {
        self.record(
            "component_render_time",
            duration_ms,
            MetricUnit::Ms,
            Some(json!({ "component": component })),
        );
    }

    /// Record a Study Builder load phase duration
    pub fn track_study_builder_performance(&mut self, phase: &str, duration_ms: f64) {
        self.record(
            "study_builder_load_time",
            duration_ms,
            MetricUnit::Ms,
            Some(json!({ "phase": phase })),
        );
    }

    /// Record a Web Vitals observation by vital name (`lcp`, `fid`, `cls`)
    pub fn record_web_vital(&mut self, vital: &str, value: f64) {
        let unit = match MetricFamily::classify(vital) {
            MetricFamily::Cls => MetricUnit::Score,
            _ => MetricUnit::Ms,
        };
        self.record(vital, value, unit, None);
    }

    fn raise_alert(&mut self, family: MetricFamily, name: &str, value: f64, threshold: f64) {
        let Some(alert_type) = family.alert_type() else {
            return;
        };

        // API latency escalates past double the threshold; other families
        // carry a fixed per-family severity.
        let severity = if family == MetricFamily::ApiResponse && value > 2.0 * threshold {
            Severity::High
        } else {
            family.base_severity()
        };

        let timestamp = self.clock.now();
        let alert = Alert {
            alert_type,
            severity,
            message: format!(
                "{} of {:.2} exceeded threshold {:.2} ({})",
                family, value, threshold, name
            ),
            threshold,
            actual_value: value,
            timestamp,
            suggestions: family.suggestions(),
        };

        warn!(
            metric = name,
            %alert_type,
            %severity,
            value,
            threshold,
            "performance threshold breached"
        );
        self.bus.emit_lossy(PulseEvent::PerformanceAlert {
            alert_type,
            severity,
            metric: name.to_string(),
            threshold,
            actual_value: value,
            timestamp,
        });
        self.alerts.push(alert);
    }

    /// Read-only access to the bounded alert log
    pub fn alerts(&self) -> &BoundedLog<Alert> {
        &self.alerts
    }

    /// Samples recorded under a metric name
    pub fn samples(&self, name: &str) -> Option<&BoundedLog<Metric>> {
        self.metrics.get(name)
    }

    /// Per-family aggregates, latest vitals, active alerts, recommendations
    pub fn get_performance_summary(&self) -> PerformanceSummary {
        let mut families: HashMap<String, FamilySummary> = HashMap::new();
        let mut sums: HashMap<MetricFamily, f64> = HashMap::new();

        for log in self.metrics.values() {
            for metric in log.iter() {
                let family = MetricFamily::classify(&metric.name);
                if family == MetricFamily::Other {
                    continue;
                }
                let entry = families.entry(family.to_string()).or_default();
                entry.count += 1;
                *sums.entry(family).or_default() += metric.value;
                if let Some(threshold) = family.threshold(&self.thresholds) {
                    if metric.value > threshold {
                        entry.breach_count += 1;
                    }
                }
            }
        }
        for (family, sum) in sums {
            if let Some(entry) = families.get_mut(&family.to_string()) {
                if entry.count > 0 {
                    entry.mean = sum / entry.count as f64;
                }
            }
        }

        let cutoff = self.clock.now() - Duration::milliseconds(ACTIVE_ALERT_WINDOW_MS);
        let active_alerts: Vec<Alert> = self
            .alerts
            .iter()
            .filter(|a| a.timestamp > cutoff)
            .cloned()
            .collect();

        let recommendations = recommendations_for(&active_alerts);

        PerformanceSummary {
            families,
            web_vitals: self.web_vitals,
            active_alerts,
            recommendations,
        }
    }

    /// Per-metric-name breach analysis, worst offenders first
    pub fn get_slow_operations_analysis(&self) -> Vec<SlowOperation> {
        let mut operations = Vec::new();

        for (name, log) in &self.metrics {
            let family = MetricFamily::classify(name);
            let Some(threshold) = family.threshold(&self.thresholds) else {
                continue;
            };

            let samples = log.len();
            if samples == 0 {
                continue;
            }
            let breach_count = log.iter().filter(|m| m.value > threshold).count();
            if breach_count == 0 {
                continue;
            }

            let mean = log.iter().map(|m| m.value).sum::<f64>() / samples as f64;
            let max = log.iter().map(|m| m.value).fold(f64::MIN, f64::max);

            operations.push(SlowOperation {
                name: name.clone(),
                samples,
                mean,
                max,
                breach_count,
                breach_ratio: breach_count as f64 / samples as f64,
            });
        }

        operations.sort_by(|a, b| {
            b.breach_ratio
                .total_cmp(&a.breach_ratio)
                .then(b.mean.total_cmp(&a.mean))
        });
        operations
    }

    /// Proactive advice from family means plus the active alert set
    pub fn get_optimization_suggestions(&self) -> Vec<String> {
        let mut suggestions = Vec::new();
        let summary = self.get_performance_summary();

        let near = |family: MetricFamily| -> bool {
            let Some(threshold) = family.threshold(&self.thresholds) else {
                return false;
            };
            summary
                .families
                .get(&family.to_string())
                .map(|f| f.count > 0 && f.mean > 0.75 * threshold)
                .unwrap_or(false)
        };

        if near(MetricFamily::ApiResponse) {
            suggestions.push(
                "API latency is trending toward its threshold - consider caching hot endpoints"
                    .to_string(),
            );
        }
        if near(MetricFamily::ComponentRender) {
            suggestions.push(
                "Render times are trending toward their threshold - memoize expensive components"
                    .to_string(),
            );
        }
        if near(MetricFamily::StudyBuilderLoad) {
            suggestions.push(
                "Study Builder load is trending toward its threshold - lazy-load blocks"
                    .to_string(),
            );
        }

        for recommendation in summary.recommendations {
            if !suggestions.contains(&recommendation) {
                suggestions.push(recommendation);
            }
        }
        suggestions
    }
}

/// Recommendations are a pure function of the alert types present
fn recommendations_for(active_alerts: &[Alert]) -> Vec<String> {
    let present: HashSet<AlertType> = active_alerts.iter().map(|a| a.alert_type).collect();

    let mut recommendations = Vec::new();
    if present.contains(&AlertType::SlowResponse) {
        recommendations
            .push("Investigate API and server latency on slow endpoints".to_string());
    }
    if present.contains(&AlertType::MemoryLeak) {
        recommendations.push("Review component lifecycle and cleanup".to_string());
    }
    if present.contains(&AlertType::ErrorSpike) {
        recommendations.push("Inspect recent deploys and error logs".to_string());
    }
    if present.contains(&AlertType::Degradation) {
        recommendations
            .push("Optimize rendering and the largest contentful paint path".to_string());
    }
    recommendations
}

#[cfg(test)]
mod tests {
    use super::*;
    use pulse_common::ManualClock;

    fn test_monitor() -> (PerformanceMonitor, Arc<ManualClock>) {
        let config = EngineConfig::default();
        let clock = Arc::new(ManualClock::from_system());
        let monitor = PerformanceMonitor::new(&config, clock.clone(), EventBus::new(16));
        (monitor, clock)
    }

    #[test]
    fn test_api_breach_medium_severity() {
        let (mut monitor, _clock) = test_monitor();
        monitor.track_api_performance("/api/studies", 2500.0);

        assert_eq!(monitor.alerts().len(), 1);
        let alert = monitor.alerts().latest().unwrap();
        assert_eq!(alert.alert_type, AlertType::SlowResponse);
        assert_eq!(alert.severity, Severity::Medium);
        assert_eq!(alert.actual_value, 2500.0);
        assert_eq!(alert.threshold, 2000.0);
    }

    #[test]
    fn test_api_breach_escalates_past_double() {
        let (mut monitor, _clock) = test_monitor();
        monitor.track_api_performance("/api/studies", 4500.0);

        let alert = monitor.alerts().latest().unwrap();
        assert_eq!(alert.severity, Severity::High);
    }

    #[test]
    fn test_exactly_one_alert_per_breach() {
        let (mut monitor, _clock) = test_monitor();
        monitor.track_api_performance("/api/studies", 2500.0);
        monitor.track_api_performance("/api/studies", 2500.0);
        // No deduplication: two breaches, two alerts
        assert_eq!(monitor.alerts().len(), 2);

        monitor.track_api_performance("/api/studies", 1500.0);
        assert_eq!(monitor.alerts().len(), 2);
    }

    #[test]
    fn test_under_threshold_no_alert() {
        let (mut monitor, _clock) = test_monitor();
        monitor.track_component_performance("StudyCard", 40.0);
        monitor.record("memory_usage", 64.0, MetricUnit::Bytes, None);
        assert!(monitor.alerts().is_empty());
    }

    #[test]
    fn test_lcp_degradation_in_summary() {
        let (mut monitor, _clock) = test_monitor();
        monitor.record("lcp", 3000.0, MetricUnit::Ms, None);

        let summary = monitor.get_performance_summary();
        assert_eq!(summary.active_alerts.len(), 1);
        let alert = &summary.active_alerts[0];
        assert_eq!(alert.alert_type, AlertType::Degradation);
        assert_eq!(alert.actual_value, 3000.0);
        assert_eq!(summary.web_vitals.lcp, Some(3000.0));
    }

    #[test]
    fn test_negative_and_nan_values_recorded_but_never_breach() {
        let (mut monitor, _clock) = test_monitor();
        monitor.record("api_response_time", -500.0, MetricUnit::Ms, None);
        monitor.record("api_response_time", f64::NAN, MetricUnit::Ms, None);

        assert_eq!(monitor.samples("api_response_time").unwrap().len(), 2);
        assert!(monitor.alerts().is_empty());
    }

    #[test]
    fn test_metric_history_is_bounded() {
        let (mut monitor, _clock) = test_monitor();
        for i in 0..250 {
            monitor.record("frame_rate", i as f64, MetricUnit::Count, None);
        }
        assert_eq!(monitor.samples("frame_rate").unwrap().len(), 100);
    }

    #[test]
    fn test_alert_log_is_bounded() {
        let (mut monitor, _clock) = test_monitor();
        for _ in 0..80 {
            monitor.track_api_performance("/api/studies", 2500.0);
        }
        assert_eq!(monitor.alerts().len(), 50);
    }

    #[test]
    fn test_error_rate_breach_is_critical() {
        let (mut monitor, _clock) = test_monitor();
        monitor.record("error_rate", 9.0, MetricUnit::Percent, None);
        let alert = monitor.alerts().latest().unwrap();
        assert_eq!(alert.alert_type, AlertType::ErrorSpike);
        assert_eq!(alert.severity, Severity::Critical);
    }

    #[test]
    fn test_active_alert_window() {
        let (mut monitor, clock) = test_monitor();
        monitor.track_api_performance("/api/old", 2500.0);
        clock.advance(Duration::milliseconds(ACTIVE_ALERT_WINDOW_MS + 1000));
        monitor.track_api_performance("/api/new", 2500.0);

        let summary = monitor.get_performance_summary();
        assert_eq!(monitor.alerts().len(), 2);
        // Only the recent breach is active
        assert_eq!(summary.active_alerts.len(), 1);
    }

    #[test]
    fn test_recommendations_follow_alert_types() {
        let (mut monitor, _clock) = test_monitor();
        monitor.record("memory_usage", 200.0, MetricUnit::Bytes, None);
        monitor.record("lcp", 4000.0, MetricUnit::Ms, None);

        let summary = monitor.get_performance_summary();
        assert!(summary
            .recommendations
            .iter()
            .any(|r| r.contains("component lifecycle")));
        assert!(summary
            .recommendations
            .iter()
            .any(|r| r.contains("largest contentful paint")));
        assert!(!summary.recommendations.iter().any(|r| r.contains("deploys")));
    }

    #[test]
    fn test_family_summary_aggregates() {
        let (mut monitor, _clock) = test_monitor();
        monitor.track_api_performance("/a", 1000.0);
        monitor.track_api_performance("/b", 3000.0);

        let summary = monitor.get_performance_summary();
        let api = summary.families.get("api_response").unwrap();
        assert_eq!(api.count, 2);
        assert_eq!(api.mean, 2000.0);
        assert_eq!(api.breach_count, 1);
    }

    #[test]
    fn test_slow_operations_analysis() {
        let (mut monitor, _clock) = test_monitor();
        // 2 of 4 api samples breach
        for value in [1000.0, 2500.0, 3000.0, 500.0] {
            monitor.track_api_performance("/a", value);
        }
        // Renders all clean
        monitor.track_component_performance("StudyCard", 20.0);
        // Unthresholded metric never appears
        monitor.record("frame_rate", 1e9, MetricUnit::Count, None);

        let analysis = monitor.get_slow_operations_analysis();
        assert_eq!(analysis.len(), 1);
        assert_eq!(analysis[0].name, "api_response_time");
        assert_eq!(analysis[0].breach_count, 2);
        assert_eq!(analysis[0].breach_ratio, 0.5);
        assert_eq!(analysis[0].max, 3000.0);
    }

    #[test]
    fn test_optimization_suggestions_trending() {
        let (mut monitor, _clock) = test_monitor();
        // Mean 1800 is above 75% of the 2000 threshold without breaching
        for _ in 0..5 {
            monitor.track_api_performance("/a", 1800.0);
        }
        let suggestions = monitor.get_optimization_suggestions();
        assert!(suggestions.iter().any(|s| s.contains("caching")));
    }

    #[test]
    fn test_breach_emits_event() {
        let config = EngineConfig::default();
        let bus = EventBus::new(16);
        let mut rx = bus.subscribe();
        let clock = Arc::new(ManualClock::from_system());
        let mut monitor = PerformanceMonitor::new(&config, clock, bus);

        monitor.track_api_performance("/api/studies", 2500.0);

        match rx.try_recv().unwrap() {
            PulseEvent::PerformanceAlert {
                alert_type,
                severity,
                actual_value,
                ..
            } => {
                assert_eq!(alert_type, AlertType::SlowResponse);
                assert_eq!(severity, Severity::Medium);
                assert_eq!(actual_value, 2500.0);
            }
            other => panic!("wrong event: {}", other.event_type()),
        }
    }
}
